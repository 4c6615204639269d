/// Takeover Messaging Core
///
/// Client-side real-time messaging engine for the lease-takeover
/// marketplace: conversation directory, live socket session and
/// thread reconciliation, consumed by a front end through `ChatClient`.

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod rest;
pub mod session;
pub mod thread;
pub mod types;
pub mod wire;

pub use client::{ChatClient, ChatEvent};
pub use config::Config;
pub use error::{ChatError, Result};
