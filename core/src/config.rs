/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the marketplace REST backend
    pub backend_url: String,

    /// WebSocket URL of the messaging backend (derived from `backend_url` if unset)
    pub socket_url: Option<String>,

    /// Bearer credential sent on every REST call and on the socket upgrade
    pub bearer_token: String,

    /// Signed-in user's id
    pub user_id: String,

    /// Signed-in user's display name, used on optimistic local copies
    pub display_name: String,

    /// Timeout for one connection attempt
    pub connect_timeout: Duration,

    /// First reconnect delay; doubles per failed attempt
    pub reconnect_base_delay: Duration,

    /// Reconnect delay cap
    pub reconnect_max_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:4000".to_string(),
            socket_url: None,
            bearer_token: String::new(),
            user_id: String::new(),
            display_name: String::new(),
            connect_timeout: Duration::from_secs(10),
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < 2 {
            return Err(ChatError::Config(format!(
                "Usage: {} <user_id> [--backend <url>] [--socket <url>] [--token <token>] [--name <display_name>]",
                args.first().map(|s| s.as_str()).unwrap_or("chat")
            )));
        }

        let user_id = args[1].clone();
        if user_id.starts_with("--") {
            return Err(ChatError::Config(
                "First argument must be the user id".to_string(),
            ));
        }

        let mut config = Self {
            user_id,
            ..Default::default()
        };

        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--backend" => {
                    let url = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--backend requires a URL argument".to_string())
                    })?;
                    config.backend_url = url.trim_end_matches('/').to_string();
                    i += 2;
                }
                "--socket" => {
                    let url = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--socket requires a URL argument".to_string())
                    })?;
                    config.socket_url = Some(url.clone());
                    i += 2;
                }
                "--token" => {
                    let token = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--token requires a token argument".to_string())
                    })?;
                    config.bearer_token = token.clone();
                    i += 2;
                }
                "--name" => {
                    let name = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--name requires a name argument".to_string())
                    })?;
                    config.display_name = name.clone();
                    i += 2;
                }
                other => {
                    return Err(ChatError::Config(format!("Unknown argument: {}", other)));
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(url) = std::env::var("TAKEOVER_BACKEND_URL") {
            config.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = std::env::var("TAKEOVER_SOCKET_URL") {
            config.socket_url = Some(url);
        }
        if let Ok(token) = std::env::var("TAKEOVER_TOKEN") {
            config.bearer_token = token;
        }

        Ok(config)
    }

    /// WebSocket endpoint, derived from the REST base when not set explicitly
    pub fn socket_endpoint(&self) -> String {
        match &self.socket_url {
            Some(url) => url.clone(),
            None => {
                let ws = if let Some(rest) = self.backend_url.strip_prefix("https://") {
                    format!("wss://{}", rest)
                } else if let Some(rest) = self.backend_url.strip_prefix("http://") {
                    format!("ws://{}", rest)
                } else {
                    format!("ws://{}", self.backend_url)
                };
                format!("{}/socket", ws.trim_end_matches('/'))
            }
        }
    }
}
