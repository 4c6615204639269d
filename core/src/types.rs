/// Shared types for the messaging layer
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One side of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// The listing a conversation is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRef {
    pub id: i64,
    pub title: String,
    #[serde(rename = "userId")]
    pub owner_user_id: String,
}

/// A durable pairing of two users scoped to one listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub listing: ListingRef,
    #[serde(rename = "participant1")]
    pub participant_a: Participant,
    #[serde(rename = "participant2")]
    pub participant_b: Participant,
    // The backend serializes this one field in snake_case
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Resolve the counterparty relative to the signed-in user
    pub fn other_participant(&self, user_id: &str) -> &Participant {
        if self.participant_a.id == user_id {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }
}

/// One chat message, fetched, pushed or locally echoed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned id; `None` while the message is an optimistic local copy
    #[serde(default)]
    pub id: Option<i64>,
    /// Present on socket broadcasts; implied by the fetch path for history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
    pub content: String,
    pub sender: Participant,
    pub created_at: DateTime<Utc>,
    /// Client-generated tag carried on sends and echoed back by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// True until the server echo lands
    #[serde(skip)]
    pub pending: bool,
}

impl Message {
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender.id == user_id
    }
}

/// Derived last-message projection used for directory ordering and preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl LastMessage {
    /// Preview text clipped for list rendering
    pub fn preview(&self, max_chars: usize) -> String {
        if self.content.chars().count() > max_chars {
            let clipped: String = self.content.chars().take(max_chars).collect();
            format!("{}...", clipped)
        } else {
            self.content.clone()
        }
    }
}

impl From<&Message> for LastMessage {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}
