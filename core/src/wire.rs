/// Wire events exchanged with the messaging backend
///
/// One JSON object per text frame, tagged with `event`; field names are
/// camelCase on the wire.
use crate::types::Participant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Events emitted by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ClientEvent {
    /// Bind this connection to a user identity (notification stream)
    #[serde(rename = "register", rename_all = "camelCase")]
    Register { user_id: String },

    /// Subscribe to a conversation's event stream
    #[serde(rename = "joinRoom", rename_all = "camelCase")]
    JoinRoom { conversation_id: i64 },

    /// Unsubscribe from a conversation's event stream
    #[serde(rename = "leaveRoom", rename_all = "camelCase")]
    LeaveRoom { conversation_id: i64 },

    /// Submit a new message for persistence and broadcast
    #[serde(rename = "sendMessage", rename_all = "camelCase")]
    SendMessage {
        conversation_id: i64,
        sender_id: String,
        content: String,
        correlation_id: Uuid,
    },
}

/// Events pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// Broadcast of a persisted message to room members
    #[serde(rename = "receiveMessage", rename_all = "camelCase")]
    ReceiveMessage {
        id: i64,
        conversation_id: i64,
        content: String,
        sender: Participant,
        created_at: DateTime<Utc>,
        #[serde(default)]
        correlation_id: Option<Uuid>,
    },

    /// Out-of-band alert, forwarded to the notification UI as-is
    #[serde(rename = "notification")]
    Notification(serde_json::Value),
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::Register { .. } => "register",
            ClientEvent::JoinRoom { .. } => "joinRoom",
            ClientEvent::LeaveRoom { .. } => "leaveRoom",
            ClientEvent::SendMessage { .. } => "sendMessage",
        }
    }
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::ReceiveMessage { .. } => "receiveMessage",
            ServerEvent::Notification(_) => "notification",
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientEvent({})", self.event_name())
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerEvent({})", self.event_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_shape() {
        let event = ClientEvent::SendMessage {
            conversation_id: 12,
            sender_id: "alice".to_string(),
            content: "hi".to_string(),
            correlation_id: Uuid::nil(),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "sendMessage");
        assert_eq!(value["conversationId"], 12);
        assert_eq!(value["senderId"], "alice");
        assert!(value["correlationId"].is_string());
    }

    #[test]
    fn test_receive_message_decodes_without_correlation() {
        let text = r#"{
            "event": "receiveMessage",
            "id": 44,
            "conversationId": 12,
            "content": "hello",
            "sender": { "id": "bob", "name": "Bob" },
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let event = ServerEvent::from_json(text).unwrap();
        match event {
            ServerEvent::ReceiveMessage {
                id,
                conversation_id,
                correlation_id,
                ..
            } => {
                assert_eq!(id, 44);
                assert_eq!(conversation_id, 12);
                assert!(correlation_id.is_none());
            }
            other => panic!("unexpected event: {}", other),
        }
    }

    #[test]
    fn test_notification_payload_passes_through() {
        let text = r#"{"event": "notification", "id": 5, "title": "Takeover applied"}"#;
        let event = ServerEvent::from_json(text).unwrap();
        match event {
            ServerEvent::Notification(record) => {
                assert_eq!(record["title"], "Takeover applied");
            }
            other => panic!("unexpected event: {}", other),
        }
    }
}
