/// Conversation directory: the user's conversations, each annotated with a
/// derived last-message projection used for ordering and preview
use crate::types::{Conversation, LastMessage, Message};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One directory row
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub conversation: Conversation,
    pub last_message: Option<LastMessage>,
}

impl DirectoryEntry {
    /// Conversations with no messages sort last (epoch time)
    fn sort_key(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|last| last.created_at)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

#[derive(Clone)]
pub struct Directory {
    entries: Arc<RwLock<Vec<DirectoryEntry>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Install the initial load, sorted descending by last-message time
    pub async fn replace_all(&self, mut entries: Vec<DirectoryEntry>) {
        sort_entries(&mut entries);
        *self.entries.write().await = entries;
    }

    /// Idempotent insert: a conversation already present is left untouched
    pub async fn upsert(&self, conversation: Conversation) -> bool {
        let mut entries = self.entries.write().await;
        if entries
            .iter()
            .any(|entry| entry.conversation.id == conversation.id)
        {
            return false;
        }
        entries.push(DirectoryEntry {
            conversation,
            last_message: None,
        });
        sort_entries(&mut entries);
        true
    }

    /// Patch the matching conversation's projection with a new message and
    /// re-sort so it moves to the top. Applies to inbound broadcasts and
    /// outbound optimistic sends alike, whether or not the thread is open.
    pub async fn apply_message(&self, message: &Message) -> bool {
        let Some(conversation_id) = message.conversation_id else {
            return false;
        };
        let mut entries = self.entries.write().await;
        let Some(entry) = entries
            .iter_mut()
            .find(|entry| entry.conversation.id == conversation_id)
        else {
            return false;
        };
        entry.last_message = Some(LastMessage::from(message));
        sort_entries(&mut entries);
        true
    }

    /// Sorted snapshot for rendering
    pub async fn entries(&self) -> Vec<DirectoryEntry> {
        self.entries.read().await.clone()
    }

    pub async fn get(&self, conversation_id: i64) -> Option<DirectoryEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.conversation.id == conversation_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

/// Descending by last-message time; stable, so ties keep their relative order
fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}
