/// Open-thread state: the one conversation whose full message list is on
/// screen, merged from fetched history, optimistic local sends and
/// live-pushed inbound messages
use crate::types::Message;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What an inbound event did to the open thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadChange {
    /// Appended in arrival order
    Appended,
    /// Replaced a pending optimistic entry with the server echo
    Reconciled,
    /// Not for the open thread; dropped (room isolation)
    NotOpen,
}

#[derive(Debug, Default)]
struct ThreadState {
    conversation_id: Option<i64>,
    /// Bumped on every open; stale history fetches carry an old value
    generation: u64,
    messages: Vec<Message>,
}

#[derive(Clone)]
pub struct ThreadView {
    state: Arc<RwLock<ThreadState>>,
}

impl ThreadView {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ThreadState::default())),
        }
    }

    /// Mark a conversation as the active thread, discarding prior state.
    /// Returns the generation token the history fetch must present.
    pub async fn open(&self, conversation_id: i64) -> u64 {
        let mut state = self.state.write().await;
        state.conversation_id = Some(conversation_id);
        state.generation += 1;
        state.messages.clear();
        state.generation
    }

    /// Replace the list wholesale with a fetch result. A fetch that resolves
    /// after the user switched threads presents a stale generation and is
    /// discarded.
    pub async fn install_history(
        &self,
        generation: u64,
        conversation_id: i64,
        mut messages: Vec<Message>,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation || state.conversation_id != Some(conversation_id) {
            return false;
        }
        // The fetch path implies the conversation; stamp it for uniformity
        for message in &mut messages {
            message.conversation_id.get_or_insert(conversation_id);
        }
        state.messages = messages;
        true
    }

    /// Synchronous append of a local copy, before any network round-trip
    pub async fn append_optimistic(&self, message: Message) -> bool {
        let mut state = self.state.write().await;
        if state.conversation_id != message.conversation_id {
            return false;
        }
        state.messages.push(message);
        true
    }

    /// Apply an inbound broadcast. Ignored unless it targets the open
    /// thread; an echo of a pending optimistic send replaces the placeholder
    /// in place instead of rendering twice.
    pub async fn apply_inbound(&self, message: &Message) -> ThreadChange {
        let mut state = self.state.write().await;
        if state.conversation_id.is_none() || state.conversation_id != message.conversation_id {
            return ThreadChange::NotOpen;
        }

        if let Some(correlation_id) = message.correlation_id {
            let placeholder = state
                .messages
                .iter_mut()
                .find(|existing| existing.pending && existing.correlation_id == Some(correlation_id));
            if let Some(existing) = placeholder {
                existing.id = message.id;
                existing.created_at = message.created_at;
                existing.content = message.content.clone();
                existing.pending = false;
                return ThreadChange::Reconciled;
            }
        }

        state.messages.push(message.clone());
        ThreadChange::Appended
    }

    pub async fn conversation_id(&self) -> Option<i64> {
        self.state.read().await.conversation_id
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    /// Close the thread view entirely (no conversation selected)
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.conversation_id = None;
        state.generation += 1;
        state.messages.clear();
    }
}

impl Default for ThreadView {
    fn default() -> Self {
        Self::new()
    }
}
