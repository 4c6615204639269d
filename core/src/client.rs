/// Client composition: owns the live session, the directory and the open
/// thread, pumps session events into both, and fans state changes out to the
/// front end
use crate::config::Config;
use crate::directory::{Directory, DirectoryEntry};
use crate::error::{ChatError, Result};
use crate::rest::RestClient;
use crate::session::LiveSession;
use crate::thread::{ThreadChange, ThreadView};
use crate::types::{Conversation, LastMessage, Message, Participant};
use crate::wire::ServerEvent;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// State-change events a front end renders from; every thread mutation is
/// reported so the view can scroll to the latest message
#[derive(Debug, Clone)]
pub enum ChatEvent {
    DirectoryChanged,
    ThreadChanged { conversation_id: i64 },
    IncomingMessage { conversation_id: i64 },
    Notification(serde_json::Value),
}

const CHAT_EVENT_CAPACITY: usize = 256;

pub struct ChatClient {
    config: Config,
    rest: RestClient,
    session: LiveSession,
    directory: Directory,
    thread: ThreadView,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatClient {
    /// Create the client and open its live session. The session is owned
    /// here and torn down by `shutdown`; nothing lives at module scope.
    pub fn new(config: Config) -> Self {
        let rest = RestClient::new(&config.backend_url, &config.bearer_token);
        let session = LiveSession::spawn(config.clone());
        let (events, _) = broadcast::channel(CHAT_EVENT_CAPACITY);

        Self {
            config,
            rest,
            session,
            directory: Directory::new(),
            thread: ThreadView::new(),
            events,
        }
    }

    /// Spawn the event pump: session events are applied to the thread first
    /// (so echo reconciliation wins over a duplicate render), then to the
    /// directory, then re-broadcast as `ChatEvent`s
    pub fn start(&self) {
        let client = self.clone();
        let mut events = self.session.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => client.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("event pump lagged {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn thread(&self) -> &ThreadView {
        &self.thread
    }

    /// Initial directory load: list conversations, then fetch each history
    /// for its last element. N+1 by design; the backend exposes no list
    /// endpoint with previews and per-user conversation counts are small.
    pub async fn load_conversations(&self) -> Result<()> {
        let conversations = self.rest.list_conversations(&self.config.user_id).await?;
        let mut entries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let last_message = match self
                .rest
                .fetch_messages(conversation.id, &self.config.user_id)
                .await
            {
                Ok(messages) => messages.last().map(LastMessage::from),
                Err(e) => {
                    warn!(
                        "failed to load history for conversation {}: {}",
                        conversation.id, e
                    );
                    None
                }
            };
            entries.push(DirectoryEntry {
                conversation,
                last_message,
            });
        }
        self.directory.replace_all(entries).await;
        let _ = self.events.send(ChatEvent::DirectoryChanged);
        Ok(())
    }

    /// Get-or-create the conversation for a listing and counterparty, then
    /// open it. Creation is idempotent at the REST boundary and the upsert
    /// deduplicates by id, so landing here twice yields one directory entry.
    pub async fn open_conversation(
        &self,
        listing_id: i64,
        receiver_id: &str,
    ) -> Result<Conversation> {
        let conversation = self
            .rest
            .get_or_create_conversation(listing_id, &self.config.user_id, receiver_id)
            .await?;
        if self.directory.upsert(conversation.clone()).await {
            let _ = self.events.send(ChatEvent::DirectoryChanged);
        }
        self.select_conversation(conversation.id).await;
        Ok(conversation)
    }

    /// Mark a conversation as the active thread: join its room (leaving the
    /// previous one) and load full history. A fetch that resolves after the
    /// user has moved on is discarded by the generation guard. Fetch
    /// failures are logged and leave the thread empty; no retry.
    pub async fn select_conversation(&self, conversation_id: i64) {
        let generation = self.thread.open(conversation_id).await;
        self.session.join_room(conversation_id).await;
        let _ = self.events.send(ChatEvent::ThreadChanged { conversation_id });

        match self
            .rest
            .fetch_messages(conversation_id, &self.config.user_id)
            .await
        {
            Ok(messages) => {
                if self
                    .thread
                    .install_history(generation, conversation_id, messages)
                    .await
                {
                    let _ = self.events.send(ChatEvent::ThreadChanged { conversation_id });
                } else {
                    debug!(
                        "stale history fetch for conversation {} discarded",
                        conversation_id
                    );
                }
            }
            Err(e) => {
                error!(
                    "failed to load messages for conversation {}: {}",
                    conversation_id, e
                );
            }
        }
    }

    /// Fire-and-forget send with an immediate optimistic local copy. The
    /// emit carries a correlation id the server echoes back; the thread
    /// swaps the placeholder for the echo when it lands.
    pub async fn send_message(&self, content: &str) -> Result<()> {
        let Some(conversation_id) = self.thread.conversation_id().await else {
            return Err(ChatError::Protocol(
                "no conversation selected".to_string(),
            ));
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        let correlation_id = Uuid::new_v4();
        let message = Message {
            id: None,
            conversation_id: Some(conversation_id),
            content: content.to_string(),
            sender: Participant {
                id: self.config.user_id.clone(),
                display_name: self.config.display_name.clone(),
            },
            created_at: Utc::now(),
            correlation_id: Some(correlation_id),
            pending: true,
        };

        self.thread.append_optimistic(message.clone()).await;
        self.directory.apply_message(&message).await;
        self.session
            .send_message(conversation_id, &self.config.user_id, content, correlation_id);

        let _ = self.events.send(ChatEvent::ThreadChanged { conversation_id });
        let _ = self.events.send(ChatEvent::DirectoryChanged);
        Ok(())
    }

    /// Release the session; the client is done
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }

    async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::ReceiveMessage {
                id,
                conversation_id,
                content,
                sender,
                created_at,
                correlation_id,
            } => {
                let message = Message {
                    id: Some(id),
                    conversation_id: Some(conversation_id),
                    content,
                    sender,
                    created_at,
                    correlation_id,
                    pending: false,
                };

                let change = self.thread.apply_inbound(&message).await;
                let in_directory = self.directory.apply_message(&message).await;
                if !in_directory {
                    debug!(
                        "message for unknown conversation {} ignored by directory",
                        conversation_id
                    );
                }

                let _ = self.events.send(ChatEvent::IncomingMessage { conversation_id });
                if change != ThreadChange::NotOpen {
                    let _ = self.events.send(ChatEvent::ThreadChanged { conversation_id });
                }
                if in_directory {
                    let _ = self.events.send(ChatEvent::DirectoryChanged);
                }
            }
            ServerEvent::Notification(record) => {
                let _ = self.events.send(ChatEvent::Notification(record));
            }
        }
    }
}

impl Clone for ChatClient {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            rest: self.rest.clone(),
            session: self.session.clone(),
            directory: self.directory.clone(),
            thread: self.thread.clone(),
            events: self.events.clone(),
        }
    }
}
