/// Live session: the one persistent socket connection per client
///
/// Owns the WebSocket to the messaging backend and translates room/message
/// intents into wire events. Inbound events fan out to subscribers over a
/// broadcast channel; subscribers filter by conversation id. Transport
/// failures degrade silently: the supervisor reconnects with capped backoff,
/// re-registers the user and re-joins the current room, and nothing is
/// surfaced as a user-facing error.
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::wire::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Inbound event broadcast capacity; slow subscribers lag rather than block
const EVENT_CAPACITY: usize = 256;

pub struct LiveSession {
    outgoing: mpsc::UnboundedSender<ClientEvent>,
    events: broadcast::Sender<ServerEvent>,
    current_room: Arc<RwLock<Option<i64>>>,
    shutdown: Arc<RwLock<bool>>,
}

impl LiveSession {
    /// Open the session for the lifetime of the owning client
    pub fn spawn(config: Config) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let current_room = Arc::new(RwLock::new(None));
        let shutdown = Arc::new(RwLock::new(false));

        let session = Self {
            outgoing: outgoing_tx,
            events: events_tx.clone(),
            current_room: current_room.clone(),
            shutdown: shutdown.clone(),
        };

        tokio::spawn(run_supervisor(
            config,
            outgoing_rx,
            events_tx,
            current_room,
            shutdown,
        ));

        session
    }

    /// Subscribe to every inbound event regardless of the active room
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Switch the active room: leaves the previous room first, and updates
    /// the room state before emitting so a reconnect mid-switch lands in the
    /// new room only
    pub async fn join_room(&self, conversation_id: i64) {
        let previous = {
            let mut room = self.current_room.write().await;
            let previous = *room;
            *room = Some(conversation_id);
            previous
        };
        if let Some(previous_id) = previous {
            if previous_id != conversation_id {
                self.emit(ClientEvent::LeaveRoom {
                    conversation_id: previous_id,
                });
            } else {
                return;
            }
        }
        self.emit(ClientEvent::JoinRoom { conversation_id });
    }

    /// Fire-and-forget send; no acknowledgement is awaited
    pub fn send_message(
        &self,
        conversation_id: i64,
        sender_id: &str,
        content: &str,
        correlation_id: uuid::Uuid,
    ) {
        self.emit(ClientEvent::SendMessage {
            conversation_id,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            correlation_id,
        });
    }

    /// Stop the supervisor and close the socket
    pub async fn shutdown(&self) {
        *self.shutdown.write().await = true;
    }

    fn emit(&self, event: ClientEvent) {
        // A closed channel means the supervisor is gone; silent degradation
        if self.outgoing.send(event).is_err() {
            warn!("live session is down, event dropped");
        }
    }
}

impl Clone for LiveSession {
    fn clone(&self) -> Self {
        Self {
            outgoing: self.outgoing.clone(),
            events: self.events.clone(),
            current_room: self.current_room.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, WsMessage>;

/// Connect, pump, reconnect with capped backoff until shutdown
async fn run_supervisor(
    config: Config,
    mut outgoing_rx: mpsc::UnboundedReceiver<ClientEvent>,
    events: broadcast::Sender<ServerEvent>,
    current_room: Arc<RwLock<Option<i64>>>,
    shutdown: Arc<RwLock<bool>>,
) {
    let mut attempts: u32 = 0;

    loop {
        if *shutdown.read().await {
            break;
        }

        match connect(&config).await {
            Ok(stream) => {
                info!("live session connected to {}", config.socket_endpoint());
                attempts = 0;
                let result = run_connection(
                    stream,
                    &config,
                    &mut outgoing_rx,
                    &events,
                    &current_room,
                    &shutdown,
                )
                .await;
                if *shutdown.read().await {
                    break;
                }
                match result {
                    Ok(()) => warn!("live session disconnected, reconnecting"),
                    Err(e) => warn!("live session error: {}, reconnecting", e),
                }
            }
            Err(e) => {
                warn!("live session connect failed: {}", e);
            }
        }

        attempts = attempts.saturating_add(1);
        let delay = backoff_delay(&config, attempts);
        debug!("live session retrying in {:?}", delay);
        sleep(delay).await;
    }

    info!("live session stopped");
}

/// Exponential backoff with jitter, capped at the configured maximum
fn backoff_delay(config: &Config, attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(5);
    let base = config
        .reconnect_base_delay
        .saturating_mul(1u32 << exponent)
        .min(config.reconnect_max_delay);
    let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.3));
    base + jitter
}

async fn connect(config: &Config) -> Result<WsStream> {
    let mut request = config
        .socket_endpoint()
        .into_client_request()
        .map_err(|e| ChatError::Transport(format!("invalid socket URL: {}", e)))?;

    if !config.bearer_token.is_empty() {
        let value = HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .map_err(|e| ChatError::Transport(format!("invalid bearer token: {}", e)))?;
        request.headers_mut().insert("Authorization", value);
    }

    let (stream, _) = timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| ChatError::Transport("connect timeout".to_string()))?
        .map_err(|e| ChatError::Transport(e.to_string()))?;

    Ok(stream)
}

/// Pump one established connection until it drops or shutdown is requested
async fn run_connection(
    stream: WsStream,
    config: &Config,
    outgoing_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    events: &broadcast::Sender<ServerEvent>,
    current_room: &Arc<RwLock<Option<i64>>>,
    shutdown: &Arc<RwLock<bool>>,
) -> Result<()> {
    let (mut write, mut read) = stream.split();

    // Intents queued while disconnected are stale; drop them (no offline
    // queuing) and restore membership from session state instead
    while outgoing_rx.try_recv().is_ok() {}

    send_event(
        &mut write,
        ClientEvent::Register {
            user_id: config.user_id.clone(),
        },
    )
    .await?;
    if let Some(conversation_id) = *current_room.read().await {
        send_event(&mut write, ClientEvent::JoinRoom { conversation_id }).await?;
    }

    loop {
        if *shutdown.read().await {
            let _ = write.send(WsMessage::Close(None)).await;
            break;
        }

        tokio::select! {
            maybe_event = outgoing_rx.recv() => {
                match maybe_event {
                    Some(event) => send_event(&mut write, event).await?,
                    // All senders dropped: the owning client is gone
                    None => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
            maybe_frame = read.next() => {
                match maybe_frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        match ServerEvent::from_json(text.as_str()) {
                            Ok(event) => {
                                debug!("inbound {}", event);
                                let _ = events.send(event);
                            }
                            Err(e) => debug!("unrecognized server event skipped: {}", e),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    // Ping/pong is handled by the protocol stack
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ChatError::Transport(e.to_string())),
                }
            }
            _ = sleep(Duration::from_millis(200)) => {
                // Check shutdown periodically
            }
        }
    }

    Ok(())
}

async fn send_event(write: &mut WsSink, event: ClientEvent) -> Result<()> {
    let json = event.to_json()?;
    debug!("outbound {}", event);
    write
        .send(WsMessage::text(json))
        .await
        .map_err(|e| ChatError::Transport(e.to_string()))
}
