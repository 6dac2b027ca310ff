//! The channel worker and its handle.
//!
//! One tokio task exclusively owns the WebSocket stream and multiplexes
//! three event sources: commands from handles, inbound frames, and
//! request deadlines. State is published through a watch channel so
//! reads are synchronous; unclaimed inbound frames fan out on a
//! broadcast channel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use fincoach_protocol::{ChatRequest, CoachReply};

use crate::error::ChannelError;
use crate::state::ConnectionState;

const BROADCAST_CAPACITY: usize = 64;
const COMMAND_CAPACITY: usize = 64;
const PREVIEW_MAX_CHARS: usize = 240;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ReplySender = oneshot::Sender<Result<CoachReply, ChannelError>>;

/// Where to dial and how long a request may wait for its reply.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub request_timeout: Duration,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Handle to a running channel worker (cheap to Clone).
///
/// The worker owns the one physical connection; dropping every handle
/// closes it, so a replaced instance cannot leak its socket.
#[derive(Clone)]
pub struct Channel {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    broadcast_tx: broadcast::Sender<CoachReply>,
    last_rx: watch::Receiver<Option<CoachReply>>,
}

/// Shared fan-out sinks. The supervisor reuses one set across redials
/// so subscribers survive reconnection.
#[derive(Clone)]
pub(crate) struct Sinks {
    pub(crate) broadcast_tx: broadcast::Sender<CoachReply>,
    pub(crate) last_tx: Arc<watch::Sender<Option<CoachReply>>>,
    pub(crate) last_rx: watch::Receiver<Option<CoachReply>>,
}

impl Sinks {
    pub(crate) fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (last_tx, last_rx) = watch::channel(None);
        Self {
            broadcast_tx,
            last_tx: Arc::new(last_tx),
            last_rx,
        }
    }
}

enum Command {
    Request { json: String, reply: ReplySender },
    Notify { json: String },
    Close,
}

impl Channel {
    /// Dial the backend and spawn the worker that owns the connection.
    pub async fn connect(config: &ChannelConfig) -> Result<Self, ChannelError> {
        Self::connect_with_sinks(config, Sinks::new()).await
    }

    pub(crate) async fn connect_with_sinks(
        config: &ChannelConfig,
        sinks: Sinks,
    ) -> Result<Self, ChannelError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let (ws, _response) = connect_async(config.url.as_str()).await.map_err(|e| {
            state_tx.send_replace(ConnectionState::Error);
            ChannelError::Transport(e.to_string())
        })?;

        state_tx.send_replace(ConnectionState::Connected);
        info!(
            component = "channel",
            event = "channel.connected",
            url = %config.url,
            "Channel connected"
        );

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let worker = Worker {
            ws,
            command_rx,
            state_tx,
            broadcast_tx: sinks.broadcast_tx.clone(),
            last_tx: sinks.last_tx,
            request_timeout: config.request_timeout,
            in_flight: None,
            queue: VecDeque::new(),
        };
        tokio::spawn(worker.run());

        Ok(Self {
            command_tx,
            state_rx,
            broadcast_tx: sinks.broadcast_tx,
            last_rx: sinks.last_rx,
        })
    }

    /// Current connection state. Updates synchronously as lifecycle
    /// events fire on the worker.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for callers that await state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Request/response mode: transmit `payload` and resolve with the
    /// reply. Fails fast with [`ChannelError::NotConnected`] when the
    /// channel is not connected; queues behind any request already
    /// awaiting its reply.
    pub async fn request(&self, payload: &ChatRequest) -> Result<CoachReply, ChannelError> {
        if self.state() != ConnectionState::Connected {
            return Err(ChannelError::NotConnected);
        }
        let json = encode(payload)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Request {
                json,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ChannelError::NotConnected)?;
        reply_rx.await.map_err(|_| ChannelError::Closed)?
    }

    /// Broadcast mode: transmit `payload` without waiting for a reply.
    /// Whatever the backend pushes back reaches subscribers instead.
    pub async fn notify(&self, payload: &ChatRequest) -> Result<(), ChannelError> {
        if self.state() != ConnectionState::Connected {
            return Err(ChannelError::NotConnected);
        }
        let json = encode(payload)?;
        self.command_tx
            .send(Command::Notify { json })
            .await
            .map_err(|_| ChannelError::NotConnected)
    }

    /// Receive inbound frames not claimed by a pending request, in
    /// channel arrival order.
    pub fn subscribe(&self) -> broadcast::Receiver<CoachReply> {
        self.broadcast_tx.subscribe()
    }

    /// Most recent unclaimed inbound frame, if any arrived yet.
    pub fn last_message(&self) -> Option<CoachReply> {
        self.last_rx.borrow().clone()
    }

    /// Tear the connection down. Pending and queued requests fail with
    /// [`ChannelError::Closed`]; idempotent.
    pub async fn close(&self) {
        let _ = self.command_tx.send(Command::Close).await;
    }
}

fn encode(payload: &ChatRequest) -> Result<String, ChannelError> {
    serde_json::to_string(payload)
        .map_err(|e| ChannelError::Transport(format!("encode frame: {e}")))
}

fn preview(raw: &str) -> String {
    raw.chars().take(PREVIEW_MAX_CHARS).collect()
}

struct InFlight {
    reply: ReplySender,
    deadline: Instant,
}

struct Queued {
    json: String,
    reply: ReplySender,
    deadline: Instant,
}

enum Exit {
    LocalClose,
    RemoteClose,
    Fault(String),
}

struct Worker {
    ws: WsStream,
    command_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    broadcast_tx: broadcast::Sender<CoachReply>,
    last_tx: Arc<watch::Sender<Option<CoachReply>>>,
    request_timeout: Duration,
    in_flight: Option<InFlight>,
    queue: VecDeque<Queued>,
}

impl Worker {
    async fn run(mut self) {
        let exit = loop {
            let next_deadline = self.next_deadline();
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Request { json, reply }) => {
                        let deadline = Instant::now() + self.request_timeout;
                        if self.in_flight.is_none() {
                            if let Err(e) = self.ws.send(Message::Text(json.into())).await {
                                let _ = reply.send(Err(ChannelError::Transport(e.to_string())));
                                break Exit::Fault(e.to_string());
                            }
                            self.in_flight = Some(InFlight { reply, deadline });
                        } else {
                            self.queue.push_back(Queued { json, reply, deadline });
                        }
                    }
                    Some(Command::Notify { json }) => {
                        if let Err(e) = self.ws.send(Message::Text(json.into())).await {
                            break Exit::Fault(e.to_string());
                        }
                    }
                    Some(Command::Close) | None => break Exit::LocalClose,
                },
                frame = self.ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(exit) = self.handle_text(text.as_str()).await {
                            break exit;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(e) = self.ws.send(Message::Pong(payload)).await {
                            break Exit::Fault(e.to_string());
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Exit::RemoteClose,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Exit::Fault(e.to_string()),
                },
                _ = async {
                    match next_deadline {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if let Err(exit) = self.handle_deadline().await {
                        break exit;
                    }
                }
            }
        };
        self.shutdown(exit).await;
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (&self.in_flight, self.queue.front()) {
            (Some(p), _) => Some(p.deadline),
            (None, Some(q)) => Some(q.deadline),
            (None, None) => None,
        }
    }

    /// Pair an inbound text frame with the oldest pending request, or
    /// fan it out to subscribers when nothing is pending.
    async fn handle_text(&mut self, raw: &str) -> Result<(), Exit> {
        match self.in_flight.take() {
            Some(in_flight) => {
                let result = serde_json::from_str::<CoachReply>(raw).map_err(|e| {
                    ChannelError::MalformedResponse {
                        reason: e.to_string(),
                        payload_preview: preview(raw),
                    }
                });
                let _ = in_flight.reply.send(result);
                self.pump_queue().await
            }
            None => {
                match serde_json::from_str::<CoachReply>(raw) {
                    Ok(reply) => {
                        self.last_tx.send_replace(Some(reply.clone()));
                        let _ = self.broadcast_tx.send(reply);
                    }
                    Err(e) => {
                        warn!(
                            component = "channel",
                            event = "channel.message.parse_failed",
                            error = %e,
                            payload_bytes = raw.len(),
                            payload_preview = %preview(raw),
                            "Dropping malformed broadcast frame"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    /// Transmit the next queued request whose deadline has not already
    /// passed.
    async fn pump_queue(&mut self) -> Result<(), Exit> {
        while let Some(next) = self.queue.pop_front() {
            let Queued {
                json,
                reply,
                deadline,
            } = next;
            if Instant::now() >= deadline {
                let _ = reply.send(Err(ChannelError::Timeout(self.request_timeout)));
                continue;
            }
            if let Err(e) = self.ws.send(Message::Text(json.into())).await {
                let _ = reply.send(Err(ChannelError::Transport(e.to_string())));
                return Err(Exit::Fault(e.to_string()));
            }
            self.in_flight = Some(InFlight { reply, deadline });
            return Ok(());
        }
        Ok(())
    }

    async fn handle_deadline(&mut self) -> Result<(), Exit> {
        let now = Instant::now();

        if self.in_flight.as_ref().is_some_and(|p| now >= p.deadline) {
            if let Some(p) = self.in_flight.take() {
                let _ = p.reply.send(Err(ChannelError::Timeout(self.request_timeout)));
            }
            // A late reply to the timed-out request can no longer be told
            // apart from the reply to the next transmission; without a wire
            // correlation identifier this pairing gap cannot be closed.
            warn!(
                component = "channel",
                event = "channel.request.timeout",
                timeout_ms = self.request_timeout.as_millis() as u64,
                queued = self.queue.len(),
                "Request timed out waiting for a reply"
            );
            return self.pump_queue().await;
        }

        while self.queue.front().is_some_and(|q| now >= q.deadline) {
            if let Some(q) = self.queue.pop_front() {
                let _ = q.reply.send(Err(ChannelError::Timeout(self.request_timeout)));
            }
        }
        Ok(())
    }

    async fn shutdown(mut self, exit: Exit) {
        let (state, err) = match &exit {
            Exit::LocalClose | Exit::RemoteClose => {
                (ConnectionState::Disconnected, ChannelError::Closed)
            }
            Exit::Fault(reason) => (
                ConnectionState::Error,
                ChannelError::Transport(reason.clone()),
            ),
        };

        if let Some(p) = self.in_flight.take() {
            let _ = p.reply.send(Err(err.clone()));
        }
        while let Some(q) = self.queue.pop_front() {
            let _ = q.reply.send(Err(err.clone()));
        }

        // Commands already queued by racing senders must resolve too.
        self.command_rx.close();
        while let Ok(cmd) = self.command_rx.try_recv() {
            if let Command::Request { reply, .. } = cmd {
                let _ = reply.send(Err(err.clone()));
            }
        }

        if matches!(exit, Exit::LocalClose) {
            let _ = self.ws.send(Message::Close(None)).await;
        }

        match &exit {
            Exit::Fault(reason) => warn!(
                component = "channel",
                event = "channel.faulted",
                error = %reason,
                "Channel transport faulted"
            ),
            _ => info!(
                component = "channel",
                event = "channel.closed",
                "Channel closed"
            ),
        }
        self.state_tx.send_replace(state);
    }
}
