//! Reconnection supervisor.
//!
//! A bare [`Channel`](crate::Channel) is terminal once its connection
//! ends. The supervisor owns channel construction instead: it observes
//! `Disconnected`/`Error` transitions and redials with exponential
//! backoff, publishing `Reconnecting` in between, until the retry
//! budget runs out or [`Supervisor::close`] is called.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fincoach_protocol::{ChatRequest, CoachReply};

use crate::channel::{Channel, ChannelConfig, Sinks};
use crate::error::ChannelError;
use crate::state::ConnectionState;

/// How hard to try getting back on the wire.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}

/// A supervised channel: same call surface as [`Channel`], plus
/// automatic redial. Subscribers and the last-message view survive
/// reconnection because every underlying channel feeds the same sinks.
pub struct Supervisor {
    current: Arc<ArcSwapOption<Channel>>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
    broadcast_tx: broadcast::Sender<CoachReply>,
    last_rx: watch::Receiver<Option<CoachReply>>,
    task: JoinHandle<()>,
}

impl Supervisor {
    /// Spawn the supervision task. Dialing starts immediately; await
    /// [`Supervisor::wait_until_connected`] before the first send.
    pub fn start(config: ChannelConfig, policy: ReconnectPolicy) -> Self {
        let sinks = Sinks::new();
        let current: Arc<ArcSwapOption<Channel>> = Arc::new(ArcSwapOption::empty());
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let shutdown = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let task = tokio::spawn(supervise(
            config,
            policy,
            sinks.clone(),
            current.clone(),
            state_tx,
            shutdown.clone(),
            wake.clone(),
        ));

        Self {
            current,
            state_rx,
            shutdown,
            wake,
            broadcast_tx: sinks.broadcast_tx,
            last_rx: sinks.last_rx,
            task,
        }
    }

    /// Current supervised state, including `Reconnecting`.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver over the supervised state.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Block until the channel is connected, or fail once it settles in
    /// a terminal state or `limit` elapses.
    pub async fn wait_until_connected(&self, limit: Duration) -> Result<(), ChannelError> {
        let mut rx = self.state_rx.clone();
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            match *rx.borrow_and_update() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected => return Err(ChannelError::Closed),
                ConnectionState::Error => {
                    return Err(ChannelError::Transport(
                        "channel failed before connecting".to_string(),
                    ))
                }
                ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return Err(ChannelError::Closed),
                Err(_) => return Err(ChannelError::Timeout(limit)),
            }
        }
    }

    /// Request/response mode on the live channel. Fails with
    /// [`ChannelError::NotConnected`] while reconnecting.
    pub async fn request(&self, payload: &ChatRequest) -> Result<CoachReply, ChannelError> {
        match self.current.load_full() {
            Some(channel) => channel.request(payload).await,
            None => Err(ChannelError::NotConnected),
        }
    }

    /// Broadcast mode on the live channel.
    pub async fn notify(&self, payload: &ChatRequest) -> Result<(), ChannelError> {
        match self.current.load_full() {
            Some(channel) => channel.notify(payload).await,
            None => Err(ChannelError::NotConnected),
        }
    }

    /// Receive unclaimed inbound frames across reconnects.
    pub fn subscribe(&self) -> broadcast::Receiver<CoachReply> {
        self.broadcast_tx.subscribe()
    }

    /// Most recent unclaimed inbound frame.
    pub fn last_message(&self) -> Option<CoachReply> {
        self.last_rx.borrow().clone()
    }

    /// Stop supervising and close the live channel. No redial follows.
    pub async fn close(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
        if let Some(channel) = self.current.load_full() {
            channel.close().await;
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // The worker cleans itself up once its last handle is gone; the
        // supervision task must not outlive the owner and redial.
        self.shutdown.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

async fn supervise(
    config: ChannelConfig,
    policy: ReconnectPolicy,
    sinks: Sinks,
    current: Arc<ArcSwapOption<Channel>>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
) {
    let mut attempts: u32 = 0;
    let mut last_terminal = ConnectionState::Disconnected;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            state_tx.send_replace(ConnectionState::Disconnected);
            return;
        }

        state_tx.send_replace(if attempts == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        match Channel::connect_with_sinks(&config, sinks.clone()).await {
            Ok(channel) => {
                if shutdown.load(Ordering::SeqCst) {
                    // close() raced the dial; don't leave the fresh socket behind
                    channel.close().await;
                    state_tx.send_replace(ConnectionState::Disconnected);
                    return;
                }
                attempts = 0;
                let mut channel_state = channel.state_changes();
                current.store(Some(Arc::new(channel)));
                state_tx.send_replace(ConnectionState::Connected);

                let terminal = loop {
                    let s = *channel_state.borrow_and_update();
                    if s.is_terminal() {
                        break s;
                    }
                    if channel_state.changed().await.is_err() {
                        break ConnectionState::Disconnected;
                    }
                };
                current.store(None);
                last_terminal = terminal;

                if shutdown.load(Ordering::SeqCst) {
                    state_tx.send_replace(terminal);
                    return;
                }
                warn!(
                    component = "supervisor",
                    event = "supervisor.channel_lost",
                    terminal = %terminal,
                    "Channel ended, scheduling redial"
                );
            }
            Err(e) => {
                last_terminal = ConnectionState::Error;
                warn!(
                    component = "supervisor",
                    event = "supervisor.dial_failed",
                    error = %e,
                    attempt = attempts + 1,
                    "Dial failed"
                );
            }
        }

        attempts += 1;
        if attempts > policy.max_attempts {
            warn!(
                component = "supervisor",
                event = "supervisor.gave_up",
                attempts = attempts - 1,
                "Retry budget exhausted"
            );
            state_tx.send_replace(last_terminal);
            return;
        }

        let delay = policy.delay_for(attempts);
        info!(
            component = "supervisor",
            event = "supervisor.backoff",
            delay_ms = delay.as_millis() as u64,
            attempt = attempts,
            "Backing off before redial"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wake.notified() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            max_attempts: 5,
        }
    }

    #[tokio::test]
    async fn reconnects_after_remote_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // First connection: close immediately. Second: serve one request.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.close(None).await.ok();

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            if ws.next().await.is_some() {
                ws.send(Message::Text(
                    r#"{"success":true,"message":"after-reconnect"}"#.into(),
                ))
                .await
                .unwrap();
            }
        });

        let supervisor = Supervisor::start(
            ChannelConfig::new(format!("ws://{addr}")),
            fast_policy(),
        );

        let mut saw_reconnecting = false;
        let mut states = supervisor.state_changes();
        let reply = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if *states.borrow_and_update() == ConnectionState::Reconnecting {
                    saw_reconnecting = true;
                }
                if *states.borrow() == ConnectionState::Connected {
                    match supervisor
                        .request(&ChatRequest::new("sess", "are you back"))
                        .await
                    {
                        Ok(reply) => break reply,
                        Err(_) => {
                            // the watch can lag the swap briefly
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            continue;
                        }
                    }
                }
                states.changed().await.unwrap();
            }
        })
        .await
        .expect("supervisor must recover");

        assert_eq!(reply.message, "after-reconnect");
        assert!(saw_reconnecting);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        // Grab a port, then free it so every dial is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let supervisor = Supervisor::start(
            ChannelConfig::new(format!("ws://{addr}")),
            ReconnectPolicy {
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(10),
                max_attempts: 2,
            },
        );

        let mut states = supervisor.state_changes();
        let settled = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let s = *states.borrow_and_update();
                if s.is_terminal() {
                    break s;
                }
                states.changed().await.unwrap();
            }
        })
        .await
        .expect("supervisor must settle");

        assert_eq!(settled, ConnectionState::Error);
        let result = supervisor
            .request(&ChatRequest::new("sess", "anyone there"))
            .await;
        assert!(matches!(result, Err(ChannelError::NotConnected)));
    }

    #[tokio::test]
    async fn close_prevents_redial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ws = accept_async(stream).await.unwrap();
            std::future::pending::<()>().await;
        });

        let supervisor = Supervisor::start(
            ChannelConfig::new(format!("ws://{addr}")),
            fast_policy(),
        );
        supervisor
            .wait_until_connected(Duration::from_secs(1))
            .await
            .unwrap();

        supervisor.close().await;

        let mut states = supervisor.state_changes();
        let settled = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let s = *states.borrow_and_update();
                if s.is_terminal() {
                    break s;
                }
                states.changed().await.unwrap();
            }
        })
        .await
        .expect("close must settle the state");
        assert_eq!(settled, ConnectionState::Disconnected);
    }
}
