use crate::client::stats::Stats;
use crate::types::{InboundMessage, OutboundMessage, decode_frame};
use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_tungstenite::tungstenite::Message;
use tracing::Instrument;

mod config;
mod consts;
mod stats;
mod utils;

pub use config::{TransportConfig, TransportConfigBuilder};
pub use stats::Stats as TransportStats;
pub use utils::TransportError;

/// Normalized events reported by the transport channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    MessageReceived(InboundMessage),
    Errored(String),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Command surface of the transport channel.
///
/// None of these calls block on the network: results come back later as
/// [`TransportEvent`]s on the event queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Channel: Send {
    /// Opens the socket. No-op while connecting or open.
    async fn connect(&mut self);

    /// Queues a frame. Dropped with a log entry unless the channel is open.
    async fn send(&mut self, message: OutboundMessage);

    /// Sends a close frame and ends the current attempt.
    async fn close(&mut self);
}

type SharedState = Arc<Mutex<ChannelState>>;

fn read_state(state: &SharedState) -> ChannelState {
    match state.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_state(state: &SharedState, next: ChannelState) {
    match state.lock() {
        Ok(mut guard) => *guard = next,
        Err(poisoned) => *poisoned.into_inner() = next,
    }
}

/// WebSocket implementation of [`Channel`].
///
/// Owns the socket through one spawned task per connection attempt. The
/// session never touches the socket directly.
pub struct Transport<E> {
    config: TransportConfig,
    events: mpsc::Sender<E>,
    c_tx: Option<mpsc::Sender<OutboundMessage>>,
    state: SharedState,
    stats: Arc<Mutex<Stats>>,
    attempt: Arc<AtomicU64>,
}

impl<E> Transport<E>
where
    E: From<TransportEvent> + Send + 'static,
{
    pub fn new(config: TransportConfig, events: mpsc::Sender<E>) -> Self {
        Self {
            config,
            events,
            c_tx: None,
            state: Arc::new(Mutex::new(ChannelState::Idle)),
            stats: Arc::new(Mutex::new(Stats::new())),
            attempt: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> ChannelState {
        read_state(&self.state)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    // Return a snapshot of the frame counters.
    pub fn stats(&self) -> Result<TransportStats> {
        if let Ok(stats_guard) = self.stats.lock() {
            Ok(stats_guard.clone())
        } else {
            Err(anyhow::anyhow!("failed to get stats"))
        }
    }
}

#[async_trait]
impl<E> Channel for Transport<E>
where
    E: From<TransportEvent> + Send + 'static,
{
    async fn connect(&mut self) {
        let state = self.state();
        if matches!(state, ChannelState::Connecting | ChannelState::Open) {
            tracing::debug!("channel is {:?}, ignoring connect", state);
            return;
        }

        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        write_state(&self.state, ChannelState::Connecting);

        let (c_tx, c_rx) = mpsc::channel(self.config.capacity());
        self.c_tx = Some(c_tx);

        let connection = Connection {
            id: attempt,
            current: self.attempt.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
            stats: self.stats.clone(),
        };
        let span = tracing::info_span!("transport", attempt);
        tokio::spawn(connection.run(c_rx).instrument(span));
    }

    async fn send(&mut self, message: OutboundMessage) {
        let state = self.state();
        if state != ChannelState::Open {
            tracing::warn!("dropping `{}` frame: channel is {:?}", message.kind(), state);
            return;
        }
        match self.c_tx {
            Some(ref tx) => {
                if let Err(e) = tx.try_send(message) {
                    tracing::error!("failed to queue outbound frame: {}", e);
                }
            }
            None => tracing::warn!("dropping `{}` frame: channel was closed", message.kind()),
        }
    }

    async fn close(&mut self) {
        // Dropping the sender tells the connection task to send a close frame.
        if self.c_tx.take().is_some() {
            tracing::info!("closing channel");
        }
    }
}

struct Connection<E> {
    id: u64,
    // Id of the latest attempt. Older attempts no longer own the state.
    current: Arc<AtomicU64>,
    config: TransportConfig,
    events: mpsc::Sender<E>,
    state: SharedState,
    stats: Arc<Mutex<Stats>>,
}

impl<E> Connection<E>
where
    E: From<TransportEvent> + Send + 'static,
{
    async fn emit(&self, event: TransportEvent) {
        if let Err(e) = self.events.send(E::from(event)).await {
            tracing::error!("failed to send transport event: {}", e);
        }
    }

    fn set_state(&self, next: ChannelState) {
        let current = self.current.load(Ordering::SeqCst);
        if current != self.id {
            tracing::debug!("attempt {} superseded by {}, not setting {:?}", self.id, current, next);
            return;
        }
        write_state(&self.state, next);
    }

    async fn fail(&self, cause: String) {
        self.set_state(ChannelState::Closed);
        self.emit(TransportEvent::Errored(cause)).await;
        self.emit(TransportEvent::Closed).await;
    }

    fn update_stats(&self, update: impl FnOnce(&mut Stats)) {
        if let Ok(mut stats_guard) = self.stats.lock() {
            update(&mut *stats_guard);
        } else {
            tracing::error!("failed to update stats");
        }
    }

    async fn run(self, mut c_rx: mpsc::Receiver<OutboundMessage>) {
        let request = match utils::build_request(&self.config) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("failed to build request: {}", e);
                self.fail(e.to_string()).await;
                return;
            }
        };

        tracing::info!("connecting to {}", self.config.url());
        let ws_stream = match tokio_tungstenite::connect_async(request).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                tracing::error!("failed to connect: {}", e);
                self.fail(e.to_string()).await;
                return;
            }
        };

        self.set_state(ChannelState::Open);
        self.emit(TransportEvent::Opened).await;
        tracing::info!("connection open");

        let (mut write, mut read) = ws_stream.split();
        let mut ping = self
            .config
            .ping_interval()
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));
        let mut closing = false;
        let mut close_deadline = Instant::now();

        loop {
            tokio::select! {
                outbound = c_rx.recv(), if !closing => match outbound {
                    Some(message) => {
                        if let Err(e) = self.send_frame(&mut write, &message).await {
                            tracing::error!("failed to send message: {}", e);
                            self.set_state(ChannelState::Closed);
                            self.emit(TransportEvent::Errored(e.to_string())).await;
                            break;
                        }
                    }
                    None => {
                        closing = true;
                        close_deadline = Instant::now() + Duration::from_secs(consts::CLOSE_GRACE_SECS);
                        if let Err(e) = write.send(Message::Close(None)).await {
                            tracing::warn!("failed to send close frame: {}", e);
                            break;
                        }
                    }
                },
                _ = next_tick(&mut ping), if !closing => {
                    if let Err(e) = self.send_frame(&mut write, &OutboundMessage::Ping).await {
                        tracing::warn!("failed to send keep-alive: {}", e);
                    }
                },
                _ = tokio::time::sleep_until(close_deadline), if closing => {
                    tracing::warn!("backend did not acknowledge close in time");
                    break;
                },
                incoming = read.next() => match incoming {
                    None => {
                        tracing::info!("connection stream ended");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("failed to read message: {}", e);
                        self.set_state(ChannelState::Closed);
                        self.emit(TransportEvent::Errored(e.to_string())).await;
                        break;
                    }
                    Some(Ok(Message::Text(text))) => self.handle_text(&text).await,
                    Some(Ok(Message::Binary(bin))) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Some(Ok(Message::Close(reason))) => {
                        // keep reading so the close reply gets flushed
                        tracing::info!("connection closed: {:?}", reason);
                    }
                    Some(Ok(_)) => {}
                },
            }
        }

        self.set_state(ChannelState::Closed);
        self.emit(TransportEvent::Closed).await;
    }

    async fn send_frame<S>(&self, write: &mut S, message: &OutboundMessage) -> Result<()>
    where
        S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let text = message.to_json()?;
        write.send(Message::Text(text)).await?;
        self.update_stats(Stats::record_sent);
        tracing::debug!("sent `{}` frame", message.kind());
        Ok(())
    }

    async fn handle_text(&self, text: &str) {
        self.update_stats(Stats::record_received);

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
            let kind = json.get("type").and_then(|v| v.as_str());
            let event = json.get("event").and_then(|v| v.as_str());
            tracing::debug!(
                "received message: type={}, event={}",
                kind.unwrap_or("none"),
                event.unwrap_or("none")
            );
        }

        match decode_frame(text) {
            Ok(messages) => {
                for message in messages {
                    self.emit(TransportEvent::MessageReceived(message)).await;
                }
            }
            Err(e) => {
                self.update_stats(Stats::record_dropped);
                tracing::warn!("dropping malformed frame: {}, text=> {:?}", e, text);
            }
        }
    }
}

async fn next_tick(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
