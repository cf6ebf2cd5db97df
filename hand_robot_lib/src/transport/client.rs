//! WebSocket client that streams actuator commands to a board or relay.
//!
//! The client owns at most one live link, one pending reconnect and one
//! stream ticker. All three are [`ScheduledTask`]s held in [`LinkState`], so
//! `disconnect()` (or dropping the client) tears everything down.

use super::error::TransportError;
use super::scheduler::ScheduledTask;
use crate::{heartbeat_message, CommandOutput, ConnectionConfig, WireEncoding};
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
pub const RELAY_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// Frames queued for the link task before new ones are dropped
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;
/// How long `shutdown` waits for the close frame to go out
pub const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

/// Callbacks for link lifecycle events. All methods default to no-ops.
///
/// Callbacks run on the client's tasks with no internal lock held.
pub trait ConnectionObserver: Send + Sync {
    fn on_connected(&self) {}
    fn on_disconnected(&self) {}
    fn on_error(&self, _error: &TransportError) {}
}

struct NoopObserver;

impl ConnectionObserver for NoopObserver {}

struct LinkState {
    phase: ConnectionState,
    // Bumped whenever the current link is replaced or dropped on purpose,
    // so a late close from an old socket can't trigger a reconnect.
    generation: u64,
    outbound: Option<mpsc::Sender<Message>>,
    link_task: Option<ScheduledTask>,
    reconnect: Option<ScheduledTask>,
    streaming: Option<ScheduledTask>,
}

struct Inner {
    config: Mutex<ConnectionConfig>,
    link: Mutex<LinkState>,
    observer: Arc<dyn ConnectionObserver>,
    reconnect_delay: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn config(&self) -> ConnectionConfig {
        lock(&self.config).clone()
    }

    fn notify_error(&self, error: &TransportError) {
        self.observer.on_error(error);
    }

    /// Queue one text frame on the live link. Never waits: a full queue
    /// drops the frame.
    fn push(&self, text: String) -> Result<(), TransportError> {
        let link = lock(&self.link);
        let outbound = link.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        outbound.try_send(Message::Text(text)).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("Outbound queue full, dropping frame");
                TransportError::QueueFull
            }
            TrySendError::Closed(_) => TransportError::NotConnected,
        })
    }

    async fn open_link(inner: &Arc<Inner>, config: &ConnectionConfig) -> Result<(), TransportError> {
        let url = config.endpoint_url();
        let attempt = {
            let mut link = lock(&inner.link);
            link.phase = ConnectionState::Connecting;
            link.generation
        };

        info!(url = %url, "Connecting");
        let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|source| TransportError::Connect {
                url: url.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let previous_task = {
            let mut link = lock(&inner.link);
            if link.generation != attempt {
                debug!(url = %url, "Connection attempt superseded");
                return Err(TransportError::Cancelled);
            }
            link.generation += 1;
            let generation = link.generation;
            link.phase = ConnectionState::Connected;
            link.outbound = Some(tx);

            let task = ScheduledTask::spawn(
                "link",
                run_link(inner.clone(), generation, socket, rx, config.targets_relay()),
            );
            link.link_task.replace(task)
        };
        drop(previous_task);

        info!(url = %url, "Connected");
        inner.observer.on_connected();
        Ok(())
    }

    fn link_lost(inner: &Arc<Inner>, generation: u64) {
        {
            let mut link = lock(&inner.link);
            if link.generation != generation {
                return;
            }
            link.outbound = None;
            link.phase = ConnectionState::Disconnected;
        }

        warn!("Connection lost");
        inner.observer.on_disconnected();
        Inner::schedule_reconnect(inner);
    }

    /// Arm the fixed-delay reconnect loop unless one is already pending
    fn schedule_reconnect(inner: &Arc<Inner>) {
        let delay = inner.reconnect_delay;
        let mut link = lock(&inner.link);
        if link.reconnect.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Reconnect already pending");
            return;
        }

        link.phase = ConnectionState::ReconnectPending;
        info!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        let inner = inner.clone();
        link.reconnect = Some(ScheduledTask::spawn("reconnect", async move {
            loop {
                time::sleep(delay).await;

                let config = inner.config();
                let result = match config.validate() {
                    Ok(()) => Inner::open_link(&inner, &config).await,
                    Err(e) => Err(TransportError::from(e)),
                };

                match result {
                    Ok(()) | Err(TransportError::Cancelled) => break,
                    Err(e) => {
                        warn!("Reconnect failed: {}", e);
                        inner.notify_error(&e);
                        lock(&inner.link).phase = ConnectionState::ReconnectPending;
                    }
                }
            }
        }));
    }
}

/// Pumps outbound frames and watches the socket until it closes.
///
/// The outbound channel closing means the owner dropped the link on purpose:
/// a close frame goes out and no reconnect follows.
async fn run_link(
    inner: Arc<Inner>,
    generation: u64,
    socket: Socket,
    mut outbound: mpsc::Receiver<Message>,
    heartbeat: bool,
) {
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat_timer = time::interval_at(
        Instant::now() + RELAY_HEARTBEAT_INTERVAL,
        RELAY_HEARTBEAT_INTERVAL,
    );
    heartbeat_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        warn!("Send failed: {}", e);
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    debug!("Link closed by owner");
                    return;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => debug!(reply = %text, "Received"),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Peer closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    inner.notify_error(&TransportError::Socket(e));
                    break;
                }
                None => break,
            },
            _ = heartbeat_timer.tick(), if heartbeat => {
                if let Err(e) = sink.send(Message::Text(heartbeat_message())).await {
                    warn!("Heartbeat failed: {}", e);
                }
            }
        }
    }

    Inner::link_lost(&inner, generation);
}

/// Options fixed for the lifetime of a [`StreamingTransportClient`]
pub struct ClientBuilder {
    config: ConnectionConfig,
    observer: Arc<dyn ConnectionObserver>,
    reconnect_delay: Duration,
}

impl ClientBuilder {
    pub fn observer(mut self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn build(self) -> StreamingTransportClient {
        StreamingTransportClient {
            inner: Arc::new(Inner {
                config: Mutex::new(self.config),
                link: Mutex::new(LinkState {
                    phase: ConnectionState::Disconnected,
                    generation: 0,
                    outbound: None,
                    link_task: None,
                    reconnect: None,
                    streaming: None,
                }),
                observer: self.observer,
                reconnect_delay: self.reconnect_delay,
            }),
        }
    }
}

/// Streams encoded commands over a WebSocket at the configured cadence.
///
/// Must be used inside a tokio runtime. Dropping the client disconnects it.
pub struct StreamingTransportClient {
    inner: Arc<Inner>,
}

impl StreamingTransportClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ConnectionConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            observer: Arc::new(NoopObserver),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn config(&self) -> ConnectionConfig {
        self.inner.config()
    }

    /// Validate the config and make one connection attempt.
    ///
    /// A config error returns before any attempt and schedules nothing.
    /// A failed attempt schedules the fixed-delay reconnect.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let config = self.inner.config();
        config.validate()?;

        let pending = lock(&self.inner.link).reconnect.take();
        drop(pending);

        match Inner::open_link(&self.inner, &config).await {
            Ok(()) => Ok(()),
            Err(TransportError::Cancelled) => Err(TransportError::Cancelled),
            Err(e) => {
                warn!("Connection failed: {}", e);
                self.inner.notify_error(&e);
                Inner::schedule_reconnect(&self.inner);
                Err(e)
            }
        }
    }

    /// Replace the config. A new cadence applies on the next tick; a new
    /// endpoint drops the live or pending link and reconnects to it.
    pub fn set_config(&self, config: ConnectionConfig) {
        let endpoint_changed = {
            let mut current = lock(&self.inner.config);
            let changed = current.endpoint_url() != config.endpoint_url();
            *current = config;
            changed
        };
        if !endpoint_changed {
            return;
        }

        let (was_connected, pending) = {
            let mut link = lock(&self.inner.link);
            let pending_reconnect = link.reconnect.as_ref().is_some_and(|task| !task.is_finished());
            if link.outbound.is_none() && !pending_reconnect && link.phase == ConnectionState::Disconnected {
                return;
            }
            link.generation += 1;
            link.phase = ConnectionState::Disconnected;
            (link.outbound.take().is_some(), link.reconnect.take())
        };
        drop(pending);

        info!(url = %self.inner.config().endpoint_url(), "Target changed, reconnecting");
        if was_connected {
            self.inner.observer.on_disconnected();
        }
        Inner::schedule_reconnect(&self.inner);
    }

    /// Call `source` once per update interval and push what it returns.
    ///
    /// `None` sends nothing. Ticks with no live link are dropped. Replaces
    /// any previous stream and keeps running across reconnects.
    pub fn start_streaming<F>(&self, mut source: F)
    where
        F: FnMut() -> Option<CommandOutput> + Send + 'static,
    {
        let cadence = self.inner.clone();
        let inner = self.inner.clone();
        let task = ScheduledTask::every(
            "stream",
            move || cadence.config().update_interval(),
            move || {
                if let Some(output) = source() {
                    let encoding = WireEncoding::from_compression(inner.config().compression_enabled);
                    if let Err(e) = inner.push(output.encode(encoding)) {
                        debug!("Dropping frame: {}", e);
                    }
                }
                std::future::ready(())
            },
        );

        let previous = lock(&self.inner.link).streaming.replace(task);
        if previous.is_some() {
            debug!("Replaced previous stream");
        }
    }

    pub fn stop_streaming(&self) {
        let task = lock(&self.inner.link).streaming.take();
        if let Some(task) = task {
            task.cancel();
            debug!("Streaming stopped");
        }
    }

    /// Push a single output now, outside the streaming cadence
    pub fn send(&self, output: &CommandOutput) -> Result<(), TransportError> {
        let encoding = WireEncoding::from_compression(self.inner.config().compression_enabled);
        self.inner.push(output.encode(encoding))
    }

    /// Close the link and cancel every scheduled task. Never reconnects.
    pub fn disconnect(&self) {
        let (was_connected, reconnect, streaming) = {
            let mut link = lock(&self.inner.link);
            link.generation += 1;
            link.phase = ConnectionState::Disconnected;
            (
                link.outbound.take().is_some(),
                link.reconnect.take(),
                link.streaming.take(),
            )
        };
        drop(reconnect);
        drop(streaming);

        if was_connected {
            info!("Disconnected");
            self.inner.observer.on_disconnected();
        }
    }

    /// [`disconnect`](Self::disconnect), then wait for the link task to send
    /// its close frame. Gives up after [`SHUTDOWN_FLUSH_TIMEOUT`].
    pub async fn shutdown(&self) {
        self.disconnect();

        let task = lock(&self.inner.link).link_task.take();
        if let Some(mut task) = task {
            if time::timeout(SHUTDOWN_FLUSH_TIMEOUT, task.finished()).await.is_err() {
                warn!("Link did not close in time");
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.link).phase
    }

    pub fn is_connection_active(&self) -> bool {
        let link = lock(&self.inner.link);
        link.phase == ConnectionState::Connected && link.outbound.is_some()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        let link = lock(&self.inner.link);
        link.phase != ConnectionState::Connected
            && link.reconnect.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for StreamingTransportClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
