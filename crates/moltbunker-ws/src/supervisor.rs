//! Connection supervisor.
//!
//! Owns the WebSocket for one session. The socket is split once per
//! connection and driven by a single task that selects over:
//!
//! - cancellation (explicit close)
//! - queued outbound messages from the session handle
//! - the keep-alive deadline (`ping_interval` after the last send)
//! - inbound messages, handed synchronously to the session's handler
//!
//! On a transport failure the task either reconnects with exponential
//! backoff or, with `auto_reconnect` off, ends the session. A reconnect
//! rejected as unauthorized always ends the session.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use moltbunker_config::EventsConfig;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::backoff::Backoff;
use crate::endpoint::Endpoint;
use crate::error::SessionError;
use crate::state::ConnectionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Reconnect and keep-alive settings.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub auto_reconnect: bool,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Idle time after the last send before a keep-alive is sent.
    pub ping_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            ping_interval: Duration::from_secs(25),
        }
    }
}

impl From<&EventsConfig> for SupervisorConfig {
    fn from(config: &EventsConfig) -> Self {
        Self {
            auto_reconnect: config.auto_reconnect,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            ping_interval: config.ping_interval(),
        }
    }
}

/// What the handler wants done after an inbound message.
#[derive(Debug, Default)]
pub(crate) struct Dispatch {
    pub replies: Vec<Message>,
    pub terminate: bool,
}

impl Dispatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn reply(message: Message) -> Self {
        Self {
            replies: vec![message],
            terminate: false,
        }
    }

    pub fn terminate() -> Self {
        Self {
            replies: Vec::new(),
            terminate: true,
        }
    }
}

/// Session-specific protocol behavior plugged into the supervisor.
pub(crate) trait SessionHandler: Send + 'static {
    /// Messages to send after each successful connect, before any inbound
    /// message is dispatched.
    fn on_connected(&mut self) -> Vec<Message>;

    /// Keep-alive probe.
    fn keepalive(&self) -> Message;

    /// Handle one inbound message.
    fn on_message(&mut self, message: Message) -> Dispatch;

    /// Sent best-effort when the session is closed locally.
    fn farewell(&self) -> Option<Message> {
        None
    }
}

/// Most recent fatal or reportable error.
#[derive(Clone, Default)]
pub(crate) struct ErrorSlot(Arc<Mutex<Option<SessionError>>>);

impl ErrorSlot {
    pub fn record(&self, error: SessionError) {
        *self.0.lock() = Some(error);
    }

    pub fn get(&self) -> Option<SessionError> {
        self.0.lock().clone()
    }
}

/// Caller-side view of a supervised connection.
#[derive(Clone)]
pub(crate) struct Link {
    outbound: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<ConnectionState>,
    errors: ErrorSlot,
    cancel: CancellationToken,
}

impl Link {
    /// Queue a message for the live connection.
    pub fn send(&self, message: Message) -> Result<(), SessionError> {
        match *self.state.borrow() {
            ConnectionState::Connected => {}
            ConnectionState::Closed | ConnectionState::Closing => {
                return Err(SessionError::Closed);
            }
            _ => return Err(SessionError::NotConnected),
        }
        self.outbound
            .send(message)
            .map_err(|_| SessionError::Closed)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.errors.get()
    }

    pub fn errors(&self) -> ErrorSlot {
        self.errors.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolve once the session is terminal.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        // Sender dropped also means the supervisor is gone.
        let _ = state.wait_for(|s| s.is_terminal()).await;
    }
}

/// Supervisor before it has been started.
pub(crate) struct ConnectionSupervisor {
    config: SupervisorConfig,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
    state: watch::Sender<ConnectionState>,
    link: Link,
}

impl ConnectionSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(ConnectionState::Disconnected);
        let link = Link {
            outbound: outbound_tx,
            state: state_rx,
            errors: ErrorSlot::default(),
            cancel: CancellationToken::new(),
        };
        Self {
            config,
            outbound_rx,
            state,
            link,
        }
    }

    pub fn link(&self) -> Link {
        self.link.clone()
    }

    /// Mark the session closed before it ever connected.
    pub fn abandon(self) {
        self.state.send_replace(ConnectionState::Closed);
    }

    /// Record a setup failure and end the session.
    pub fn fail(self, error: SessionError) -> SessionError {
        warn!("Session setup failed: {}", error);
        self.link.errors.record(error.clone());
        self.state.send_replace(ConnectionState::Closed);
        error
    }

    /// Perform the first handshake, then hand the socket to a background task.
    ///
    /// The first attempt is not retried: a failure here is returned to the
    /// caller and the session is closed.
    pub async fn start<H: SessionHandler>(
        self,
        endpoint: Endpoint,
        handler: H,
    ) -> Result<JoinHandle<()>, SessionError> {
        if self.link.cancel.is_cancelled() {
            self.state.send_replace(ConnectionState::Closed);
            return Err(SessionError::Closed);
        }
        self.state.send_replace(ConnectionState::Connecting);

        let cancel = self.link.cancel.clone();
        let ws = tokio::select! {
            _ = cancel.cancelled() => {
                self.state.send_replace(ConnectionState::Closed);
                return Err(SessionError::Closed);
            }
            result = open(&endpoint) => match result {
                Ok(ws) => ws,
                Err(e) => return Err(self.fail(e)),
            },
        };
        info!("Connected to {}{}", host_of(&endpoint), endpoint.url().path());

        let mut task = SupervisorTask {
            config: self.config,
            endpoint,
            outbound: self.outbound_rx,
            state: self.state,
            errors: self.link.errors.clone(),
            cancel,
        };
        // Mark Connected before returning so sends issued right after
        // connect() are accepted; replay still precedes them on the wire.
        task.state.send_replace(ConnectionState::Connected);
        Ok(tokio::spawn(async move { task.run(ws, handler).await }))
    }
}

fn host_of(endpoint: &Endpoint) -> String {
    endpoint.url().host_str().unwrap_or_default().to_string()
}

async fn open(endpoint: &Endpoint) -> Result<WsStream, SessionError> {
    let request = endpoint.request()?;
    let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(ws)
}

/// Why one connection ended.
enum Outcome {
    /// Local close.
    Cancelled,
    /// Handler asked to end the session.
    Finished,
    /// Transport failure or remote close.
    Dropped(SessionError),
}

struct SupervisorTask {
    config: SupervisorConfig,
    endpoint: Endpoint,
    outbound: mpsc::UnboundedReceiver<Message>,
    state: watch::Sender<ConnectionState>,
    errors: ErrorSlot,
    cancel: CancellationToken,
}

impl SupervisorTask {
    async fn run<H: SessionHandler>(&mut self, mut ws: WsStream, mut handler: H) {
        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);

        loop {
            match self.serve(ws, &mut handler).await {
                Outcome::Cancelled => {
                    debug!("Session closed locally");
                    break;
                }
                Outcome::Finished => {
                    debug!("Session ended by handler");
                    break;
                }
                Outcome::Dropped(e) => {
                    warn!("Connection lost: {}", e);
                    self.errors.record(e);
                    if !self.config.auto_reconnect {
                        break;
                    }
                    self.state.send_replace(ConnectionState::Disconnected);
                }
            }

            match self.reconnect(&mut backoff).await {
                Some(next) => ws = next,
                None => break,
            }
        }

        self.state.send_replace(ConnectionState::Closed);
    }

    /// Retry until connected or cancelled.
    async fn reconnect(&mut self, backoff: &mut Backoff) -> Option<WsStream> {
        loop {
            let delay = backoff.next_delay();
            warn!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = sleep(delay) => {}
            }

            self.state.send_replace(ConnectionState::Connecting);
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                result = open(&self.endpoint) => result,
            };
            match attempt {
                Ok(ws) => {
                    backoff.reset();
                    info!(
                        "Reconnected to {}{}",
                        host_of(&self.endpoint),
                        self.endpoint.url().path()
                    );
                    self.state.send_replace(ConnectionState::Connected);
                    return Some(ws);
                }
                Err(e @ SessionError::Authentication(_)) => {
                    error!("Reconnect rejected, giving up: {}", e);
                    self.errors.record(e);
                    return None;
                }
                Err(e) => {
                    warn!("Reconnect failed: {}", e);
                    self.errors.record(e);
                    self.state.send_replace(ConnectionState::Disconnected);
                }
            }
        }
    }

    /// Drive one connection until it ends.
    async fn serve<H: SessionHandler>(&mut self, ws: WsStream, handler: &mut H) -> Outcome {
        let (mut sink, mut source): (WsSink, WsSource) = ws.split();

        for message in handler.on_connected() {
            trace!("Replaying {:?}", message);
            if let Err(e) = sink.send(message).await {
                return Outcome::Dropped(e.into());
            }
        }
        let mut last_sent = Instant::now();

        loop {
            let keepalive_at = last_sent + self.config.ping_interval;
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.state.send_replace(ConnectionState::Closing);
                    if let Some(message) = handler.farewell() {
                        let _ = sink.send(message).await;
                    }
                    let _ = sink.close().await;
                    return Outcome::Cancelled;
                }

                Some(message) = self.outbound.recv() => {
                    trace!("Sending {:?}", message);
                    if let Err(e) = sink.send(message).await {
                        return Outcome::Dropped(e.into());
                    }
                    last_sent = Instant::now();
                }

                _ = sleep_until(keepalive_at) => {
                    debug!("Sending keep-alive");
                    if let Err(e) = sink.send(handler.keepalive()).await {
                        return Outcome::Dropped(e.into());
                    }
                    last_sent = Instant::now();
                }

                inbound = source.next() => match inbound {
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Server closed connection: {:?}", frame);
                        return Outcome::Dropped(SessionError::Connection(
                            "connection closed by server".to_string(),
                        ));
                    }
                    Some(Ok(message)) => {
                        let dispatch = handler.on_message(message);
                        for reply in dispatch.replies {
                            if let Err(e) = sink.send(reply).await {
                                return Outcome::Dropped(e.into());
                            }
                            last_sent = Instant::now();
                        }
                        if dispatch.terminate {
                            let _ = sink.close().await;
                            return Outcome::Finished;
                        }
                    }
                    Some(Err(e)) => return Outcome::Dropped(e.into()),
                    None => {
                        return Outcome::Dropped(SessionError::Connection(
                            "connection stream ended".to_string(),
                        ));
                    }
                },
            }
        }
    }
}
