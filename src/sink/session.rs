//! Sink connection session and receive loop.
//!
//! # Lifecycle
//!
//! ```text
//! Closed --open()--> Open --close() / remote close / error--> Closed
//! ```
//!
//! [`Sink::open`] connects and spawns the receive loop as a tokio task.
//! The loop owns the socket, so it is released on every exit path.
//!
//! # Receive Loop
//!
//! For each inbound frame:
//!
//! 1. Append the raw frame to history
//! 2. Parse it into an [`InboundMessage`]
//! 3. Dispatch it through the [`CallbackRegistry`]
//! 4. Forward it to [`MessageStream`] subscribers
//!
//! Malformed frames are logged and skipped. Listeners run one message at a
//! time, in arrival order, never concurrently.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::protocol::InboundMessage;

use super::builder::SinkBuilder;
use super::history::History;
use super::registry::{CallbackRegistry, EventFilter, ListenerHandle};

// ============================================================================
// Constants
// ============================================================================

/// Messages buffered per [`MessageStream`] before it starts lagging.
const MESSAGE_BUFFER: usize = 256;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sender side of the message subscription, dropped when the loop ends.
type SharedMessageSender = Arc<Mutex<Option<broadcast::Sender<InboundMessage>>>>;

// ============================================================================
// CloseReason
// ============================================================================

/// Why a receive loop terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// [`Sink::close`] (or drop) asked the loop to stop.
    Requested,
    /// The relay closed the connection.
    Remote,
    /// The connection failed.
    Failed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("closed by client"),
            Self::Remote => f.write_str("closed by relay"),
            Self::Failed(message) => write!(f, "connection failed: {message}"),
        }
    }
}

/// Receive loop state published through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopState {
    Running,
    Finished(CloseReason),
}

impl LoopState {
    fn reason(&self) -> Option<CloseReason> {
        match self {
            Self::Running => None,
            Self::Finished(reason) => Some(reason.clone()),
        }
    }
}

/// Internal commands for the receive loop.
enum SessionCommand {
    /// Close the socket and stop.
    Shutdown,
}

// ============================================================================
// Session
// ============================================================================

/// One open connection and its receive loop.
struct Session {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
    state_rx: watch::Receiver<LoopState>,
    messages: SharedMessageSender,
}

impl Session {
    fn spawn(ws_stream: WsStream, registry: CallbackRegistry, history: History) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LoopState::Running);
        let (messages_tx, _) = broadcast::channel(MESSAGE_BUFFER);
        let messages: SharedMessageSender = Arc::new(Mutex::new(Some(messages_tx)));

        let context = LoopContext {
            registry,
            history,
            messages: Arc::clone(&messages),
        };

        let task = tokio::spawn(async move {
            let reason = run_receive_loop(ws_stream, command_rx, &context).await;
            context.messages.lock().take();
            state_tx.send_replace(LoopState::Finished(reason));
        });

        Self {
            command_tx,
            task,
            state_rx,
            messages,
        }
    }

    fn is_running(&self) -> bool {
        matches!(*self.state_rx.borrow(), LoopState::Running)
    }

    fn shutdown(&self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
    }
}

// ============================================================================
// MessageStream
// ============================================================================

/// Parsed inbound messages of one open session, in arrival order.
///
/// Ends when the session closes. A subscriber that falls more than
/// 256 messages behind skips the oldest ones.
pub struct MessageStream {
    rx: broadcast::Receiver<InboundMessage>,
}

impl MessageStream {
    /// Waits for the next message. Returns `None` once the session closed.
    pub async fn next(&mut self) -> Option<InboundMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Message stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Receiving client: one persistent connection dispatching relay events.
///
/// # Example
///
/// ```no_run
/// use sinkr::Sink;
///
/// # async fn example() -> sinkr::Result<()> {
/// let sink = Sink::builder()
///     .url("wss://relay.example")
///     .app_id("app1")
///     .build()?;
///
/// sink.on("ping", |data| println!("ping: {data}"));
/// sink.open().await?;
///
/// let reason = sink.wait_closed().await?;
/// println!("session ended: {reason}");
/// # Ok(())
/// # }
/// ```
pub struct Sink {
    endpoint: Endpoint,
    registry: CallbackRegistry,
    history: History,
    session: Mutex<Option<Session>>,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Sink - Constructor
// ============================================================================

impl Sink {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SinkBuilder {
        SinkBuilder::new()
    }

    /// Creates a closed sink for a resolved endpoint.
    #[must_use]
    pub fn new(endpoint: Endpoint, history_capacity: usize) -> Self {
        Self {
            endpoint,
            registry: CallbackRegistry::new(),
            history: History::new(history_capacity),
            session: Mutex::new(None),
        }
    }
}

// ============================================================================
// Sink - Accessors
// ============================================================================

impl Sink {
    /// Returns the resolved endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the callback registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Returns `true` while the receive loop is running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.lock().as_ref().is_some_and(Session::is_running)
    }

    /// Returns the retained raw frames, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.snapshot()
    }

    /// Drops all retained raw frames.
    pub fn clear_history(&self) {
        self.history.clear();
    }
}

// ============================================================================
// Sink - Listeners
// ============================================================================

impl Sink {
    /// Registers `handler` for `event` (or every event with
    /// [`EventFilter::Any`] / `None`).
    pub fn on<F>(&self, event: impl Into<EventFilter>, handler: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.registry.on(event, handler)
    }

    /// Registers `handler` for every event.
    pub fn on_any<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.registry.on(EventFilter::Any, handler)
    }

    /// Registers `handler` for the first matching event only.
    pub fn once<F>(&self, event: impl Into<EventFilter>, handler: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.registry.once(event, handler)
    }

    /// Removes listeners for `event`, or all listeners for
    /// [`EventFilter::Any`] / `None`.
    pub fn clear_listeners(&self, event: impl Into<EventFilter>) {
        self.registry.clear_listeners(event);
    }
}

// ============================================================================
// Sink - Lifecycle
// ============================================================================

impl Sink {
    /// Connects and starts the receive loop.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if a session is open
    /// - [`Error::WebSocket`] if the WebSocket handshake fails
    pub async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        debug!(endpoint = %self.endpoint, "Connecting sink");

        let (ws_stream, _) = connect_async(self.endpoint.as_str()).await.map_err(|e| {
            error!(endpoint = %self.endpoint, error = %e, "WebSocket connect failed");
            Error::from(e)
        })?;

        let session = Session::spawn(ws_stream, self.registry.clone(), self.history.clone());

        {
            let mut guard = self.session.lock();
            if guard.as_ref().is_some_and(Session::is_running) {
                session.shutdown();
                return Err(Error::AlreadyConnected);
            }
            *guard = Some(session);
        }

        info!(endpoint = %self.endpoint, "Sink connected");
        Ok(())
    }

    /// Closes the connection and waits for the receive loop to stop.
    ///
    /// Returns why the loop ended; [`CloseReason::Remote`] or
    /// [`CloseReason::Failed`] if it had already stopped on its own.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no session
    /// - [`Error::Connection`] if the receive loop task panicked
    pub async fn close(&self) -> Result<CloseReason> {
        let session = self.session.lock().take().ok_or(Error::NotConnected)?;
        session.shutdown();

        let Session { task, state_rx, .. } = session;
        task.await
            .map_err(|e| Error::connection(format!("receive loop aborted: {e}")))?;

        let reason = state_rx.borrow().reason().unwrap_or(CloseReason::Requested);
        info!(endpoint = %self.endpoint, %reason, "Sink closed");

        Ok(reason)
    }

    /// Waits until the receive loop terminates.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no session
    /// - [`Error::ConnectionClosed`] if the loop vanished without a reason
    pub async fn wait_closed(&self) -> Result<CloseReason> {
        let mut state_rx = self
            .session
            .lock()
            .as_ref()
            .map(|session| session.state_rx.clone())
            .ok_or(Error::NotConnected)?;

        let state = state_rx
            .wait_for(|state| state.reason().is_some())
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        state.reason().ok_or(Error::ConnectionClosed)
    }

    /// Subscribes to parsed inbound messages of the open session.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] if no session is open.
    pub fn messages(&self) -> Result<MessageStream> {
        let guard = self.session.lock();
        let session = guard
            .as_ref()
            .filter(|session| session.is_running())
            .ok_or(Error::NotConnected)?;

        let rx = session
            .messages
            .lock()
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(Error::NotConnected)?;

        Ok(MessageStream { rx })
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.shutdown();
        }
    }
}

// ============================================================================
// Receive Loop
// ============================================================================

/// State shared between a session and its receive loop.
struct LoopContext {
    registry: CallbackRegistry,
    history: History,
    messages: SharedMessageSender,
}

/// Reads frames until shutdown, remote close or error.
async fn run_receive_loop(
    ws_stream: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    context: &LoopContext,
) -> CloseReason {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        trace!(len = text.len(), "Text frame received");
                        context.history.push(text.as_str());
                        handle_frame(InboundMessage::parse(text.as_str()), context);
                    }

                    Some(Ok(WsMessage::Binary(bytes))) => {
                        trace!(len = bytes.len(), "Binary frame received");
                        context.history.push(String::from_utf8_lossy(&bytes));
                        handle_frame(InboundMessage::parse_bytes(&bytes), context);
                    }

                    Some(Ok(WsMessage::Close(_))) => {
                        debug!("WebSocket closed by relay");
                        // Sends the close reply queued by the read half.
                        if let Err(e) = ws_write.flush().await {
                            debug!(error = %e, "Close reply failed");
                        }
                        break CloseReason::Remote;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break CloseReason::Failed(e.to_string());
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break CloseReason::Remote;
                    }

                    // Ignore Ping, Pong, Frame
                    _ => {}
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(SessionCommand::Shutdown) | None => {
                        debug!("Shutdown requested");
                        if let Err(e) = ws_write.close().await {
                            debug!(error = %e, "Close handshake failed");
                        }
                        break CloseReason::Requested;
                    }
                }
            }
        }
    };

    debug!(%reason, "Receive loop terminated");
    reason
}

/// Dispatches one parsed frame and forwards it to message subscribers.
fn handle_frame(parsed: Result<InboundMessage>, context: &LoopContext) {
    let message = match parsed {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Skipping malformed frame");
            return;
        }
    };

    context.registry.dispatch(&message);

    if let Some(tx) = context.messages.lock().as_ref() {
        let _ = tx.send(message);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;
    use tracing_subscriber::EnvFilter;

    const WAIT: Duration = Duration::from_secs(5);

    type RelaySocket = WebSocketStream<TcpStream>;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn bind_relay() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
        let url = format!("ws://{}", listener.local_addr().expect("local addr"));
        (listener, url)
    }

    async fn accept_one(listener: &TcpListener) -> RelaySocket {
        let (stream, _) = listener.accept().await.expect("accept");
        accept_async(stream).await.expect("websocket upgrade")
    }

    /// Opens `sink` against `listener`, returning the relay side.
    async fn open_pair(sink: &Sink, listener: &TcpListener) -> RelaySocket {
        let (opened, relay) = tokio::join!(sink.open(), accept_one(listener));
        opened.expect("open sink");
        relay
    }

    async fn push(relay: &mut RelaySocket, frame: &str) {
        relay
            .send(WsMessage::text(frame.to_owned()))
            .await
            .expect("send frame");
    }

    fn sink_for(url: &str) -> Sink {
        Sink::builder()
            .url(url)
            .app_id("app1")
            .build()
            .expect("build sink")
    }

    #[tokio::test]
    async fn test_ping_reaches_listener_once() {
        init_tracing();
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);
        assert_eq!(sink.endpoint().path(), "/app1");

        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.on("ping", move |data: &Value| {
            let _ = tx.send(data.clone());
        });
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        sink.once("done", move |_: &Value| {
            let _ = done_tx.send(());
        });

        let mut relay = open_pair(&sink, &listener).await;
        assert!(sink.is_open());

        push(&mut relay, r#"{"data":{"event":"ping","payload":1}}"#).await;
        push(&mut relay, r#"{"data":{"event":"done"}}"#).await;

        timeout(WAIT, done_rx.recv()).await.expect("done event");
        let received = rx.try_recv().expect("ping delivered");
        assert_eq!(received, serde_json::json!({ "event": "ping", "payload": 1 }));
        assert!(rx.try_recv().is_err());

        assert_eq!(
            sink.history(),
            vec![
                r#"{"data":{"event":"ping","payload":1}}"#.to_owned(),
                r#"{"data":{"event":"done"}}"#.to_owned(),
            ]
        );

        assert_eq!(sink.close().await.expect("close"), CloseReason::Requested);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        init_tracing();
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let count = Arc::new(AtomicUsize::new(0));
        let handler_count = Arc::clone(&count);
        sink.on_any(move |_: &Value| {
            handler_count.fetch_add(1, Ordering::SeqCst);
        });
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        sink.on("ok", move |_: &Value| {
            let _ = done_tx.send(());
        });

        let mut relay = open_pair(&sink, &listener).await;
        push(&mut relay, "not json").await;
        push(&mut relay, r#"{"data":{"payload":1}}"#).await;
        push(&mut relay, r#"{"data":{"event":"ok"}}"#).await;

        timeout(WAIT, done_rx.recv()).await.expect("valid frame delivered");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(sink.is_open());
        assert_eq!(sink.history().len(), 3);

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_loop() {
        init_tracing();
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        sink.on("boom", |_: &Value| panic!("listener failure"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.on_any(move |data: &Value| {
            let _ = tx.send(data["event"].clone());
        });

        let mut relay = open_pair(&sink, &listener).await;
        push(&mut relay, r#"{"data":{"event":"boom"}}"#).await;
        push(&mut relay, r#"{"data":{"event":"after"}}"#).await;

        let first = timeout(WAIT, rx.recv()).await.expect("first").expect("value");
        let second = timeout(WAIT, rx.recv()).await.expect("second").expect("value");
        assert_eq!(first, "boom");
        assert_eq!(second, "after");
        assert!(sink.is_open());

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_message_stream() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let mut relay = open_pair(&sink, &listener).await;
        let mut messages = sink.messages().expect("subscribe");

        push(&mut relay, r#"{"data":{"event":"a"}}"#).await;
        push(&mut relay, r#"{"data":{"event":"b"}}"#).await;

        let a = timeout(WAIT, messages.next()).await.expect("a").expect("message");
        let b = timeout(WAIT, messages.next()).await.expect("b").expect("message");
        assert_eq!(a.event(), "a");
        assert_eq!(b.event(), "b");

        sink.close().await.expect("close");
        assert!(timeout(WAIT, messages.next()).await.expect("end").is_none());
    }

    #[tokio::test]
    async fn test_remote_close_is_observable() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let mut relay = open_pair(&sink, &listener).await;
        relay.close(None).await.expect("relay close");

        let reason = timeout(WAIT, sink.wait_closed())
            .await
            .expect("loop ends")
            .expect("reason");
        assert_eq!(reason, CloseReason::Remote);
        assert!(!sink.is_open());
        assert!(matches!(sink.messages(), Err(Error::NotConnected)));

        assert_eq!(sink.close().await.expect("close"), CloseReason::Remote);
        assert!(matches!(sink.close().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_closed_sink_rejects_operations() {
        let sink = sink_for("ws://127.0.0.1:9");

        assert!(!sink.is_open());
        assert!(matches!(sink.close().await, Err(Error::NotConnected)));
        assert!(matches!(sink.wait_closed().await, Err(Error::NotConnected)));
        assert!(matches!(sink.messages(), Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_open_twice_fails() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let _relay = open_pair(&sink, &listener).await;
        assert!(matches!(sink.open().await, Err(Error::AlreadyConnected)));

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_reopen_after_close() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let _first = open_pair(&sink, &listener).await;
        sink.close().await.expect("close");
        assert!(!sink.is_open());

        let mut relay = open_pair(&sink, &listener).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.on("again", move |_: &Value| {
            let _ = tx.send(());
        });
        push(&mut relay, r#"{"data":{"event":"again"}}"#).await;
        timeout(WAIT, rx.recv()).await.expect("delivered after reopen");

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_open_unreachable_relay() {
        let (listener, url) = bind_relay().await;
        drop(listener);

        let sink = sink_for(&url);
        let err = sink.open().await.unwrap_err();
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_binary_frame_is_dispatched() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.on("blob", move |data: &Value| {
            let _ = tx.send(data["size"].clone());
        });

        let mut relay = open_pair(&sink, &listener).await;
        relay
            .send(WsMessage::binary(br#"{"data":{"event":"blob","size":3}}"#.to_vec()))
            .await
            .expect("send binary frame");
        relay
            .send(WsMessage::binary(vec![0xff, 0xfe]))
            .await
            .expect("send invalid frame");
        push(&mut relay, r#"{"data":{"event":"blob","size":4}}"#).await;

        let first = timeout(WAIT, rx.recv()).await.expect("binary").expect("value");
        let second = timeout(WAIT, rx.recv()).await.expect("text").expect("value");
        assert_eq!(first, 3);
        assert_eq!(second, 4);

        let history = sink.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], r#"{"data":{"event":"blob","size":3}}"#);

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_drop_closes_connection() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let mut relay = open_pair(&sink, &listener).await;
        drop(sink);

        let frame = timeout(WAIT, relay.next()).await.expect("relay notified");
        assert!(matches!(frame, Some(Ok(WsMessage::Close(_)))));
    }

    #[tokio::test]
    async fn test_transport_failure_is_observable() {
        init_tracing();
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.on("ping", move |_: &Value| {
            let _ = tx.send(());
        });

        let mut relay = open_pair(&sink, &listener).await;
        push(&mut relay, r#"{"data":{"event":"ping"}}"#).await;
        timeout(WAIT, rx.recv()).await.expect("delivered");

        // Socket goes away without a close handshake.
        drop(relay);

        let reason = timeout(WAIT, sink.wait_closed())
            .await
            .expect("loop ends")
            .expect("reason");
        assert!(matches!(reason, CloseReason::Failed(_)));
        assert!(!sink.is_open());
    }

    #[tokio::test]
    async fn test_remote_close_is_answered() {
        let (listener, url) = bind_relay().await;
        let sink = sink_for(&url);

        let mut relay = open_pair(&sink, &listener).await;
        relay.close(None).await.expect("relay close");

        let reply = timeout(WAIT, relay.next()).await.expect("close reply");
        assert!(matches!(reply, Some(Ok(WsMessage::Close(_)))));

        let reason = timeout(WAIT, sink.wait_closed())
            .await
            .expect("loop ends")
            .expect("reason");
        assert_eq!(reason, CloseReason::Remote);
    }
}
