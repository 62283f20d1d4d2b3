use crate::builder::WebSocketClientBuilder;
use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::diagnostics::DiagnosticsBuffer;
use crate::session::{run_session, SessionHandle, SessionShared};
use crate::traffic_log::TrafficLog;
use crate::traits::*;
use crate::worker::{Executor, WorkerLoop};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lifecycle events published to the owning thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake completed, `on_connected` has run
    Connected,
    /// Session ended, `on_disconnected` has run
    Disconnected,
    /// A fault was reported through `on_error`
    Error(WsBridgeError),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connection_state: ConnectionState,
}

/// Per-`init` settings shared with the session task
pub(crate) struct Setup {
    pub(crate) config: ClientConfig,
    pub(crate) traffic_log: TrafficLog,
}

#[derive(Default)]
struct Lifecycle {
    setup: Option<Arc<Setup>>,
    worker: Option<Arc<WorkerLoop>>,
    /// Halted workers replaced by a later `start()`, joined by `join()`
    retired: Vec<Arc<WorkerLoop>>,
    session: Option<SessionHandle>,
}

/// Base WebSocket client bridging a synchronous caller and an async socket loop
///
/// The caller configures the client with [`init`](Self::init), then drives it
/// with [`start`](Self::start), [`send_packet`](Self::send_packet),
/// [`stop`](Self::stop) and [`join`](Self::join) from plain threads. All socket
/// I/O and every [`ClientHandler`] hook run on the client's worker loop.
///
/// # Type Parameters
/// - `H`: lifecycle hooks
/// - `C`: wire codec, [`JsonCodec`] by default
///
/// # Example
/// ```ignore
/// let client = WebSocketClient::new(MyHandler::default());
/// client.init(ClientConfig::builder().host("wss://stream.example.com/ws").build()?)?;
/// client.start()?;
///
/// // send_packet is only valid once on_connected has fired
/// client.recv_event_timeout(Duration::from_secs(10))?;
/// client.send_packet(&packet)?;
///
/// client.stop();
/// client.join()?;
/// ```
pub struct WebSocketClient<H, C = JsonCodec>
where
    C: PacketCodec,
    H: ClientHandler<C::Packet>,
{
    shared: Arc<SessionShared<H, C>>,
    executor: Executor,
    lifecycle: Mutex<Lifecycle>,
    event_rx: Receiver<ClientEvent>,
}

impl<H> WebSocketClient<H, JsonCodec>
where
    H: ClientHandler<Packet>,
{
    /// Client with the JSON codec on a dedicated worker thread
    pub fn new(handler: H) -> Self {
        WebSocketClientBuilder::new(handler).build()
    }

    pub fn builder(handler: H) -> WebSocketClientBuilder<H, JsonCodec> {
        WebSocketClientBuilder::new(handler)
    }
}

impl<H, C> WebSocketClient<H, C>
where
    C: PacketCodec,
    H: ClientHandler<C::Packet>,
{
    /// Called by [`WebSocketClientBuilder::build`]
    pub(crate) fn from_parts(
        handler: H,
        codec: C,
        executor: Executor,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (event_tx, event_rx) = unbounded();
        let shared = Arc::new(SessionShared {
            handler,
            codec,
            transport,
            diagnostics: DiagnosticsBuffer::new(),
            state: AtomicConnectionState::new(ConnectionState::Idle),
            metrics: AtomicMetrics::new(),
            events: event_tx,
            last_fault: Mutex::new(None),
            generation: AtomicU64::new(0),
        });

        Self {
            shared,
            executor,
            lifecycle: Mutex::new(Lifecycle::default()),
            event_rx,
        }
    }

    /// Store the configuration and open the traffic log if one is configured
    ///
    /// Must be called before [`start`](Self::start). Re-initialising is allowed
    /// only while no session is active.
    pub fn init(&self, config: ClientConfig) -> Result<()> {
        config.validate()?;

        let mut lifecycle = self.lifecycle.lock();
        if self.shared.state.is_active() {
            return Err(WsBridgeError::InvalidState(
                "init() while a session is active".into(),
            ));
        }

        let traffic_log = TrafficLog::open(config.log_path())?;
        if traffic_log.is_enabled() {
            debug!("Traffic log enabled");
        }
        if let Some(proxy) = config.proxy_url() {
            info!("Using proxy {}", proxy);
        }

        lifecycle.setup = Some(Arc::new(Setup {
            config,
            traffic_log,
        }));
        Ok(())
    }

    /// Schedule a connection session onto the worker loop
    ///
    /// Creates the dedicated worker thread on first use (or after a previous
    /// worker was stopped). Returns immediately; wait for
    /// [`ClientEvent::Connected`] before sending. Calling `start()` while a
    /// session is already running is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        let setup = lifecycle
            .setup
            .clone()
            .ok_or(WsBridgeError::NotInitialized)?;

        let worker_halted = lifecycle.worker.as_ref().map_or(false, |w| w.is_halted());
        if self.shared.state.begin().is_none() {
            if worker_halted {
                return Err(WsBridgeError::InvalidState(
                    "previous session is still closing".into(),
                ));
            }
            debug!("start() ignored, session already active");
            return Ok(());
        }

        let worker = match lifecycle.worker.clone().filter(|w| !w.is_halted()) {
            Some(worker) => worker,
            None => match WorkerLoop::new(&self.executor) {
                Ok(worker) => {
                    let worker = Arc::new(worker);
                    if let Some(old) = lifecycle.worker.replace(Arc::clone(&worker)) {
                        lifecycle.retired.push(old);
                    }
                    worker
                }
                Err(e) => {
                    self.shared.state.set(ConnectionState::Idle);
                    return Err(e);
                }
            },
        };

        let generation = self.shared.next_generation();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let session = SessionHandle::new(commands_tx.clone());
        let shared = Arc::clone(&self.shared);
        let task = run_session(shared, setup, generation, commands_tx, commands_rx);

        if let Err(e) = worker.submit(task) {
            self.shared.state.set(ConnectionState::Closed);
            return Err(e);
        }

        lifecycle.session = Some(session);
        info!("Client started (session {})", generation);
        Ok(())
    }

    /// Request the session to close and the worker loop to halt
    ///
    /// Non-blocking. Use [`join`](Self::join) to wait for the worker thread.
    pub fn stop(&self) {
        let lifecycle = self.lifecycle.lock();
        if let Some(session) = &lifecycle.session {
            session.close();
        }
        if let Some(worker) = &lifecycle.worker {
            if !worker.is_halted() {
                info!("Stopping client");
                worker.halt();
            }
        }
    }

    /// Block until every worker thread this client spawned has exited
    ///
    /// No-op for [`Executor::Attached`]. Returns the fault reported by the last
    /// session, if any, so the owning thread observes it. Fails with
    /// `InvalidState` when called from the worker thread itself.
    pub fn join(&self) -> Result<()> {
        let workers: Vec<Arc<WorkerLoop>> = {
            let lifecycle = self.lifecycle.lock();
            lifecycle
                .retired
                .iter()
                .chain(lifecycle.worker.iter())
                .cloned()
                .collect()
        };

        if workers.iter().any(|w| w.is_current_thread()) {
            return Err(WsBridgeError::InvalidState(
                "join() called from the worker thread".into(),
            ));
        }

        for worker in &workers {
            worker.join()?;
        }
        self.lifecycle.lock().retired.retain(|w| w.is_running());

        match self.shared.last_fault.lock().clone() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// Encode `packet` and queue it for writing on the worker loop
    ///
    /// Callable from any thread. Writes leave in the order they were queued.
    /// Valid only while connected; there is no buffering before the handshake.
    pub fn send_packet(&self, packet: &C::Packet) -> Result<()> {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.setup.is_none() {
            return Err(WsBridgeError::NotInitialized);
        }

        if lifecycle.worker.as_ref().map_or(false, |w| w.is_halted()) {
            drop(lifecycle);
            let error = WsBridgeError::LoopStopped("send_packet() after stop()".into());
            warn!("{}", error);
            self.shared.report(error.clone());
            return Err(error);
        }

        let setup = lifecycle
            .setup
            .as_ref()
            .ok_or(WsBridgeError::NotInitialized)?;
        let session = lifecycle
            .session
            .as_ref()
            .filter(|_| self.shared.state.is_connected())
            .ok_or(WsBridgeError::NotConnected)?;

        let text = self.shared.codec.encode(packet)?;
        self.shared.diagnostics.record_sent(&text);
        setup.traffic_log.sent(&text);
        session.send_text(text)
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.shared.metrics.messages_sent(),
            messages_received: self.shared.metrics.messages_received(),
            connection_state: self.shared.state.get(),
        }
    }

    /// Last encoded outbound text, capped at 1000 characters
    pub fn last_sent_text(&self) -> Option<String> {
        self.shared.diagnostics.last_sent()
    }

    /// Last raw inbound text, capped at 1000 characters
    pub fn last_received_text(&self) -> Option<String> {
        self.shared.diagnostics.last_received()
    }

    /// Most recent fault reported since the last `start()`
    pub fn last_fault(&self) -> Option<WsBridgeError> {
        self.shared.last_fault.lock().clone()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Receive an event, giving up after `timeout`
    pub fn recv_event_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<ClientEvent, RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }

    /// Check if the dedicated worker thread is alive
    pub fn is_worker_running(&self) -> bool {
        self.lifecycle
            .lock()
            .worker
            .as_ref()
            .map_or(false, |w| w.is_running())
    }

    /// Check if the current worker loop runs on a thread owned by this client
    pub fn owns_worker_thread(&self) -> bool {
        self.lifecycle
            .lock()
            .worker
            .as_ref()
            .map_or(false, |w| w.owns_thread())
    }

    /// Configuration stored by the last `init()`
    pub fn config(&self) -> Option<ClientConfig> {
        self.lifecycle
            .lock()
            .setup
            .as_ref()
            .map(|setup| setup.config.clone())
    }

    pub fn handler(&self) -> &H {
        &self.shared.handler
    }
}

impl<H, C> Drop for WebSocketClient<H, C>
where
    C: PacketCodec,
    H: ClientHandler<C::Packet>,
{
    fn drop(&mut self) {
        self.stop();
    }
}
