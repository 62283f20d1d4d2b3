//! Connection session and receive loop
//!
//! One session = one connection attempt. It runs as a single task on the
//! worker loop and owns the socket for its whole life:
//!
//! 1. connect through the transport (`Connecting`)
//! 2. fire `on_connected` (`Connected`)
//! 3. loop: decode inbound frames into `on_packet`, write queued commands
//! 4. on peer close, local close or fault: `Closed`, `on_error` for faults,
//!    then `on_disconnected`
//!
//! Caller threads never touch the socket. They push [`SessionCommand`]s onto
//! the session's queue, which the loop drains in FIFO order.

use crate::client::{ClientEvent, Setup};
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::diagnostics::DiagnosticsBuffer;
use crate::heartbeat::spawn_heartbeat;
use crate::report::ErrorReport;
use crate::traits::*;
use crossbeam_channel::Sender;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Work queued for the session by caller threads and the heartbeat
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Write one text frame
    Send(String),
    /// Write a keepalive PING
    Ping,
    /// Start the closing handshake
    Close,
}

/// Caller-side handle to a running session's command queue
pub(crate) struct SessionHandle {
    commands: UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(commands: UnboundedSender<SessionCommand>) -> Self {
        Self { commands }
    }

    pub(crate) fn send_text(&self, text: String) -> Result<()> {
        self.commands
            .send(SessionCommand::Send(text))
            .map_err(|_| WsBridgeError::NotConnected)
    }

    /// Ask the session to close; no-op if it already ended
    pub(crate) fn close(&self) {
        if self.commands.send(SessionCommand::Close).is_ok() {
            debug!("Close requested");
        }
    }
}

/// State shared by the client's public surface and its session task
pub(crate) struct SessionShared<H, C> {
    pub(crate) handler: H,
    pub(crate) codec: C,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) diagnostics: DiagnosticsBuffer,
    pub(crate) state: AtomicConnectionState,
    pub(crate) metrics: AtomicMetrics,
    pub(crate) events: Sender<ClientEvent>,
    pub(crate) last_fault: Mutex<Option<WsBridgeError>>,
    /// Bumped by every `start()`; a session only owns faults of its own generation
    pub(crate) generation: AtomicU64,
}

impl<H, C> SessionShared<H, C>
where
    C: PacketCodec,
    H: ClientHandler<C::Packet>,
{
    /// Open a new session generation and forget the previous fault
    pub(crate) fn next_generation(&self) -> u64 {
        let mut fault = self.last_fault.lock();
        *fault = None;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Funnel a caller-side fault through `on_error` and make it visible to the owner
    pub(crate) fn report(&self, error: WsBridgeError) {
        self.publish_fault(None, error);
    }

    /// Same as [`report`](Self::report) for a fault raised by session `generation`
    ///
    /// A superseded session still reaches `on_error` and the event channel but
    /// never overwrites the fault of the session that replaced it.
    fn report_session(&self, generation: u64, error: WsBridgeError) {
        self.publish_fault(Some(generation), error);
    }

    fn publish_fault(&self, generation: Option<u64>, error: WsBridgeError) {
        let (last_sent, last_received) = self.diagnostics.snapshot();
        let report = ErrorReport::new(error.clone(), last_sent, last_received);
        self.handler.on_error(&report);

        {
            let mut fault = self.last_fault.lock();
            let current = self.generation.load(Ordering::Acquire);
            if generation.map_or(true, |g| g == current) {
                *fault = Some(error.clone());
            } else {
                debug!("Fault of superseded session {:?} not kept", generation);
            }
        }
        let _ = self.events.send(ClientEvent::Error(error));
    }

    /// Decode one inbound frame and hand it to `on_packet`
    fn dispatch(&self, setup: &Setup, text: String) -> Result<()> {
        self.diagnostics.record_received(&text);
        self.metrics.increment_received();

        let packet = self.codec.decode(&text).map_err(|e| {
            error!("Unable to parse data: {}", text);
            e
        })?;

        setup.traffic_log.received(&packet);
        self.handler.on_packet(packet);
        Ok(())
    }
}

/// Write access to the connection state for the lifetime of one session
///
/// The session owns the state from `start()` until it marks itself closed.
/// After `close()` a newer session may already have claimed the state, so
/// nothing is written again, not even on drop. Dropping an open guard (task
/// cancelled mid-session) closes it.
struct SessionState<'a> {
    state: &'a AtomicConnectionState,
    open: bool,
}

impl<'a> SessionState<'a> {
    fn new(state: &'a AtomicConnectionState) -> Self {
        Self { state, open: true }
    }

    fn set(&self, state: ConnectionState) {
        if self.open {
            self.state.set(state);
        }
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.open, false) {
            self.state.set(ConnectionState::Closed);
        }
    }
}

impl Drop for SessionState<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Session task: connect, run the receive loop, dispatch the lifecycle hooks
pub(crate) async fn run_session<H, C>(
    shared: Arc<SessionShared<H, C>>,
    setup: Arc<Setup>,
    generation: u64,
    commands_tx: UnboundedSender<SessionCommand>,
    mut commands: UnboundedReceiver<SessionCommand>,
) where
    C: PacketCodec,
    H: ClientHandler<C::Packet>,
{
    let mut state = SessionState::new(&shared.state);
    let config = &setup.config;

    state.set(ConnectionState::Connecting);
    info!("Connecting to {}", config.host());

    let connection = match shared.transport.connect(config).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect: {}", e);
            state.close();
            shared.report_session(generation, e);
            return;
        }
    };

    info!("Connected to {}", config.host());
    state.set(ConnectionState::Connected);
    shared.handler.on_connected();
    let _ = shared.events.send(ClientEvent::Connected);

    let heartbeat = config
        .has_heartbeat()
        .then(|| spawn_heartbeat(config.ping_interval(), commands_tx.clone()));
    drop(commands_tx);

    let result = receive_loop(&shared, &setup, connection, &mut commands).await;

    if let Some(handle) = heartbeat {
        handle.abort();
    }
    drop(commands);

    state.close();
    match result {
        Ok(()) => info!("Connection to {} closed", config.host()),
        Err(e) => {
            error!("Connection error: {}", e);
            shared.report_session(generation, e);
        }
    }

    shared.handler.on_disconnected();
    let _ = shared.events.send(ClientEvent::Disconnected);
}

/// Main message loop
///
/// Returns `Ok` when the inbound stream ends normally and the first fault
/// otherwise. Queued commands are no longer read once closing has begun.
async fn receive_loop<H, C>(
    shared: &SessionShared<H, C>,
    setup: &Setup,
    connection: Connection,
    commands: &mut UnboundedReceiver<SessionCommand>,
) -> Result<()>
where
    C: PacketCodec,
    H: ClientHandler<C::Packet>,
{
    let Connection { mut sink, mut frames } = connection;
    let mut closing = false;

    loop {
        tokio::select! {
            frame = frames.next() => {
                match frame {
                    Some(Ok(text)) => shared.dispatch(setup, text)?,
                    Some(Err(e)) if closing => {
                        debug!("Error while closing, treating as closed: {}", e);
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        if !closing {
                            warn!("WebSocket stream closed by peer");
                        }
                        return Ok(());
                    }
                }
            }

            command = commands.recv(), if !closing => {
                match command {
                    Some(SessionCommand::Send(text)) => {
                        sink.send_text(text).await?;
                        shared.metrics.increment_sent();
                    }
                    Some(SessionCommand::Ping) => {
                        sink.send_ping().await?;
                        debug!("Heartbeat ping sent");
                    }
                    Some(SessionCommand::Close) | None => {
                        info!("Closing connection");
                        closing = true;
                        if let Err(e) = sink.close().await {
                            debug!("Close handshake failed: {}", e);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
