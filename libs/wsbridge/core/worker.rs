//! Worker loop
//!
//! All socket I/O and callback dispatch of a client runs on one executor:
//!
//! ```text
//! caller threads                       worker loop
//! ──────────────                       ───────────
//! start()       ── submit(session) ──> session task: connect, receive loop
//! send_packet() ── command queue ────> session task writes the frame
//! stop()        ── Close + halt ─────> session closes, loop drains, thread exits
//! join()        <── thread exit ─────
//! ```
//!
//! [`Executor::Dedicated`] builds a current-thread tokio runtime and drives it
//! from one background thread owned by the client. [`Executor::Attached`]
//! spawns onto a runtime the host process already runs; no thread is created
//! and halting never shuts that runtime down.

use crate::traits::{Result, WsBridgeError};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Name of the background thread created for [`Executor::Dedicated`]
pub const WORKER_THREAD_NAME: &str = "wsbridge-worker";

/// How long a halted dedicated loop waits for in-flight tasks before dropping them
pub const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Where the client's worker loop runs
#[derive(Clone, Default)]
pub enum Executor {
    /// Spawn one background thread running a single-threaded scheduler
    #[default]
    Dedicated,
    /// Schedule onto a runtime owned by the host process
    Attached(Handle),
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executor::Dedicated => f.write_str("Dedicated"),
            Executor::Attached(_) => f.write_str("Attached"),
        }
    }
}

/// Decrements the in-flight count when a submitted task finishes or is dropped
struct InFlight(Arc<watch::Sender<usize>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

pub(crate) struct WorkerLoop {
    handle: Handle,
    halted: AtomicBool,
    halt_tx: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
    thread_id: Option<ThreadId>,
    exited: Arc<AtomicBool>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl WorkerLoop {
    pub(crate) fn new(executor: &Executor) -> Result<Self> {
        match executor {
            Executor::Dedicated => Self::dedicated(),
            Executor::Attached(handle) => Ok(Self::attached(handle.clone())),
        }
    }

    fn dedicated() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WsBridgeError::Runtime(format!("failed to build scheduler: {}", e)))?;
        let handle = runtime.handle().clone();

        let (halt_tx, halt_rx) = oneshot::channel::<()>();
        let (in_flight, mut idle) = watch::channel(0usize);
        let exited = Arc::new(AtomicBool::new(false));
        let exited_flag = Arc::clone(&exited);

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    // A dropped sender counts as a halt request
                    let _ = halt_rx.await;
                    debug!("Worker loop halting, draining in-flight tasks");
                    let timed_out = tokio::time::timeout(CLOSE_GRACE, idle.wait_for(|n| *n == 0))
                        .await
                        .is_err();
                    if timed_out {
                        warn!("Tasks still running after {:?}, dropping them", CLOSE_GRACE);
                    }
                });
                drop(runtime);
                exited_flag.store(true, Ordering::Release);
                debug!("Worker thread exiting");
            })
            .map_err(|e| WsBridgeError::Runtime(format!("failed to spawn worker thread: {}", e)))?;

        info!("Spawned worker thread '{}'", WORKER_THREAD_NAME);

        Ok(Self {
            handle,
            halted: AtomicBool::new(false),
            halt_tx: Mutex::new(Some(halt_tx)),
            thread_id: Some(thread.thread().id()),
            thread: Mutex::new(Some(thread)),
            exited,
            in_flight: Arc::new(in_flight),
        })
    }

    fn attached(handle: Handle) -> Self {
        debug!("Attaching worker loop to host runtime");
        let (in_flight, _) = watch::channel(0usize);
        Self {
            handle,
            halted: AtomicBool::new(false),
            halt_tx: Mutex::new(None),
            thread: Mutex::new(None),
            thread_id: None,
            exited: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(in_flight),
        }
    }

    /// Schedule a task onto the loop from any thread
    pub(crate) fn submit<F>(&self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_halted() {
            return Err(WsBridgeError::LoopStopped(
                "cannot schedule a task after stop()".into(),
            ));
        }

        self.in_flight.send_modify(|count| *count += 1);
        let guard = InFlight(Arc::clone(&self.in_flight));
        self.handle.spawn(async move {
            let _guard = guard;
            task.await;
        });
        Ok(())
    }

    /// Request the loop to stop accepting work and wind down
    ///
    /// Non-blocking. A dedicated thread finishes its in-flight tasks (bounded by
    /// [`CLOSE_GRACE`]) and exits; an attached loop only stops accepting work.
    pub(crate) fn halt(&self) {
        if self.halted.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(tx) = self.halt_tx.lock().take() {
            let _ = tx.send(());
        }
        debug!("Worker loop halt requested");
    }

    pub(crate) fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Check if the loop owns a background thread
    pub(crate) fn owns_thread(&self) -> bool {
        self.thread_id.is_some()
    }

    /// Check if the loop's own thread is still alive
    pub(crate) fn is_running(&self) -> bool {
        self.owns_thread() && !self.exited.load(Ordering::Acquire)
    }

    pub(crate) fn is_current_thread(&self) -> bool {
        self.thread_id == Some(thread::current().id())
    }

    /// Block until the background thread has exited; no-op when attached
    pub(crate) fn join(&self) -> Result<()> {
        if self.is_current_thread() {
            return Err(WsBridgeError::InvalidState(
                "join() called from the worker thread".into(),
            ));
        }

        let mut thread = self.thread.lock();
        if let Some(handle) = thread.take() {
            handle
                .join()
                .map_err(|_| WsBridgeError::Runtime("worker thread panicked".into()))?;
            debug!("Worker thread joined");
        }
        Ok(())
    }
}

impl Drop for WorkerLoop {
    fn drop(&mut self) {
        self.halt();
    }
}
