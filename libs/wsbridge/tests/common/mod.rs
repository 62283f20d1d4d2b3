//! Common test utilities for wsbridge integration tests
//!
//! The client under test is driven from plain `#[test]` threads, so the mock
//! server brings its own multi-threaded runtime instead of borrowing the
//! test's.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Notify;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wsbridge::{ClientHandler, ErrorReport, FaultKind, Packet};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// What the mock server does with each accepted connection
#[derive(Debug, Clone)]
pub struct ServerScript {
    /// Text frames sent right after the handshake
    pub greeting: Vec<String>,
    /// Start the closing handshake once the greeting is out, for this many
    /// connections in accept order
    pub close_first: usize,
    /// Echo every text frame back
    pub echo: bool,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            greeting: Vec::new(),
            close_first: 0,
            echo: true,
        }
    }
}

impl ServerScript {
    pub fn greeting(frames: &[&str]) -> Self {
        Self {
            greeting: frames.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn then_close(self) -> Self {
        self.then_close_first(usize::MAX)
    }

    /// Close only the first `n` connections; later ones stay open and echo
    pub fn then_close_first(mut self, n: usize) -> Self {
        self.close_first = n;
        self
    }
}

#[derive(Default)]
struct ServerLog {
    received: Mutex<Vec<String>>,
    pings: AtomicUsize,
    connections: AtomicUsize,
}

/// A mock WebSocket server on 127.0.0.1 with its own runtime
pub struct MockWsServer {
    pub addr: SocketAddr,
    runtime: Option<Runtime>,
    shutdown: Arc<Notify>,
    log: Arc<ServerLog>,
}

impl MockWsServer {
    /// Echo server
    pub fn start() -> Self {
        Self::with_script(ServerScript::default())
    }

    pub fn with_script(script: ServerScript) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let log = Arc::new(ServerLog::default());

        let shutdown_clone = Arc::clone(&shutdown);
        let log_clone = Arc::clone(&log);
        runtime.spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let script = script.clone();
                                let log = Arc::clone(&log_clone);
                                let shutdown = Arc::clone(&shutdown_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, script, log, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            runtime: Some(runtime),
            shutdown,
            log,
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        script: ServerScript,
        log: Arc<ServerLog>,
        shutdown: Arc<Notify>,
    ) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };
        let index = log.connections.fetch_add(1, Ordering::SeqCst);
        let close_after_greeting = index < script.close_first;

        let (mut write, mut read) = ws_stream.split();

        for frame in &script.greeting {
            if write.send(Message::Text(frame.clone())).await.is_err() {
                return;
            }
        }
        if close_after_greeting && write.send(Message::Close(None)).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            log.received.lock().push(text.clone());
                            if script.echo && !close_after_greeting
                                && write.send(Message::Text(text)).await.is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(_))) => {
                            // tungstenite queues the pong itself
                            log.pings.fetch_add(1, Ordering::SeqCst);
                        }
                        // Keep reading so the close reply gets flushed
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}/socket", self.addr)
    }

    /// Handle of the server's runtime, usable as a host runtime for a client
    pub fn handle(&self) -> Handle {
        match &self.runtime {
            Some(runtime) => runtime.handle().clone(),
            None => unreachable!("runtime lives until drop"),
        }
    }

    /// Text frames received so far, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.log.received.lock().clone()
    }

    pub fn pings(&self) -> usize {
        self.log.pings.load(Ordering::SeqCst)
    }

    /// Completed handshakes so far
    pub fn connections(&self) -> usize {
        self.log.connections.load(Ordering::SeqCst)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// One hook invocation seen by [`RecordingHandler`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call<P> {
    Connected,
    Packet(P),
    Error {
        kind: FaultKind,
        last_sent: Option<String>,
        last_received: Option<String>,
    },
    Disconnected,
}

/// Handler that records every hook call and the thread it ran on
pub struct RecordingHandler<P = Packet> {
    calls: Mutex<Vec<Call<P>>>,
    threads: Mutex<Vec<Option<String>>>,
}

impl<P> Default for RecordingHandler<P> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
        }
    }
}

impl<P: Clone> RecordingHandler<P> {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call<P>> {
        self.calls.lock().clone()
    }

    pub fn packets(&self) -> Vec<P> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Packet(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of the threads the hooks ran on
    pub fn threads(&self) -> Vec<Option<String>> {
        self.threads.lock().clone()
    }

    fn record(&self, call: Call<P>) {
        self.threads
            .lock()
            .push(thread::current().name().map(str::to_owned));
        self.calls.lock().push(call);
    }
}

impl<P> ClientHandler<P> for RecordingHandler<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn on_connected(&self) {
        self.record(Call::Connected);
    }

    fn on_disconnected(&self) {
        self.record(Call::Disconnected);
    }

    fn on_packet(&self, packet: P) {
        self.record(Call::Packet(packet));
    }

    fn on_error(&self, report: &ErrorReport) {
        verbose_println!("{}", report);
        self.record(Call::Error {
            kind: report.kind,
            last_sent: report.last_sent.clone(),
            last_received: report.last_received.clone(),
        });
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Build a JSON packet from a `json!` object literal
pub fn packet(value: serde_json::Value) -> Packet {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not a JSON object: {}", other),
    }
}
