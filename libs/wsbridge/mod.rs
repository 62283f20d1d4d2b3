//! # wsbridge
//!
//! Base client for one persistent WebSocket connection, driven from
//! synchronous code.
//!
//! Concrete protocol clients implement [`ClientHandler`] (and optionally a
//! [`PacketCodec`]) and let [`WebSocketClient`] own the socket, the worker
//! loop, and fault reporting.

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, diagnostics, report, tungstenite, worker,
    builder::{states, ClientConfigBuilder, WebSocketClientBuilder},
    client::{ClientEvent, Metrics, WebSocketClient},
    config::{ClientConfig, Headers, DEFAULT_PING_INTERVAL_SECS},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    diagnostics::{DiagnosticsBuffer, DIAGNOSTIC_TEXT_LIMIT},
    report::ErrorReport,
    tungstenite::TungsteniteTransport,
    worker::{Executor, CLOSE_GRACE, WORKER_THREAD_NAME},
};
pub(crate) use self::core::{heartbeat, session, traffic_log};
