//! # wsbridge core
//!
//! Lifecycle manager, worker loop and connection session of the base client.
//!
//! ## Features
//!
//! - **Synchronous surface**: `init`, `start`, `stop`, `join` and `send_packet`
//!   are plain blocking-free calls usable from any thread
//! - **One worker loop per client**: a dedicated background thread, or a host
//!   runtime the client attaches to
//! - **Serialized writes**: every outbound frame goes through one command queue
//! - **Type-state builder**: the host is required at compile time
//! - **Fault reports**: every worker-side fault reaches `on_error` with the last
//!   sent and received text
//!
//! ## Example
//!
//! ```rust,ignore
//! use wsbridge::{ClientConfig, ClientEvent, ClientHandler, Packet, WebSocketClient};
//!
//! struct Feed;
//!
//! impl ClientHandler<Packet> for Feed {
//!     fn on_packet(&self, packet: Packet) {
//!         println!("{:?}", packet);
//!     }
//! }
//!
//! fn main() -> wsbridge::Result<()> {
//!     let client = WebSocketClient::new(Feed);
//!     client.init(ClientConfig::builder().host("wss://stream.example.com/ws").build()?)?;
//!     client.start()?;
//!
//!     if let Ok(ClientEvent::Connected) = client.recv_event() {
//!         let mut packet = Packet::new();
//!         packet.insert("op".into(), "subscribe".into());
//!         client.send_packet(&packet)?;
//!     }
//!
//!     client.stop();
//!     client.join()
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod diagnostics;
pub(crate) mod heartbeat;
pub mod report;
pub(crate) mod session;
pub(crate) mod traffic_log;
pub mod tungstenite;
pub mod worker;

// Re-export main types
pub use builder::{states, ClientConfigBuilder, WebSocketClientBuilder};
pub use client::{ClientEvent, Metrics, WebSocketClient};
pub use config::{ClientConfig, Headers, DEFAULT_PING_INTERVAL_SECS};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use diagnostics::{DiagnosticsBuffer, DIAGNOSTIC_TEXT_LIMIT};
pub use report::ErrorReport;
pub use tungstenite::TungsteniteTransport;
pub use worker::{Executor, CLOSE_GRACE, WORKER_THREAD_NAME};

// Re-export traits for convenience
pub use crate::traits::*;
