//! # wsbridge traits
//!
//! Extension seams of the base client:
//!
//! - **PacketCodec**: convert packets to and from wire text (JSON by default)
//! - **ClientHandler**: lifecycle hooks (`on_connected`, `on_disconnected`,
//!   `on_packet`, `on_error`)
//! - **Transport**: open the underlying socket and expose it as a frame sink and
//!   an inbound frame stream
//! - **WsBridgeError / FaultKind**: error taxonomy

pub mod codec;
pub mod error;
pub mod handler;
pub mod transport;

// Re-export commonly used types
pub use codec::{JsonCodec, Packet, PacketCodec};
pub use error::{FaultKind, Result, WsBridgeError};
pub use handler::{write_report, ClientHandler};
pub use transport::{Connection, FrameSink, FrameStream, Transport};
