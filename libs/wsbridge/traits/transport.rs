//! Transport seam
//!
//! The client never touches TCP, TLS or WebSocket framing directly. It asks a
//! [`Transport`] for a [`Connection`], writes through the connection's
//! [`FrameSink`] and reads its inbound text frames as a stream.

use crate::config::ClientConfig;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Inbound text frames of one connection
///
/// Single pass: the stream ends when the socket closes (`None`) or yields one
/// terminal `Err` on a transport failure. A new connection is needed to read
/// again.
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Write half of a live connection
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame and wait for it to be flushed
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Write a keepalive PING control frame
    async fn send_ping(&mut self) -> Result<()>;

    /// Start the closing handshake
    ///
    /// The inbound stream ends once the peer acknowledges.
    async fn close(&mut self) -> Result<()>;
}

/// A live socket split into its write and read halves
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub frames: FrameStream,
}

impl Connection {
    pub fn new(sink: impl FrameSink + 'static, frames: FrameStream) -> Self {
        Self {
            sink: Box::new(sink),
            frames,
        }
    }
}

/// Opens connections for a client
///
/// The default implementation is [`crate::TungsteniteTransport`]. A custom
/// transport can be supplied through `WebSocketClientBuilder::transport`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Resolve and connect to `config.host()`, honouring proxy, headers and
    /// TLS policy from the config
    ///
    /// Failures must be reported as [`crate::WsBridgeError::Connect`].
    async fn connect(&self, config: &ClientConfig) -> Result<Connection>;
}
