use crate::error::{Result, WsBridgeError};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Default packet shape: a JSON object of string keys to arbitrary values
pub type Packet = Map<String, Value>;

/// Converts packets to and from wire text
///
/// Encoding and decoding are replaced together: a client that speaks a
/// non-JSON wire format supplies its own codec, and the diagnostics buffer
/// always holds text produced by the same codec that parses it.
///
/// # Example
/// ```ignore
/// struct PipeCodec;
///
/// impl PacketCodec for PipeCodec {
///     type Packet = Vec<String>;
///
///     fn encode(&self, packet: &Self::Packet) -> Result<String> {
///         Ok(packet.join("|"))
///     }
///
///     fn decode(&self, text: &str) -> Result<Self::Packet> {
///         Ok(text.split('|').map(str::to_owned).collect())
///     }
/// }
/// ```
pub trait PacketCodec: Send + Sync + 'static {
    /// Structured packet exchanged with the callbacks
    type Packet: Send + Debug + 'static;

    /// Serialize a packet into a text frame
    fn encode(&self, packet: &Self::Packet) -> Result<String>;

    /// Parse a text frame into a packet
    ///
    /// Malformed input must fail with [`WsBridgeError::Decode`]; a partial
    /// packet is never returned.
    fn decode(&self, text: &str) -> Result<Self::Packet>;
}

/// JSON codec used when no other codec is supplied
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PacketCodec for JsonCodec {
    type Packet = Packet;

    fn encode(&self, packet: &Packet) -> Result<String> {
        serde_json::to_string(packet).map_err(|e| WsBridgeError::Encode(e.to_string()))
    }

    fn decode(&self, text: &str) -> Result<Packet> {
        serde_json::from_str(text).map_err(|e| WsBridgeError::Decode(e.to_string()))
    }
}
