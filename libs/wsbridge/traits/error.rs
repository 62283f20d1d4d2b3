use std::fmt;
use thiserror::Error;

/// Main error type for wsbridge
///
/// Payloads are plain strings so a fault can be cloned: the same value is
/// handed to `on_error`, published on the event channel and returned from
/// `join()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WsBridgeError {
    /// Transport or handshake failure while connecting
    #[error("Connect error: {0}")]
    Connect(String),

    /// Inbound payload could not be decoded into a packet
    #[error("Decode error: {0}")]
    Decode(String),

    /// Outbound packet could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// Socket failure after the connection was established
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection closed while an operation still needed it
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// `start()` or `send_packet()` called before `init()`
    #[error("Client not initialized: call init() before start()")]
    NotInitialized,

    /// `send_packet()` called while no session is connected
    #[error("Not connected: wait for on_connected before sending")]
    NotConnected,

    /// Task scheduled onto a worker loop that was already halted
    #[error("Worker loop stopped: {0}")]
    LoopStopped(String),

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Worker thread or scheduler could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl WsBridgeError {
    /// Classify this error for fault reporting
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Connect(_) => FaultKind::Connect,
            Self::Decode(_) => FaultKind::Decode,
            Self::Transport(_) | Self::ConnectionClosed(_) => FaultKind::Transport,
            Self::Runtime(_) => FaultKind::Runtime,
            Self::Encode(_)
            | Self::NotInitialized
            | Self::NotConnected
            | Self::LoopStopped(_)
            | Self::InvalidState(_)
            | Self::Configuration(_) => FaultKind::CallerMisuse,
        }
    }
}

/// Fault classification passed to `on_error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Handshake or transport failure during connect
    Connect,
    /// Malformed inbound payload
    Decode,
    /// Mid-stream socket failure
    Transport,
    /// API used out of order (send before connect, schedule after stop, ...)
    CallerMisuse,
    /// Worker thread or scheduler failure
    Runtime,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Connect => "ConnectError",
            FaultKind::Decode => "DecodeError",
            FaultKind::Transport => "TransportError",
            FaultKind::CallerMisuse => "CallerMisuseError",
            FaultKind::Runtime => "RuntimeError",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for wsbridge operations
pub type Result<T> = std::result::Result<T, WsBridgeError>;
