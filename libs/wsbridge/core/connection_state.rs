use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of one connection session
///
/// `Idle -> Connecting -> Connected -> Closed`. A failed connect goes straight
/// from `Connecting` to `Closed`. `Closed` is terminal for the session; the
/// next `start()` begins a new session from `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No session has been started yet
    Idle = 0,
    /// Session scheduled, handshake in progress
    Connecting = 1,
    /// Handshake done, receive loop running
    Connected = 2,
    /// Session ended
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Closed,
        }
    }

    /// Connecting or connected
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// Lock-free connection state shared between caller threads and the worker loop
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.get() == ConnectionState::Idle
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == ConnectionState::Closed
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.get().is_active()
    }

    /// Atomically replace `current` with `new`
    ///
    /// Returns the previous state on success, the actual state on failure.
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        self.0
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    /// Claim the session slot: move from `Idle` or `Closed` to `Connecting`
    ///
    /// Returns the state that was replaced, or `None` when a session is
    /// already active. Exactly one of several racing callers wins.
    pub fn begin(&self) -> Option<ConnectionState> {
        [ConnectionState::Idle, ConnectionState::Closed]
            .into_iter()
            .find_map(|from| {
                self.compare_exchange(from, ConnectionState::Connecting).ok()
            })
    }
}

/// Traffic counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }
}
