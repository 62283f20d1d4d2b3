use parking_lot::Mutex;

/// Maximum number of characters kept per diagnostics slot
pub const DIAGNOSTIC_TEXT_LIMIT: usize = 1000;

/// Last sent and last received wire text, kept for crash reports only
///
/// Each slot is overwritten on every send/receive and truncated to
/// [`DIAGNOSTIC_TEXT_LIMIT`] characters. Both slots are empty until the first
/// traffic.
#[derive(Debug, Default)]
pub struct DiagnosticsBuffer {
    last_sent: Mutex<Option<String>>,
    last_received: Mutex<Option<String>>,
}

impl DiagnosticsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, text: &str) {
        *self.last_sent.lock() = Some(truncate(text));
    }

    pub fn record_received(&self, text: &str) {
        *self.last_received.lock() = Some(truncate(text));
    }

    pub fn last_sent(&self) -> Option<String> {
        self.last_sent.lock().clone()
    }

    pub fn last_received(&self) -> Option<String> {
        self.last_received.lock().clone()
    }

    /// (last sent, last received)
    pub fn snapshot(&self) -> (Option<String>, Option<String>) {
        (self.last_sent(), self.last_received())
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(DIAGNOSTIC_TEXT_LIMIT) {
        Some((cut, _)) => text[..cut].to_owned(),
        None => text.to_owned(),
    }
}
