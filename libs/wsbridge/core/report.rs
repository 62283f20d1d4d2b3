//! Crash reports for faults raised inside the worker loop

use crate::traits::{FaultKind, WsBridgeError};
use chrono::{DateTime, Local};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

/// Everything `on_error` receives about a fault
///
/// `Display` renders the timestamped report that the default `on_error`
/// writes to stderr.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: FaultKind,
    pub error: WsBridgeError,
    /// Last sent text (already truncated by the diagnostics buffer)
    pub last_sent: Option<String>,
    /// Last received text (already truncated by the diagnostics buffer)
    pub last_received: Option<String>,
    pub timestamp: DateTime<Local>,
    /// Error description plus a backtrace when `RUST_BACKTRACE` enables one
    ///
    /// The backtrace is taken when the report is built, so it shows the path
    /// that handed the fault to `on_error` (session task or `send_packet`),
    /// not the frame where the error value was first created.
    pub trace: String,
}

impl ErrorReport {
    /// Build a report, capturing the current backtrace for [`trace`](Self::trace)
    pub fn new(
        error: WsBridgeError,
        last_sent: Option<String>,
        last_received: Option<String>,
    ) -> Self {
        let trace = format_trace(&error, &Backtrace::capture());
        Self {
            kind: error.kind(),
            error,
            last_sent,
            last_received,
            timestamp: Local::now(),
            trace,
        }
    }
}

fn format_trace(error: &WsBridgeError, backtrace: &Backtrace) -> String {
    let mut trace = format!("{}: {}\n", error.kind(), error);
    if backtrace.status() == BacktraceStatus::Captured {
        trace.push_str(&backtrace.to_string());
        if !trace.ends_with('\n') {
            trace.push('\n');
        }
    }
    trace
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}]: Unhandled WebSocket Error:{}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f"),
            self.kind
        )?;
        writeln!(f, "LastSentText:\n{}", self.last_sent.as_deref().unwrap_or("<none>"))?;
        writeln!(
            f,
            "LastReceivedText:\n{}",
            self.last_received.as_deref().unwrap_or("<none>")
        )?;
        writeln!(f, "Exception trace: ")?;
        f.write_str(&self.trace)
    }
}
