//! Optional per-client traffic log
//!
//! When a log path is configured every sent text and every decoded inbound
//! packet is written to that file at debug level. The file has its own
//! subscriber, scoped with `tracing::dispatcher::with_default`, so the host's
//! global subscriber and filters are left alone.

use crate::traits::{Result, WsBridgeError};
use std::fmt::Debug;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, Dispatch, Level};

pub(crate) struct TrafficLog {
    dispatch: Option<Dispatch>,
}

impl TrafficLog {
    pub(crate) fn disabled() -> Self {
        Self { dispatch: None }
    }

    /// Open (append, create) the log file, or return a disabled log
    pub(crate) fn open(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::disabled());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                WsBridgeError::Configuration(format!(
                    "cannot create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                WsBridgeError::Configuration(format!("cannot open log file {}: {}", path.display(), e))
            })?;

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_max_level(Level::DEBUG)
            .finish();

        Ok(Self {
            dispatch: Some(Dispatch::new(subscriber)),
        })
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.dispatch.is_some()
    }

    pub(crate) fn sent(&self, text: &str) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || debug!("sent text: {}", text));
        }
    }

    pub(crate) fn received<P: Debug>(&self, packet: &P) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || debug!("recv data: {:?}", packet));
        }
    }
}
