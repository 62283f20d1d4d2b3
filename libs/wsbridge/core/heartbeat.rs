//! Heartbeat mechanism for WebSocket connections
//!
//! # Architecture
//!
//! The heartbeat runs as its own task next to the session's receive loop and
//! never touches the socket. It queues a [`SessionCommand::Ping`] on the
//! session's command queue, so keepalive frames go through the same
//! serialized write path as packets:
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. Queue Ping ─────┼──> Command Queue ──> Receive Loop ──> WebSocket PING
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The task exits as soon as the session drops its end of the queue.

use crate::session::SessionCommand;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Heartbeat task that queues a PING every `interval`
///
/// The first tick is skipped so no PING is sent right after connecting, and
/// missed ticks are skipped rather than bursted.
pub(crate) async fn heartbeat_task(interval: Duration, commands: UnboundedSender<SessionCommand>) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!("Heartbeat tick - queueing ping");
                if commands.send(SessionCommand::Ping).is_err() {
                    break;
                }
            }
            _ = commands.closed() => break,
        }
    }

    debug!("Heartbeat task exiting");
}

/// Spawn a heartbeat task on the current runtime
pub(crate) fn spawn_heartbeat(
    interval: Duration,
    commands: UnboundedSender<SessionCommand>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(heartbeat_task(interval, commands))
}
