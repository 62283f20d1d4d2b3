use crate::report::ErrorReport;
use std::io::Write;
use std::sync::Arc;
use tracing::error;

/// Lifecycle hooks invoked by the receive loop
///
/// All hooks run on the worker loop, one at a time, in session order:
/// `on_connected` first, then `on_packet` for every decoded frame, then
/// `on_error` (only for faults) and `on_disconnected`.
///
/// Hooks should return quickly. A hook that blocks stalls the worker loop,
/// which also holds back every queued `send_packet` write.
///
/// # Type Parameters
/// - `P`: packet type produced by the client's codec
///
/// # Example
/// ```ignore
/// struct TickerFeed {
///     last_price: Mutex<Option<f64>>,
/// }
///
/// impl ClientHandler<Packet> for TickerFeed {
///     fn on_connected(&self) {
///         info!("ticker feed online");
///     }
///
///     fn on_packet(&self, packet: Packet) {
///         if let Some(price) = packet.get("price").and_then(|p| p.as_f64()) {
///             *self.last_price.lock() = Some(price);
///         }
///     }
/// }
/// ```
pub trait ClientHandler<P>: Send + Sync + 'static
where
    P: Send + 'static,
{
    /// Called once the socket handshake succeeded
    fn on_connected(&self) {}

    /// Called when a connected session ends, for any reason
    fn on_disconnected(&self) {}

    /// Called for every decoded inbound packet
    fn on_packet(&self, packet: P);

    /// Called for every fault raised inside the worker loop's tasks
    ///
    /// The default writes the formatted report to stderr and logs it. The
    /// fault is propagated to the owning thread afterwards regardless of
    /// what this hook does (see `WebSocketClient::join`).
    fn on_error(&self, report: &ErrorReport) {
        write_report(report);
    }
}

/// Default `on_error` behaviour, callable from overriding implementations
pub fn write_report(report: &ErrorReport) {
    error!("Unhandled WebSocket error ({}): {}", report.kind, report.error);
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "{}", report);
    let _ = stderr.flush();
}

/// Share one handler between a client and the code that inspects it
impl<P, T> ClientHandler<P> for Arc<T>
where
    P: Send + 'static,
    T: ClientHandler<P> + ?Sized,
{
    fn on_connected(&self) {
        (**self).on_connected()
    }

    fn on_disconnected(&self) {
        (**self).on_disconnected()
    }

    fn on_packet(&self, packet: P) {
        (**self).on_packet(packet)
    }

    fn on_error(&self, report: &ErrorReport) {
        (**self).on_error(report)
    }
}
