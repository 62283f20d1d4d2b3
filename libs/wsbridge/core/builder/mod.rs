pub mod states;

use crate::client::WebSocketClient;
use crate::config::{ClientConfig, Headers, DEFAULT_PING_INTERVAL_SECS};
use crate::traits::*;
use crate::tungstenite::TungsteniteTransport;
use crate::worker::Executor;
use states::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`ClientConfig`]
///
/// The host is required; every other setting has a default.
///
/// # Example
/// ```ignore
/// let config = ClientConfig::builder()
///     .host("wss://stream.example.com/ws")
///     .proxy("127.0.0.1", 1080)
///     .ping_interval(Duration::from_secs(20))
///     .header("X-Api-Key", "abc")
///     .build()?;
/// ```
pub struct ClientConfigBuilder<S>
where
    S: HostState,
{
    _state: TypeState<S>,
    host: Option<String>,
    proxy_host: String,
    proxy_port: u16,
    ping_interval: u64,
    headers: Headers,
    log_path: Option<PathBuf>,
    accept_invalid_certs: bool,
}

impl ClientConfigBuilder<NoHost> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            host: None,
            proxy_host: String::new(),
            proxy_port: 0,
            ping_interval: DEFAULT_PING_INTERVAL_SECS,
            headers: Headers::new(),
            log_path: None,
            accept_invalid_certs: false,
        }
    }

    pub fn host(self, host: impl Into<String>) -> ClientConfigBuilder<HasHost> {
        ClientConfigBuilder {
            _state: TypeState::new(),
            host: Some(host.into()),
            proxy_host: self.proxy_host,
            proxy_port: self.proxy_port,
            ping_interval: self.ping_interval,
            headers: self.headers,
            log_path: self.log_path,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

impl Default for ClientConfigBuilder<NoHost> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<S> ClientConfigBuilder<S>
where
    S: HostState,
{
    /// Route the connection through an HTTP proxy
    ///
    /// The proxy is only used when the host is non-empty and the port is
    /// non-zero.
    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = host.into();
        self.proxy_port = port;
        self
    }

    /// Set the keepalive PING interval (whole seconds, zero disables it)
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval.as_secs();
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Record every sent and received frame at debug level in this file
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Skip TLS certificate and hostname verification
    ///
    /// Only for endpoints with self-signed certificates you control.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

// Build method - only available once the host is set
impl ClientConfigBuilder<HasHost> {
    pub fn build(self) -> Result<ClientConfig> {
        let config = ClientConfig {
            host: self.host.unwrap_or_default(),
            proxy_host: self.proxy_host,
            proxy_port: self.proxy_port,
            ping_interval: self.ping_interval,
            headers: self.headers,
            log_path: self.log_path,
            accept_invalid_certs: self.accept_invalid_certs,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`WebSocketClient`]
///
/// Chooses the codec, the executor the worker loop runs on, and the transport.
/// Defaults: [`JsonCodec`], [`Executor::Dedicated`], [`TungsteniteTransport`].
///
/// # Example
/// ```ignore
/// let client = WebSocketClient::builder(MyHandler::default())
///     .executor(Executor::Attached(tokio::runtime::Handle::current()))
///     .build();
/// ```
pub struct WebSocketClientBuilder<H, C> {
    handler: H,
    codec: C,
    executor: Executor,
    transport: Arc<dyn Transport>,
}

impl<H> WebSocketClientBuilder<H, JsonCodec> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            codec: JsonCodec,
            executor: Executor::Dedicated,
            transport: Arc::new(TungsteniteTransport),
        }
    }
}

impl<H, C> WebSocketClientBuilder<H, C> {
    /// Replace the wire codec
    pub fn codec<C2>(self, codec: C2) -> WebSocketClientBuilder<H, C2>
    where
        C2: PacketCodec,
    {
        WebSocketClientBuilder {
            handler: self.handler,
            codec,
            executor: self.executor,
            transport: self.transport,
        }
    }

    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn build(self) -> WebSocketClient<H, C>
    where
        C: PacketCodec,
        H: ClientHandler<C::Packet>,
    {
        WebSocketClient::from_parts(self.handler, self.codec, self.executor, self.transport)
    }
}
