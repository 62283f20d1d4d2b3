use crate::builder::{states::NoHost, ClientConfigBuilder};
use crate::traits::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue, Uri};

/// HTTP headers sent with the opening handshake
pub type Headers = HashMap<String, String>;

/// Default keepalive interval in seconds
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 60;

/// Connection settings for one client
///
/// Built with [`ClientConfig::builder`] or loaded from YAML with
/// [`ClientConfig::from_yaml_str`]. Both paths validate the host URI and the
/// header pairs. The config is immutable once handed to `init()`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// WebSocket URI (ws:// or wss://)
    pub(crate) host: String,

    /// HTTP proxy host, used only together with `proxy_port`
    pub(crate) proxy_host: String,

    /// HTTP proxy port, 0 means unset
    pub(crate) proxy_port: u16,

    /// Keepalive PING interval in seconds, 0 disables the heartbeat
    pub(crate) ping_interval: u64,

    /// Extra handshake headers
    pub(crate) headers: Headers,

    /// Optional file receiving a debug line for every sent/received frame
    pub(crate) log_path: Option<PathBuf>,

    /// Skip TLS certificate and hostname verification
    pub(crate) accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            proxy_host: String::new(),
            proxy_port: 0,
            ping_interval: DEFAULT_PING_INTERVAL_SECS,
            headers: Headers::new(),
            log_path: None,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Start building a config; `host` is required before `build()`
    pub fn builder() -> ClientConfigBuilder<NoHost> {
        ClientConfigBuilder::new()
    }

    /// Parse and validate a YAML document
    ///
    /// ```yaml
    /// host: wss://stream.example.com/ws
    /// proxy_host: 127.0.0.1
    /// proxy_port: 1080
    /// ping_interval: 20
    /// headers:
    ///   X-Api-Key: abc
    /// log_path: logs/ws.log
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)
            .map_err(|e| WsBridgeError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the host URI and header pairs
    pub(crate) fn validate(&self) -> Result<()> {
        let uri: Uri = self
            .host
            .parse()
            .map_err(|e| WsBridgeError::Configuration(format!("invalid host '{}': {}", self.host, e)))?;

        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            other => {
                return Err(WsBridgeError::Configuration(format!(
                    "host '{}' must use ws:// or wss://, got scheme {:?}",
                    self.host, other
                )))
            }
        }

        if uri.host().map_or(true, str::is_empty) {
            return Err(WsBridgeError::Configuration(format!(
                "host '{}' has no authority",
                self.host
            )));
        }

        for (key, value) in &self.headers {
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| WsBridgeError::Configuration(format!("invalid header name: {}", key)))?;
            HeaderValue::from_str(value).map_err(|_| {
                WsBridgeError::Configuration(format!("invalid header value for key '{}'", key))
            })?;
        }

        Ok(())
    }

    /// Get a reference to the host URI
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Proxy URL, present only when both proxy host and port are set
    pub fn proxy_url(&self) -> Option<String> {
        if self.proxy_host.is_empty() || self.proxy_port == 0 {
            return None;
        }
        Some(format!("http://{}:{}", self.proxy_host, self.proxy_port))
    }

    /// Proxy address as `host:port`, for the CONNECT tunnel
    pub(crate) fn proxy_addr(&self) -> Option<(String, u16)> {
        self.proxy_url()
            .map(|_| (self.proxy_host.clone(), self.proxy_port))
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval)
    }

    /// Check if the keepalive heartbeat is enabled
    pub fn has_heartbeat(&self) -> bool {
        self.ping_interval > 0
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }
}
