//! Default transport on top of tokio-tungstenite
//!
//! Opens a plain TCP or HTTP CONNECT tunnelled stream, runs the WebSocket
//! handshake over it (TLS for `wss://`) and splits the socket into a
//! [`FrameSink`] and a text [`FrameStream`].

use crate::config::ClientConfig;
use crate::traits::*;
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Upper bound on the proxy's CONNECT response head
const MAX_PROXY_RESPONSE: usize = 8192;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// tokio-tungstenite backed [`Transport`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, config: &ClientConfig) -> Result<Connection> {
        let request = build_request(config)?;
        let (host, port) = target_addr(&request)?;

        let tcp = match config.proxy_addr() {
            Some((proxy_host, proxy_port)) => {
                open_tunnel(&proxy_host, proxy_port, &host, port).await?
            }
            None => TcpStream::connect((host.as_str(), port))
                .await
                .map_err(|e| WsBridgeError::Connect(format!("{}:{}: {}", host, port, e)))?,
        };

        let connector = tls_connector(config)?;
        let (ws_stream, response) = client_async_tls_with_config(request, tcp, None, connector)
            .await
            .map_err(|e| WsBridgeError::Connect(e.to_string()))?;
        debug!("Handshake response status: {}", response.status());

        let (write, read) = ws_stream.split();
        let frames = read
            .filter_map(|message| async move { inbound_text(message) })
            .boxed();

        Ok(Connection::new(TungsteniteSink { write }, frames))
    }
}

/// Handshake request for the configured host, with the configured headers
fn build_request(config: &ClientConfig) -> Result<Request> {
    let mut request = config
        .host()
        .into_client_request()
        .map_err(|e| WsBridgeError::Connect(format!("invalid host '{}': {}", config.host(), e)))?;

    for (key, value) in config.headers() {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                request.headers_mut().insert(name, value);
            }
            _ => warn!("Skipping invalid header '{}'", key),
        }
    }

    Ok(request)
}

/// Host and port to open the TCP stream to
fn target_addr(request: &Request) -> Result<(String, u16)> {
    let uri = request.uri();
    let host = uri
        .host()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| WsBridgeError::Connect(format!("no host in '{}'", uri)))?;

    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") => 443,
        _ => 80,
    });

    Ok((host, port))
}

/// Open a TCP stream to `host:port` through an HTTP CONNECT proxy
async fn open_tunnel(proxy_host: &str, proxy_port: u16, host: &str, port: u16) -> Result<TcpStream> {
    let mut stream = TcpStream::connect((proxy_host, proxy_port))
        .await
        .map_err(|e| {
            WsBridgeError::Connect(format!("proxy {}:{}: {}", proxy_host, proxy_port, e))
        })?;

    let authority = if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };
    let connect = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n\r\n", authority);
    stream
        .write_all(connect.as_bytes())
        .await
        .map_err(|e| WsBridgeError::Connect(format!("proxy write failed: {}", e)))?;

    // Read byte by byte so nothing past the response head is consumed
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_PROXY_RESPONSE {
            return Err(WsBridgeError::Connect("proxy response too large".into()));
        }
        let n = stream
            .read(&mut byte)
            .await
            .map_err(|e| WsBridgeError::Connect(format!("proxy read failed: {}", e)))?;
        if n == 0 {
            return Err(WsBridgeError::Connect(
                "proxy closed the connection during CONNECT".into(),
            ));
        }
        head.push(byte[0]);
    }

    let head = String::from_utf8_lossy(&head);
    let status_line = head.lines().next().unwrap_or_default();
    match status_line.split_whitespace().nth(1) {
        Some("200") => {
            info!("Tunnel to {} open via {}:{}", authority, proxy_host, proxy_port);
            Ok(stream)
        }
        _ => Err(WsBridgeError::Connect(format!(
            "proxy refused CONNECT: {}",
            status_line
        ))),
    }
}

/// TLS connector honouring `accept_invalid_certs`; `None` uses the default
fn tls_connector(config: &ClientConfig) -> Result<Option<Connector>> {
    if !config.accept_invalid_certs() {
        return Ok(None);
    }

    warn!("TLS certificate verification disabled for {}", config.host());
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| WsBridgeError::Connect(format!("TLS setup failed: {}", e)))?;
    Ok(Some(Connector::NativeTls(connector)))
}

/// Map one inbound tungstenite message to a text frame
///
/// Control frames are skipped; tungstenite answers PINGs on its own.
fn inbound_text(
    message: std::result::Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<String>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(data)) => Some(
            String::from_utf8(data)
                .map_err(|e| WsBridgeError::Decode(format!("binary frame is not UTF-8: {}", e))),
        ),
        Ok(Message::Close(frame)) => {
            debug!("Received close frame: {:?}", frame);
            None
        }
        Ok(_) => None,
        Err(e) => Some(Err(WsBridgeError::Transport(e.to_string()))),
    }
}

struct TungsteniteSink {
    write: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for TungsteniteSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.write
            .send(Message::Text(text))
            .await
            .map_err(|e| WsBridgeError::Transport(format!("failed to send frame: {}", e)))
    }

    async fn send_ping(&mut self) -> Result<()> {
        self.write
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| WsBridgeError::Transport(format!("failed to send ping: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.write
            .send(Message::Close(None))
            .await
            .map_err(|e| WsBridgeError::Transport(format!("failed to send close: {}", e)))
    }
}
