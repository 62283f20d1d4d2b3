//! WebSocket listener
//!
//! Connects the base client to one endpoint from a plain synchronous `main`,
//! sends the packets given on the command line once connected and logs
//! everything it receives until the run time elapses.
//!
//! Usage: `ws_listen [ws://host/path] [json-packet ...]`
//!
//! Without a host argument the configuration is read from the YAML file named
//! by `WS_LISTEN_CONFIG` (default `config/ws_listen.yaml`). `WS_LISTEN_SECS` sets
//! the run time (default 10).

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::{info, warn};
use wsbridge::{ClientConfig, ClientEvent, ClientHandler, Packet, WebSocketClient};
use wsbridge_harness::bin_common::{load_config_path, load_listen_config, parse_args, ListenArgs};
use wsbridge_harness::logging::init_tracing;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

struct LoggingHandler;

impl ClientHandler<Packet> for LoggingHandler {
    fn on_connected(&self) {
        info!("Listener connected");
    }

    fn on_disconnected(&self) {
        info!("Listener disconnected");
    }

    fn on_packet(&self, packet: Packet) {
        match serde_json::to_string(&packet) {
            Ok(text) => info!("<- {}", text),
            Err(_) => info!("<- {:?}", packet),
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = ListenArgs::parse(parse_args());
    let config = match &args.host {
        Some(host) => ClientConfig::builder().host(host.as_str()).build()?,
        None => load_listen_config(&load_config_path())?,
    };

    let packets = args
        .packets
        .iter()
        .map(|text| {
            serde_json::from_str::<Packet>(text)
                .with_context(|| format!("not a JSON object: {}", text))
        })
        .collect::<Result<Vec<_>>>()?;

    let run_for = std::env::var("WS_LISTEN_SECS")
        .ok()
        .and_then(|secs| secs.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10));

    let client = WebSocketClient::new(LoggingHandler);
    client.init(config)?;
    client.start()?;

    match client.recv_event_timeout(CONNECT_TIMEOUT) {
        Ok(ClientEvent::Connected) => {}
        Ok(ClientEvent::Error(e)) => {
            client.stop();
            client.join().ok();
            return Err(e).context("connection failed");
        }
        Ok(event) => bail!("unexpected event before connect: {:?}", event),
        Err(_) => {
            client.stop();
            bail!("no connection within {:?}", CONNECT_TIMEOUT);
        }
    }

    for packet in &packets {
        client.send_packet(packet)?;
        info!("-> {}", client.last_sent_text().unwrap_or_default());
    }

    match client.recv_event_timeout(run_for) {
        Ok(ClientEvent::Disconnected) => warn!("Server closed the connection"),
        Ok(ClientEvent::Error(e)) => warn!("Session fault: {}", e),
        _ => {}
    }

    client.stop();
    client.join()?;

    let metrics = client.metrics();
    info!(
        "Sent {} / received {} messages",
        metrics.messages_sent, metrics.messages_received
    );
    Ok(())
}
