//! CLI utilities for binaries
//!
//! Handles configuration loading and argument parsing for the listener binary.

use anyhow::Context;
use std::path::{Path, PathBuf};
use wsbridge::ClientConfig;

/// Environment variable naming the client configuration file
pub const CONFIG_PATH_ENV: &str = "WS_LISTEN_CONFIG";

/// Configuration file used when the environment variable is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/ws_listen.yaml";

/// Load configuration path from environment or use default
pub fn load_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

/// Read and validate a YAML client configuration
pub fn load_listen_config(path: &Path) -> anyhow::Result<ClientConfig> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config = ClientConfig::from_yaml_str(&yaml)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Arguments of `ws_listen`: `[ws://host/path] [json-packet ...]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListenArgs {
    /// Host given on the command line, overriding the config file
    pub host: Option<String>,
    /// Packets to send once connected, as JSON text
    pub packets: Vec<String>,
}

impl ListenArgs {
    pub fn parse(args: Vec<String>) -> Self {
        let mut args = args.into_iter().peekable();
        let host = args.next_if(|arg| arg.starts_with("ws://") || arg.starts_with("wss://"));
        Self {
            host,
            packets: args.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_listen_args_with_host() {
        let args = ListenArgs::parse(vec![
            "wss://stream.example.com/ws".to_string(),
            r#"{"op":"subscribe"}"#.to_string(),
        ]);
        assert_eq!(args.host.as_deref(), Some("wss://stream.example.com/ws"));
        assert_eq!(args.packets, vec![r#"{"op":"subscribe"}"#.to_string()]);
    }

    #[test]
    fn test_listen_args_without_host() {
        let args = ListenArgs::parse(vec![r#"{"op":"ping"}"#.to_string()]);
        assert_eq!(args.host, None);
        assert_eq!(args.packets.len(), 1);
        assert_eq!(ListenArgs::parse(Vec::new()), ListenArgs::default());
    }

    #[test]
    fn test_load_listen_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: wss://stream.example.com/ws").unwrap();
        writeln!(file, "ping_interval: 15").unwrap();

        let config = load_listen_config(file.path()).unwrap();
        assert_eq!(config.host(), "wss://stream.example.com/ws");
        assert_eq!(config.ping_interval().as_secs(), 15);

        assert!(load_listen_config(Path::new("/nonexistent/ws_listen.yaml")).is_err());
    }
}
