//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.tether/config.json`). Every field has a
//! default, so a missing file or an empty object yields a working local server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// WebSocket runtime settings.
    #[serde(default)]
    pub websocket: WebSocketConfig,
}

/// Bind address, port, and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for HTTP and WebSocket (default 15152).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest request body read before the handler runs (default 1 MiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Pooled payload buffers for binary, ping and pong frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketConfig {
    /// Idle buffers kept for reuse (default 64).
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
}

fn default_port() -> u16 {
    15152
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_pool_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_pool_capacity(),
        }
    }
}

impl ServerConfig {
    /// `bind:port`, as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind.trim(), self.port)
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TETHER_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".tether").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from `path` (or the default path). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.server.port, 15152);
        assert_eq!(c.server.bind, "127.0.0.1");
        assert_eq!(c.server.max_body_bytes, 1024 * 1024);
        assert_eq!(c.websocket.pool_capacity, 64);
        assert_eq!(c.server.bind_addr(), "127.0.0.1:15152");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c: Config =
            serde_json::from_str(r#"{"server":{"port":8080,"maxBodyBytes":10}}"#).unwrap();
        assert_eq!(c.server.port, 8080);
        assert_eq!(c.server.max_body_bytes, 10);
        assert_eq!(c.server.bind, "127.0.0.1");
        assert_eq!(c.websocket.pool_capacity, 64);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join(format!("tether-missing-{}.json", uuid::Uuid::new_v4()));
        let (c, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(c.server.port, 15152);
    }

    #[test]
    fn invalid_file_reports_path() {
        let path = std::env::temp_dir().join(format!("tether-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"{not json").unwrap();
        let err = load_config(Some(path.clone())).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config from"));
        let _ = std::fs::remove_file(path);
    }
}
