use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_ENV: &str = "WICKET_CONFIG";

/// Environment variable overriding the listening address (`host:port`).
pub const LISTEN_ENV: &str = "LISTEN";

/// Method (lower-case) to named handler.
pub type HandlerBindings = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub dispatch: DispatchConfig,
    pub handlers: HandlerBindings,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            connection: ConnectionConfig::default(),
            dispatch: DispatchConfig::default(),
            handlers: default_bindings(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub interface: String,
    /// Pending connections the listening socket queues.
    pub backlog: i32,
    /// Number of acceptor threads.
    pub acceptors: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7070,
            interface: "localhost".to_string(),
            backlog: 100,
            acceptors: 1,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub min_count: usize,
    pub max_count: usize,
    /// Idle time after which pool threads above `min_count` exit.
    pub keep_alive_time_secs: u64,
    /// Default read timeout on data sockets; 0 waits forever.
    pub socket_timeout_secs: u64,
    pub read_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            min_count: 5,
            max_count: 100,
            keep_alive_time_secs: 10,
            socket_timeout_secs: 60,
            read_buffer_size: 8192,
        }
    }
}

impl ConnectionConfig {
    pub fn keep_alive_time(&self) -> Duration {
        Duration::from_secs(self.keep_alive_time_secs)
    }

    pub fn socket_timeout(&self) -> Option<Duration> {
        (self.socket_timeout_secs > 0).then(|| Duration::from_secs(self.socket_timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Name of the dispatcher every request enters first.
    pub start: String,
    /// Media types served by the method handlers. `*` matches requests
    /// without `Content-Type`.
    pub text_content_types: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            start: "default".to_string(),
            text_content_types: vec!["text/plain".to_string(), "*".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("static"),
        }
    }
}

/// Binds every storage method to its `file-storage-*` handler.
pub fn default_bindings() -> HandlerBindings {
    ["get", "head", "post", "put", "delete", "options"]
        .into_iter()
        .map(|method| (method.to_string(), format!("file-storage-{method}")))
        .collect()
}

impl Config {
    /// Loads the file named by `WICKET_CONFIG`, falling back to defaults, and
    /// applies the `LISTEN` override.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen) = std::env::var(LISTEN_ENV) {
            config.apply_listen(&listen)?;
        }

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("invalid configuration")
    }

    /// Replaces interface and port with a `host:port` address.
    pub fn apply_listen(&mut self, listen: &str) -> Result<()> {
        let (interface, port) = listen
            .rsplit_once(':')
            .with_context(|| format!("{LISTEN_ENV} must be host:port, got {listen:?}"))?;
        self.server.port = port
            .parse()
            .with_context(|| format!("invalid port in {LISTEN_ENV}: {port:?}"))?;
        self.server.interface = interface.to_string();
        Ok(())
    }
}
