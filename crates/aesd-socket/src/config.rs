//! Configuration for the socket server
//!
//! Settings come from an optional TOML file; command-line flags override the
//! file.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use aesd_log::StoreConfig;
use aesd_logging::LogConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 9000;

/// Default receive chunk size in bytes
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Default seconds between timestamp records
pub const DEFAULT_TIMESTAMP_INTERVAL_SECS: u64 = 10;

/// Configuration for the socket server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: SocketAddr,
    /// Bytes read from a connection per receive
    pub read_chunk_size: usize,
    /// Seconds between timestamp records; 0 disables them
    pub timestamp_interval_secs: u64,
    /// Log store settings
    pub store: StoreConfig,
    /// Logging output settings
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            timestamp_interval_secs: DEFAULT_TIMESTAMP_INTERVAL_SECS,
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Set the listen address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the store configuration
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Set the timestamp interval (0 disables timestamps)
    pub fn with_timestamp_interval_secs(mut self, secs: u64) -> Self {
        self.timestamp_interval_secs = secs;
        self
    }

    /// Set the receive chunk size
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Interval between timestamp records, if enabled
    pub fn timestamp_interval(&self) -> Option<Duration> {
        (self.timestamp_interval_secs > 0).then(|| Duration::from_secs(self.timestamp_interval_secs))
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> ServerResult<()> {
        if self.read_chunk_size == 0 {
            return Err(ServerError::config("read_chunk_size must be at least 1"));
        }
        self.store.validate()?;
        Ok(())
    }
}

/// Command-line interface of `aesdsocket`
#[derive(Debug, Parser)]
#[command(name = "aesdsocket", about = "Socket front-end for the AESD command log")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Listen address
    #[arg(long)]
    pub bind: Option<IpAddr>,
    /// Number of commands kept in the log
    #[arg(long)]
    pub capacity: Option<usize>,
    /// Seconds between timestamp records (0 disables)
    #[arg(long)]
    pub timestamp_interval: Option<u64>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Emit JSONL instead of human-readable console logs
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Resolve the effective configuration: file (or defaults), then flags
    pub fn into_config(self) -> ServerResult<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(ip) = self.bind {
            config.bind_addr.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(capacity) = self.capacity {
            config.store.capacity = capacity;
        }
        if let Some(secs) = self.timestamp_interval {
            config.timestamp_interval_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.log.default_level = level;
        }
        if self.json {
            config.log.console.pretty = false;
        }

        config.validate()?;
        Ok(config)
    }
}
