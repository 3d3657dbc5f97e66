//! Logging setup for the AESD log services
//!
//! This crate wires `tracing` events to the console and, optionally, to a
//! rolling file.
//!
//! # Features
//!
//! - **Pretty console output** for interactive use (default)
//! - **JSONL output**: structured JSON lines for log aggregation
//! - **File Rotation**: daily/hourly log rotation via tracing-appender
//! - `RUST_LOG` overrides the configured level
//!
//! # Quick Start
//!
//! ```ignore
//! use aesd_logging::{LogConfig, SubscriberBuilder};
//!
//! // Simple setup with defaults (pretty console at info)
//! let _guard = SubscriberBuilder::new().init()?;
//!
//! // Production: JSONL into ./logs, rotated daily
//! let _guard = SubscriberBuilder::new()
//!     .with_config(LogConfig::production("./logs".into()))
//!     .init()?;
//! ```

pub mod config;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};
use std::io;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use layers::BoxedLayer;

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log file or directory could not be created
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A global subscriber is already installed
    #[error("Subscriber init failed: {0}")]
    Init(String),
}

/// Builder for configuring and initializing the logging subscriber
pub struct SubscriberBuilder {
    config: LogConfig,
}

impl SubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Choose pretty (true) or JSONL (false) console output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally.
    ///
    /// Returns the file writer guard when file output is enabled; it must be
    /// kept alive for the life of the program or buffered lines are lost.
    ///
    /// # Errors
    ///
    /// Fails if the log directory cannot be created or a global subscriber
    /// is already set.
    pub fn init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(layers::console_layer(&self.config.console, &self.config.jsonl));
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = create_file_writer(file_config)?;
            layers.push(layers::jsonl_layer(writer, &self.config.jsonl));
            guard = Some(file_guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the non-blocking file writer; `Never` truncates one file, the
/// others append to a rolling set.
fn create_file_writer(file_config: &FileConfig) -> io::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&file_config.directory)?;
    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            let path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };
    let appender = RollingFileAppender::new(rotation, &file_config.directory, &file_config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (pretty console)
pub fn init_default() -> Result<Option<WorkerGuard>, LoggingError> {
    SubscriberBuilder::new().init()
}

/// Initialize logging for testing (minimal output); repeat calls are ignored
pub fn init_testing() {
    let _ = SubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = SubscriberBuilder::new();
        assert_eq!(builder.config.default_level, "info");
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = SubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().default_level, "debug");
        assert!(builder.config().console.ansi);
    }

    #[test]
    fn test_builder_overrides() {
        let builder = SubscriberBuilder::new()
            .with_level("trace")
            .with_console(false)
            .with_pretty(false);
        assert_eq!(builder.config.default_level, "trace");
        assert!(!builder.config.console.enabled);
        assert!(!builder.config.console.pretty);
    }

    #[test]
    fn test_file_writer_never_rotation_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            directory: dir.path().join("nested"),
            prefix: "unit".to_string(),
            rotation: RotationStrategy::Never,
        };
        let (_writer, _guard) = create_file_writer(&config).unwrap();
        assert!(dir.path().join("nested").join("unit.log").exists());
    }

    #[test]
    fn test_init_testing_is_repeatable() {
        init_testing();
        init_testing();
    }
}
