//! Configuration for the log store

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};

/// Default number of resident commands
pub const DEFAULT_CAPACITY: usize = 10;

/// Default cap on a single pending record
pub const DEFAULT_MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Store configuration, fixed when the store is constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of record slots in the ring
    pub capacity: usize,
    /// Largest record a write accumulator will assemble
    pub max_record_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        }
    }
}

impl StoreConfig {
    /// Create a configuration with a custom slot count
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the per-record size cap
    pub fn with_max_record_bytes(mut self, max: usize) -> Self {
        self.max_record_bytes = max;
        self
    }

    /// Reject values the store cannot be built with
    pub fn validate(&self) -> LogResult<()> {
        if self.capacity == 0 {
            return Err(LogError::config("capacity must be at least 1"));
        }
        if self.max_record_bytes == 0 {
            return Err(LogError::config("max_record_bytes must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.max_record_bytes, 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::with_capacity(3).with_max_record_bytes(128);
        assert_eq!(config.capacity, 3);
        assert_eq!(config.max_record_bytes, 128);
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(matches!(
            StoreConfig::with_capacity(0).validate(),
            Err(LogError::Config(_))
        ));
        assert!(StoreConfig::default().with_max_record_bytes(0).validate().is_err());
    }
}
