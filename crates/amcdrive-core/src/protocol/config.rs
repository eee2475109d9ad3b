//! Session configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_ADDRESS, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Settings for opening a session to one drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Drive address (1-63)
    pub address: u8,
    /// Timeout for each wait on response data, in milliseconds
    pub timeout_ms: u64,
    /// Pass raw frames to the session's observer
    pub diagnostics: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_ADDRESS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            diagnostics: false,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProtocolError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ProtocolError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Response wait timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.address, 0x3F);
        assert_eq!(config.timeout(), Duration::from_millis(1000));
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_config_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "port_name": "/dev/ttyUSB2", "timeout_ms": 250 }}"#).unwrap();

        let config = SessionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port_name, "/dev/ttyUSB2");
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SessionConfig::from_file(file.path()),
            Err(ProtocolError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SessionConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
    }
}
