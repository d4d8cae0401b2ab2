//! File configuration.
//!
//! Every section and field is optional; a missing file section falls back
//! to the defaults, which point at a recognition service on localhost.

use crate::capture::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate outside 1..=120.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// JPEG quality outside 1..=100.
    #[error("invalid jpeg quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    /// Base URL is not http or https.
    #[error("invalid service url: {0}")]
    InvalidUrl(String),
    /// A timeout is zero.
    #[error("timeouts must be non-zero")]
    InvalidTimeout,
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    /// Recognition service connection.
    pub service: ServiceConfig,
    #[serde(default)]
    /// Camera stream settings.
    pub capture: CaptureConfig,
    #[serde(default)]
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
}

/// Remote recognition service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL the endpoint paths are joined onto.
    pub base_url: String,
    /// Upper bound on a whole request round trip.
    pub request_timeout_ms: u64,
    /// Upper bound on establishing the connection.
    pub connect_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl ServiceConfig {
    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Rejects URLs without an http(s) scheme and zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.capture.validate()
    }
}
