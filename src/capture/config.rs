//! Camera capture configuration.
//!
//! The browser default is "whatever the device offers"; here the stream
//! resolution is requested explicitly so encoded stills have a predictable
//! size on the wire.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index or identifier.
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// JPEG quality for captured stills (1-100).
    pub jpeg_quality: u8,
    /// Capture single-channel frames.
    pub grayscale: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            jpeg_quality: 90,
            grayscale: false,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}
