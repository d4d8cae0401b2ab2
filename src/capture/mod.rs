//! Camera input and still capture.
//!
//! This module owns the single video device: acquiring and releasing the
//! live stream, and turning its current frame into an encoded still that
//! can be shipped to the recognition service.

mod camera;
mod config;
mod encoder;
mod frame;
#[cfg(feature = "camera")]
mod webcam;

pub use camera::{Camera, CameraError, CameraHandle, CameraManager, CameraStats, MockCamera};
pub use config::CaptureConfig;
pub use encoder::FrameEncoder;
pub use frame::{CapturedImage, Frame, ImageEncoding, PixelFormat};
#[cfg(feature = "camera")]
pub use webcam::WebcamCamera;
