//! Camera abstraction and exclusive stream ownership.
//!
//! Devices implement the [`Camera`] trait. The [`CameraManager`] wraps a
//! device and hands out [`CameraHandle`] tokens so that at most one stream
//! is live at a time and every acquisition is paired with a release.

use super::{CaptureConfig, Frame, PixelFormat};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Permission denied or no such device.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// The device rejected the requested format.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// Reading or encoding a frame failed.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// The stream has not reported video dimensions yet.
    #[error("stream has no video frame yet")]
    NoActiveFrame,
    /// The handle does not belong to the live stream.
    #[error("camera handle is not the active stream")]
    NotAcquired,
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens the device and starts streaming with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Samples the current frame of the live stream.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the stream is currently running.
    fn is_open(&self) -> bool;

    /// Stops all tracks and releases the device.
    fn close(&mut self);
}

/// Mock camera for testing that generates synthetic frames.
///
/// `with_warmup(n)` makes the first `n` samples after each open come back
/// without dimensions, the way a browser stream does before metadata loads.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    warmup: u32,
    warmup_remaining: u32,
    denied: bool,
}

impl MockCamera {
    /// Camera producing full frames from the first sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sampled right after open carry no dimensions.
    pub fn with_warmup(frames: u32) -> Self {
        Self {
            warmup: frames,
            ..Self::default()
        }
    }

    /// A device whose permission is always denied.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        if self.denied {
            return Err(CameraError::DeviceUnavailable(
                "permission denied".to_string(),
            ));
        }
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        self.warmup_remaining = self.warmup;
        tracing::info!(?config, "MockCamera opened");
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotAcquired)?;
        self.sequence += 1;

        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return Ok(Frame::empty(self.sequence));
        }

        let format = if config.grayscale {
            PixelFormat::Gray8
        } else {
            PixelFormat::Rgb8
        };
        let len = (config.width * config.height) as usize * format.bytes_per_pixel();
        // Deterministic gradient shifted by sequence so successive frames differ
        let pixels: Vec<u8> = (0..len)
            .map(|i| ((i as u64 + self.sequence * 7) % 256) as u8)
            .collect();

        Ok(Frame::new(
            pixels,
            config.width,
            config.height,
            format,
            self.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            tracing::info!("MockCamera closed");
        }
    }
}

/// Token for the currently acquired stream.
///
/// Not `Clone`: exactly one owner holds the right to release a stream.
#[derive(Debug, PartialEq, Eq)]
pub struct CameraHandle {
    id: u64,
}

impl CameraHandle {
    /// Identifier of the stream this handle was issued for.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Counters for acquire/release pairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraStats {
    /// Streams opened.
    pub acquisitions: u64,
    /// Streams actually stopped (no-op releases are not counted).
    pub releases: u64,
}

/// Owns the single camera device and serialises access to its stream.
pub struct CameraManager {
    camera: Box<dyn Camera>,
    config: CaptureConfig,
    active: Option<u64>,
    next_id: u64,
    stats: CameraStats,
}

impl CameraManager {
    /// Wraps `camera`; nothing is opened until [`CameraManager::acquire`].
    pub fn new(camera: Box<dyn Camera>, config: CaptureConfig) -> Self {
        Self {
            camera,
            config,
            active: None,
            next_id: 1,
            stats: CameraStats::default(),
        }
    }

    /// Starts a stream, first stopping any stream that is already live.
    pub fn acquire(&mut self) -> Result<CameraHandle, CameraError> {
        if let Some(previous) = self.active.take() {
            tracing::debug!(stream = previous, "Releasing prior stream before acquire");
            self.stop_stream(previous);
        }

        self.camera.open(&self.config)?;

        let id = self.next_id;
        self.next_id += 1;
        self.active = Some(id);
        self.stats.acquisitions += 1;
        tracing::info!(stream = id, "Camera acquired");
        Ok(CameraHandle { id })
    }

    /// Stops the stream behind `handle`.
    ///
    /// A handle whose stream was already stopped (or superseded by a later
    /// acquire) is ignored.
    pub fn release(&mut self, handle: CameraHandle) {
        if self.active == Some(handle.id) {
            self.active = None;
            self.stop_stream(handle.id);
        } else {
            tracing::trace!(stream = handle.id, "Release of inactive stream ignored");
        }
    }

    /// Stops whatever stream is live. Returns false when nothing was held.
    pub fn release_all(&mut self) -> bool {
        match self.active.take() {
            Some(id) => {
                self.stop_stream(id);
                true
            }
            None => false,
        }
    }

    /// Samples a frame from the stream behind `handle`.
    pub fn capture(&mut self, handle: &CameraHandle) -> Result<Frame, CameraError> {
        if self.active != Some(handle.id) || !self.camera.is_open() {
            return Err(CameraError::NotAcquired);
        }
        self.camera.capture()
    }

    /// True while a stream is live.
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire/release counts so far.
    pub fn stats(&self) -> CameraStats {
        self.stats
    }

    fn stop_stream(&mut self, id: u64) {
        self.camera.close();
        self.stats.releases += 1;
        tracing::info!(stream = id, "Camera released");
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for CameraManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraManager")
            .field("active", &self.active)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> CameraManager {
        CameraManager::new(
            Box::new(MockCamera::new()),
            CaptureConfig::with_dimensions(16, 12),
        )
    }

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::with_dimensions(8, 8);

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(camera.capture(), Err(CameraError::NotAcquired)));
    }

    #[test]
    fn test_warmup_frames_have_no_dimensions() {
        let mut camera = MockCamera::with_warmup(1);
        camera.open(&CaptureConfig::with_dimensions(8, 8)).unwrap();

        assert!(!camera.capture().unwrap().has_dimensions());
        assert!(camera.capture().unwrap().has_dimensions());
    }

    #[test]
    fn test_denied_camera_reports_unavailable() {
        let mut manager = CameraManager::new(
            Box::new(MockCamera::denied()),
            CaptureConfig::default(),
        );
        assert!(matches!(
            manager.acquire(),
            Err(CameraError::DeviceUnavailable(_))
        ));
        assert!(!manager.is_streaming());
        assert_eq!(manager.stats().acquisitions, 0);
    }

    #[test]
    fn test_acquire_releases_prior_stream() {
        let mut manager = manager();
        let first = manager.acquire().unwrap();
        let second = manager.acquire().unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.stats().releases, 1);

        // The superseded handle is dead; releasing it leaves the live stream alone.
        manager.release(first);
        assert!(manager.is_streaming());
        assert!(manager.capture(&second).is_ok());

        manager.release(second);
        assert!(!manager.is_streaming());
        assert_eq!(manager.stats(), CameraStats { acquisitions: 2, releases: 2 });
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let mut manager = manager();
        assert!(!manager.release_all());

        let _handle = manager.acquire().unwrap();
        assert!(manager.release_all());
        assert!(!manager.release_all());
        assert_eq!(manager.stats().releases, 1);
    }

    #[test]
    fn test_capture_with_stale_handle_fails() {
        let mut manager = manager();
        let first = manager.acquire().unwrap();
        let _second = manager.acquire().unwrap();
        assert!(matches!(
            manager.capture(&first),
            Err(CameraError::NotAcquired)
        ));
    }
}
