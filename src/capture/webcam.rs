//! Webcam capture using nokhwa.

use super::{Camera, CameraError, CaptureConfig, Frame, PixelFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use tracing::{debug, info};

/// Camera backed by a platform video device.
///
/// The device is opened lazily on [`Camera::open`] and dropped on
/// [`Camera::close`], so the platform indicator turns off between sessions.
#[derive(Default)]
pub struct WebcamCamera {
    camera: Option<nokhwa::Camera>,
    sequence: u64,
    grayscale: bool,
}

impl WebcamCamera {
    /// A closed webcam; the device is chosen by the config on open.
    pub fn new() -> Self {
        Self::default()
    }

    /// List available webcam devices.
    pub fn list_devices() -> Result<Vec<String>, CameraError> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)
            .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;

        Ok(devices
            .into_iter()
            .map(|info| format!("{}: {}", info.index(), info.human_name()))
            .collect())
    }
}

impl Camera for WebcamCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.close();

        info!(
            device = config.device_id,
            width = config.width,
            height = config.height,
            "Opening webcam"
        );

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));
        let mut camera = nokhwa::Camera::new(CameraIndex::Index(config.device_id), requested)
            .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))?;

        let resolution = camera.resolution();
        info!(
            "Webcam streaming: {}x{} @ {} fps",
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        self.camera = Some(camera);
        self.sequence = 0;
        self.grayscale = config.grayscale;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let camera = self.camera.as_mut().ok_or(CameraError::NotAcquired)?;

        let buffer = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        self.sequence += 1;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Ok(Frame::empty(self.sequence));
        }
        debug!(sequence = self.sequence, width, height, "Captured webcam frame");

        let rgb = decoded.into_raw();
        if self.grayscale {
            // ITU-R BT.601 luma
            let luma = rgb
                .chunks_exact(3)
                .map(|p| ((p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000) as u8)
                .collect();
            Ok(Frame::new(luma, width, height, PixelFormat::Gray8, self.sequence))
        } else {
            Ok(Frame::new(rgb, width, height, PixelFormat::Rgb8, self.sequence))
        }
    }

    fn is_open(&self) -> bool {
        self.camera.as_ref().is_some_and(|c| c.is_stream_open())
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop webcam stream cleanly");
            }
            info!("Webcam stream stopped after {} frames", self.sequence);
        }
    }
}

impl Drop for WebcamCamera {
    fn drop(&mut self) {
        self.close();
    }
}
