//! Still capture: sample the live stream and encode the frame as JPEG.

use super::{CameraError, CameraHandle, CameraManager, CapturedImage, Frame, ImageEncoding, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

/// Turns live frames into encoded stills.
///
/// Holds no session state; callers decide where the image goes.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl FrameEncoder {
    /// JPEG quality is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Samples the current frame at native resolution and encodes it.
    ///
    /// Fails with [`CameraError::NoActiveFrame`] while the stream has not
    /// reported its video dimensions.
    pub fn capture_frame(
        &self,
        camera: &mut CameraManager,
        handle: &CameraHandle,
    ) -> Result<CapturedImage, CameraError> {
        let frame = camera.capture(handle)?;
        self.encode(&frame)
    }

    /// Encodes a single raw frame.
    pub fn encode(&self, frame: &Frame) -> Result<CapturedImage, CameraError> {
        if !frame.has_dimensions() {
            return Err(CameraError::NoActiveFrame);
        }
        if !frame.is_valid() {
            return Err(CameraError::CaptureFailed(format!(
                "pixel buffer of {} bytes does not match {}x{} {:?}",
                frame.pixels().len(),
                frame.width(),
                frame.height(),
                frame.format()
            )));
        }

        let color = match frame.format() {
            PixelFormat::Gray8 => ExtendedColorType::L8,
            PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
        };

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
        encoder
            .encode(frame.pixels(), frame.width(), frame.height(), color)
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        tracing::trace!(
            sequence = frame.sequence(),
            encoded_bytes = bytes.len(),
            "Encoded frame"
        );

        Ok(CapturedImage::new(
            ImageEncoding::Jpeg,
            bytes,
            frame.width(),
            frame.height(),
        ))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(90)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConfig, MockCamera};

    #[test]
    fn test_encodes_jpeg() {
        let frame = Frame::new(vec![128u8; 8 * 8 * 3], 8, 8, PixelFormat::Rgb8, 1);
        let image = FrameEncoder::default().encode(&frame).unwrap();

        assert_eq!(image.encoding(), ImageEncoding::Jpeg);
        assert_eq!(image.dimensions(), (8, 8));
        // JPEG SOI marker
        assert_eq!(&image.bytes()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encodes_grayscale() {
        let frame = Frame::new(vec![40u8; 4 * 4], 4, 4, PixelFormat::Gray8, 1);
        assert!(FrameEncoder::new(50).encode(&frame).is_ok());
    }

    #[test]
    fn test_no_dimensions_is_no_active_frame() {
        let result = FrameEncoder::default().encode(&Frame::empty(1));
        assert!(matches!(result, Err(CameraError::NoActiveFrame)));
    }

    #[test]
    fn test_capture_from_manager_after_warmup() {
        let mut manager = CameraManager::new(
            Box::new(MockCamera::with_warmup(1)),
            CaptureConfig::with_dimensions(8, 6),
        );
        let handle = manager.acquire().unwrap();
        let encoder = FrameEncoder::default();

        assert!(matches!(
            encoder.capture_frame(&mut manager, &handle),
            Err(CameraError::NoActiveFrame)
        ));
        let image = encoder.capture_frame(&mut manager, &handle).unwrap();
        assert_eq!(image.dimensions(), (8, 6));
    }
}
