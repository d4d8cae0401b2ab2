//! Raw frames from the camera and the encoded stills taken from them.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Pixel layout of a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit luminance, one byte per pixel.
    Gray8,
    /// 8-bit RGB, three bytes per pixel.
    #[default]
    Rgb8,
}

impl PixelFormat {
    /// Bytes used by a single pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A single raw frame sampled from the live stream.
///
/// A frame with zero width or height means the stream has not
/// negotiated its video dimensions yet.
#[derive(Clone)]
pub struct Frame {
    /// Raw pixel data laid out according to `format`.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    format: PixelFormat,
    /// Monotonic sequence number within the stream.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            sequence,
        }
    }

    /// A frame from a stream that has no video dimensions yet.
    pub fn empty(sequence: u64) -> Self {
        Self::new(Vec::new(), 0, 0, PixelFormat::default(), sequence)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    /// Width in pixels; zero before the stream is ready.
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    /// Height in pixels; zero before the stream is ready.
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True once the stream reports non-zero video dimensions.
    #[inline]
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Validates that the pixel buffer size matches dimensions and format.
    pub fn is_valid(&self) -> bool {
        let expected =
            (self.width as usize) * (self.height as usize) * self.format.bytes_per_pixel();
        self.pixels.len() == expected
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

/// Encoding tag carried by a [`CapturedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    #[default]
    /// Baseline JPEG.
    Jpeg,
}

impl ImageEncoding {
    /// MIME type used in data URIs.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
        }
    }
}

/// An encoded still image, opaque to everything but the remote service.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    encoding: ImageEncoding,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl CapturedImage {
    /// Wraps an already encoded payload.
    pub fn new(encoding: ImageEncoding, bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            encoding,
            bytes,
            width,
            height,
        }
    }

    #[inline]
    /// Encoding of the payload.
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// Returns the encoded payload.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns (width, height) of the source frame.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Renders the image as a self-contained `data:` URI with a base64 body.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.encoding.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("encoding", &self.encoding)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoded_bytes", &self.bytes.len())
            .finish()
    }
}
