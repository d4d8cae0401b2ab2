//! Capture buffers for the two capture modes.

use crate::capture::CapturedImage;

/// Ordered stills for an enrollment, in capture order.
///
/// Unbounded; the caller decides when enough images exist.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentBuffer {
    images: Vec<CapturedImage>,
}

impl EnrollmentBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `image` after the existing ones.
    pub fn append(&mut self, image: CapturedImage) {
        self.images.push(image);
    }

    /// Drops every image.
    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Copy of the current contents, for submission or display.
    pub fn snapshot(&self) -> Vec<CapturedImage> {
        self.images.clone()
    }

    /// Borrowed view of the images.
    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    /// Number of images held.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True when no image has been captured since the last clear.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Single still used for recognition; a new capture replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct RecognitionSlot {
    image: Option<CapturedImage>,
}

impl RecognitionSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `image`, returning the one it replaced.
    pub fn set(&mut self, image: CapturedImage) -> Option<CapturedImage> {
        self.image.replace(image)
    }

    /// Empties the slot.
    pub fn clear(&mut self) {
        self.image = None;
    }

    /// The stored image, if any.
    pub fn get(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    /// True until a photo is set.
    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }
}
