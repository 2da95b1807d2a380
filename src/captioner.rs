//! The image-captioning capability.
//!
//! The video processor only needs "image in, text out". [`Captioner`] is
//! that seam: the ONNX backend in [`crate::onnx`] implements it for a real
//! model, and any `FnMut(&RgbImage) -> Result<String, InferenceError>`
//! closure implements it too, which is how deterministic stand-ins are
//! written.
//!
//! # Example
//!
//! ```
//! use framecap::{Captioner, InferenceError};
//! use image::RgbImage;
//!
//! let mut captioner = |image: &RgbImage| -> Result<String, InferenceError> {
//!     Ok(format!("a {}x{} picture", image.width(), image.height()))
//! };
//! let caption = captioner.caption(&RgbImage::new(4, 3)).unwrap();
//! assert_eq!(caption, "a 4x3 picture");
//! ```

use image::RgbImage;

use crate::error::InferenceError;

/// Generates a natural-language description of one image.
///
/// Implementations may be slow and may fail for an individual frame. A
/// failure only affects that frame.
pub trait Captioner {
    /// Describe `image`.
    fn caption(&mut self, image: &RgbImage) -> Result<String, InferenceError>;
}

impl<F> Captioner for F
where
    F: FnMut(&RgbImage) -> Result<String, InferenceError>,
{
    fn caption(&mut self, image: &RgbImage) -> Result<String, InferenceError> {
        self(image)
    }
}
