//! Letterbox crop geometry.
//!
//! Only horizontal letterboxing (bars above and below the picture) is
//! modeled. A ratio that would need pillarbox bars on the left and right
//! yields a crop covering the full frame.

use image::{RgbImage, imageops};

use crate::aspect_ratio::AspectRatio;

/// An axis-aligned crop rectangle in pixel coordinates.
///
/// `right` and `bottom` are exclusive. A `CropRect` produced by
/// [`CropRect::letterbox`] always lies within the frame it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge (inclusive).
    pub left: u32,
    /// Top edge (inclusive).
    pub top: u32,
    /// Right edge (exclusive).
    pub right: u32,
    /// Bottom edge (exclusive).
    pub bottom: u32,
}

impl CropRect {
    /// Compute the symmetric top/bottom crop that leaves content of the given
    /// aspect ratio.
    ///
    /// Returns `None` when `ratio` is disabled. The content height is
    /// `width / ratio`, clamped to `height`; fractional edges are rounded
    /// half-to-even. The result may have zero height for extreme ratios.
    pub fn letterbox(width: u32, height: u32, ratio: AspectRatio) -> Option<Self> {
        if ratio.is_disabled() {
            return None;
        }

        let frame_height = f64::from(height);
        let content_height = (f64::from(width) / ratio.value()).min(frame_height);
        let border = (frame_height - content_height) * 0.5;

        let top = border.round_ties_even() as u32;
        let bottom = ((border + content_height).round_ties_even() as u32).clamp(top, height);

        Some(Self {
            left: 0,
            top,
            right: width,
            bottom,
        })
    }

    /// Width of the rectangle.
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Height of the rectangle.
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// `true` when the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Copy the covered region out of `frame`.
    pub fn apply(&self, frame: &RgbImage) -> RgbImage {
        imageops::crop_imm(frame, self.left, self.top, self.width(), self.height()).to_image()
    }
}
