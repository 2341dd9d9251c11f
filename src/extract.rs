//! Dominant color extraction for a single frame.
//!
//! [`DominantColorExtractor`] runs the per-frame pipeline: optional letterbox
//! crop, downscale to fit a 100×100 box, palette quantization, frequency
//! counting, and selection of the most frequent palette entry.
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use spectrograph::{Color, DominantColorExtractor};
//!
//! let frame = RgbImage::from_pixel(64, 48, Rgb([0x33, 0x66, 0x99]));
//! let extractor = DominantColorExtractor::new(32)?;
//! let extraction = extractor.extract(&frame)?;
//! assert_eq!(extraction.color, Color::new(0x33, 0x66, 0x99));
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```

use std::borrow::Cow;

use image::{
    Rgb, RgbImage,
    imageops::{self, FilterType},
};

use crate::{
    aspect_ratio::AspectRatio,
    color::Color,
    crop::CropRect,
    error::SpectrographError,
    quantize::{MAX_PALETTE_SIZE, MedianCut, Quantizer},
};

/// Frames are shrunk to fit a square of this size before quantization.
pub const THUMBNAIL_SIZE: u32 = 100;

/// Default number of palette entries.
pub const DEFAULT_PALETTE_SIZE: usize = 32;

/// Pixel counts per palette index for one quantized frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorFrequencyTable {
    counts: Vec<u64>,
}

impl ColorFrequencyTable {
    /// Count how many of `indices` point at each of `palette_len` entries.
    ///
    /// Indices outside the palette are ignored.
    pub fn from_indices(indices: &[u8], palette_len: usize) -> Self {
        let mut counts = vec![0u64; palette_len];
        for &index in indices {
            if let Some(count) = counts.get_mut(index as usize) {
                *count += 1;
            }
        }
        Self { counts }
    }

    /// Pixel count for a palette index (0 when out of range).
    pub fn count(&self, index: usize) -> u64 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// Total number of counted pixels.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of palette entries tracked.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// `true` when no pixel was counted.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// The most frequent palette index and its count.
    ///
    /// Equal counts resolve to the lowest index. Returns `None` when the
    /// table is empty.
    pub fn dominant(&self) -> Option<(usize, u64)> {
        let mut best: Option<(usize, u64)> = None;
        for (index, &count) in self.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((index, count)),
            }
        }
        best
    }

    /// `(index, count)` pairs ordered by descending count, then ascending
    /// index. Unused entries are omitted.
    pub fn ranked(&self) -> Vec<(usize, u64)> {
        let mut ranked: Vec<(usize, u64)> = self
            .counts
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, count)| *count > 0)
            .collect();
        ranked.sort_by(|left, right| right.1.cmp(&left.1).then(left.0.cmp(&right.0)));
        ranked
    }
}

/// Everything computed while extracting one frame's dominant color.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The dominant color.
    pub color: Color,
    /// Palette index of the dominant color.
    pub index: usize,
    /// The frame's palette.
    pub palette: Vec<Color>,
    /// Pixel counts per palette index.
    pub frequencies: ColorFrequencyTable,
    /// The quantized (downscaled) frame, when materialization was requested.
    pub quantized_image: Option<RgbImage>,
}

/// Computes the most frequent color of a frame after palette quantization.
///
/// Generic over the [`Quantizer`]; [`MedianCut`] is used unless another one
/// is supplied with [`with_quantizer`](DominantColorExtractor::with_quantizer).
#[derive(Debug, Clone)]
pub struct DominantColorExtractor<Q: Quantizer = MedianCut> {
    palette_size: usize,
    crop_ratio: AspectRatio,
    materialize: bool,
    quantizer: Q,
}

impl DominantColorExtractor<MedianCut> {
    /// Create an extractor producing palettes of at most `palette_size`
    /// entries.
    ///
    /// Sizes above [`MAX_PALETTE_SIZE`] are clamped.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::InvalidPaletteSize`] when `palette_size`
    /// is zero.
    pub fn new(palette_size: usize) -> Result<Self, SpectrographError> {
        if palette_size == 0 {
            return Err(SpectrographError::InvalidPaletteSize(0));
        }
        if palette_size > MAX_PALETTE_SIZE {
            log::warn!(
                "Palette size {palette_size} exceeds {MAX_PALETTE_SIZE}, clamping"
            );
        }

        Ok(Self {
            palette_size: palette_size.min(MAX_PALETTE_SIZE),
            crop_ratio: AspectRatio::DISABLED,
            materialize: false,
            quantizer: MedianCut,
        })
    }
}

impl<Q: Quantizer> DominantColorExtractor<Q> {
    /// Replace the quantizer.
    pub fn with_quantizer<R: Quantizer>(self, quantizer: R) -> DominantColorExtractor<R> {
        DominantColorExtractor {
            palette_size: self.palette_size,
            crop_ratio: self.crop_ratio,
            materialize: self.materialize,
            quantizer,
        }
    }

    /// Crop top and bottom borders so the remaining content has this aspect
    /// ratio. [`AspectRatio::DISABLED`] turns cropping off.
    #[must_use]
    pub fn with_crop_ratio(mut self, ratio: AspectRatio) -> Self {
        self.crop_ratio = ratio;
        self
    }

    /// Keep the quantized frame in [`Extraction::quantized_image`].
    #[must_use]
    pub fn with_quantized_image(mut self, materialize: bool) -> Self {
        self.materialize = materialize;
        self
    }

    /// Effective palette size.
    pub fn palette_size(&self) -> usize {
        self.palette_size
    }

    /// Configured crop ratio.
    pub fn crop_ratio(&self) -> AspectRatio {
        self.crop_ratio
    }

    /// The crop rectangle this extractor applies to a frame of the given size.
    pub fn crop_rect(&self, width: u32, height: u32) -> Option<CropRect> {
        CropRect::letterbox(width, height, self.crop_ratio)
    }

    /// Apply the letterbox crop, borrowing the frame when there is nothing
    /// to crop.
    pub fn crop<'a>(&self, frame: &'a RgbImage) -> Cow<'a, RgbImage> {
        match self.crop_rect(frame.width(), frame.height()) {
            Some(rect) => Cow::Owned(rect.apply(frame)),
            None => Cow::Borrowed(frame),
        }
    }

    /// Extract the dominant color of `frame`.
    ///
    /// # Errors
    ///
    /// - [`SpectrographError::EmptyPalette`] if quantization produced no
    ///   palette (for example a zero-area crop).
    /// - [`SpectrographError::EmptyFrequencyTable`] if no quantized pixel was
    ///   counted.
    pub fn extract(&self, frame: &RgbImage) -> Result<Extraction, SpectrographError> {
        let cropped = self.crop(frame);
        self.extract_cropped(&cropped)
    }

    /// Run the pipeline on a frame that is already cropped.
    pub(crate) fn extract_cropped(
        &self,
        frame: &RgbImage,
    ) -> Result<Extraction, SpectrographError> {
        let thumbnail = downscale(frame);
        let pixels: Vec<Rgb<u8>> = thumbnail.pixels().copied().collect();
        let quantization = self.quantizer.quantize(&pixels, self.palette_size);

        if quantization.palette.is_empty() {
            return Err(SpectrographError::EmptyPalette {
                frame_number: None,
                path: None,
            });
        }

        let frequencies =
            ColorFrequencyTable::from_indices(&quantization.indices, quantization.palette.len());
        let (index, count) = frequencies
            .dominant()
            .ok_or(SpectrographError::EmptyFrequencyTable {
                frame_number: None,
                path: None,
            })?;

        log::trace!(
            "Dominant palette entry {index} covers {count}/{} pixels",
            frequencies.total()
        );

        let quantized_image = if self.materialize {
            quantization.to_image(thumbnail.width(), thumbnail.height())
        } else {
            None
        };

        Ok(Extraction {
            color: quantization.palette[index],
            index,
            palette: quantization.palette,
            frequencies,
            quantized_image,
        })
    }
}

/// Shrink `frame` to fit within [`THUMBNAIL_SIZE`] on both axes.
fn downscale(frame: &RgbImage) -> Cow<'_, RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let (target_width, target_height) = thumbnail_dimensions(width, height, THUMBNAIL_SIZE);
    if (target_width, target_height) == (width, height) {
        return Cow::Borrowed(frame);
    }
    Cow::Owned(imageops::resize(
        frame,
        target_width,
        target_height,
        FilterType::CatmullRom,
    ))
}

/// Fit `width × height` inside a `bound × bound` box, never enlarging.
///
/// The constrained side is whichever of floor/ceil keeps the aspect ratio
/// closest, with floor preferred on ties, and is at least 1.
fn thumbnail_dimensions(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= bound && height <= bound) {
        return (width, height);
    }

    let aspect = f64::from(width) / f64::from(height);
    let side = f64::from(bound);

    if aspect <= 1.0 {
        let new_width = round_aspect(side * aspect, |n| (aspect - n / side).abs());
        (new_width, bound)
    } else {
        let new_height = round_aspect(side / aspect, |n| {
            if n == 0.0 { 0.0 } else { (aspect - side / n).abs() }
        });
        (bound, new_height)
    }
}

fn round_aspect(number: f64, key: impl Fn(f64) -> f64) -> u32 {
    let (floor, ceil) = (number.floor(), number.ceil());
    let best = if key(ceil) < key(floor) { ceil } else { floor };
    (best as u32).max(1)
}
