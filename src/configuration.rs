//! Run configuration.
//!
//! [`SamplingOptions`] is a builder that carries every knob of a run:
//! palette size, crop ratio, frame limit, step, output color format, and the
//! optional debug, confirmation, and progress hooks.
//!
//! # Example
//!
//! ```
//! use spectrograph::{AspectRatio, ColorFormat, FrameLimit, SamplingOptions};
//!
//! let options = SamplingOptions::new()
//!     .with_palette_size(16)
//!     .with_crop_ratio("2.39:1".parse::<AspectRatio>()?)
//!     .with_frame_limit(FrameLimit::Frames(1_000))
//!     .with_step(10)
//!     .with_color_format(ColorFormat::Rgb);
//! options.validate()?;
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::PathBuf,
    sync::Arc,
};

use image::RgbImage;

use crate::{
    aspect_ratio::AspectRatio,
    color::ColorFormat,
    error::SpectrographError,
    extract::DEFAULT_PALETTE_SIZE,
    progress::{NoOpProgress, ProgressCallback},
};

/// How many source frames a run may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameLimit {
    /// Run to the end of the stream. This is the default.
    #[default]
    Unbounded,
    /// Stop once this many frames have been read (selected or not).
    Frames(u64),
}

impl FrameLimit {
    /// Convert the signed convention where `-1` means unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::InvalidFrameLimit`] for values below -1.
    pub fn from_signed(value: i64) -> Result<Self, SpectrographError> {
        match value {
            -1 => Ok(FrameLimit::Unbounded),
            n if n >= 0 => Ok(FrameLimit::Frames(n as u64)),
            n => Err(SpectrographError::InvalidFrameLimit(n)),
        }
    }

    /// `true` if a frame with this zero-based counter may still be read.
    pub fn allows(self, counter: u64) -> bool {
        match self {
            FrameLimit::Unbounded => true,
            FrameLimit::Frames(limit) => counter < limit,
        }
    }

    /// Apply the limit to a known frame count.
    pub fn cap(self, frame_count: u64) -> u64 {
        match self {
            FrameLimit::Unbounded => frame_count,
            FrameLimit::Frames(limit) => frame_count.min(limit),
        }
    }
}

/// What a run is about to do, handed to a [`RunConfirmation`].
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    /// Source path, if the source came from a file.
    pub path: Option<PathBuf>,
    /// Frames the source expects to produce, if known.
    pub frame_count_hint: Option<u64>,
    /// Frames that will be selected, if the source frame count is known.
    pub selected_frames_hint: Option<u64>,
}

/// Approves or refuses a run before any frame is decoded.
///
/// Consulted only when a [`FrameInspector`] is attached and the frame limit
/// is [`FrameLimit::Unbounded`], since that combination hands every frame of
/// the whole source to the inspector.
pub trait RunConfirmation: Send + Sync {
    /// Return `false` to abort with [`SpectrographError::RunDeclined`].
    fn confirm(&self, request: &ConfirmationRequest) -> bool;
}

impl<F> RunConfirmation for F
where
    F: Fn(&ConfirmationRequest) -> bool + Send + Sync,
{
    fn confirm(&self, request: &ConfirmationRequest) -> bool {
        self(request)
    }
}

/// Receives the quantized image of every selected frame.
///
/// Debug aid only; it never changes the extracted colors.
pub trait FrameInspector: Send + Sync {
    /// Called once per selected frame, in frame order.
    fn inspect(&self, frame_number: u64, quantized: &RgbImage);
}

/// Configuration for a [`SamplingController`](crate::SamplingController) run.
///
/// Defaults: palette size 32, no cropping, unbounded frame limit, step 1,
/// hex output, no debug hooks, no progress callback.
#[derive(Clone)]
pub struct SamplingOptions {
    pub(crate) palette_size: usize,
    pub(crate) crop_ratio: AspectRatio,
    pub(crate) frame_limit: FrameLimit,
    pub(crate) step: u64,
    pub(crate) color_format: ColorFormat,
    pub(crate) keep_last_frame: bool,
    pub(crate) inspector: Option<Arc<dyn FrameInspector>>,
    pub(crate) confirmation: Option<Arc<dyn RunConfirmation>>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
}

impl Debug for SamplingOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplingOptions")
            .field("palette_size", &self.palette_size)
            .field("crop_ratio", &self.crop_ratio)
            .field("frame_limit", &self.frame_limit)
            .field("step", &self.step)
            .field("color_format", &self.color_format)
            .field("keep_last_frame", &self.keep_last_frame)
            .field("has_inspector", &self.inspector.is_some())
            .field("has_confirmation", &self.confirmation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            palette_size: DEFAULT_PALETTE_SIZE,
            crop_ratio: AspectRatio::DISABLED,
            frame_limit: FrameLimit::Unbounded,
            step: 1,
            color_format: ColorFormat::Hex,
            keep_last_frame: false,
            inspector: None,
            confirmation: None,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Number of palette entries each frame is quantized to.
    #[must_use]
    pub fn with_palette_size(mut self, palette_size: usize) -> Self {
        self.palette_size = palette_size;
        self
    }

    /// Letterbox crop ratio; [`AspectRatio::DISABLED`] turns cropping off.
    #[must_use]
    pub fn with_crop_ratio(mut self, ratio: AspectRatio) -> Self {
        self.crop_ratio = ratio;
        self
    }

    /// Maximum number of source frames to read.
    #[must_use]
    pub fn with_frame_limit(mut self, limit: FrameLimit) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Extract every `step`-th frame, starting with frame 0.
    #[must_use]
    pub fn with_step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }

    /// Text rendering of the resulting colors.
    #[must_use]
    pub fn with_color_format(mut self, format: ColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Keep the last selected frame (cropped, not yet quantized) for
    /// inspection after the run.
    #[must_use]
    pub fn with_keep_last_frame(mut self, keep: bool) -> Self {
        self.keep_last_frame = keep;
        self
    }

    /// Hand every selected frame's quantized image to `inspector`.
    #[must_use]
    pub fn with_frame_inspector(mut self, inspector: Arc<dyn FrameInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Ask `confirmation` before an unbounded run with frame inspection.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: Arc<dyn RunConfirmation>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Report progress every `size` extracted frames. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Configured palette size.
    pub fn palette_size(&self) -> usize {
        self.palette_size
    }

    /// Configured crop ratio.
    pub fn crop_ratio(&self) -> AspectRatio {
        self.crop_ratio
    }

    /// Configured frame limit.
    pub fn frame_limit(&self) -> FrameLimit {
        self.frame_limit
    }

    /// Configured step.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Configured output color format.
    pub fn color_format(&self) -> ColorFormat {
        self.color_format
    }

    /// Check the options without touching any source.
    ///
    /// # Errors
    ///
    /// - [`SpectrographError::InvalidPaletteSize`] if the palette size is 0.
    /// - [`SpectrographError::InvalidStep`] if the step is 0.
    pub fn validate(&self) -> Result<(), SpectrographError> {
        if self.palette_size == 0 {
            return Err(SpectrographError::InvalidPaletteSize(0));
        }
        if self.step == 0 {
            return Err(SpectrographError::InvalidStep(0));
        }
        Ok(())
    }

    /// Number of frames a source of `frame_count` frames would yield.
    pub fn selected_frames(&self, frame_count: u64) -> u64 {
        self.frame_limit.cap(frame_count).div_ceil(self.step.max(1))
    }

    pub(crate) fn needs_confirmation(&self) -> bool {
        self.inspector.is_some() && self.frame_limit == FrameLimit::Unbounded
    }
}
