//! # spectrograph
//!
//! Extract the dominant color of every sampled frame of a video or image.
//!
//! Each selected frame is optionally cropped to remove letterbox bars,
//! shrunk to fit a 100×100 box, reduced to a small adaptive palette, and
//! summarized by its most frequent palette color. The per-frame colors, in
//! frame order, form a *spectrograph*: a color fingerprint of the video that
//! downstream tools render as a strip of bars.
//!
//! Video decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; still images
//! are decoded with [`image`].
//!
//! ## Quick Start
//!
//! ### Colors of a video
//!
//! ```no_run
//! use spectrograph::{AspectRatio, SamplingOptions, Spectrograph};
//!
//! let options = SamplingOptions::new()
//!     .with_crop_ratio("2.39:1".parse::<AspectRatio>()?)
//!     .with_step(24);
//! let spectrograph = Spectrograph::from_path("movie.mp4", &options)?;
//! for line in spectrograph.formatted() {
//!     println!("{line}");
//! }
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```
//!
//! ### Dominant color of one frame
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use spectrograph::DominantColorExtractor;
//!
//! let frame = RgbImage::from_pixel(320, 240, Rgb([0x33, 0x66, 0x99]));
//! let color = DominantColorExtractor::new(8)?.extract(&frame)?.color;
//! assert_eq!(color.to_hex(), "#336699");
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```
//!
//! ### Streaming
//!
//! ```no_run
//! use spectrograph::{SamplingController, SamplingOptions, VideoSource};
//!
//! let controller = SamplingController::new(SamplingOptions::new())?;
//! let mut source = VideoSource::open("movie.mp4")?;
//! controller.run_with(&mut source, |frame_number, color| {
//!     println!("{frame_number}: {color}");
//!     Ok(())
//! })?;
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `SamplingController::run_parallel` quantizes batches of frames across rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod aspect_ratio;
pub mod color;
pub mod configuration;
mod conversion;
pub mod crop;
pub mod error;
pub mod extract;
pub mod ffmpeg;
#[cfg(feature = "rayon")]
mod parallel;
pub mod progress;
pub mod quantize;
pub mod sampling;
pub mod source;
pub mod video;

pub use aspect_ratio::AspectRatio;
pub use color::{Color, ColorFormat};
pub use configuration::{
    ConfirmationRequest, FrameInspector, FrameLimit, RunConfirmation, SamplingOptions,
};
pub use crop::CropRect;
pub use error::SpectrographError;
pub use extract::{
    ColorFrequencyTable, DEFAULT_PALETTE_SIZE, DominantColorExtractor, Extraction, THUMBNAIL_SIZE,
};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use progress::{ProgressCallback, ProgressInfo};
pub use quantize::{MAX_PALETTE_SIZE, MedianCut, Quantization, Quantizer};
pub use sampling::{RunReport, SamplingController, Spectrograph};
pub use source::{FrameIterator, FrameSource, InMemorySource, StillImageSource, open_source};
pub use video::{SourceMetadata, VideoSource};
