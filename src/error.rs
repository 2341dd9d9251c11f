//! Error types for the `spectrograph` crate.
//!
//! This module defines [`SpectrographError`], the unified error type returned
//! by every fallible operation in the crate. Errors carry the context needed
//! to diagnose a failed run: the source path, the frame number, and the
//! upstream message.

use std::{
    io::Error as IoError,
    path::{Path, PathBuf},
};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `spectrograph` operations.
///
/// Configuration errors ([`InvalidAspectRatio`](SpectrographError::InvalidAspectRatio),
/// [`InvalidPaletteSize`](SpectrographError::InvalidPaletteSize), ...) are
/// raised before any decoding starts. Everything else aborts the run in
/// progress; there is no partial result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpectrographError {
    /// The input could not be opened or decoded.
    #[error("Failed to open source at {path}: {reason}")]
    SourceUnavailable {
        /// Path that was passed to the frame source.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The input container holds no video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path of the opened container.
        path: PathBuf,
    },

    /// The decoder failed after the source was opened.
    #[error("Failed to decode frame {frame_number} of {path}: {reason}")]
    VideoDecodeError {
        /// Path of the source being decoded.
        path: PathBuf,
        /// Number of frames successfully decoded before the failure.
        frame_number: u64,
        /// Upstream decoder message.
        reason: String,
    },

    /// An aspect ratio string was not of the form `W:H`.
    #[error("Invalid aspect ratio {0:?}: expected W:H, e.g. 4:3")]
    InvalidAspectRatio(String),

    /// A palette size of zero or less was requested.
    #[error("Palette size must be at least 1 (got {0})")]
    InvalidPaletteSize(i64),

    /// A sampling step below one was requested.
    #[error("Step must be at least 1 (got {0})")]
    InvalidStep(i64),

    /// A frame limit below -1 was requested.
    #[error("Frame limit must be -1 (unbounded) or non-negative (got {0})")]
    InvalidFrameLimit(i64),

    /// An unknown color format name was given.
    #[error("Unsupported color format {0:?}: expected hex or rgb")]
    InvalidColorFormat(String),

    /// A color string was not of the form `#rrggbb`.
    #[error("Invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),

    /// Quantization produced no palette entries.
    #[error("Quantization produced an empty palette{}", context_suffix(.frame_number, .path))]
    EmptyPalette {
        /// Frame being extracted, when known.
        frame_number: Option<u64>,
        /// Source the frame came from, when known.
        path: Option<PathBuf>,
    },

    /// The quantized image contained no pixels to count.
    #[error("Color frequency table is empty{}", context_suffix(.frame_number, .path))]
    EmptyFrequencyTable {
        /// Frame being extracted, when known.
        frame_number: Option<u64>,
        /// Source the frame came from, when known.
        path: Option<PathBuf>,
    },

    /// The run was refused by the configured [`RunConfirmation`](crate::RunConfirmation).
    #[error("Run declined by confirmation callback")]
    RunDeclined,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl SpectrographError {
    /// Attach the frame number and source path to a per-frame extraction
    /// error.
    ///
    /// Only [`EmptyPalette`](SpectrographError::EmptyPalette) and
    /// [`EmptyFrequencyTable`](SpectrographError::EmptyFrequencyTable) are
    /// affected; fields that are already set are kept.
    #[must_use]
    pub fn at_frame(self, frame: u64, source: Option<&Path>) -> Self {
        match self {
            SpectrographError::EmptyPalette { frame_number, path } => {
                SpectrographError::EmptyPalette {
                    frame_number: frame_number.or(Some(frame)),
                    path: path.or_else(|| source.map(Path::to_path_buf)),
                }
            }
            SpectrographError::EmptyFrequencyTable { frame_number, path } => {
                SpectrographError::EmptyFrequencyTable {
                    frame_number: frame_number.or(Some(frame)),
                    path: path.or_else(|| source.map(Path::to_path_buf)),
                }
            }
            other => other,
        }
    }
}

impl From<FfmpegError> for SpectrographError {
    fn from(error: FfmpegError) -> Self {
        SpectrographError::FfmpegError(error.to_string())
    }
}

fn context_suffix(frame_number: &Option<u64>, path: &Option<PathBuf>) -> String {
    match (frame_number, path) {
        (Some(number), Some(path)) => format!(" (frame {number} of {})", path.display()),
        (Some(number), None) => format!(" (frame {number})"),
        (None, Some(path)) => format!(" ({})", path.display()),
        (None, None) => String::new(),
    }
}
