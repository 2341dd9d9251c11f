//! Frame sources.
//!
//! A [`FrameSource`] hands out decoded RGB frames one at a time, in source
//! order. Sources are sequential: there is no seeking, and the end of the
//! stream is terminal. Once [`next_frame`](FrameSource::next_frame) has
//! returned `Ok(None)`, every later call returns `Ok(None)` as well.
//!
//! [`open_source`] picks the right implementation for a path: still images
//! are decoded with the `image` crate, everything else goes through FFmpeg
//! ([`VideoSource`](crate::VideoSource)).
//!
//! # Example
//!
//! ```no_run
//! use spectrograph::{FrameSource, open_source};
//!
//! let mut source = open_source("input.mp4")?;
//! for result in FrameSource::frames(&mut source) {
//!     let (frame_number, frame) = result?;
//!     println!("frame {frame_number}: {}x{}", frame.width(), frame.height());
//! }
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use image::{ImageFormat, ImageReader, RgbImage};

use crate::{error::SpectrographError, video::VideoSource};

/// A sequential producer of RGB frames.
pub trait FrameSource {
    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` at the end of the stream, and keeps returning
    /// `Ok(None)` afterwards.
    ///
    /// # Errors
    ///
    /// Decoder failures are reported as
    /// [`SpectrographError::VideoDecodeError`] or
    /// [`SpectrographError::SourceUnavailable`].
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SpectrographError>;

    /// Path of the underlying file, if the source was opened from one.
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Estimated number of frames, if the container reports one.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }

    /// Adapt the source into an iterator of `(frame_number, frame)` pairs.
    ///
    /// The iterator stops after the end of the stream or the first error.
    fn frames(&mut self) -> FrameIterator<'_, Self>
    where
        Self: Sized,
    {
        FrameIterator::new(self)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SpectrographError> {
        (**self).next_frame()
    }

    fn path(&self) -> Option<&Path> {
        (**self).path()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}

/// Lazy iterator over the frames of a [`FrameSource`].
///
/// Created via [`FrameSource::frames`].
pub struct FrameIterator<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    frame_number: u64,
    done: bool,
}

impl<'a, S: FrameSource + ?Sized> FrameIterator<'a, S> {
    pub(crate) fn new(source: &'a mut S) -> Self {
        Self {
            source,
            frame_number: 0,
            done: false,
        }
    }
}

impl<S: FrameSource + ?Sized> Iterator for FrameIterator<'_, S> {
    type Item = Result<(u64, RgbImage), SpectrographError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.source.next_frame() {
            Ok(Some(frame)) => {
                let frame_number = self.frame_number;
                self.frame_number += 1;
                Some(Ok((frame_number, frame)))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

impl<S: FrameSource + ?Sized> std::iter::FusedIterator for FrameIterator<'_, S> {}

/// A single still image, yielded once.
#[derive(Debug)]
pub struct StillImageSource {
    path: PathBuf,
    frame: Option<RgbImage>,
}

impl StillImageSource {
    /// Decode the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::SourceUnavailable`] if the file cannot be
    /// read or decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SpectrographError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening still image: {}", path.display());

        let unavailable = |reason: String| SpectrographError::SourceUnavailable {
            path: path.clone(),
            reason,
        };

        let image = ImageReader::open(&path)
            .map_err(|error| unavailable(error.to_string()))?
            .with_guessed_format()
            .map_err(|error| unavailable(error.to_string()))?
            .decode()
            .map_err(|error| unavailable(error.to_string()))?;

        Ok(Self {
            frame: Some(image.to_rgb8()),
            path,
        })
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SpectrographError> {
        Ok(self.frame.take())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(1)
    }
}

/// Frames already held in memory.
///
/// # Example
///
/// ```
/// use image::{Rgb, RgbImage};
/// use spectrograph::{FrameSource, InMemorySource};
///
/// let mut source = InMemorySource::new(vec![RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]))]);
/// assert!(source.next_frame()?.is_some());
/// assert!(source.next_frame()?.is_none());
/// # Ok::<(), spectrograph::SpectrographError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    frames: VecDeque<RgbImage>,
    total: u64,
}

impl InMemorySource {
    /// Wrap a sequence of frames.
    pub fn new<I: IntoIterator<Item = RgbImage>>(frames: I) -> Self {
        let frames: VecDeque<RgbImage> = frames.into_iter().collect();
        Self {
            total: frames.len() as u64,
            frames,
        }
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FromIterator<RgbImage> for InMemorySource {
    fn from_iter<I: IntoIterator<Item = RgbImage>>(frames: I) -> Self {
        Self::new(frames)
    }
}

impl FrameSource for InMemorySource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SpectrographError> {
        Ok(self.frames.pop_front())
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

/// Open `path` with the appropriate source.
///
/// Files whose extension names a still-image format are decoded with the
/// `image` crate. GIFs and everything else are opened with FFmpeg.
///
/// # Errors
///
/// Returns [`SpectrographError::SourceUnavailable`] if the file cannot be
/// opened or decoded, or [`SpectrographError::NoVideoStream`] if a container
/// has no video.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn FrameSource>, SpectrographError> {
    let path = path.as_ref();
    if is_still_image(path) {
        Ok(Box::new(StillImageSource::open(path)?))
    } else {
        Ok(Box::new(VideoSource::open(path)?))
    }
}

fn is_still_image(path: &Path) -> bool {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Gif) | Err(_) => false,
        Ok(format) => format.reading_enabled(),
    }
}
