//! FFmpeg-backed video frame source.
//!
//! [`VideoSource`] demuxes a container, decodes its best video stream
//! sequentially, and converts every decoded frame to RGB24 at the source
//! resolution. It never seeks: frames come out in decode order, exactly once.
//! The demuxer and decoder are released when the source is dropped.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{error::SpectrographError, source::FrameSource};

/// Properties of the decoded video stream, read when the source is opened.
#[derive(Debug, Clone)]
#[must_use]
pub struct SourceMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Number of frames, from the stream header when present, otherwise
    /// estimated from duration and frame rate. Zero when unknown.
    pub frame_count: u64,
    /// Container duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

/// Sequential decoder over the best video stream of a media file.
///
/// # Example
///
/// ```no_run
/// use spectrograph::{FrameSource, VideoSource};
///
/// let mut source = VideoSource::open("input.mp4")?;
/// println!("{} frames expected", source.metadata().frame_count);
/// while let Some(frame) = source.next_frame()? {
///     println!("{}x{}", frame.width(), frame.height());
/// }
/// # Ok::<(), spectrograph::SpectrographError>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    decoder: VideoDecoder,
    /// Scaler to RGB24 and the input geometry it was built for.
    scaler: Option<(ScalingContext, (Pixel, u32, u32))>,
    video_stream_index: usize,
    metadata: SourceMetadata,
    path: PathBuf,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    frames_decoded: u64,
    eof_sent: bool,
    done: bool,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("frames_decoded", &self.frames_decoded)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a media file and prepare a decoder for its best video stream.
    ///
    /// Initializes FFmpeg on first use.
    ///
    /// # Errors
    ///
    /// - [`SpectrographError::SourceUnavailable`] if the file cannot be
    ///   opened or its codec is unsupported.
    /// - [`SpectrographError::NoVideoStream`] if the container has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SpectrographError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video source: {}", path.display());

        let unavailable = |reason: String| SpectrographError::SourceUnavailable {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| unavailable(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| unavailable(error.to_string()))?;

        let (video_stream_index, decoder, metadata) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or_else(|| SpectrographError::NoVideoStream { path: path.clone() })?;
            let index = stream.index();

            let decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| {
                    unavailable(format!(
                        "Failed to read codec parameters for stream {index}: {error}"
                    ))
                })?;
            let decoder = decoder_context.decoder().video().map_err(|error| {
                unavailable(format!(
                    "Failed to create video decoder for stream {index}: {error}"
                ))
            })?;

            let frame_rate = stream.avg_frame_rate();
            let frames_per_second = if frame_rate.denominator() != 0 {
                f64::from(frame_rate.numerator()) / f64::from(frame_rate.denominator())
            } else {
                let rate = stream.rate();
                if rate.denominator() != 0 {
                    f64::from(rate.numerator()) / f64::from(rate.denominator())
                } else {
                    0.0
                }
            };

            let duration_microseconds = input_context.duration();
            let duration = if duration_microseconds > 0 {
                Duration::from_micros(duration_microseconds as u64)
            } else {
                Duration::ZERO
            };

            let frame_count = if stream.frames() > 0 {
                stream.frames() as u64
            } else if frames_per_second > 0.0 {
                (duration.as_secs_f64() * frames_per_second) as u64
            } else {
                0
            };

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let metadata = SourceMetadata {
                width: decoder.width(),
                height: decoder.height(),
                frames_per_second,
                frame_count,
                duration,
                codec,
                format: input_context.format().name().to_string(),
            };

            (index, decoder, metadata)
        };

        log::debug!(
            "Video stream {video_stream_index}: {}x{} {} @ {:.3} fps, ~{} frames",
            metadata.width,
            metadata.height,
            metadata.codec,
            metadata.frames_per_second,
            metadata.frame_count
        );

        Ok(Self {
            input_context,
            decoder,
            scaler: None,
            video_stream_index,
            metadata,
            path,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            frames_decoded: 0,
            eof_sent: false,
            done: false,
        })
    }

    /// Stream properties read at open time.
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Number of frames handed out so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn decode_error(&mut self, reason: impl ToString) -> SpectrographError {
        self.done = true;
        SpectrographError::VideoDecodeError {
            path: self.path.clone(),
            frame_number: self.frames_decoded,
            reason: reason.to_string(),
        }
    }

    /// Convert the current `decoded_frame` to an RGB image.
    ///
    /// Every failure ends the source with a
    /// [`SpectrographError::VideoDecodeError`] for the frame being converted.
    fn convert_current_frame(&mut self) -> Result<RgbImage, SpectrographError> {
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();
        let geometry = (self.decoded_frame.format(), width, height);

        let up_to_date = matches!(&self.scaler, Some((_, current)) if *current == geometry);
        if !up_to_date {
            log::debug!(
                "Building RGB24 scaler for {:?} {width}x{height}",
                geometry.0
            );
            let scaler = match ScalingContext::get(
                geometry.0,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            ) {
                Ok(scaler) => scaler,
                Err(error) => {
                    return Err(self.decode_error(format!(
                        "Failed to build RGB24 scaler for {:?} {width}x{height}: {error}",
                        geometry.0
                    )));
                }
            };
            self.scaler = Some((scaler, geometry));
        }

        let scaled = match self.scaler.as_mut() {
            Some((scaler, _)) => scaler.run(&self.decoded_frame, &mut self.rgb_frame),
            None => Ok(()),
        };
        if let Err(error) = scaled {
            return Err(self.decode_error(format!("RGB24 conversion failed: {error}")));
        }

        match crate::conversion::rgb24_frame_to_image(&self.rgb_frame, width, height) {
            Some(image) => Ok(image),
            None => Err(self.decode_error("Failed to construct RGB image from decoded frame data")),
        }
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SpectrographError> {
        if self.done {
            return Ok(None);
        }

        loop {
            // Drain frames the decoder already produced before feeding more.
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let image = self.convert_current_frame()?;
                self.frames_decoded += 1;
                return Ok(Some(image));
            }

            if self.eof_sent {
                log::debug!(
                    "End of stream after {} frames: {}",
                    self.frames_decoded,
                    self.path.display()
                );
                self.done = true;
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            return Err(self.decode_error(error));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return Err(self.decode_error(error));
                    }
                    self.eof_sent = true;
                }
                Err(error) => return Err(self.decode_error(error)),
            }
        }
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (self.metadata.frame_count > 0).then_some(self.metadata.frame_count)
    }
}
