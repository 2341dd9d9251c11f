//! Frame sampling and the resulting color sequence.
//!
//! [`SamplingController`] walks a [`FrameSource`], selects every `step`-th
//! frame up to the frame limit, and extracts each selected frame's dominant
//! color. [`Spectrograph`] is the ordered result: one [`Color`] per selected
//! frame, in frame order.
//!
//! # Example
//!
//! ```no_run
//! use spectrograph::{SamplingOptions, Spectrograph};
//!
//! let options = SamplingOptions::new().with_step(24);
//! let spectrograph = Spectrograph::from_path("input.mp4", &options)?;
//! for line in spectrograph.formatted() {
//!     println!("{line}");
//! }
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use image::RgbImage;

use crate::{
    color::{Color, ColorFormat},
    configuration::{ConfirmationRequest, SamplingOptions},
    error::SpectrographError,
    extract::{DominantColorExtractor, Extraction},
    progress::ProgressTracker,
    quantize::{MedianCut, Quantizer},
    source::{FrameSource, open_source},
};

/// Summary of a streaming run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Source frames read, selected or not.
    pub frames_read: u64,
    /// Frames whose color was extracted.
    pub frames_selected: u64,
    /// Last selected frame after cropping, when requested with
    /// [`SamplingOptions::with_keep_last_frame`].
    pub last_frame: Option<RgbImage>,
}

/// The ordered dominant colors of a source's selected frames.
#[derive(Debug, Clone, Default)]
pub struct Spectrograph {
    colors: Vec<Color>,
    format: ColorFormat,
    source_path: Option<PathBuf>,
    frames_read: u64,
    last_frame: Option<RgbImage>,
}

impl Spectrograph {
    /// Open `path`, run the sampler over it, and close it.
    ///
    /// # Errors
    ///
    /// Configuration errors are reported before the file is opened. See
    /// [`open_source`] and [`SamplingController::run`] for the rest.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        options: &SamplingOptions,
    ) -> Result<Self, SpectrographError> {
        let controller = SamplingController::new(options.clone())?;
        let mut source = open_source(path)?;
        controller.run(&mut source)
    }

    /// The colors, one per selected frame.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Consume the spectrograph, keeping only the colors.
    pub fn into_colors(self) -> Vec<Color> {
        self.colors
    }

    /// Number of colors.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// `true` if no frame was selected.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Iterate over the colors in frame order.
    pub fn iter(&self) -> std::slice::Iter<'_, Color> {
        self.colors.iter()
    }

    /// Output format chosen for this run.
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// Colors rendered in the run's [`ColorFormat`].
    pub fn formatted(&self) -> Vec<String> {
        self.colors
            .iter()
            .map(|color| color.format(self.format))
            .collect()
    }

    /// Path of the analyzed source, if it was a file.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Source frames read during the run.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Last selected frame after cropping, if it was kept.
    pub fn last_frame(&self) -> Option<&RgbImage> {
        self.last_frame.as_ref()
    }

    /// Write one formatted color per line, preceded by `%`-prefixed comment
    /// lines when `header` is given.
    pub fn write_lines<W: Write>(&self, writer: &mut W, header: Option<&str>) -> io::Result<()> {
        if let Some(header) = header {
            for line in header.lines() {
                writeln!(writer, "% {line}")?;
            }
        }
        for color in &self.colors {
            writeln!(writer, "{}", color.format(self.format))?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Spectrograph {
    type Item = &'a Color;
    type IntoIter = std::slice::Iter<'a, Color>;

    fn into_iter(self) -> Self::IntoIter {
        self.colors.iter()
    }
}

/// Drives a [`FrameSource`] through a [`DominantColorExtractor`].
///
/// The controller holds no per-run state, so one controller can process any
/// number of sources, one after the other.
#[derive(Debug, Clone)]
pub struct SamplingController<Q: Quantizer = MedianCut> {
    pub(crate) options: SamplingOptions,
    pub(crate) extractor: DominantColorExtractor<Q>,
}

impl SamplingController<MedianCut> {
    /// Validate `options` and build a controller.
    ///
    /// # Errors
    ///
    /// Returns [`SpectrographError::InvalidPaletteSize`] or
    /// [`SpectrographError::InvalidStep`] for invalid options.
    pub fn new(options: SamplingOptions) -> Result<Self, SpectrographError> {
        options.validate()?;
        let extractor = DominantColorExtractor::new(options.palette_size)?
            .with_crop_ratio(options.crop_ratio)
            .with_quantized_image(options.inspector.is_some());
        Ok(Self { options, extractor })
    }
}

impl<Q: Quantizer> SamplingController<Q> {
    /// Use a different quantizer for every frame.
    pub fn with_quantizer<R: Quantizer>(self, quantizer: R) -> SamplingController<R> {
        SamplingController {
            options: self.options,
            extractor: self.extractor.with_quantizer(quantizer),
        }
    }

    /// The options this controller was built with.
    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    /// Run over `source` and collect the colors.
    ///
    /// # Errors
    ///
    /// Any source or extraction error aborts the run; see
    /// [`run_with`](SamplingController::run_with).
    pub fn run<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Spectrograph, SpectrographError> {
        let mut colors = Vec::new();
        let report = self.run_with(source, |_, color| {
            colors.push(color);
            Ok(())
        })?;
        Ok(self.assemble(colors, report, source.path()))
    }

    /// Run over `source`, handing each color to `on_color` as soon as it is
    /// extracted.
    ///
    /// `on_color` receives the source frame number and the color. Returning
    /// an error from it stops the run and propagates that error.
    ///
    /// # Errors
    ///
    /// - [`SpectrographError::RunDeclined`] if the confirmation callback
    ///   refused the run.
    /// - Source errors ([`SpectrographError::VideoDecodeError`], ...).
    /// - [`SpectrographError::EmptyPalette`] /
    ///   [`SpectrographError::EmptyFrequencyTable`] with the frame number.
    pub fn run_with<S, F>(
        &self,
        source: &mut S,
        mut on_color: F,
    ) -> Result<RunReport, SpectrographError>
    where
        S: FrameSource + ?Sized,
        F: FnMut(u64, Color) -> Result<(), SpectrographError>,
    {
        self.confirm(source)?;

        let step = self.options.step;
        let limit = self.options.frame_limit;
        let mut tracker = self.tracker(source);

        log::debug!(
            "Sampling {} (step={step}, limit={limit:?}, palette={}, crop={})",
            describe(source.path()),
            self.extractor.palette_size(),
            self.extractor.crop_ratio()
        );

        let mut report = RunReport::default();
        let mut counter = 0u64;

        while limit.allows(counter) {
            let Some(frame) = source.next_frame()? else {
                break;
            };

            if counter % step == 0 {
                let cropped = self.extractor.crop(&frame);
                let extraction = self
                    .extractor
                    .extract_cropped(&cropped)
                    .map_err(|error| error.at_frame(counter, source.path()))?;

                self.inspect(counter, &extraction);
                log::trace!("Frame {counter}: {}", extraction.color);
                on_color(counter, extraction.color)?;

                if self.options.keep_last_frame {
                    report.last_frame = Some(cropped.into_owned());
                }
                report.frames_selected += 1;
                tracker.advance(counter);
            }

            counter += 1;
        }

        report.frames_read = counter;
        tracker.finish();

        log::debug!(
            "Sampled {} of {} frames from {}",
            report.frames_selected,
            report.frames_read,
            describe(source.path())
        );

        Ok(report)
    }

    /// Ask the confirmation callback, if the run needs one.
    pub(crate) fn confirm<S: FrameSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<(), SpectrographError> {
        if !self.options.needs_confirmation() {
            return Ok(());
        }
        let Some(confirmation) = &self.options.confirmation else {
            return Ok(());
        };

        let frame_count_hint = source.frame_count_hint();
        let request = ConfirmationRequest {
            path: source.path().map(Path::to_path_buf),
            frame_count_hint,
            selected_frames_hint: frame_count_hint.map(|count| self.options.selected_frames(count)),
        };

        if confirmation.confirm(&request) {
            Ok(())
        } else {
            log::info!("Run over {} declined", describe(source.path()));
            Err(SpectrographError::RunDeclined)
        }
    }

    pub(crate) fn tracker<S: FrameSource + ?Sized>(&self, source: &S) -> ProgressTracker {
        let total = source
            .frame_count_hint()
            .map(|count| self.options.selected_frames(count));
        ProgressTracker::new(self.options.progress.clone(), total, self.options.batch_size)
    }

    pub(crate) fn inspect(&self, frame_number: u64, extraction: &Extraction) {
        if let Some(inspector) = &self.options.inspector {
            if let Some(quantized) = &extraction.quantized_image {
                inspector.inspect(frame_number, quantized);
            }
        }
    }

    pub(crate) fn assemble(
        &self,
        colors: Vec<Color>,
        report: RunReport,
        path: Option<&Path>,
    ) -> Spectrograph {
        Spectrograph {
            colors,
            format: self.options.color_format,
            source_path: path.map(Path::to_path_buf),
            frames_read: report.frames_read,
            last_frame: report.last_frame,
        }
    }
}

fn describe(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_else(|| "in-memory source".to_string())
}
