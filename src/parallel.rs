//! Parallel dominant-color extraction.
//!
//! Decoding stays sequential: the frame source is stateful and is only ever
//! touched from the calling thread. Selected frames are gathered into
//! batches and each batch is quantized across [`rayon`] threads. Results are
//! collected in batch order, so the output is identical to
//! [`SamplingController::run`](crate::SamplingController::run).

use ::rayon::iter::{IntoParallelIterator, ParallelIterator};
use image::RgbImage;

use crate::{
    error::SpectrographError,
    extract::Extraction,
    quantize::Quantizer,
    sampling::{RunReport, SamplingController, Spectrograph},
    source::FrameSource,
};

impl<Q: Quantizer> SamplingController<Q> {
    /// Run over `source`, extracting selected frames on the rayon thread
    /// pool.
    ///
    /// Frames are decoded in batches of `batch_len` selected frames
    /// (at least 1); a batch is held in memory while it is processed.
    ///
    /// # Errors
    ///
    /// Same as [`run`](SamplingController::run). When several frames of a
    /// batch fail, which of their errors is returned is unspecified.
    pub fn run_parallel<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        batch_len: usize,
    ) -> Result<Spectrograph, SpectrographError> {
        self.confirm(source)?;

        let batch_len = batch_len.max(1);
        let step = self.options.step;
        let limit = self.options.frame_limit;
        let mut tracker = self.tracker(source);

        log::debug!(
            "Sampling in parallel (batch={batch_len}, threads={})",
            ::rayon::current_num_threads()
        );

        let mut colors = Vec::new();
        let mut report = RunReport::default();
        let mut counter = 0u64;
        let mut exhausted = false;

        while !exhausted {
            let mut batch: Vec<(u64, RgbImage)> = Vec::with_capacity(batch_len);
            while batch.len() < batch_len {
                if !limit.allows(counter) {
                    exhausted = true;
                    break;
                }
                let Some(frame) = source.next_frame()? else {
                    exhausted = true;
                    break;
                };
                if counter % step == 0 {
                    batch.push((counter, frame));
                }
                counter += 1;
            }

            if batch.is_empty() {
                continue;
            }

            let path = source.path();
            let extracted: Vec<(u64, RgbImage, Extraction)> = batch
                .into_par_iter()
                .map(|(frame_number, frame)| -> Result<_, SpectrographError> {
                    let extraction = {
                        let cropped = self.extractor.crop(&frame);
                        self.extractor
                            .extract_cropped(&cropped)
                            .map_err(|error| error.at_frame(frame_number, path))?
                    };
                    Ok((frame_number, frame, extraction))
                })
                .collect::<Result<_, SpectrographError>>()?;

            for (frame_number, _, extraction) in &extracted {
                self.inspect(*frame_number, extraction);
                colors.push(extraction.color);
                report.frames_selected += 1;
                tracker.advance(*frame_number);
            }

            if self.options.keep_last_frame {
                if let Some((_, frame, _)) = extracted.last() {
                    report.last_frame = Some(self.extractor.crop(frame).into_owned());
                }
            }
        }

        report.frames_read = counter;
        tracker.finish();
        Ok(self.assemble(colors, report, source.path()))
    }

    /// [`run_parallel`](SamplingController::run_parallel) with a batch of
    /// four frames per rayon thread.
    ///
    /// # Errors
    ///
    /// Same as [`run`](SamplingController::run).
    pub fn run_parallel_default<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Spectrograph, SpectrographError> {
        self.run_parallel(source, ::rayon::current_num_threads() * 4)
    }
}
