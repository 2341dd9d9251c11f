//! Progress reporting.
//!
//! Attach a [`ProgressCallback`] to [`SamplingOptions`](crate::SamplingOptions)
//! to observe a long run. Callbacks only observe; they cannot stop the run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spectrograph::{ProgressCallback, ProgressInfo, SamplingOptions, Spectrograph};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             eprintln!("{pct:.1}% ({} frames)", info.current);
//!         }
//!     }
//! }
//!
//! let options = SamplingOptions::new()
//!     .with_step(24)
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_batch_size(10);
//! let spectrograph = Spectrograph::from_path("input.mp4", &options)?;
//! # Ok::<(), spectrograph::SpectrographError>(())
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// A snapshot of run progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Selected frames extracted so far.
    pub current: u64,
    /// Selected frames expected, if the source reports a frame count.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// Source frame number of the most recently extracted frame.
    pub current_frame: Option<u64>,
}

/// Receives progress updates during a run.
///
/// Implementations must be [`Send`] and [`Sync`]: with the `rayon` feature
/// the controller may report from worker-fed batches.
pub trait ProgressCallback: Send + Sync {
    /// Called every [`batch_size`](crate::SamplingOptions::with_batch_size)
    /// extracted frames, and once when the run finishes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. Used when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for a run and fires the callback in batches.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one extracted frame.
    pub(crate) fn advance(&mut self, frame_number: u64) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(Some(frame_number));
            self.items_since_last_report = 0;
        }
    }

    /// Emit the final report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, frame_number: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_number,
        });
    }
}
