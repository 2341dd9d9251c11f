//! Sampling controller integration tests.
//!
//! These run entirely on in-memory frames.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use image::{Rgb, RgbImage};
use spectrograph::{
    Color, ColorFormat, ConfirmationRequest, FrameInspector, FrameLimit, FrameSource,
    InMemorySource, MedianCut, Quantization, Quantizer, SamplingController, SamplingOptions,
    SpectrographError,
};

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

fn solid(color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(8, 8, color)
}

fn source_of(colors: &[Rgb<u8>]) -> InMemorySource {
    colors.iter().map(|color| solid(*color)).collect()
}

fn controller(options: SamplingOptions) -> SamplingController {
    SamplingController::new(options).expect("valid options")
}

// ── Frame selection ────────────────────────────────────────────────

#[test]
fn step_selects_every_nth_frame() {
    let mut source = source_of(&[RED, BLUE, RED, BLUE]);
    let options = SamplingOptions::new().with_step(2).with_palette_size(4);
    let spectrograph = controller(options).run(&mut source).expect("run");

    assert_eq!(spectrograph.formatted(), vec!["#ff0000", "#ff0000"]);
    assert_eq!(spectrograph.frames_read(), 4);
}

#[test]
fn colors_follow_frame_order() {
    let mut source = source_of(&[RED, GREEN, BLUE, WHITE]);
    let spectrograph = controller(SamplingOptions::new()).run(&mut source).unwrap();

    assert_eq!(
        spectrograph.colors(),
        &[
            Color::new(255, 0, 0),
            Color::new(0, 255, 0),
            Color::new(0, 0, 255),
            Color::new(255, 255, 255),
        ]
    );
}

#[test]
fn result_length_matches_selection_formula() {
    for frame_count in 0..7u64 {
        for step in 1..4u64 {
            for limit in [-1i64, 0, 1, 3, 10] {
                let frame_limit = FrameLimit::from_signed(limit).unwrap();
                let options = SamplingOptions::new()
                    .with_step(step)
                    .with_frame_limit(frame_limit);
                let mut source: InMemorySource =
                    (0..frame_count).map(|_| RgbImage::from_pixel(2, 2, RED)).collect();

                let spectrograph = controller(options.clone()).run(&mut source).unwrap();

                let read = if limit < 0 {
                    frame_count
                } else {
                    frame_count.min(limit as u64)
                };
                let expected = read.div_ceil(step);
                assert_eq!(
                    spectrograph.len() as u64,
                    expected,
                    "frames={frame_count} step={step} limit={limit}"
                );
                assert_eq!(options.selected_frames(frame_count), expected);
                assert_eq!(spectrograph.frames_read(), read);
            }
        }
    }
}

#[test]
fn zero_frame_limit_reads_nothing() {
    let mut source = source_of(&[RED, BLUE, GREEN]);
    let spectrograph = controller(SamplingOptions::new().with_frame_limit(FrameLimit::Frames(0)))
        .run(&mut source)
        .unwrap();

    assert!(spectrograph.is_empty());
    assert_eq!(spectrograph.frames_read(), 0);
    assert_eq!(source.remaining(), 3);
}

#[test]
fn frame_limit_stops_before_reading_more() {
    let mut source = source_of(&[RED, BLUE, GREEN, WHITE]);
    let spectrograph = controller(SamplingOptions::new().with_frame_limit(FrameLimit::Frames(2)))
        .run(&mut source)
        .unwrap();

    assert_eq!(spectrograph.formatted(), vec!["#ff0000", "#0000ff"]);
    assert_eq!(source.remaining(), 2);
}

#[test]
fn empty_source_yields_empty_result() {
    let mut source = InMemorySource::new(Vec::new());
    let spectrograph = controller(SamplingOptions::new()).run(&mut source).unwrap();
    assert!(spectrograph.is_empty());
    assert_eq!(spectrograph.iter().count(), 0);
}

#[test]
fn controller_is_reusable_across_sources() {
    let controller = controller(SamplingOptions::new());
    let first = controller.run(&mut source_of(&[RED])).unwrap();
    let second = controller.run(&mut source_of(&[BLUE, GREEN])).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(second.formatted(), vec!["#0000ff", "#00ff00"]);
}

// ── Validation ─────────────────────────────────────────────────────

#[test]
fn zero_step_is_rejected() {
    match SamplingController::new(SamplingOptions::new().with_step(0)) {
        Err(SpectrographError::InvalidStep(0)) => {}
        other => panic!("Expected InvalidStep, got: {other:?}"),
    }
}

#[test]
fn zero_palette_size_is_rejected() {
    match SamplingController::new(SamplingOptions::new().with_palette_size(0)) {
        Err(SpectrographError::InvalidPaletteSize(0)) => {}
        other => panic!("Expected InvalidPaletteSize, got: {other:?}"),
    }
}

#[test]
fn signed_frame_limit_conversion() {
    assert_eq!(FrameLimit::from_signed(-1).unwrap(), FrameLimit::Unbounded);
    assert_eq!(FrameLimit::from_signed(0).unwrap(), FrameLimit::Frames(0));
    assert_eq!(FrameLimit::from_signed(42).unwrap(), FrameLimit::Frames(42));
    match FrameLimit::from_signed(-2) {
        Err(SpectrographError::InvalidFrameLimit(-2)) => {}
        other => panic!("Expected InvalidFrameLimit, got: {other:?}"),
    }
}

#[test]
fn options_debug_lists_settings() {
    let options = SamplingOptions::new().with_batch_size(0);
    let debug = format!("{options:?}");
    assert!(debug.contains("SamplingOptions"));
    assert!(debug.contains("palette_size: 32"));
    assert!(debug.contains("has_inspector: false"));
    // Clamped to 1.
    assert!(debug.contains("batch_size: 1"));
}

// ── Output formatting ──────────────────────────────────────────────

#[test]
fn rgb_format_renders_components() {
    let mut source = source_of(&[RED, GREEN]);
    let spectrograph = controller(SamplingOptions::new().with_color_format(ColorFormat::Rgb))
        .run(&mut source)
        .unwrap();

    assert_eq!(spectrograph.format(), ColorFormat::Rgb);
    assert_eq!(spectrograph.formatted(), vec!["255,0,0", "0,255,0"]);
}

#[test]
fn write_lines_prefixes_header_comments() {
    let mut source = source_of(&[RED, BLUE]);
    let spectrograph = controller(SamplingOptions::new()).run(&mut source).unwrap();

    let mut output = Vec::new();
    spectrograph
        .write_lines(&mut output, Some("spectrograph of clip.mp4\n2 frames"))
        .unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "% spectrograph of clip.mp4\n% 2 frames\n#ff0000\n#0000ff\n"
    );

    let mut bare = Vec::new();
    spectrograph.write_lines(&mut bare, None).unwrap();
    assert_eq!(String::from_utf8(bare).unwrap(), "#ff0000\n#0000ff\n");
}

// ── Streaming ──────────────────────────────────────────────────────

#[test]
fn run_with_streams_frame_numbers_and_colors() {
    let mut source = source_of(&[RED, GREEN, BLUE, WHITE, RED]);
    let mut seen = Vec::new();
    let report = controller(SamplingOptions::new().with_step(2))
        .run_with(&mut source, |frame_number, color| {
            seen.push((frame_number, color.to_hex()));
            Ok(())
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (0, "#ff0000".to_string()),
            (2, "#0000ff".to_string()),
            (4, "#ff0000".to_string()),
        ]
    );
    assert_eq!(report.frames_read, 5);
    assert_eq!(report.frames_selected, 3);
    assert!(report.last_frame.is_none());
}

#[test]
fn callback_error_stops_the_run() {
    let mut source = source_of(&[RED, GREEN, BLUE, WHITE]);
    let mut calls = 0;
    let result = controller(SamplingOptions::new()).run_with(&mut source, |_, _| {
        calls += 1;
        if calls == 2 {
            Err(SpectrographError::RunDeclined)
        } else {
            Ok(())
        }
    });

    assert!(matches!(result, Err(SpectrographError::RunDeclined)));
    assert_eq!(calls, 2);
    assert_eq!(source.remaining(), 2);
}

// ── Debug hooks ────────────────────────────────────────────────────

#[test]
fn last_selected_frame_is_kept_after_cropping() {
    let frames = vec![
        RgbImage::from_pixel(40, 30, RED),
        RgbImage::from_pixel(40, 30, BLUE),
        RgbImage::from_pixel(40, 30, GREEN),
        RgbImage::from_pixel(40, 30, WHITE),
    ];
    let options = SamplingOptions::new()
        .with_step(2)
        .with_crop_ratio("2:1".parse().unwrap())
        .with_keep_last_frame(true);

    let spectrograph = controller(options).run(&mut InMemorySource::new(frames)).unwrap();
    let last = spectrograph.last_frame().expect("last frame kept");

    assert_eq!(last.dimensions(), (40, 20));
    assert_eq!(*last.get_pixel(0, 0), GREEN);
}

struct RecordingInspector {
    frames: Mutex<Vec<(u64, (u32, u32))>>,
}

impl FrameInspector for RecordingInspector {
    fn inspect(&self, frame_number: u64, quantized: &RgbImage) {
        self.frames
            .lock()
            .unwrap()
            .push((frame_number, quantized.dimensions()));
    }
}

#[test]
fn inspector_sees_each_selected_frame() {
    let inspector = Arc::new(RecordingInspector {
        frames: Mutex::new(Vec::new()),
    });
    let mut source: InMemorySource =
        (0..5).map(|_| RgbImage::from_pixel(300, 150, RED)).collect();
    let options = SamplingOptions::new()
        .with_step(2)
        .with_frame_limit(FrameLimit::Frames(5))
        .with_frame_inspector(inspector.clone());

    let spectrograph = controller(options).run(&mut source).unwrap();

    assert_eq!(spectrograph.len(), 3);
    assert_eq!(
        *inspector.frames.lock().unwrap(),
        vec![(0, (100, 50)), (2, (100, 50)), (4, (100, 50))]
    );
}

#[test]
fn inspector_does_not_change_colors() {
    let inspector = Arc::new(RecordingInspector {
        frames: Mutex::new(Vec::new()),
    });
    let plain = controller(SamplingOptions::new())
        .run(&mut source_of(&[RED, GREEN]))
        .unwrap();
    let inspected = controller(
        SamplingOptions::new()
            .with_frame_limit(FrameLimit::Frames(10))
            .with_frame_inspector(inspector),
    )
    .run(&mut source_of(&[RED, GREEN]))
    .unwrap();

    assert_eq!(plain.colors(), inspected.colors());
}

// ── Confirmation ───────────────────────────────────────────────────

#[test]
fn declined_confirmation_aborts_before_decoding() {
    let inspector = Arc::new(RecordingInspector {
        frames: Mutex::new(Vec::new()),
    });
    let options = SamplingOptions::new()
        .with_frame_inspector(inspector.clone())
        .with_confirmation(Arc::new(|_: &ConfirmationRequest| false));

    let mut source = source_of(&[RED, BLUE, GREEN]);
    match controller(options).run(&mut source) {
        Err(SpectrographError::RunDeclined) => {}
        other => panic!("Expected RunDeclined, got: {other:?}"),
    }
    assert_eq!(source.remaining(), 3);
    assert!(inspector.frames.lock().unwrap().is_empty());
}

#[test]
fn confirmation_receives_selection_estimate() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    let options = SamplingOptions::new()
        .with_step(2)
        .with_frame_inspector(Arc::new(RecordingInspector {
            frames: Mutex::new(Vec::new()),
        }))
        .with_confirmation(Arc::new(move |request: &ConfirmationRequest| {
            recorded
                .lock()
                .unwrap()
                .push((request.frame_count_hint, request.selected_frames_hint));
            true
        }));

    let spectrograph = controller(options)
        .run(&mut source_of(&[RED, BLUE, GREEN, WHITE, RED]))
        .unwrap();

    assert_eq!(spectrograph.len(), 3);
    assert_eq!(*requests.lock().unwrap(), vec![(Some(5), Some(3))]);
}

#[test]
fn confirmation_skipped_when_limited_or_not_inspecting() {
    let asked = Arc::new(AtomicUsize::new(0));

    let counter = asked.clone();
    let ask = Arc::new(move |_: &ConfirmationRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        false
    });

    let limited = SamplingOptions::new()
        .with_frame_limit(FrameLimit::Frames(2))
        .with_frame_inspector(Arc::new(RecordingInspector {
            frames: Mutex::new(Vec::new()),
        }))
        .with_confirmation(ask.clone());
    assert_eq!(controller(limited).run(&mut source_of(&[RED, BLUE])).unwrap().len(), 2);

    let not_inspecting = SamplingOptions::new().with_confirmation(ask);
    assert_eq!(
        controller(not_inspecting).run(&mut source_of(&[RED])).unwrap().len(),
        1
    );

    assert_eq!(asked.load(Ordering::SeqCst), 0);
}

// ── Errors ─────────────────────────────────────────────────────────

/// Returns no palette for all-green input.
struct GreenBlindQuantizer;

impl Quantizer for GreenBlindQuantizer {
    fn quantize(&self, pixels: &[Rgb<u8>], palette_size: usize) -> Quantization {
        if pixels.iter().all(|pixel| *pixel == GREEN) {
            return Quantization::default();
        }
        MedianCut.quantize(pixels, palette_size)
    }
}

#[test]
fn extraction_error_names_the_frame() {
    let controller = controller(SamplingOptions::new()).with_quantizer(GreenBlindQuantizer);
    let mut source = source_of(&[RED, BLUE, GREEN, WHITE]);

    let error = controller.run(&mut source).unwrap_err();
    match &error {
        SpectrographError::EmptyPalette { frame_number, path } => {
            assert_eq!(*frame_number, Some(2));
            assert_eq!(*path, None);
        }
        other => panic!("Expected EmptyPalette, got: {other:?}"),
    }
    assert!(error.to_string().contains("frame 2"), "{error}");
    assert_eq!(source.remaining(), 1);
}

#[test]
fn zero_area_crop_fails_with_frame_number() {
    let options = SamplingOptions::new().with_crop_ratio("1000:1".parse().unwrap());
    let mut source = InMemorySource::new(vec![RgbImage::from_pixel(1000, 1000, RED)]);

    match controller(options).run(&mut source) {
        Err(SpectrographError::EmptyPalette { frame_number, .. }) => {
            assert_eq!(frame_number, Some(0));
        }
        other => panic!("Expected EmptyPalette, got: {other:?}"),
    }
}

#[test]
fn source_errors_abort_the_run() {
    struct FailingSource {
        served: u64,
    }

    impl FrameSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, SpectrographError> {
            if self.served == 2 {
                return Err(SpectrographError::VideoDecodeError {
                    path: "broken.mp4".into(),
                    frame_number: self.served,
                    reason: "corrupt packet".to_string(),
                });
            }
            self.served += 1;
            Ok(Some(solid(RED)))
        }
    }

    let mut colors = Vec::new();
    let result = controller(SamplingOptions::new()).run_with(
        &mut FailingSource { served: 0 },
        |_, color| {
            colors.push(color);
            Ok(())
        },
    );

    match result {
        Err(SpectrographError::VideoDecodeError { frame_number, .. }) => {
            assert_eq!(frame_number, 2);
        }
        other => panic!("Expected VideoDecodeError, got: {other:?}"),
    }
    assert_eq!(colors.len(), 2);
}

// ── Frame sources ──────────────────────────────────────────────────

#[test]
fn in_memory_end_of_stream_is_sticky() {
    let mut source = source_of(&[RED]);
    assert_eq!(source.frame_count_hint(), Some(1));
    assert!(source.next_frame().unwrap().is_some());
    assert!(source.next_frame().unwrap().is_none());
    assert!(source.next_frame().unwrap().is_none());
}

#[test]
fn frames_iterator_numbers_frames() {
    let mut source = source_of(&[RED, GREEN, BLUE]);
    let numbers: Vec<u64> = source
        .frames()
        .map(|result| result.map(|(number, _)| number))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(numbers, vec![0, 1, 2]);
}

#[test]
fn boxed_sources_can_be_sampled() {
    let mut source: Box<dyn FrameSource> = Box::new(source_of(&[BLUE, RED]));
    let spectrograph = controller(SamplingOptions::new()).run(&mut source).unwrap();
    assert_eq!(spectrograph.formatted(), vec!["#0000ff", "#ff0000"]);
    assert!(spectrograph.source_path().is_none());
}

// ── Parallel extraction ────────────────────────────────────────────

#[cfg(feature = "rayon")]
#[test]
fn parallel_run_matches_sequential_run() {
    let palette = [RED, GREEN, BLUE, WHITE, Rgb([12, 34, 56])];
    let frames: Vec<RgbImage> = (0..23)
        .map(|index| RgbImage::from_pixel(120, 90, palette[index % palette.len()]))
        .collect();

    let controller = controller(
        SamplingOptions::new()
            .with_step(3)
            .with_frame_limit(FrameLimit::Frames(20)),
    );
    let sequential = controller
        .run(&mut InMemorySource::new(frames.clone()))
        .unwrap();

    for batch in [0, 1, 2, 5, 64] {
        let parallel = controller
            .run_parallel(&mut InMemorySource::new(frames.clone()), batch)
            .unwrap();
        assert_eq!(parallel.colors(), sequential.colors(), "batch={batch}");
        assert_eq!(parallel.frames_read(), sequential.frames_read());
    }

    let default = controller
        .run_parallel_default(&mut InMemorySource::new(frames))
        .unwrap();
    assert_eq!(default.colors(), sequential.colors());
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_run_reports_failing_frame() {
    let controller = controller(SamplingOptions::new()).with_quantizer(GreenBlindQuantizer);
    let error = controller
        .run_parallel(&mut source_of(&[RED, GREEN, BLUE]), 8)
        .unwrap_err();
    assert!(matches!(
        error,
        SpectrographError::EmptyPalette {
            frame_number: Some(1),
            ..
        }
    ));
}
