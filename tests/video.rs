//! Video decoding tests on clips encoded at test time.
//!
//! Clips are written as uncompressed RGB24 in a NUT container, so decoded
//! pixels match the encoded ones exactly. Tests are skipped when the local
//! FFmpeg build cannot write such a clip.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::{Pixel, context::Output},
    frame::Video as VideoFrame,
};
use image::{Rgb, RgbImage};
use spectrograph::{
    FrameSource, SamplingOptions, Spectrograph, SpectrographError, VideoSource, open_source,
};

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const FRAMES_PER_SECOND: i32 = 4;

fn encode_rawvideo(path: &Path, frames: &[RgbImage]) -> Result<(), ffmpeg_next::Error> {
    ffmpeg_next::init()?;
    let (width, height) = frames[0].dimensions();
    let time_base = Rational::new(1, FRAMES_PER_SECOND);

    let mut output = ffmpeg_next::format::output(&path)?;
    let codec =
        ffmpeg_next::encoder::find(Id::RAWVIDEO).ok_or(ffmpeg_next::Error::EncoderNotFound)?;
    let mut stream = output.add_stream(codec)?;
    let stream_index = stream.index();

    let mut encoder = CodecContext::from_parameters(stream.parameters())?
        .encoder()
        .video()?;
    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::RGB24);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(Rational::new(FRAMES_PER_SECOND, 1)));
    let mut encoder = encoder.open_as(codec)?;
    stream.set_parameters(&encoder);

    output.write_header()?;

    for (index, image) in frames.iter().enumerate() {
        let mut frame = VideoFrame::new(Pixel::RGB24, width, height);
        let stride = frame.stride(0);
        let row_len = width as usize * 3;
        let data = frame.data_mut(0);
        for (y, row) in image.as_raw().chunks_exact(row_len).enumerate() {
            data[y * stride..y * stride + row_len].copy_from_slice(row);
        }
        frame.set_pts(Some(index as i64));

        encoder.send_frame(&frame)?;
        write_packets(&mut encoder, &mut output, stream_index, time_base)?;
    }

    encoder.send_eof()?;
    write_packets(&mut encoder, &mut output, stream_index, time_base)?;
    output.write_trailer()
}

fn write_packets(
    encoder: &mut ffmpeg_next::encoder::Video,
    output: &mut Output,
    stream_index: usize,
    time_base: Rational,
) -> Result<(), ffmpeg_next::Error> {
    let stream_time_base = output
        .stream(stream_index)
        .ok_or(ffmpeg_next::Error::StreamNotFound)?
        .time_base();

    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(time_base, stream_time_base);
        packet.write_interleaved(output)?;
    }
    Ok(())
}

/// Encode `frames` into `directory/name`, or `None` when this FFmpeg build
/// cannot.
fn write_clip(directory: &Path, name: &str, frames: &[RgbImage]) -> Option<PathBuf> {
    let path = directory.join(name);
    match encode_rawvideo(&path, frames) {
        Ok(()) => Some(path),
        Err(error) => {
            eprintln!("Skipping: cannot encode test clip ({error})");
            None
        }
    }
}

/// Four 32x24 frames: red, blue, red, blue.
fn alternating_frames() -> Vec<RgbImage> {
    [RED, BLUE, RED, BLUE]
        .into_iter()
        .map(|color| RgbImage::from_pixel(32, 24, color))
        .collect()
}

// ── Decoding ───────────────────────────────────────────────────────

#[test]
fn clip_frames_decode_in_order_with_exact_colors() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(path) = write_clip(directory.path(), "alternating.nut", &alternating_frames()) else {
        return;
    };

    let mut source = VideoSource::open(&path).expect("Failed to open clip");
    assert_eq!((source.metadata().width, source.metadata().height), (32, 24));
    assert_eq!(source.path(), Some(path.as_path()));

    let mut colors = Vec::new();
    while let Some(frame) = source.next_frame().expect("decode") {
        assert_eq!(frame.dimensions(), (32, 24));
        colors.push(*frame.get_pixel(16, 12));
    }

    assert_eq!(colors, vec![RED, BLUE, RED, BLUE]);
    assert_eq!(source.frames_decoded(), 4);
    assert!(source.next_frame().unwrap().is_none());
    assert!(source.next_frame().unwrap().is_none());
}

#[test]
fn every_second_frame_of_alternating_clip_is_red() {
    let directory = tempfile::tempdir().unwrap();
    let Some(path) = write_clip(directory.path(), "alternating.nut", &alternating_frames()) else {
        return;
    };

    let options = SamplingOptions::new().with_step(2).with_palette_size(4);
    let spectrograph = Spectrograph::from_path(&path, &options).expect("run");

    assert_eq!(spectrograph.formatted(), vec!["#ff0000", "#ff0000"]);
    assert_eq!(spectrograph.frames_read(), 4);
}

#[test]
fn open_source_routes_clip_to_video_decoder() {
    let directory = tempfile::tempdir().unwrap();
    let Some(path) = write_clip(directory.path(), "alternating.nut", &alternating_frames()) else {
        return;
    };

    let mut source = open_source(&path).expect("open");
    let frames: Vec<_> = source.frames().collect::<Result<_, _>>().unwrap();
    let numbers: Vec<u64> = frames.iter().map(|(number, _)| *number).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
}

// ── Damaged input ──────────────────────────────────────────────────

#[test]
fn truncated_clip_ends_with_decode_error_naming_the_file() {
    let directory = tempfile::tempdir().unwrap();
    let Some(path) = write_clip(directory.path(), "truncated.nut", &alternating_frames()) else {
        return;
    };

    // Drop the trailer and the second half of the last frame.
    let bytes = std::fs::read(&path).unwrap();
    let frame_bytes = 32 * 24 * 3;
    std::fs::write(&path, &bytes[..bytes.len().saturating_sub(frame_bytes / 2)]).unwrap();

    let mut source = match VideoSource::open(&path) {
        Ok(source) => source,
        Err(SpectrographError::SourceUnavailable { path: reported, .. }) => {
            assert_eq!(reported, path);
            return;
        }
        Err(other) => panic!("Expected SourceUnavailable, got: {other:?}"),
    };

    let mut decoded = Vec::new();
    loop {
        match source.next_frame() {
            Ok(Some(frame)) => decoded.push(*frame.get_pixel(0, 0)),
            Ok(None) => break,
            Err(SpectrographError::VideoDecodeError {
                path: reported,
                frame_number,
                ..
            }) => {
                assert_eq!(reported, path);
                assert_eq!(frame_number, decoded.len() as u64);
                break;
            }
            Err(other) => panic!("Expected VideoDecodeError, got: {other:?}"),
        }
    }

    assert!(decoded.len() <= 4);
    assert!(decoded.iter().zip([RED, BLUE, RED, BLUE]).all(|(got, want)| *got == want));
    assert!(source.next_frame().unwrap().is_none());
}
