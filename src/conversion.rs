//! Packing of decoded FFmpeg frames into `image` buffers.

use ffmpeg_next::frame::Video as VideoFrame;
use image::RgbImage;

const RGB24_BYTES_PER_PIXEL: usize = 3;

/// Copy an RGB24 FFmpeg frame into a tightly-packed [`RgbImage`].
///
/// FFmpeg pads rows to its own alignment, so rows are copied one at a time
/// unless the stride already matches. Returns `None` if the frame holds less
/// data than `width × height` requires.
pub(crate) fn rgb24_frame_to_image(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Option<RgbImage> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * RGB24_BYTES_PER_PIXEL;
    let rows = height as usize;
    let data = video_frame.data(0);

    if stride < row_length || data.len() < stride * rows.saturating_sub(1) + row_length {
        return None;
    }

    let buffer = if stride == row_length {
        data[..row_length * rows].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * rows);
        for row in data.chunks(stride).take(rows) {
            buffer.extend_from_slice(&row[..row_length]);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer)
}
