//! Internal utility functions.
//!
//! Pixel-data copying and timestamp conversion shared by the sampler.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an RGB24 FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// The padding is stripped so the result can be passed straight to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    strip_row_padding(
        video_frame.data(0),
        video_frame.stride(0),
        width as usize * 3,
        height as usize,
    )
}

/// Copy `rows` rows of `row_bytes` each out of a plane laid out with
/// `stride` bytes per row.
pub(crate) fn strip_row_padding(
    data: &[u8],
    stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Vec<u8> {
    if stride == row_bytes {
        data[..row_bytes * rows].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * rows);
        for row in 0..rows {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to a [`Duration`].
///
/// Negative timestamps (possible before the first keyframe) map to `None`.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Option<Duration> {
    if time_base.denominator() == 0 {
        return None;
    }
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds >= 0.0 && seconds.is_finite()).then(|| Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_compacted() {
        // 2x2 RGB image stored with 2 bytes of padding per row.
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let packed = strip_row_padding(&data, 8, 6, 2);
        assert_eq!(packed, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn unpadded_plane_is_copied_as_is() {
        let data = [1, 2, 3, 4, 5, 6];
        assert_eq!(strip_row_padding(&data, 3, 3, 2), data.to_vec());
    }

    #[test]
    fn pts_conversion() {
        let time_base = Rational::new(1, 90_000);
        assert_eq!(
            pts_to_duration(45_000, time_base),
            Some(Duration::from_millis(500))
        );
        assert_eq!(pts_to_duration(-10, time_base), None);
        assert_eq!(pts_to_duration(10, Rational::new(1, 0)), None);
    }
}
