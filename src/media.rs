//! Opened video files.
//!
//! [`VideoFile`] owns the FFmpeg demuxer for one file together with the
//! cached [`VideoMetadata`] of its best video stream. The demuxer is closed
//! when the `VideoFile` is dropped, so every path out of frame extraction
//! releases it.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational, Stream, codec::context::Context as CodecContext, format::context::Input,
    media::Type,
};

use crate::{error::CaptionError, metadata::VideoMetadata};

/// A video file opened for decoding.
///
/// # Example
///
/// ```no_run
/// use framecap::VideoFile;
///
/// let video = VideoFile::open("videos/clip.mp4")?;
/// println!("{:?}", video.metadata().duration);
/// # Ok::<(), framecap::CaptionError>(())
/// ```
pub struct VideoFile {
    pub(crate) input_context: Input,
    pub(crate) metadata: VideoMetadata,
    pub(crate) video_stream_index: usize,
    pub(crate) path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file and read the metadata of its best video stream.
    ///
    /// Initialises FFmpeg (idempotent) before opening.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::FileOpen`] if the container cannot be opened
    /// or its codec parameters cannot be read, and
    /// [`CaptionError::NoVideoStream`] if it holds no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptionError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init().map_err(|error| CaptionError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| CaptionError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(CaptionError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                CaptionError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to read video codec parameters: {error}"),
                }
            })?;
        let video_decoder =
            decoder_context
                .decoder()
                .video()
                .map_err(|error| CaptionError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;

        let frames_per_second = stream_frame_rate(&stream);
        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = video_decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: video_decoder.width(),
            height: video_decoder.height(),
            frames_per_second,
            frame_count,
            codec,
            duration,
        };

        log::debug!(
            "Opened {} ({}x{} @ {:.3} fps, ~{} frames, {})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            path,
        })
    }

    /// Metadata of the video stream, cached at open time.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Native frame rate of a stream: the average frame rate, then the
/// stream's base rate, else `0.0`.
fn stream_frame_rate(stream: &Stream<'_>) -> f64 {
    rational_to_f64(stream.avg_frame_rate())
        .or_else(|| rational_to_f64(stream.rate()))
        .unwrap_or(0.0)
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 || rate.numerator() == 0 {
        None
    } else {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::rational_to_f64;
    use ffmpeg_next::Rational;

    #[test]
    fn rational_rates() {
        assert_eq!(rational_to_f64(Rational::new(30, 1)), Some(30.0));
        let ntsc = rational_to_f64(Rational::new(30000, 1001)).unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(rational_to_f64(Rational::new(0, 1)), None);
        assert_eq!(rational_to_f64(Rational::new(25, 0)), None);
    }
}
