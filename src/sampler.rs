//! Fixed-rate frame sampling.
//!
//! [`FrameSampler`] decodes every frame of a video in order and keeps one
//! frame out of every [`interval`](FrameSampler::interval), where the
//! interval is the native frame rate divided by the target sampling rate.
//! Kept frames are converted to RGB8. Frames are produced lazily, so only
//! the frame currently being captioned is held in memory.
//!
//! Decoding ends at end-of-stream or at the first decode failure; a failure
//! is logged and treated as the end of the video rather than an error.
//!
//! # Example
//!
//! ```no_run
//! use framecap::FrameSampler;
//!
//! let sampler = FrameSampler::open("videos/clip.mp4", 1.0)?;
//! for frame in sampler {
//!     frame.image.save(format!("frame_{}.png", frame.position))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{path::Path, time::Duration};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    error::CaptionError, media::VideoFile, metadata::VideoMetadata, utilities,
};

/// Frame rate assumed when the container does not report a usable one.
pub const DEFAULT_FRAMES_PER_SECOND: f64 = 30.0;

/// The native frame rate to sample against: `native` when it is a positive
/// finite number, [`DEFAULT_FRAMES_PER_SECOND`] otherwise.
pub fn effective_frame_rate(native: f64) -> f64 {
    if native.is_finite() && native > 0.0 {
        native
    } else {
        DEFAULT_FRAMES_PER_SECOND
    }
}

/// Number of decoded frames between two kept frames.
///
/// Computed as `floor(native / target)` and clamped to at least 1, so a
/// target rate at or above the native rate keeps every frame.
///
/// ```
/// use framecap::sampling_interval;
///
/// assert_eq!(sampling_interval(30.0, 1.0), 30);
/// assert_eq!(sampling_interval(29.97, 1.0), 29);
/// assert_eq!(sampling_interval(24.0, 60.0), 1);
/// assert_eq!(sampling_interval(0.0, 1.0), 30);
/// ```
pub fn sampling_interval(native_fps: f64, target_rate: f64) -> u64 {
    if !(target_rate.is_finite() && target_rate > 0.0) {
        return 1;
    }
    let quotient = (effective_frame_rate(native_fps) / target_rate).floor();
    if quotient >= 1.0 { quotient as u64 } else { 1 }
}

/// Number of frames a fully decodable stream of `total_frames` yields at
/// the given interval.
pub fn expected_frame_count(total_frames: u64, interval: u64) -> u64 {
    total_frames.div_ceil(interval.max(1))
}

/// One frame kept by the sampler.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// 0-based position among sampled frames.
    pub position: usize,
    /// 0-based index of the frame in decode order.
    pub source_frame: u64,
    /// Presentation timestamp, when the stream provides one.
    pub timestamp: Option<Duration>,
    /// The frame converted to 8-bit RGB.
    pub image: RgbImage,
}

/// Lazy iterator over the frames of a video, sampled at a fixed rate.
///
/// The sampler owns its [`VideoFile`], decoder, and scaler; dropping it
/// (including part-way through the stream) releases all of them.
pub struct FrameSampler {
    video: VideoFile,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    scaler_source: (Pixel, u32, u32),
    interval: u64,
    time_base: Rational,
    decoded_count: u64,
    kept_count: usize,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
}

impl FrameSampler {
    /// Open `path` and prepare to sample it at `target_rate` frames per
    /// second.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::InvalidSampleRate`] for a zero, negative, or
    /// non-finite rate, and any error from [`VideoFile::open`] or decoder
    /// setup.
    pub fn open<P: AsRef<Path>>(path: P, target_rate: f64) -> Result<Self, CaptionError> {
        if !(target_rate.is_finite() && target_rate > 0.0) {
            return Err(CaptionError::InvalidSampleRate(target_rate));
        }

        let video = VideoFile::open(path)?;
        let stream = video
            .input_context
            .stream(video.video_stream_index)
            .ok_or(CaptionError::NoVideoStream)?;
        let time_base = stream.time_base();
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let interval = sampling_interval(video.metadata.frames_per_second, target_rate);
        log::debug!(
            "Sampling {} at {target_rate} fps (native {:.3} fps, every {interval} frame(s))",
            video.path.display(),
            effective_frame_rate(video.metadata.frames_per_second),
        );

        Ok(Self {
            video,
            decoder,
            scaler: None,
            scaler_source: (Pixel::None, 0, 0),
            interval,
            time_base,
            decoded_count: 0,
            kept_count: 0,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
        })
    }

    /// Number of decoded frames between two kept frames.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Metadata of the video being sampled.
    pub fn metadata(&self) -> &VideoMetadata {
        self.video.metadata()
    }

    /// Convert the current `decoded_frame` to an RGB image.
    ///
    /// The scaler is built from the first decoded frame and rebuilt if the
    /// stream changes format or resolution mid-way.
    fn convert_current_frame(&mut self) -> Result<RgbImage, CaptionError> {
        let source = (
            self.decoded_frame.format(),
            self.decoded_frame.width(),
            self.decoded_frame.height(),
        );
        if self.scaler.is_none() || self.scaler_source != source {
            self.scaler = Some(ScalingContext::get(
                source.0,
                source.1,
                source.2,
                Pixel::RGB24,
                source.1,
                source.2,
                ScalingFlags::BILINEAR,
            )?);
            self.scaler_source = source;
        }

        let Some(scaler) = self.scaler.as_mut() else {
            return Err(CaptionError::VideoDecodeError(
                "RGB scaler is not initialised".to_string(),
            ));
        };
        scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;

        let (width, height) = (source.1, source.2);
        let buffer = utilities::frame_to_rgb_buffer(&self.rgb_frame, width, height);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            CaptionError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }

    /// Stop iteration after a decode failure.
    fn stop(&mut self, error: impl std::fmt::Display) -> Option<SampledFrame> {
        log::warn!(
            "Stopping decode of {} after {} frame(s): {error}",
            self.video.path.display(),
            self.decoded_count,
        );
        self.done = true;
        None
    }
}

impl Iterator for FrameSampler {
    type Item = SampledFrame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let counter = self.decoded_count;
                self.decoded_count += 1;

                if counter % self.interval != 0 {
                    continue;
                }

                let timestamp = self
                    .decoded_frame
                    .timestamp()
                    .or_else(|| self.decoded_frame.pts())
                    .and_then(|pts| utilities::pts_to_duration(pts, self.time_base));

                return match self.convert_current_frame() {
                    Ok(image) => {
                        let position = self.kept_count;
                        self.kept_count += 1;
                        Some(SampledFrame {
                            position,
                            source_frame: counter,
                            timestamp,
                            image,
                        })
                    }
                    Err(error) => self.stop(error),
                };
            }

            if self.eof_sent {
                log::debug!(
                    "Finished {}: decoded {} frame(s), kept {}",
                    self.video.path.display(),
                    self.decoded_count,
                    self.kept_count,
                );
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.video.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            return self.stop(error);
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.stop(error);
                    }
                    self.eof_sent = true;
                }
                Err(error) => return self.stop(error),
            }
        }
    }
}

/// Sample every frame of `path` at `target_rate` into memory.
///
/// A video that cannot be opened yields an empty vector; the failure is
/// logged at `warn`.
pub fn sample_frames<P: AsRef<Path>>(path: P, target_rate: f64) -> Vec<SampledFrame> {
    match FrameSampler::open(path.as_ref(), target_rate) {
        Ok(sampler) => sampler.collect(),
        Err(error) => {
            log::warn!("Cannot sample {}: {error}", path.as_ref().display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_from_native_rate() {
        assert_eq!(sampling_interval(30.0, 1.0), 30);
        assert_eq!(sampling_interval(60.0, 2.0), 30);
        assert_eq!(sampling_interval(25.0, 0.5), 50);
        assert_eq!(sampling_interval(23.976, 1.0), 23);
    }

    #[test]
    fn interval_never_zero() {
        assert_eq!(sampling_interval(30.0, 30.0), 1);
        assert_eq!(sampling_interval(30.0, 45.0), 1);
        assert_eq!(sampling_interval(5.0, 1000.0), 1);
        assert_eq!(sampling_interval(30.0, 0.0), 1);
        assert_eq!(sampling_interval(30.0, -2.0), 1);
        assert_eq!(sampling_interval(30.0, f64::NAN), 1);
    }

    #[test]
    fn missing_native_rate_falls_back_to_default() {
        assert_eq!(effective_frame_rate(0.0), DEFAULT_FRAMES_PER_SECOND);
        assert_eq!(effective_frame_rate(f64::NAN), DEFAULT_FRAMES_PER_SECOND);
        assert_eq!(effective_frame_rate(-1.0), DEFAULT_FRAMES_PER_SECOND);
        assert_eq!(effective_frame_rate(24.0), 24.0);
        assert_eq!(sampling_interval(0.0, 1.0), 30);
    }

    #[test]
    fn expected_counts() {
        // 10 seconds at 30 fps sampled at 1 fps.
        assert_eq!(expected_frame_count(300, 30), 10);
        // Frames 0, 30, ..., 300 are kept.
        assert_eq!(expected_frame_count(301, 30), 11);
        assert_eq!(expected_frame_count(0, 30), 0);
        assert_eq!(expected_frame_count(7, 0), 7);
    }

    #[test]
    fn invalid_rate_is_rejected_before_opening() {
        let result = FrameSampler::open("does_not_matter.mp4", 0.0);
        assert!(matches!(result, Err(CaptionError::InvalidSampleRate(_))));
    }

    #[test]
    fn unopenable_video_samples_nothing() {
        assert!(sample_frames("this_video_does_not_exist.mp4", 1.0).is_empty());
    }
}
