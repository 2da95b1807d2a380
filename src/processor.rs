//! Per-video caption loop.
//!
//! [`caption_video`] samples a video and captions each frame in order.
//! A captioner failure is reported for that frame and the loop moves on:
//! there is no retry and no abort, and failed frames leave no gap marker in
//! the result.

use std::path::Path;

use image::RgbImage;

use crate::{
    captioner::Captioner,
    progress::{ProgressCallback, ProgressEvent},
    sampler::FrameSampler,
};

/// Caption `frames` in order, returning the captions that succeeded.
///
/// Events carry the 1-based position of the frame among `frames`.
pub fn caption_frames<I, C>(
    frames: I,
    captioner: &mut C,
    progress: &dyn ProgressCallback,
) -> Vec<String>
where
    I: IntoIterator<Item = RgbImage>,
    C: Captioner + ?Sized,
{
    let mut captions = Vec::new();

    for (index, frame) in frames.into_iter().enumerate() {
        let position = index + 1;
        match captioner.caption(&frame) {
            Ok(text) => {
                progress.on_event(&ProgressEvent::Captioned {
                    position,
                    text: text.clone(),
                });
                captions.push(text);
            }
            Err(error) => {
                log::debug!("Captioner failed on frame {position}: {error:?}");
                progress.on_event(&ProgressEvent::FrameFailed {
                    position,
                    error: error.to_string(),
                });
            }
        }
    }

    captions
}

/// Sample `path` at `sample_rate` frames per second and caption each frame.
///
/// Frames are decoded one at a time as they are captioned. A video that
/// cannot be opened produces no captions; the reason is logged at `warn`.
pub fn caption_video<P, C>(
    path: P,
    sample_rate: f64,
    captioner: &mut C,
    progress: &dyn ProgressCallback,
) -> Vec<String>
where
    P: AsRef<Path>,
    C: Captioner + ?Sized,
{
    let path = path.as_ref();
    let sampler = match FrameSampler::open(path, sample_rate) {
        Ok(sampler) => sampler,
        Err(error) => {
            log::warn!("Cannot sample {}: {error}", path.display());
            return Vec::new();
        }
    };

    let frames = sampler.map(|frame| {
        log::trace!(
            "Sampled frame {} (source frame {}, t={:?})",
            frame.position + 1,
            frame.source_frame,
            frame.timestamp,
        );
        frame.image
    });

    caption_frames(frames, captioner, progress)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::InferenceError;

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_event(&self, event: &ProgressEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    /// Frames whose single pixel's red channel carries the frame number.
    fn numbered_frames(count: u8) -> Vec<RgbImage> {
        (1..=count)
            .map(|n| RgbImage::from_pixel(1, 1, image::Rgb([n, 0, 0])))
            .collect()
    }

    fn frame_number(image: &RgbImage) -> u8 {
        image.get_pixel(0, 0).0[0]
    }

    #[test]
    fn failed_frame_is_skipped_not_placeheld() {
        let progress = RecordingProgress::default();
        let mut captioner = |image: &RgbImage| -> Result<String, InferenceError> {
            match frame_number(image) {
                3 => Err(InferenceError::Runtime("boom".to_string())),
                n => Ok(format!("scene {n}")),
            }
        };

        let captions = caption_frames(numbered_frames(10), &mut captioner, &progress);

        assert_eq!(captions.len(), 9);
        assert_eq!(captions[1], "scene 2");
        assert_eq!(captions[2], "scene 4");
        assert_eq!(captions[8], "scene 10");

        let events = progress.events.lock().unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(
            events[2],
            ProgressEvent::FrameFailed {
                position: 3,
                error: "model runtime error: boom".to_string(),
            }
        );
        assert_eq!(events[3].to_string(), "Caption 4: scene 4");
    }

    #[test]
    fn all_failures_yield_nothing() {
        let progress = RecordingProgress::default();
        let mut captioner =
            |_: &RgbImage| -> Result<String, InferenceError> { Err(InferenceError::EmptyOutput) };

        let captions = caption_frames(numbered_frames(4), &mut captioner, &progress);

        assert!(captions.is_empty());
        let events = progress.events.lock().unwrap();
        assert!(
            events
                .iter()
                .all(|event| matches!(event, ProgressEvent::FrameFailed { .. }))
        );
    }

    #[test]
    fn captions_keep_frame_order() {
        let progress = RecordingProgress::default();
        let mut captioner = |image: &RgbImage| -> Result<String, InferenceError> {
            Ok(frame_number(image).to_string())
        };

        let captions = caption_frames(numbered_frames(6), &mut captioner, &progress);
        let numbers: Vec<u8> = captions.iter().map(|c| c.parse().unwrap()).collect();

        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn unopenable_video_is_not_an_error() {
        let progress = RecordingProgress::default();
        let mut calls = 0;
        let mut captioner = |_: &RgbImage| -> Result<String, InferenceError> {
            calls += 1;
            Ok(String::new())
        };

        let captions = caption_video("no_such_video.mp4", 1.0, &mut captioner, &progress);

        assert!(captions.is_empty());
        assert_eq!(calls, 0);
        assert!(progress.events.lock().unwrap().is_empty());
    }
}
