//! Progress reporting.
//!
//! The video processor and batch driver report what they are doing through
//! a [`ProgressCallback`]. The library itself never prints; the `framecap`
//! binary renders each [`ProgressEvent`] as a console status line.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use framecap::{CaptionConfig, ProgressCallback, ProgressEvent};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_event(&self, event: &ProgressEvent) {
//!         println!("{event}");
//!     }
//! }
//!
//! let config = CaptionConfig::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

/// Something observable that happened during a run.
///
/// The [`Display`] form is the human-readable status line for the event.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressEvent {
    /// A video is about to be processed.
    VideoStarted {
        /// File name of the video.
        name: String,
    },
    /// A frame was captioned.
    Captioned {
        /// 1-based position among sampled frames.
        position: usize,
        /// The caption text.
        text: String,
    },
    /// The captioner failed for a frame; processing continues.
    FrameFailed {
        /// 1-based position among sampled frames.
        position: usize,
        /// Rendered error message.
        error: String,
    },
    /// A video produced no captions, so no caption file was written.
    NoCaptions {
        /// File name of the video.
        name: String,
    },
    /// A caption file was written.
    Saved {
        /// Path of the caption file.
        path: PathBuf,
    },
}

impl Display for ProgressEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProgressEvent::VideoStarted { name } => write!(f, "Processing {name}..."),
            ProgressEvent::Captioned { position, text } => write!(f, "Caption {position}: {text}"),
            ProgressEvent::FrameFailed { position, error } => {
                write!(f, "Error on frame {position}: {error}")
            }
            ProgressEvent::NoCaptions { .. } => write!(f, "No captions generated."),
            ProgressEvent::Saved { path } => write!(f, "Saved to {}", path.display()),
        }
    }
}

/// Receives [`ProgressEvent`]s during a run.
///
/// Callbacks are infallible; they observe but cannot change the run.
pub trait ProgressCallback: Send + Sync {
    /// Called once per event, in order.
    fn on_event(&self, event: &ProgressEvent);
}

/// Discards every event. This is the default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        let started = ProgressEvent::VideoStarted {
            name: "clip.mp4".to_string(),
        };
        assert_eq!(started.to_string(), "Processing clip.mp4...");

        let captioned = ProgressEvent::Captioned {
            position: 3,
            text: "a dog on a beach".to_string(),
        };
        assert_eq!(captioned.to_string(), "Caption 3: a dog on a beach");

        let failed = ProgressEvent::FrameFailed {
            position: 4,
            error: "model runtime error: boom".to_string(),
        };
        assert_eq!(
            failed.to_string(),
            "Error on frame 4: model runtime error: boom"
        );

        let none = ProgressEvent::NoCaptions {
            name: "clip.mp4".to_string(),
        };
        assert_eq!(none.to_string(), "No captions generated.");

        let saved = ProgressEvent::Saved {
            path: PathBuf::from("captions").join("clip.txt"),
        };
        assert!(saved.to_string().starts_with("Saved to captions"));
        assert!(saved.to_string().ends_with("clip.txt"));
    }
}
