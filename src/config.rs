//! Run configuration.
//!
//! [`CaptionConfig`] is a builder carrying the input and output
//! directories, the sampling rate, and the progress callback into the
//! [`BatchRunner`](crate::BatchRunner). The defaults reproduce the fixed
//! layout the tool has always used: videos are read from `videos/`,
//! captions are written to `captions/`, one frame per second is sampled.
//!
//! # Example
//!
//! ```
//! use framecap::CaptionConfig;
//!
//! let config = CaptionConfig::new()
//!     .with_input_dir("footage")
//!     .with_output_dir("out")
//!     .with_sample_rate(0.5);
//! assert_eq!(config.sample_rate(), 0.5);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::progress::{NoOpProgress, ProgressCallback, ProgressEvent};

/// Default directory scanned for videos.
pub const DEFAULT_INPUT_DIR: &str = "videos";
/// Default directory caption files are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "captions";
/// Default sampling rate in frames per second.
pub const DEFAULT_SAMPLE_RATE: f64 = 1.0;

/// Configuration for a batch captioning run.
#[derive(Clone)]
pub struct CaptionConfig {
    pub(crate) input_dir: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) sample_rate: f64,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for CaptionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CaptionConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionConfig {
    /// Create a configuration with the default directories and rate and
    /// no progress callback.
    pub fn new() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sample_rate: DEFAULT_SAMPLE_RATE,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the directory scanned for videos.
    #[must_use]
    pub fn with_input_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.input_dir = dir.into();
        self
    }

    /// Set the directory caption files are written to.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the sampling rate in frames per second.
    ///
    /// Not validated here; a non-positive rate makes every video fail to
    /// open in the sampler and so produce no captions.
    #[must_use]
    pub fn with_sample_rate(mut self, frames_per_second: f64) -> Self {
        self.sample_rate = frames_per_second;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        self.progress.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_layout() {
        let config = CaptionConfig::default();
        assert_eq!(config.input_dir(), Path::new("videos"));
        assert_eq!(config.output_dir(), Path::new("captions"));
        assert_eq!(config.sample_rate(), 1.0);
    }

    #[test]
    fn debug_omits_callback() {
        let debug = format!("{:?}", CaptionConfig::new().with_sample_rate(2.0));
        assert!(debug.contains("CaptionConfig"));
        assert!(debug.contains("sample_rate: 2.0"));
        assert!(!debug.contains("progress"));
    }
}
