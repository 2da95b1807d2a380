//! Video stream metadata.
//!
//! [`VideoMetadata`] is read once when a [`VideoFile`](crate::VideoFile) is
//! opened and cached for its lifetime. The frame sampler uses the native
//! frame rate to derive its sampling interval.

use std::time::Duration;

/// Metadata for the best video stream of a file.
///
/// # Example
///
/// ```no_run
/// use framecap::VideoFile;
///
/// let video = VideoFile::open("videos/clip.mp4")?;
/// let metadata = video.metadata();
/// println!("{}x{} @ {:.2} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// # Ok::<(), framecap::CaptionError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Native frames per second, or `0.0` when the container does not
    /// report one.
    pub frames_per_second: f64,
    /// Estimated total number of frames, computed from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
    /// Container duration.
    pub duration: Duration,
}
