//! # framecap
//!
//! Caption videos frame by frame. `framecap` samples frames from each video
//! at a fixed rate, describes every sampled frame with an image-captioning
//! model, and writes one caption file per video. Decoding goes through
//! FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate; the bundled model backend runs on ONNX Runtime.
//!
//! ## Quick Start
//!
//! ### Caption a directory of videos
//!
//! ```no_run
//! use framecap::{BatchRunner, CaptionConfig, VitGpt2Captioner};
//!
//! let mut captioner = VitGpt2Captioner::from_dir("models/vit-gpt2-image-captioning")?;
//! let config = CaptionConfig::new()
//!     .with_input_dir("videos")
//!     .with_output_dir("captions")
//!     .with_sample_rate(1.0);
//! let summary = BatchRunner::new(config).run(&mut captioner)?;
//! println!("{} caption file(s) written", summary.files_written);
//! # Ok::<(), framecap::CaptionError>(())
//! ```
//!
//! ### Sample frames without captioning
//!
//! ```no_run
//! use framecap::FrameSampler;
//!
//! for frame in FrameSampler::open("videos/clip.mp4", 2.0)? {
//!     println!("frame {} at {:?}", frame.source_frame, frame.timestamp);
//! }
//! # Ok::<(), framecap::CaptionError>(())
//! ```
//!
//! ### Plug in a different captioner
//!
//! Anything implementing [`Captioner`] can be used, including closures:
//!
//! ```no_run
//! use framecap::{BatchRunner, CaptionConfig, InferenceError};
//! use image::RgbImage;
//!
//! let mut captioner = |image: &RgbImage| -> Result<String, InferenceError> {
//!     Ok(format!("{}x{} frame", image.width(), image.height()))
//! };
//! BatchRunner::new(CaptionConfig::new()).run(&mut captioner)?;
//! # Ok::<(), framecap::CaptionError>(())
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `onnx` (default) | [`VitGpt2Captioner`] backed by ONNX Runtime |
//! | `cuda` | Run the ONNX backend on the CUDA execution provider |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod batch;
pub mod captioner;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod media;
pub mod metadata;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod processor;
pub mod progress;
pub mod sampler;
mod utilities;

pub use batch::{
    BatchRunner, BatchSummary, VIDEO_EXTENSIONS, caption_file_name, collect_videos,
    is_video_file, write_caption_file,
};
pub use captioner::Captioner;
pub use config::{CaptionConfig, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_SAMPLE_RATE};
pub use error::{CaptionError, InferenceError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use media::VideoFile;
pub use metadata::VideoMetadata;
#[cfg(feature = "onnx")]
pub use onnx::{CaptionModelOptions, VitGpt2Captioner, preprocess};
pub use processor::{caption_frames, caption_video};
pub use progress::{ProgressCallback, ProgressEvent};
pub use sampler::{
    DEFAULT_FRAMES_PER_SECOND, FrameSampler, SampledFrame, effective_frame_rate,
    expected_frame_count, sample_frames, sampling_interval,
};
