//! Error types for the `framecap` crate.
//!
//! [`CaptionError`] is returned by every fallible operation that should stop
//! the run (opening inputs, loading the model, writing caption files).
//! [`InferenceError`] is the narrower error a
//! [`Captioner`](crate::Captioner) returns for a single frame; the video
//! processor reports it and moves on.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framecap` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptionError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The requested sampling rate is zero, negative, or not finite.
    #[error("Sample rate must be a positive number of frames per second, got {0}")]
    InvalidSampleRate(f64),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading directories or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The captioning model could not be loaded.
    #[error("Failed to load captioning model from {path}: {reason}")]
    ModelLoad {
        /// Model directory or file that failed to load.
        path: PathBuf,
        /// Underlying reason the load failed.
        reason: String,
    },

    /// Model inference failed outside the per-frame caption loop.
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// A path has no usable file stem for naming its caption file.
    #[error("Cannot derive a caption file name from {0}")]
    InvalidPath(PathBuf),
}

impl From<FfmpegError> for CaptionError {
    fn from(error: FfmpegError) -> Self {
        CaptionError::FfmpegError(error.to_string())
    }
}

/// Failure to caption a single frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InferenceError {
    /// The frame could not be turned into model input.
    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    /// The inference runtime reported an error.
    #[error("model runtime error: {0}")]
    Runtime(String),

    /// Generated token ids could not be turned back into text.
    #[error("token decoding failed: {0}")]
    Decode(String),

    /// The model produced no text for the frame.
    #[error("model produced an empty caption")]
    EmptyOutput,
}

