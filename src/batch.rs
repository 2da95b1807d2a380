//! Directory-level batch driver.
//!
//! [`BatchRunner`] scans the configured input directory for videos, runs
//! the caption loop on each one, and writes `<video-stem>.txt` into the
//! output directory. Videos that yield no captions get no file. Failures to
//! touch the filesystem end the run; everything that goes wrong inside a
//! single video is absorbed by the video processor.
//!
//! # Example
//!
//! ```no_run
//! use framecap::{BatchRunner, CaptionConfig, InferenceError};
//! use image::RgbImage;
//!
//! let mut captioner = |_: &RgbImage| -> Result<String, InferenceError> {
//!     Ok("a frame".to_string())
//! };
//! let summary = BatchRunner::new(CaptionConfig::new()).run(&mut captioner)?;
//! println!("wrote {} caption file(s)", summary.files_written);
//! # Ok::<(), framecap::CaptionError>(())
//! ```

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    captioner::Captioner, config::CaptionConfig, error::CaptionError, processor,
    progress::ProgressEvent,
};

/// File extensions (lowercase, without the dot) treated as videos.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];

/// Whether `path` has one of the [`VIDEO_EXTENSIONS`], in any case.
pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}

/// Caption file name for a video: its file stem with a `.txt` extension.
pub fn caption_file_name<P: AsRef<Path>>(video_path: P) -> Option<PathBuf> {
    let mut name = video_path.as_ref().file_stem()?.to_os_string();
    name.push(".txt");
    Some(PathBuf::from(name))
}

/// Write `captions` to `path`, replacing any existing file.
///
/// Each caption becomes a line `Frame <n>: <caption>` with `n` counting
/// from 1.
pub fn write_caption_file<P: AsRef<Path>>(
    path: P,
    captions: &[String],
) -> Result<(), CaptionError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for (index, caption) in captions.iter().enumerate() {
        writeln!(writer, "Frame {}: {caption}", index + 1)?;
    }
    writer.flush()?;
    Ok(())
}

/// List the video files directly inside `input_dir`, sorted by file name.
///
/// Subdirectories and files without a video extension are skipped.
pub fn collect_videos<P: AsRef<Path>>(input_dir: P) -> Result<Vec<PathBuf>, CaptionError> {
    let mut videos = Vec::new();
    for entry in fs::read_dir(input_dir.as_ref())? {
        let entry = entry?;
        let path = entry.path();
        if !is_video_file(&path) {
            continue;
        }
        if !entry.file_type()?.is_file() && !path.is_file() {
            log::debug!("Skipping non-file entry {}", path.display());
            continue;
        }
        videos.push(path);
    }
    videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(videos)
}

/// Totals for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Video files found in the input directory.
    pub videos_seen: usize,
    /// Caption files written.
    pub files_written: usize,
    /// Videos that produced no captions (and so no file).
    pub videos_without_captions: usize,
    /// Caption lines written across all files.
    pub captions_written: usize,
}

/// Runs the caption loop over every video in a directory.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    config: CaptionConfig,
}

impl BatchRunner {
    pub fn new(config: CaptionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptionConfig {
        &self.config
    }

    /// Caption every video in the input directory.
    ///
    /// Creates the output directory first if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CaptionError::IoError`] if the output directory cannot be
    /// created, the input directory cannot be listed, or a caption file
    /// cannot be written.
    pub fn run<C>(&self, captioner: &mut C) -> Result<BatchSummary, CaptionError>
    where
        C: Captioner + ?Sized,
    {
        let config = &self.config;
        fs::create_dir_all(&config.output_dir)?;

        let videos = collect_videos(&config.input_dir)?;
        log::info!(
            "Found {} video(s) in {}",
            videos.len(),
            config.input_dir.display()
        );

        let mut summary = BatchSummary {
            videos_seen: videos.len(),
            ..BatchSummary::default()
        };

        for video in &videos {
            let name = video
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| video.display().to_string());
            config.emit(ProgressEvent::VideoStarted { name: name.clone() });

            let captions = processor::caption_video(
                video,
                config.sample_rate,
                &mut *captioner,
                config.progress.as_ref(),
            );

            if captions.is_empty() {
                summary.videos_without_captions += 1;
                config.emit(ProgressEvent::NoCaptions { name });
                continue;
            }

            let file_name =
                caption_file_name(video).ok_or_else(|| CaptionError::InvalidPath(video.clone()))?;
            let output_path = config.output_dir.join(file_name);
            write_caption_file(&output_path, &captions)?;
            log::info!(
                "Wrote {} caption(s) to {}",
                captions.len(),
                output_path.display()
            );

            summary.files_written += 1;
            summary.captions_written += captions.len();
            config.emit(ProgressEvent::Saved { path: output_path });
        }

        Ok(summary)
    }
}
