use std::{io, path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framecap::{
    BatchRunner, BatchSummary, CaptionConfig, CaptionModelOptions, FfmpegLogLevel,
    ProgressCallback, ProgressEvent, VitGpt2Captioner, collect_videos,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::{EnvFilter, prelude::*};

const CLI_AFTER_HELP: &str = "Examples:\n  framecap\n  framecap --input-dir footage --output-dir out --sample-rate 0.5\n  framecap --model-dir models/vit-gpt2-image-captioning --progress --json\n  framecap completions zsh > _framecap";

#[derive(Debug, Parser)]
#[command(
    name = "framecap",
    version,
    about = "Caption sampled video frames and write one caption file per video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    options: RunOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Parser, Clone)]
struct RunOptions {
    /// Directory scanned for .mp4, .mov and .avi files.
    #[arg(long, default_value = framecap::DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Directory caption files are written to (created if missing).
    #[arg(long, default_value = framecap::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Frames sampled per second of video.
    #[arg(long, default_value_t = framecap::DEFAULT_SAMPLE_RATE)]
    sample_rate: f64,

    /// Directory holding the ONNX captioning model and its tokenizer.
    #[arg(long, default_value = "models/vit-gpt2-image-captioning")]
    model_dir: PathBuf,

    /// Maximum generated caption length in tokens.
    #[arg(long)]
    max_length: Option<usize>,

    /// ONNX Runtime intra-op thread count.
    #[arg(long)]
    threads: Option<usize>,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, default_value = "error")]
    ffmpeg_log_level: FfmpegLogLevel,

    /// Show debug logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar over the videos being processed.
    #[arg(long)]
    progress: bool,

    /// Print a JSON summary of the run when it finishes.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,framecap=debug"
    } else {
        "warn,framecap=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Renders progress events as console status lines.
struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    fn new(bar: Option<ProgressBar>) -> Self {
        Self { bar }
    }

    fn print(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_event(&self, event: &ProgressEvent) {
        let line = event.to_string();
        match event {
            ProgressEvent::VideoStarted { name } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(name.clone());
                }
                self.print(line.bold().to_string());
            }
            ProgressEvent::Captioned { .. } => self.print(line),
            ProgressEvent::FrameFailed { .. } => self.print(line.red().to_string()),
            ProgressEvent::NoCaptions { .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                self.print(line.yellow().to_string());
            }
            ProgressEvent::Saved { .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                self.print(line.green().to_string());
            }
            _ => self.print(line),
        }
    }
}

fn progress_bar(options: &RunOptions) -> Result<Option<ProgressBar>, Box<dyn std::error::Error>> {
    if !options.progress {
        return Ok(None);
    }
    // A missing input directory is reported by the run itself.
    let total = collect_videos(&options.input_dir)
        .map(|videos| videos.len())
        .unwrap_or(0);
    let bar = ProgressBar::new(total as u64);
    let style =
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    Ok(Some(bar))
}

fn load_captioner(options: &RunOptions) -> Result<VitGpt2Captioner, Box<dyn std::error::Error>> {
    let mut model_options = CaptionModelOptions::from_model_dir(&options.model_dir)?;
    if let Some(max_length) = options.max_length {
        model_options = model_options.with_max_length(max_length);
    }
    if let Some(threads) = options.threads {
        model_options = model_options.with_intra_threads(threads);
    }
    Ok(VitGpt2Captioner::from_dir_with_options(
        &options.model_dir,
        model_options,
    )?)
}

fn print_summary(summary: &BatchSummary) -> Result<(), Box<dyn std::error::Error>> {
    let payload = json!({
        "videos_seen": summary.videos_seen,
        "files_written": summary.files_written,
        "videos_without_captions": summary.videos_without_captions,
        "captions_written": summary.captions_written,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "framecap", &mut io::stdout());
        return Ok(());
    }

    let options = cli.options;
    init_logging(options.verbose);
    framecap::set_ffmpeg_log_level(options.ffmpeg_log_level);

    if !(options.sample_rate.is_finite() && options.sample_rate > 0.0) {
        return Err(format!(
            "--sample-rate must be a positive number, got {}",
            options.sample_rate
        )
        .into());
    }

    let mut captioner = load_captioner(&options)?;

    let bar = progress_bar(&options)?;
    let progress = Arc::new(ConsoleProgress::new(bar.clone()));
    let config = CaptionConfig::new()
        .with_input_dir(&options.input_dir)
        .with_output_dir(&options.output_dir)
        .with_sample_rate(options.sample_rate)
        .with_progress(progress);

    let summary = BatchRunner::new(config).run(&mut captioner)?;

    if let Some(bar) = bar {
        bar.finish_with_message("done");
    }

    if options.json {
        print_summary(&summary)?;
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_layout() {
        let cli = Cli::try_parse_from(["framecap"]).unwrap();
        assert_eq!(cli.options.input_dir, PathBuf::from("videos"));
        assert_eq!(cli.options.output_dir, PathBuf::from("captions"));
        assert_eq!(cli.options.sample_rate, 1.0);
        assert_eq!(cli.options.ffmpeg_log_level, FfmpegLogLevel::Error);
        assert!(cli.command.is_none());
    }

    #[test]
    fn overrides_and_subcommand() {
        let cli = Cli::try_parse_from([
            "framecap",
            "--input-dir",
            "footage",
            "--sample-rate",
            "0.5",
            "--ffmpeg-log-level",
            "quiet",
        ])
        .unwrap();
        assert_eq!(cli.options.input_dir, PathBuf::from("footage"));
        assert_eq!(cli.options.sample_rate, 0.5);
        assert_eq!(cli.options.ffmpeg_log_level, FfmpegLogLevel::Quiet);

        let cli = Cli::try_parse_from(["framecap", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));
    }

    #[test]
    fn bad_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["framecap", "--ffmpeg-log-level", "loud"]).is_err());
    }
}
