mod core;
mod shared;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::core::config::{Mode, RunConfig, Settings, Split};
use crate::core::extractor::FfmpegExtractor;
use crate::core::fetcher::YtDlpFetcher;
use crate::core::metadata;
use crate::core::pipeline::{Pipeline, PipelineOptions};
use crate::utils::logger;

/// Download and process the RealEstate10K dataset
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dataset split to process
    #[arg(value_enum)]
    mode: Mode,

    /// Index of current split
    #[arg(long = "split_idx", requires = "num_splits")]
    split_idx: Option<usize>,

    /// Total number of splits
    #[arg(long = "num_splits", requires = "split_idx")]
    num_splits: Option<usize>,

    /// Number of download threads to use
    #[arg(long = "num_threads")]
    num_threads: Option<usize>,

    /// Number of concurrent frame extraction workers per video
    #[arg(long = "extract_threads")]
    extract_threads: Option<usize>,

    /// Directory holding the <mode>/ descriptor folders
    #[arg(long)]
    dataroot: Option<PathBuf>,

    /// Directory receiving the <mode>/ frame folders
    #[arg(long = "output_root")]
    output_root: Option<PathBuf>,

    /// Directory holding per-video cookie files
    #[arg(long = "cookies_dir")]
    cookies_dir: Option<PathBuf>,

    /// Directory for downloaded videos while they are processed
    #[arg(long = "work_dir")]
    work_dir: Option<PathBuf>,

    /// JSON config file (defaults to re10k-fetch.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give up on a download after this many seconds
    #[arg(long = "fetch_timeout")]
    fetch_timeout: Option<u64>,

    /// yt-dlp executable
    #[arg(long)]
    ytdlp: Option<String>,

    /// ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Print the loaded sequence list and exit
    #[arg(long = "show_only", default_value_t = false)]
    show_only: bool,
}

impl Cli {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(n) = self.num_threads {
            settings.num_threads = n;
        }
        if let Some(n) = self.extract_threads {
            settings.extract_threads = n;
        }
        if let Some(dir) = &self.dataroot {
            settings.dataroot = dir.clone();
        }
        if let Some(dir) = &self.output_root {
            settings.output_root = dir.clone();
        }
        if let Some(dir) = &self.cookies_dir {
            settings.cookies_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            settings.work_dir = dir.clone();
        }
        if let Some(secs) = self.fetch_timeout {
            settings.fetch_timeout_secs = Some(secs);
        }
        if let Some(bin) = &self.ytdlp {
            settings.ytdlp_bin = bin.clone();
        }
        if let Some(bin) = &self.ffmpeg {
            settings.ffmpeg_bin = bin.clone();
        }
        settings
    }

    /// Tags log banners so concurrent split runs can be told apart.
    fn run_label(&self) -> String {
        match (self.split_idx, self.num_splits) {
            (Some(index), Some(count)) => format!("{} split {}/{}", self.mode, index, count),
            _ => self.mode.to_string(),
        }
    }

    fn split(&self) -> Result<Option<Split>> {
        match (self.split_idx, self.num_splits) {
            (Some(index), Some(count)) => Ok(Some(Split::new(index, count)?)),
            _ => Ok(None),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(&std::env::current_dir()?, &cli.run_label());

    let settings = cli.apply(Settings::load(cli.config.as_deref())?);
    let config = RunConfig::resolve(cli.mode, cli.split()?, settings)?;

    let registry = metadata::load(&config.dataroot, config.split)?;
    logger::info(&format!(
        "{} movies are used in {} mode",
        registry.len(),
        config.mode
    ));
    registry.show();

    if registry.is_empty() {
        logger::warn("No sequences selected; nothing to do");
        return Ok(());
    }

    if cli.show_only {
        return Ok(());
    }

    let fetcher = YtDlpFetcher::new(
        config.ytdlp_bin.clone(),
        config.max_height,
        config.fetch_timeout,
    );
    let extractor = FfmpegExtractor::new(config.ffmpeg_bin.clone());
    let pipeline = Pipeline::new(
        PipelineOptions::from(&config),
        Arc::new(fetcher),
        Arc::new(extractor),
    );

    let stop = pipeline.stop_flag();
    ctrlc::set_handler(move || {
        if !stop.swap(true, Ordering::SeqCst) {
            logger::warn("Interrupt received; finishing in-flight videos, no new downloads");
        }
    })?;

    let summary = pipeline.run(registry.records())?;
    summary.log();
    logger::info("Done!");
    Ok(())
}
