use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::constants;
use crate::utils::file_utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Train,
    Test,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects chunk `index` of `count` contiguous chunks of the descriptor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub index: usize,
    pub count: usize,
}

impl Split {
    pub fn new(index: usize, count: usize) -> Result<Self> {
        if count == 0 {
            anyhow::bail!("--num_splits must be at least 1");
        }
        if index >= count {
            anyhow::bail!("--split_idx {} is out of range for --num_splits {}", index, count);
        }
        Ok(Self { index, count })
    }
}

/// Settings that can come from the JSON config file. Missing keys keep
/// their defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub dataroot: PathBuf,
    pub output_root: PathBuf,
    pub cookies_dir: PathBuf,
    pub work_dir: PathBuf,
    pub failure_log_dir: PathBuf,
    pub num_threads: usize,
    pub extract_threads: usize,
    pub max_height: u32,
    pub fetch_timeout_secs: Option<u64>,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataroot: PathBuf::from(constants::DEFAULT_DATAROOT),
            output_root: PathBuf::from(constants::DEFAULT_OUTPUT_ROOT),
            cookies_dir: PathBuf::from(constants::DEFAULT_COOKIES_DIR),
            work_dir: PathBuf::from(constants::DEFAULT_WORK_DIR),
            failure_log_dir: PathBuf::from(constants::DEFAULT_FAILURE_LOG_DIR),
            num_threads: constants::DEFAULT_NUM_THREADS,
            extract_threads: constants::DEFAULT_EXTRACT_THREADS,
            max_height: constants::DEFAULT_MAX_HEIGHT,
            fetch_timeout_secs: None,
            ytdlp_bin: constants::DEFAULT_YTDLP_BIN.to_string(),
            ffmpeg_bin: constants::DEFAULT_FFMPEG_BIN.to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or from the default config file when it
    /// exists. Falls back to built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = PathBuf::from(constants::CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = file_utils::read_to_string(&path)?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub split: Option<Split>,
    pub dataroot: PathBuf,
    pub output_root: PathBuf,
    pub cookies_dir: PathBuf,
    pub work_dir: PathBuf,
    pub failure_log_path: PathBuf,
    pub num_threads: usize,
    pub extract_threads: usize,
    pub max_height: u32,
    pub fetch_timeout: Option<Duration>,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
}

impl RunConfig {
    pub fn resolve(mode: Mode, split: Option<Split>, settings: Settings) -> Result<Self> {
        if settings.num_threads == 0 {
            anyhow::bail!("--num_threads must be at least 1");
        }
        if settings.extract_threads == 0 {
            anyhow::bail!("--extract_threads must be at least 1");
        }
        if settings.max_height == 0 {
            anyhow::bail!("max_height must be at least 1");
        }

        let failure_log_path = settings.failure_log_dir.join(format!(
            "{}{}.txt",
            constants::FAILURE_LOG_PREFIX,
            mode
        ));

        Ok(Self {
            mode,
            split,
            dataroot: settings.dataroot.join(mode.as_str()),
            output_root: settings.output_root.join(mode.as_str()),
            cookies_dir: settings.cookies_dir,
            work_dir: settings.work_dir,
            failure_log_path,
            num_threads: settings.num_threads,
            extract_threads: settings.extract_threads,
            max_height: settings.max_height,
            fetch_timeout: settings.fetch_timeout_secs.map(Duration::from_secs),
            ytdlp_bin: settings.ytdlp_bin,
            ffmpeg_bin: settings.ffmpeg_bin,
        })
    }
}
