pub const APP_NAME: &str = "re10k-fetch";

pub const CONFIG_FILE: &str = "re10k-fetch.json";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const RUN_LOG_FILE: &str = "download.log";

pub const DEFAULT_DATAROOT: &str = "./RealEstate10K";
pub const DEFAULT_OUTPUT_ROOT: &str = "./dataset";
pub const DEFAULT_COOKIES_DIR: &str = "./cookies";
pub const DEFAULT_WORK_DIR: &str = ".";
pub const DEFAULT_FAILURE_LOG_DIR: &str = ".";

pub const DEFAULT_NUM_THREADS: usize = 8;
pub const DEFAULT_EXTRACT_THREADS: usize = 16;
pub const DEFAULT_MAX_HEIGHT: u32 = 480;

pub const DEFAULT_YTDLP_BIN: &str = "yt-dlp";
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";

pub const DESCRIPTOR_EXTENSION: &str = "txt";
pub const COOKIE_EXTENSION: &str = "txt";
pub const FRAME_EXTENSION: &str = "png";
pub const FAILURE_LOG_PREFIX: &str = "failed_videos_";
