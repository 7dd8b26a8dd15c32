use std::path::PathBuf;
use thiserror::Error;

/// Failure of one external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("{tool} timed out after {secs}s")]
    TimedOut { tool: String, secs: u64 },
}

/// Download of a source video failed. Terminal for that source only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("downloaded video not found at {0}")]
    MissingOutput(PathBuf),
}

/// Extraction of one frame failed. Terminal for the owning sequence only.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("frame at {timecode}: {source}")]
    Tool {
        timecode: String,
        #[source]
        source: ToolError,
    },
    #[error("extracted frame not found at {0}")]
    MissingOutput(PathBuf),
    #[error("cannot create sequence directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
