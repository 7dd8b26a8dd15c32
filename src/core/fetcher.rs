use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::core::error::FetchError;
use crate::core::tool::run_checked;
use crate::utils::file_utils;
use crate::utils::logger;

/// Downloads one source video to a local file.
pub trait VideoFetcher: Send + Sync {
    /// Downloads `url` into `destination` using the cookie file at
    /// `credential`, returning the path of the local video.
    fn fetch(
        &self,
        url: &str,
        credential: &Path,
        destination: &Path,
    ) -> Result<PathBuf, FetchError>;
}

/// `yt-dlp` adapter requesting the best video-only stream at or below
/// `max_height` lines.
pub struct YtDlpFetcher {
    binary: String,
    max_height: u32,
    timeout: Option<Duration>,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>, max_height: u32, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            max_height,
            timeout,
        }
    }

    pub fn format_selector(&self) -> String {
        format!("bestvideo[height<={}]", self.max_height)
    }

    fn command(&self, url: &str, credential: &Path, destination: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--quiet")
            .arg("--no-warnings")
            .arg("--no-progress")
            // Write straight to the destination so a failed download leaves
            // no stray `.part` file behind.
            .arg("--no-part")
            .arg("-f")
            .arg(self.format_selector())
            .arg("-o")
            .arg(destination);
        if credential.exists() {
            cmd.arg("--cookies").arg(credential);
        } else {
            logger::debug(&format!("No cookie file at {}", credential.display()));
        }
        cmd.arg(url);
        cmd
    }
}

impl VideoFetcher for YtDlpFetcher {
    fn fetch(
        &self,
        url: &str,
        credential: &Path,
        destination: &Path,
    ) -> Result<PathBuf, FetchError> {
        let mut cmd = self.command(url, credential, destination);
        run_checked(&self.binary, &mut cmd, self.timeout)?;

        if !destination.is_file() {
            return Err(FetchError::MissingOutput(destination.to_path_buf()));
        }
        Ok(destination.to_path_buf())
    }
}

/// Files a source leaves in the working directories while it is processed.
#[derive(Debug, Clone)]
pub struct SourceArtifacts {
    pub video: PathBuf,
    pub credential: PathBuf,
}

impl SourceArtifacts {
    pub fn new(video: PathBuf, credential: PathBuf) -> Self {
        Self { video, credential }
    }

    pub fn remove_video(&self) {
        if let Err(err) = file_utils::remove_file_if_exists(&self.video) {
            logger::error(&format!(
                "Failed to remove video {}: {}",
                self.video.display(),
                err
            ));
        }
    }

    pub fn remove_credential(&self) {
        if let Err(err) = file_utils::remove_file_if_exists(&self.credential) {
            logger::error(&format!(
                "Failed to remove cookie file {}: {}",
                self.credential.display(),
                err
            ));
        }
    }

    pub fn cleanup(&self) {
        self.remove_credential();
        self.remove_video();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ToolError;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn test_command_requests_height_bound_stream() {
        let fetcher = YtDlpFetcher::new("yt-dlp", 480, None);
        assert_eq!(fetcher.format_selector(), "bestvideo[height<=480]");

        let dir = tempfile::tempdir().unwrap();
        let cookie = dir.path().join("abc.txt");
        std::fs::write(&cookie, "# Netscape HTTP Cookie File\n").unwrap();

        let cmd = fetcher.command("https://y?v=abc", &cookie, &dir.path().join("abc"));
        let args = args(&cmd);
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "bestvideo[height<=480]"));
        assert!(args.windows(2).any(|w| w[0] == "--cookies"));
        assert_eq!(args.last().unwrap(), "https://y?v=abc");
    }

    #[test]
    fn test_command_omits_missing_cookie_file() {
        let fetcher = YtDlpFetcher::new("yt-dlp", 360, None);
        let dir = tempfile::tempdir().unwrap();
        let cmd = fetcher.command(
            "https://y?v=abc",
            &dir.path().join("none.txt"),
            &dir.path().join("abc"),
        );
        assert!(!args(&cmd).iter().any(|a| a == "--cookies"));
    }

    #[test]
    fn test_missing_binary_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new("no-such-downloader-xyz", 480, None);
        let err = fetcher
            .fetch(
                "https://y?v=abc",
                &dir.path().join("c.txt"),
                &dir.path().join("abc"),
            )
            .unwrap_err();
        assert!(matches!(err, FetchError::Tool(ToolError::Launch { .. })));
    }

    #[test]
    fn test_cleanup_removes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts =
            SourceArtifacts::new(dir.path().join("abc"), dir.path().join("abc.txt"));
        std::fs::write(&artifacts.video, b"video").unwrap();
        std::fs::write(&artifacts.credential, b"cookie").unwrap();

        artifacts.cleanup();
        assert!(!artifacts.video.exists());
        assert!(!artifacts.credential.exists());

        // Second cleanup is a no-op.
        artifacts.cleanup();
    }
}
