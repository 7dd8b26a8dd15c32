use std::path::Path;
use std::process::Command;

use crate::core::error::ExtractError;
use crate::core::layout::{Claim, OutputLayout};
use crate::core::metadata::Sequence;
use crate::core::tool::run_checked;
use crate::utils::logger;
use crate::utils::time_utils::format_timecode;

/// Pulls a single still frame out of a local video.
pub trait FrameExtractor: Send + Sync {
    fn extract_frame(
        &self,
        video: &Path,
        timecode: &str,
        output: &Path,
    ) -> Result<(), ExtractError>;
}

/// `ffmpeg` adapter: input-side seek, one frame, image2 muxer.
pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, video: &Path, timecode: &str, output: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-nostdin")
            .arg("-loglevel")
            .arg("error")
            .arg("-ss")
            .arg(timecode)
            .arg("-i")
            .arg(video)
            .arg("-vframes")
            .arg("1")
            .arg("-f")
            .arg("image2")
            .arg(output);
        cmd
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract_frame(
        &self,
        video: &Path,
        timecode: &str,
        output: &Path,
    ) -> Result<(), ExtractError> {
        let mut cmd = self.command(video, timecode, output);
        run_checked(&self.binary, &mut cmd, None).map_err(|source| ExtractError::Tool {
            timecode: timecode.to_string(),
            source,
        })?;

        // ffmpeg exits 0 when the seek lands past the end and writes nothing.
        if !output.is_file() {
            return Err(ExtractError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    Extracted { frames: usize },
    /// Output directory already existed.
    Skipped,
    /// A frame failed; the partial directory was removed.
    Failed,
}

impl SequenceOutcome {
    pub fn is_fatal(self) -> bool {
        matches!(self, SequenceOutcome::Failed)
    }
}

/// Extracts every frame of `sequence` from `video` into its output directory.
///
/// Frames are taken in stored order. The first failure discards the whole
/// directory and stops the sequence.
pub fn extract_sequence(
    extractor: &dyn FrameExtractor,
    video: &Path,
    sequence: &Sequence,
    layout: &OutputLayout,
) -> SequenceOutcome {
    match layout.claim_sequence(&sequence.name) {
        Ok(Claim::Created(_)) => {}
        Ok(Claim::AlreadyExists(dir)) => {
            logger::warn(&format!("The output dir {} has already existed.", dir.display()));
            return SequenceOutcome::Skipped;
        }
        Err(source) => {
            let err = ExtractError::CreateDir {
                path: layout.sequence_dir(&sequence.name),
                source,
            };
            logger::error(&format!("Sequence {}: {}", sequence.name, err));
            return SequenceOutcome::Failed;
        }
    }

    for &timestamp in &sequence.timestamps {
        let timecode = format_timecode(timestamp);
        let output = layout.frame_path(&sequence.name, timestamp);

        if let Err(err) = extractor.extract_frame(video, &timecode, &output) {
            logger::error(&format!(
                "Failed to process {} ({}): {}",
                sequence.name,
                video.display(),
                err
            ));
            if let Err(err) = layout.discard_sequence(&sequence.name) {
                logger::error(&format!(
                    "Failed to remove partial output {}: {}",
                    layout.sequence_dir(&sequence.name).display(),
                    err
                ));
            }
            return SequenceOutcome::Failed;
        }
    }

    logger::debug(&format!(
        "Sequence {}: {} frames",
        sequence.name,
        sequence.timestamps.len()
    ));
    SequenceOutcome::Extracted {
        frames: sequence.timestamps.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    /// Writes a stub image per call; fails on the `fail_at`-th call.
    struct RecordingExtractor {
        calls: Mutex<Vec<String>>,
        fail_at: Option<usize>,
    }

    impl RecordingExtractor {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at,
            }
        }
    }

    impl FrameExtractor for RecordingExtractor {
        fn extract_frame(
            &self,
            _video: &Path,
            timecode: &str,
            output: &Path,
        ) -> Result<(), ExtractError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(timecode.to_string());
            if self.fail_at == Some(calls.len()) {
                return Err(ExtractError::MissingOutput(output.to_path_buf()));
            }
            fs::write(output, b"png").unwrap();
            Ok(())
        }
    }

    fn sequence(name: &str, timestamps: &[u64]) -> Sequence {
        Sequence {
            name: name.to_string(),
            timestamps: timestamps.to_vec(),
        }
    }

    #[test]
    fn test_extracts_frames_in_order_named_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let extractor = RecordingExtractor::new(None);

        let seq = sequence("seq", &[3_600_000_000, 1_500_000]);
        let outcome = extract_sequence(&extractor, Path::new("video"), &seq, &layout);

        assert_eq!(outcome, SequenceOutcome::Extracted { frames: 2 });
        assert_eq!(
            *extractor.calls.lock().unwrap(),
            vec!["01:00:00.000".to_string(), "00:00:01.500".to_string()]
        );
        assert!(layout.frame_path("seq", 3_600_000_000).is_file());
        assert!(layout.frame_path("seq", 1_500_000).is_file());
    }

    #[test]
    fn test_existing_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        fs::create_dir(layout.sequence_dir("seq")).unwrap();
        let extractor = RecordingExtractor::new(None);

        let seq = sequence("seq", &[1]);
        let outcome = extract_sequence(&extractor, Path::new("video"), &seq, &layout);

        assert_eq!(outcome, SequenceOutcome::Skipped);
        assert!(!outcome.is_fatal());
        assert!(extractor.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failure_discards_directory_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let extractor = RecordingExtractor::new(Some(2));

        let seq = sequence("seq", &[1_000, 2_000, 3_000, 4_000]);
        let outcome = extract_sequence(&extractor, Path::new("video"), &seq, &layout);

        assert!(outcome.is_fatal());
        assert!(!layout.sequence_dir("seq").exists());
        assert_eq!(extractor.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_ffmpeg_command_line() {
        let extractor = FfmpegExtractor::new("ffmpeg");
        let cmd = extractor.command(
            Path::new("abc"),
            "00:00:03.725",
            Path::new("out/seq/3725400.png"),
        );
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            args,
            vec![
                "-nostdin",
                "-loglevel",
                "error",
                "-ss",
                "00:00:03.725",
                "-i",
                "abc",
                "-vframes",
                "1",
                "-f",
                "image2",
                "out/seq/3725400.png",
            ]
        );
    }
}
