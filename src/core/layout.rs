use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::core::metadata::SourceRecord;
use crate::shared::constants;
use crate::utils::file_utils;

/// Result of trying to take ownership of a sequence's output directory.
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// `<output_root>/<sequence>/<timestamp>.png` layout plus the
/// "directory exists means done" checks at source and sequence level.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the output root. Failure here is fatal for the whole run.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create output root {}", self.root.display()))
    }

    pub fn sequence_dir(&self, sequence: &str) -> PathBuf {
        self.root.join(sequence)
    }

    pub fn frame_path(&self, sequence: &str, timestamp: u64) -> PathBuf {
        self.sequence_dir(sequence)
            .join(format!("{}.{}", timestamp, constants::FRAME_EXTENSION))
    }

    pub fn sequence_done(&self, sequence: &str) -> bool {
        self.sequence_dir(sequence).exists()
    }

    /// True when every sequence of `record` already has an output directory.
    pub fn source_done(&self, record: &SourceRecord) -> bool {
        record
            .sequences()
            .iter()
            .all(|sequence| self.sequence_done(&sequence.name))
    }

    /// Atomically creates the sequence directory. An existing directory is a
    /// skip signal, not an error.
    pub fn claim_sequence(&self, sequence: &str) -> std::io::Result<Claim> {
        let dir = self.sequence_dir(sequence);
        match fs::create_dir(&dir) {
            Ok(()) => Ok(Claim::Created(dir)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(Claim::AlreadyExists(dir)),
            Err(err) => Err(err),
        }
    }

    pub fn discard_sequence(&self, sequence: &str) -> std::io::Result<()> {
        file_utils::remove_dir_if_exists(&self.sequence_dir(sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{Sequence, SourceRegistry};

    fn record(names: &[&str]) -> SourceRecord {
        let mut registry = SourceRegistry::new();
        for name in names {
            registry.insert(
                "https://y?v=id".to_string(),
                Sequence {
                    name: name.to_string(),
                    timestamps: vec![1000],
                },
            );
        }
        registry.into_records().remove(0)
    }

    #[test]
    fn test_frame_path_uses_literal_timestamp() {
        let layout = OutputLayout::new("/out/test");
        assert_eq!(
            layout.frame_path("seq", 3_725_400),
            PathBuf::from("/out/test/seq/3725400.png")
        );
    }

    #[test]
    fn test_claim_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());

        assert!(matches!(layout.claim_sequence("a").unwrap(), Claim::Created(_)));
        assert!(matches!(layout.claim_sequence("a").unwrap(), Claim::AlreadyExists(_)));

        layout.discard_sequence("a").unwrap();
        assert!(!layout.sequence_done("a"));
    }

    #[test]
    fn test_source_done_requires_every_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let record = record(&["a", "b"]);

        assert!(!layout.source_done(&record));
        layout.claim_sequence("a").unwrap();
        assert!(!layout.source_done(&record));
        layout.claim_sequence("b").unwrap();
        assert!(layout.source_done(&record));
    }
}
