use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::core::config::Split;
use crate::shared::constants;
use crate::utils::{file_utils, logger};

/// One named run of frames inside a source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    /// Raw descriptor timestamps (microseconds) in requested frame order.
    pub timestamps: Vec<u64>,
}

/// All sequences that share one source video URL.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    url: String,
    sequences: Vec<Sequence>,
}

impl SourceRecord {
    pub fn new(url: String, first: Sequence) -> Self {
        Self {
            url,
            sequences: vec![first],
        }
    }

    fn add(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Identifier used to name the local video and its cookie file: the part
    /// of the URL after the last `=`, made safe for use as a file name.
    pub fn video_id(&self) -> String {
        let tail = self.url.rsplit('=').next().unwrap_or(&self.url);
        tail.chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '?' | '*' | '"' | '<' | '>' | '|' => '_',
                _ => c,
            })
            .collect()
    }
}

/// Source records in first-seen order.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    records: Vec<SourceRecord>,
    rejected: usize,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `sequence` to the record for `url`, creating it if needed.
    pub fn insert(&mut self, url: String, sequence: Sequence) {
        match self.records.iter_mut().find(|record| record.url == url) {
            Some(record) => record.add(sequence),
            None => self.records.push(SourceRecord::new(url, sequence)),
        }
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    #[cfg(test)]
    pub fn into_records(self) -> Vec<SourceRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Descriptor files that could not be read or parsed.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn sequence_count(&self) -> usize {
        self.records.iter().map(SourceRecord::len).sum()
    }

    /// Prints every source with its sequences and their frame counts.
    pub fn show(&self) {
        println!("########################################");
        for record in &self.records {
            println!(" URL : {}", record.url());
            for (idx, sequence) in record.sequences().iter().enumerate() {
                println!(" SEQ_{} : {}", idx, sequence.name);
                println!(" LEN_{} : {}", idx, sequence.timestamps.len());
            }
            println!("----------------------------------------");
        }
        println!("TOTAL : {} sequences", self.sequence_count());
        println!("########################################");
    }
}

/// Parses descriptor text: the source URL on line 1, then lines whose first
/// field is an integer timestamp. Blank timestamp lines are ignored.
pub fn parse_descriptor(content: &str) -> Result<(String, Vec<u64>)> {
    let mut lines = content.lines().enumerate();

    let url = lines
        .next()
        .map(|(_, line)| line.trim())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| anyhow!("line 1: missing source URL"))?
        .to_string();

    let mut timestamps = Vec::new();
    for (idx, line) in lines {
        let Some(field) = line.split_whitespace().next() else {
            continue;
        };
        let timestamp = field
            .parse::<u64>()
            .with_context(|| format!("line {}: invalid timestamp '{}'", idx + 1, field))?;
        timestamps.push(timestamp);
    }

    Ok((url, timestamps))
}

fn sequence_name(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("descriptor path has no file name: {}", path.display()))
}

/// Keeps the contiguous chunk of `files` selected by `split`. The last chunk
/// absorbs the remainder.
pub fn select_split(files: Vec<PathBuf>, split: Option<Split>) -> Vec<PathBuf> {
    let Some(split) = split else {
        return files;
    };

    let total = files.len();
    let chunk = total / split.count;
    let start = split.index * chunk;
    let end = if split.index + 1 < split.count {
        start + chunk
    } else {
        total
    };

    files
        .into_iter()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn load_descriptor(path: &Path) -> Result<(String, Sequence)> {
    let content = file_utils::read_to_string(path)?;
    let (url, timestamps) = parse_descriptor(&content)
        .with_context(|| format!("Failed to parse descriptor {}", path.display()))?;
    let name = sequence_name(path)?;
    Ok((url, Sequence { name, timestamps }))
}

/// Builds the registry from already-selected descriptor files. Unreadable
/// or malformed descriptors are logged and counted, not loaded.
pub fn load_registry(files: &[PathBuf]) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for path in files {
        match load_descriptor(path) {
            Ok((url, sequence)) => registry.insert(url, sequence),
            Err(err) => {
                logger::error(&format!("{:#}", err));
                registry.rejected += 1;
            }
        }
    }
    registry
}

/// Lists, partitions and parses every descriptor under `dataroot`.
pub fn load(dataroot: &Path, split: Option<Split>) -> Result<SourceRegistry> {
    logger::info(&format!("Loading data list from {}", dataroot.display()));
    let files = file_utils::list_files(dataroot, constants::DESCRIPTOR_EXTENSION)?;
    let total = files.len();
    let files = select_split(files, split);
    if let Some(split) = split {
        logger::info(&format!(
            "Split {}/{}: {} of {} descriptor files",
            split.index, split.count, files.len(), total
        ));
    }
    let registry = load_registry(&files);
    if registry.rejected() > 0 {
        logger::warn(&format!(
            "Skipped {} of {} descriptor files that could not be loaded",
            registry.rejected(),
            files.len()
        ));
    }
    Ok(registry)
}
