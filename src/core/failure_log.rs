use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only list of source URLs whose download failed, one per line.
///
/// Appends are serialized so concurrent failures never interleave.
pub struct FailureLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `url` and then runs `on_recorded` while still holding the lock.
    pub fn record<F: FnOnce()>(&self, url: &str, on_recorded: F) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", url).as_bytes())?;
        on_recorded();
        Ok(())
    }
}
