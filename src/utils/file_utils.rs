use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lists regular files in `dir` with the given extension, sorted by name.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == extension)
        })
        .collect();

    files.sort();

    if files.is_empty() {
        anyhow::bail!(
            "No files with extension '{}' found in '{}'",
            extension,
            dir.display()
        );
    }

    Ok(files)
}

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Removes a file, treating "not found" as success.
pub fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Removes a directory tree, treating "not found" as success.
pub fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::write(dir.path().join("c.json"), "x").unwrap();
        fs::create_dir(dir.path().join("d.txt")).unwrap();

        let files = list_files(dir.path(), "txt").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_list_files_empty_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(dir.path(), "txt").is_err());
    }

    #[test]
    fn test_remove_missing_paths_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_file_if_exists(&dir.path().join("nope")).is_ok());
        assert!(remove_dir_if_exists(&dir.path().join("nope")).is_ok());
    }
}
