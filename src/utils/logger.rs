use crate::shared::constants;
use lazy_static::lazy_static;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic::{self, Location};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Clone)]
struct LoggerPaths {
    error_path: PathBuf,
    run_path: PathBuf,
}

lazy_static! {
    static ref LOGGER: Mutex<Option<LoggerPaths>> = Mutex::new(None);
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", line);
    }
}

fn start_file(path: &Path, title: &str, label: &str) {
    // Several split runs may share one working directory, so never truncate.
    append_line(
        path,
        &format!(
            "=== {} Started: {} ({}, pid {}) ===",
            title,
            chrono::Local::now(),
            label,
            std::process::id()
        ),
    );
}

/// Renders a panic payload and its source location for the error log.
fn panic_message(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    let at = location
        .map(|l| format!("{}:{}", l.file(), l.line()))
        .unwrap_or_else(|| "unknown location".to_string());
    format!("PANIC at {}: {}", at, text)
}

fn open_logs(dir: &Path, label: &str) -> LoggerPaths {
    let paths = LoggerPaths {
        error_path: dir.join(constants::ERROR_LOG_FILE),
        run_path: dir.join(constants::RUN_LOG_FILE),
    };
    start_file(&paths.error_path, "Error Log", label);
    start_file(&paths.run_path, "Run Log", label);

    *LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(paths.clone());
    paths
}

/// Appends a start banner tagged with `label` to the run/error logs in `dir`
/// and installs the panic hook.
pub fn init(dir: &Path, label: &str) {
    let paths = open_logs(dir, label);

    panic::set_hook(Box::new(move |info| {
        let entry = format!(
            "{}\nBacktrace:\n{}",
            panic_message(info.payload(), info.location()),
            Backtrace::capture()
        );
        append_line(&paths.error_path, &entry);
        append_line(&paths.run_path, &entry);

        eprintln!(
            "{} crashed. See {} for details.",
            constants::APP_NAME,
            paths.error_path.display()
        );
    }));
}

pub fn log(level: &str, msg: &str) {
    match level {
        "ERROR" | "WARNING" => eprintln!("[{}] {}", level, msg),
        "DEBUG" => {}
        _ => println!("[{}] {}", level, msg),
    }

    let guard = LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(paths) = guard.as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{}][{}] {}", timestamp, level, msg);
        append_line(&paths.run_path, &line);

        if level == "ERROR" {
            append_line(&paths.error_path, &line);
        }
    }
}

pub fn info(msg: &str) {
    log("INFO", msg);
}

pub fn warn(msg: &str) {
    log("WARNING", msg);
}

pub fn error(msg: &str) {
    log("ERROR", msg);
}

pub fn debug(msg: &str) {
    log("DEBUG", msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reinit_keeps_earlier_lines() {
        let dir = tempfile::tempdir().unwrap();
        open_logs(dir.path(), "test split 0/2");
        error("Failed to process seqA");
        open_logs(dir.path(), "test split 1/2");
        info("second run");

        let run_log = fs::read_to_string(dir.path().join(constants::RUN_LOG_FILE)).unwrap();
        let error_log = fs::read_to_string(dir.path().join(constants::ERROR_LOG_FILE)).unwrap();
        assert!(run_log.contains("seqA"));
        assert!(error_log.contains("seqA"));
        assert!(run_log.contains("split 0/2"));
        assert!(run_log.contains("split 1/2"));
    }

    #[test]
    fn test_panic_message_formats_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref(), None), "PANIC at unknown location: boom");

        let fixed: Box<dyn Any + Send> = Box::new("static boom");
        let message = panic_message(fixed.as_ref(), Some(Location::caller()));
        assert!(message.ends_with(": static boom"));

        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert!(panic_message(other.as_ref(), None).contains("non-string"));
    }
}
