use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of running an external tool to completion.
pub enum ToolOutcome {
    Exited { status: ExitStatus, stderr: String },
    TimedOut,
}

/// Runs `command` with stdout discarded and stderr captured.
///
/// With a `timeout`, the child is polled and killed once the deadline passes.
pub fn run_tool(command: &mut Command, timeout: Option<Duration>) -> std::io::Result<ToolOutcome> {
    // Keep terminal Ctrl-C away from the tool so in-flight work can finish.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain stderr on a side thread so a chatty tool never blocks on a full pipe.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let status = match timeout {
        None => Some(child.wait()?),
        Some(limit) => {
            let deadline = Instant::now() + limit;
            loop {
                if let Some(status) = child.try_wait()? {
                    break Some(status);
                }
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    // A killed tool may leave grandchildren holding the pipe, so the reader
    // is only joined after a normal exit.
    Ok(match status {
        Some(status) => {
            let stderr = stderr_reader
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default();
            ToolOutcome::Exited {
                status,
                stderr: stderr.trim().to_string(),
            }
        }
        None => ToolOutcome::TimedOut,
    })
}
