use std::process::Command;
use std::time::Duration;

use crate::core::error::ToolError;
use crate::utils::process::{self, ToolOutcome};

/// Runs `program` through the process runner and maps the outcome to a
/// [`ToolError`].
pub fn run_checked(
    program: &str,
    command: &mut Command,
    timeout: Option<Duration>,
) -> Result<(), ToolError> {
    let outcome = process::run_tool(command, timeout).map_err(|source| ToolError::Launch {
        tool: program.to_string(),
        source,
    })?;

    match outcome {
        ToolOutcome::Exited { status, .. } if status.success() => Ok(()),
        ToolOutcome::Exited { status, stderr } => Err(ToolError::Failed {
            tool: program.to_string(),
            status: status.to_string(),
            stderr,
        }),
        ToolOutcome::TimedOut => Err(ToolError::TimedOut {
            tool: program.to_string(),
            secs: timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }),
    }
}
