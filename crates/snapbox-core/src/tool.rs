//! Argv-vector invocation of external tools.

use std::path::PathBuf;
use std::process::Command;

use snapbox_common::error::{Result, SnapboxError};

/// Runs an external tool, capturing stdout.
///
/// # Errors
///
/// Returns an I/O error if the program cannot be spawned, or an
/// `External` error carrying the tool's stderr on nonzero exit.
pub(crate) fn run(program: &'static str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| SnapboxError::Io {
            path: PathBuf::from(program),
            source: e,
        })?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    Err(SnapboxError::External {
        program,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
