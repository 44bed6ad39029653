//! Attach to a running container.
//!
//! The supervisor records the container init's host PID at fork time;
//! attach reads that record, verifies the process still lives, joins its
//! namespace set, and execs the requested argv under the container root.

use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::ContainerId;
use snapbox_core::btrfs::SubvolumeStore;
use snapbox_core::namespace;

use crate::artifacts;

/// Runs a command inside a running container.
///
/// The argv is executed directly, without shell wrapping. The payload's
/// exit status is logged but is not an engine-level error.
///
/// # Errors
///
/// Returns `NotFound` for an unknown container, `NotRunning` when no
/// live init process is recorded, and surfaces namespace or chroot
/// refusals.
pub fn exec(store: &SubvolumeStore, id: &ContainerId, argv: &[String]) -> Result<()> {
    if !store.exists(id.as_str())? {
        return Err(SnapboxError::NotFound {
            kind: "container",
            id: id.to_string(),
        });
    }
    if argv.is_empty() {
        return Err(SnapboxError::Config {
            message: "exec command is empty".into(),
        });
    }

    let root = store.path_of(id.as_str());
    let pid = artifacts::read_pid(&root, id)?.ok_or_else(|| SnapboxError::NotRunning {
        id: id.to_string(),
    })?;
    if !namespace::process_alive(pid) {
        artifacts::clear_pid(&root, id);
        return Err(SnapboxError::NotRunning { id: id.to_string() });
    }

    tracing::info!(id = %id, pid, cmd = ?argv, "attaching to container");
    enter_and_exec(&root, pid, argv)
}

/// Joins the target's namespaces and chroots before forking; PID
/// namespace entry only applies to children, so the exec happens in a
/// forked child while this process waits.
#[cfg(target_os = "linux")]
fn enter_and_exec(root: &std::path::Path, pid: i32, argv: &[String]) -> Result<()> {
    use std::ffi::CString;

    use nix::sys::wait::{waitpid, WaitStatus};
    use nix::unistd::{execvp, fork, ForkResult};

    namespace::join_namespaces_of(pid)?;
    namespace::enter_container_root(root)?;

    let mut cstrings = Vec::with_capacity(argv.len());
    for arg in argv {
        cstrings.push(CString::new(arg.as_str()).map_err(|_| SnapboxError::Config {
            message: format!("argument contains an interior NUL byte: {arg}"),
        })?);
    }

    match unsafe { fork() }.map_err(|e| SnapboxError::Kernel {
        op: "fork",
        message: e.to_string(),
    })? {
        ForkResult::Parent { child } => {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, 0)) => {}
                Ok(WaitStatus::Exited(_, code)) => {
                    tracing::warn!(code, "exec payload exited nonzero");
                }
                other => tracing::warn!(status = ?other, "exec payload stopped abnormally"),
            }
            Ok(())
        }
        ForkResult::Child => {
            if let Err(e) = execvp(&cstrings[0], &cstrings) {
                eprintln!("exec failed: {e}");
            }
            std::process::exit(127);
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn enter_and_exec(_root: &std::path::Path, _pid: i32, _argv: &[String]) -> Result<()> {
    Err(SnapboxError::Config {
        message: "Linux required for native container operations".into(),
    })
}
