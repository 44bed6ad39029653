//! Per-container filesystem artifacts.
//!
//! A container subvolume carries, next to its rootfs, the command record
//! (`<id>.cmd`), the captured output (`<id>.log`), and — while the init
//! process lives — its host PID (`<id>.pid`).

use std::path::{Path, PathBuf};

use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::ContainerId;

/// Path of the command record inside a container subvolume.
#[must_use]
pub fn cmd_path(container_root: &Path, id: &ContainerId) -> PathBuf {
    container_root.join(format!("{id}.cmd"))
}

/// Path of the log file inside a container subvolume.
#[must_use]
pub fn log_path(container_root: &Path, id: &ContainerId) -> PathBuf {
    container_root.join(format!("{id}.log"))
}

/// Path of the init PID record inside a container subvolume.
#[must_use]
pub fn pid_path(container_root: &Path, id: &ContainerId) -> PathBuf {
    container_root.join(format!("{id}.pid"))
}

/// Overwrites the container's `etc/resolv.conf` with the engine resolver.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_resolv_conf(container_root: &Path, nameserver: &str) -> Result<()> {
    let etc = container_root.join("etc");
    std::fs::create_dir_all(&etc).map_err(|e| SnapboxError::Io {
        path: etc.clone(),
        source: e,
    })?;
    let resolv = etc.join("resolv.conf");
    std::fs::write(&resolv, format!("nameserver {nameserver}\n")).map_err(|e| {
        SnapboxError::Io {
            path: resolv,
            source: e,
        }
    })
}

/// Records the command string a container was launched with.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_command(container_root: &Path, id: &ContainerId, cmd: &str) -> Result<()> {
    let path = cmd_path(container_root, id);
    std::fs::write(&path, cmd).map_err(|e| SnapboxError::Io { path, source: e })
}

/// Reads the recorded command, `None` if the record is absent.
///
/// # Errors
///
/// Returns an error if the record exists but cannot be read.
pub fn read_command(container_root: &Path, id: &ContainerId) -> Result<Option<String>> {
    let path = cmd_path(container_root, id);
    if !path.exists() {
        return Ok(None);
    }
    let content =
        std::fs::read_to_string(&path).map_err(|e| SnapboxError::Io { path, source: e })?;
    Ok(Some(content.trim().to_string()))
}

/// Records the host PID of the container's init process.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_pid(container_root: &Path, id: &ContainerId, pid: i32) -> Result<()> {
    let path = pid_path(container_root, id);
    std::fs::write(&path, pid.to_string()).map_err(|e| SnapboxError::Io { path, source: e })
}

/// Reads the recorded init PID; `None` if the record is absent or stale
/// beyond parsing.
///
/// # Errors
///
/// Returns an error if the record exists but cannot be read.
pub fn read_pid(container_root: &Path, id: &ContainerId) -> Result<Option<i32>> {
    let path = pid_path(container_root, id);
    if !path.exists() {
        return Ok(None);
    }
    let content =
        std::fs::read_to_string(&path).map_err(|e| SnapboxError::Io { path, source: e })?;
    Ok(content.trim().parse().ok())
}

/// Removes the PID record, tolerating its absence.
pub fn clear_pid(container_root: &Path, id: &ContainerId) {
    let _ = std::fs::remove_file(pid_path(container_root, id));
}

/// Reads the captured container output; a missing log yields the empty
/// string.
///
/// # Errors
///
/// Returns an error if the log exists but cannot be read.
pub fn read_log(container_root: &Path, id: &ContainerId) -> Result<String> {
    let path = log_path(container_root, id);
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(&path).map_err(|e| SnapboxError::Io { path, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ContainerId {
        ContainerId::from_suffix(42)
    }

    #[test]
    fn artifact_paths_embed_container_id() {
        let root = Path::new("/var/snapbox/ps_042");
        assert_eq!(
            cmd_path(root, &id()),
            PathBuf::from("/var/snapbox/ps_042/ps_042.cmd")
        );
        assert_eq!(
            log_path(root, &id()),
            PathBuf::from("/var/snapbox/ps_042/ps_042.log")
        );
        assert_eq!(
            pid_path(root, &id()),
            PathBuf::from("/var/snapbox/ps_042/ps_042.pid")
        );
    }

    #[test]
    fn resolv_conf_is_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("etc")).expect("etc");
        std::fs::write(dir.path().join("etc/resolv.conf"), "nameserver 1.1.1.1\n")
            .expect("seed");

        write_resolv_conf(dir.path(), "8.8.8.8").expect("write");

        let content =
            std::fs::read_to_string(dir.path().join("etc/resolv.conf")).expect("read");
        assert_eq!(content, "nameserver 8.8.8.8\n");
    }

    #[test]
    fn resolv_conf_creates_missing_etc() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_resolv_conf(dir.path(), "8.8.8.8").expect("write");
        assert!(dir.path().join("etc/resolv.conf").exists());
    }

    #[test]
    fn command_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_command(dir.path(), &id(), "/bin/echo hi").expect("write");
        assert_eq!(
            read_command(dir.path(), &id()).expect("read"),
            Some("/bin/echo hi".to_string())
        );
    }

    #[test]
    fn missing_command_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(read_command(dir.path(), &id()).expect("read"), None);
    }

    #[test]
    fn pid_roundtrip_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_pid(dir.path(), &id(), 4321).expect("write");
        assert_eq!(read_pid(dir.path(), &id()).expect("read"), Some(4321));

        clear_pid(dir.path(), &id());
        assert_eq!(read_pid(dir.path(), &id()).expect("read"), None);
    }

    #[test]
    fn garbage_pid_record_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(pid_path(dir.path(), &id()), "not-a-pid").expect("seed");
        assert_eq!(read_pid(dir.path(), &id()).expect("read"), None);
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(read_log(dir.path(), &id()).expect("read"), "");
    }

    #[test]
    fn log_contents_are_returned_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(log_path(dir.path(), &id()), "hello\n").expect("seed");
        assert_eq!(read_log(dir.path(), &id()).expect("read"), "hello\n");
    }
}
