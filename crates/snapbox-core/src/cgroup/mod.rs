//! Cgroups v2 resource management.
//!
//! The engine owns one parent cgroup under the unified hierarchy and
//! creates a child per container. Limit writes are best-effort: which
//! controllers are delegated varies across kernels and distributions, and
//! the engine must not refuse to run a container over a missing controller.
//! Joining a process into its cgroup is the one hard requirement.

pub mod cpu;
pub mod memory;

use std::io::Write;
use std::path::{Path, PathBuf};

use snapbox_common::error::{Result, SnapboxError};

/// Handle to one container's cgroup directory.
#[derive(Debug)]
pub struct Cgroup {
    path: PathBuf,
}

impl Cgroup {
    /// Creates the engine parent (if needed) and a child cgroup for the
    /// given container ID, enabling the cpu and memory controllers in the
    /// parent's subtree where available.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directories cannot be created.
    /// Controller delegation failures are logged and ignored.
    pub fn create(parent: &Path, id: &str) -> Result<Self> {
        std::fs::create_dir_all(parent).map_err(|e| SnapboxError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
        enable_controllers(parent);
        let path = parent.join(id);
        std::fs::create_dir_all(&path).map_err(|e| SnapboxError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "cgroup created");
        Ok(Self { path })
    }

    /// Applies CPU weight and memory ceiling, best-effort.
    ///
    /// A missing controller file or a refused write leaves the container
    /// unconstrained on that axis.
    pub fn apply_limits(&self, cpu_share: u64, mem_limit_mb: u64) {
        if let Err(e) = cpu::set_cpu_weight(&self.path, cpu::share_to_weight(cpu_share)) {
            tracing::warn!(error = %e, "cpu weight not applied");
        }
        if let Err(e) =
            memory::set_memory_max(&self.path, memory::megabytes_to_bytes(mem_limit_mb))
        {
            tracing::warn!(error = %e, "memory limit not applied");
        }
    }

    /// Adds a process to this cgroup by writing its PID to `cgroup.procs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Unlike limit application this
    /// is a hard error: an unaccounted container init defeats the limiter.
    pub fn add_process(&self, pid: u32) -> Result<()> {
        let procs = self.path.join("cgroup.procs");
        std::fs::write(&procs, pid.to_string()).map_err(|e| SnapboxError::Io {
            path: procs,
            source: e,
        })?;
        tracing::debug!(pid, "process joined cgroup");
        Ok(())
    }

    /// Returns this cgroup's directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Enables the cpu and memory controllers in the parent's subtree,
/// best-effort, for those the parent reports as available.
fn enable_controllers(parent: &Path) {
    let controllers =
        std::fs::read_to_string(parent.join("cgroup.controllers")).unwrap_or_default();
    let available: Vec<&str> = controllers.split_whitespace().collect();
    let mut enable = String::new();
    for wanted in ["cpu", "memory"] {
        if available.contains(&wanted) {
            if !enable.is_empty() {
                enable.push(' ');
            }
            enable.push('+');
            enable.push_str(wanted);
        }
    }
    if enable.is_empty() {
        return;
    }
    let subtree = parent.join("cgroup.subtree_control");
    if let Err(e) = std::fs::write(&subtree, &enable) {
        tracing::warn!(error = %e, "controller delegation refused");
    }
}

/// Removes a container's cgroup, migrating any remaining processes up to
/// the root cgroup first.
///
/// A missing cgroup is not an error.
///
/// # Errors
///
/// Returns an error if the cgroup directory exists but cannot be removed.
pub fn remove(cgroup_root: &Path, parent: &Path, id: &str) -> Result<()> {
    let child = parent.join(id);
    if !child.exists() {
        return Ok(());
    }
    migrate_procs(&child, cgroup_root);
    std::fs::remove_dir(&child).map_err(|e| SnapboxError::Io {
        path: child,
        source: e,
    })?;
    tracing::info!(id, "cgroup removed");
    Ok(())
}

/// Moves every PID listed in `from`'s process list into `to`'s,
/// best-effort: a PID that exited mid-migration is simply skipped.
fn migrate_procs(from: &Path, to: &Path) {
    let listing = std::fs::read_to_string(from.join("cgroup.procs")).unwrap_or_default();
    let dst = to.join("cgroup.procs");
    for pid in listing.split_whitespace() {
        let attempt = std::fs::OpenOptions::new()
            .append(true)
            .open(&dst)
            .and_then(|mut f| f.write_all(pid.as_bytes()));
        if let Err(e) = attempt {
            tracing::warn!(pid, error = %e, "pid migration skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_builds_parent_and_child() {
        let dir = tempfile::tempdir().expect("tempdir");
        let parent = dir.path().join("snapbox");
        let cgroup = Cgroup::create(&parent, "ps_042").expect("create");
        assert!(cgroup.path().is_dir());
        assert_eq!(cgroup.path(), parent.join("ps_042"));
    }

    #[test]
    fn enable_controllers_writes_available_subset() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cgroup.controllers"), "cpuset cpu io memory pids")
            .expect("controllers file");
        enable_controllers(dir.path());
        let subtree =
            std::fs::read_to_string(dir.path().join("cgroup.subtree_control")).expect("read");
        assert_eq!(subtree, "+cpu +memory");
    }

    #[test]
    fn enable_controllers_skips_missing_controllers() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cgroup.controllers"), "pids").expect("controllers file");
        enable_controllers(dir.path());
        assert!(!dir.path().join("cgroup.subtree_control").exists());
    }

    #[test]
    fn apply_limits_writes_transformed_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let parent = dir.path().join("snapbox");
        let cgroup = Cgroup::create(&parent, "ps_100").expect("create");
        std::fs::write(cgroup.path().join("cpu.weight"), "100").expect("seed");
        std::fs::write(cgroup.path().join("memory.max"), "max").expect("seed");

        cgroup.apply_limits(512, 512);

        let weight = std::fs::read_to_string(cgroup.path().join("cpu.weight")).expect("read");
        let mem = std::fs::read_to_string(cgroup.path().join("memory.max")).expect("read");
        assert_eq!(weight, "5000");
        assert_eq!(mem, "512000000");
    }

    #[test]
    fn apply_limits_tolerates_absent_controller_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let parent = dir.path().join("snapbox");
        let cgroup = Cgroup::create(&parent, "ps_200").expect("create");
        cgroup.apply_limits(512, 512);
        assert!(!cgroup.path().join("cpu.weight").exists());
    }

    #[test]
    fn add_process_writes_pid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cgroup = Cgroup::create(dir.path(), "ps_042").expect("create");
        cgroup.add_process(4321).expect("join");
        let procs = std::fs::read_to_string(cgroup.path().join("cgroup.procs")).expect("read");
        assert_eq!(procs, "4321");
    }

    #[test]
    fn remove_missing_cgroup_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        remove(dir.path(), &dir.path().join("snapbox"), "ps_042").expect("noop");
    }

    #[test]
    fn migrate_procs_appends_to_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let child = dir.path().join("child");
        std::fs::create_dir(&child).expect("child dir");
        std::fs::write(child.join("cgroup.procs"), "11\n22\n").expect("seed procs");
        std::fs::write(dir.path().join("cgroup.procs"), "").expect("seed root");

        migrate_procs(&child, dir.path());

        let moved = std::fs::read_to_string(dir.path().join("cgroup.procs")).expect("read");
        assert!(moved.contains("11"));
        assert!(moved.contains("22"));
    }
}
