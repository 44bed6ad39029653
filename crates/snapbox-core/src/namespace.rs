//! Linux namespace transitions for container isolation.
//!
//! Safe wrappers around `setns(2)`, `unshare(2)`, `mount(2)`, and
//! `chroot(2)` used by the supervisor on the way into a container and by
//! attach when joining a running one.

use std::path::Path;

use snapbox_common::error::Result;

/// Namespace kinds joined when attaching to a running container, in the
/// order they are entered. Mount is first so the remaining `/proc/<pid>`
/// lookups are done on descriptors opened beforehand.
#[cfg(target_os = "linux")]
const ATTACH_NAMESPACES: [&str; 5] = ["mnt", "uts", "ipc", "net", "pid"];

#[cfg(target_os = "linux")]
fn kernel_err(op: &'static str, e: nix::Error) -> snapbox_common::error::SnapboxError {
    snapbox_common::error::SnapboxError::Kernel {
        op,
        message: e.to_string(),
    }
}

/// Moves the calling process into the named network namespace.
///
/// # Errors
///
/// Returns an error if the namespace file cannot be opened or the
/// `setns(2)` call is refused.
#[cfg(target_os = "linux")]
pub fn enter_netns(netns_dir: &Path, name: &str) -> Result<()> {
    use nix::sched::{setns, CloneFlags};

    let path = netns_dir.join(name);
    let file = std::fs::File::open(&path).map_err(|e| snapbox_common::error::SnapboxError::Io {
        path,
        source: e,
    })?;
    setns(&file, CloneFlags::CLONE_NEWNET).map_err(|e| kernel_err("setns", e))?;
    tracing::debug!(name, "entered network namespace");
    Ok(())
}

/// Creates fresh mount, UTS, IPC, and PID namespaces for the caller.
///
/// The caller itself stays in its original PID namespace; its next child
/// becomes PID 1 of the new one.
///
/// # Errors
///
/// Returns an error if the `unshare(2)` call is refused.
#[cfg(target_os = "linux")]
pub fn unshare_isolation() -> Result<()> {
    use nix::sched::{unshare, CloneFlags};

    unshare(
        CloneFlags::CLONE_NEWNS
            | CloneFlags::CLONE_NEWUTS
            | CloneFlags::CLONE_NEWIPC
            | CloneFlags::CLONE_NEWPID,
    )
    .map_err(|e| kernel_err("unshare", e))?;
    Ok(())
}

/// Marks every mount in the current namespace private so container mount
/// activity cannot propagate back to the host.
///
/// # Errors
///
/// Returns an error if the `mount(2)` call is refused.
#[cfg(target_os = "linux")]
pub fn make_mounts_private() -> Result<()> {
    use nix::mount::{mount, MsFlags};

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| kernel_err("mount", e))
}

/// Mounts a fresh procfs over `/proc`, reflecting the caller's PID
/// namespace.
///
/// # Errors
///
/// Returns an error if the `mount(2)` call is refused.
#[cfg(target_os = "linux")]
pub fn mount_proc() -> Result<()> {
    use nix::mount::{mount, MsFlags};

    mount(
        Some("proc"),
        "/proc",
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| kernel_err("mount", e))
}

/// Changes the calling process's root to the container rootfs.
///
/// # Errors
///
/// Returns an error if `chroot(2)` or the subsequent `chdir` fails.
#[cfg(target_os = "linux")]
pub fn enter_container_root(rootfs: &Path) -> Result<()> {
    nix::unistd::chroot(rootfs).map_err(|e| kernel_err("chroot", e))?;
    nix::unistd::chdir("/").map_err(|e| kernel_err("chdir", e))?;
    Ok(())
}

/// Joins the mount, UTS, IPC, network, and PID namespaces of a running
/// process.
///
/// All namespace descriptors are opened before the first transition;
/// entering the mount namespace changes what `/proc` refers to.
/// PID namespace entry takes effect for the caller's children only, so
/// callers must fork before exec.
///
/// # Errors
///
/// Returns an error if a namespace file cannot be opened or a `setns(2)`
/// call is refused.
#[cfg(target_os = "linux")]
pub fn join_namespaces_of(pid: i32) -> Result<()> {
    use nix::sched::{setns, CloneFlags};

    let mut handles = Vec::with_capacity(ATTACH_NAMESPACES.len());
    for ns in ATTACH_NAMESPACES {
        let path = std::path::PathBuf::from(format!("/proc/{pid}/ns/{ns}"));
        let file =
            std::fs::File::open(&path).map_err(|e| snapbox_common::error::SnapboxError::Io {
                path,
                source: e,
            })?;
        handles.push(file);
    }
    for (ns, file) in ATTACH_NAMESPACES.iter().zip(&handles) {
        let flag = match *ns {
            "mnt" => CloneFlags::CLONE_NEWNS,
            "uts" => CloneFlags::CLONE_NEWUTS,
            "ipc" => CloneFlags::CLONE_NEWIPC,
            "net" => CloneFlags::CLONE_NEWNET,
            _ => CloneFlags::CLONE_NEWPID,
        };
        setns(file, flag).map_err(|e| kernel_err("setns", e))?;
    }
    tracing::debug!(pid, "joined container namespaces");
    Ok(())
}

/// Reports whether a process with the given PID is alive.
#[cfg(target_os = "linux")]
#[must_use]
pub fn process_alive(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(target_os = "linux"))]
mod stubs {
    use std::path::Path;

    use snapbox_common::error::{Result, SnapboxError};

    fn unsupported<T>() -> Result<T> {
        Err(SnapboxError::Config {
            message: "Linux required for native container operations".into(),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — namespace entry requires Linux.
    pub fn enter_netns(_netns_dir: &Path, _name: &str) -> Result<()> {
        unsupported()
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — namespace creation requires Linux.
    pub fn unshare_isolation() -> Result<()> {
        unsupported()
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — mount propagation control requires Linux.
    pub fn make_mounts_private() -> Result<()> {
        unsupported()
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — procfs mounting requires Linux.
    pub fn mount_proc() -> Result<()> {
        unsupported()
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — chroot requires Linux.
    pub fn enter_container_root(_rootfs: &Path) -> Result<()> {
        unsupported()
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — namespace joining requires Linux.
    pub fn join_namespaces_of(_pid: i32) -> Result<()> {
        unsupported()
    }

    /// Stub for non-Linux platforms.
    #[must_use]
    pub fn process_alive(_pid: i32) -> bool {
        false
    }
}

#[cfg(not(target_os = "linux"))]
pub use stubs::*;
