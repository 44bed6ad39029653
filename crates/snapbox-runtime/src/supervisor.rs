//! Container supervisor.
//!
//! Composes the store, network fabric, and limiter into the `run`
//! operation: snapshot the image, wire the network, create the cgroup,
//! then launch the command inside a fresh namespace set with the
//! snapshot as its root.
//!
//! Process tree during a run:
//!
//! ```text
//! supervisor ── tees the output pipe into <id>.log and stdout
//!   └─ middle ── joins the cgroup, enters the netns, unshares
//!      └─ init ── PID 1 of the new PID namespace; mounts proc,
//!                 chroots, execs /bin/sh -c <cmd>
//! ```
//!
//! The middle process reports pre-exec failures over a CLOEXEC status
//! pipe so the supervisor can tell a hard engine error (cgroup join,
//! namespace transition, chroot) from a payload failure, which is only
//! captured in the log.

use snapbox_common::config::EngineConfig;
use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::{ContainerId, ImageId};
use snapbox_core::btrfs::SubvolumeStore;
use snapbox_core::cgroup::Cgroup;
use snapbox_core::network;

use crate::artifacts;

/// Creates and runs a container in the foreground.
///
/// On return the network fabric is gone regardless of how the payload
/// fared; the snapshot, log, command record, and cgroup persist until
/// `rm`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown image before any mutation, a
/// precondition error if the bridge is absent, and surfaces hard setup
/// failures after tearing the network back down.
pub fn run(
    store: &SubvolumeStore,
    config: &EngineConfig,
    image: &ImageId,
    cmd: &str,
) -> Result<ContainerId> {
    if !store.exists(image.as_str())? {
        return Err(SnapboxError::NotFound {
            kind: "image",
            id: image.to_string(),
        });
    }
    network::ensure_bridge(&config.bridge)?;

    let id = store.allocate_container_id()?;
    tracing::info!(id = %id, image = %image, cmd, "starting container");

    network::setup(&config.bridge, &id)?;
    let result = provision_and_launch(store, config, image, &id, cmd);
    network::teardown(&id);
    artifacts::clear_pid(&store.path_of(id.as_str()), &id);

    result.map(|()| id)
}

fn provision_and_launch(
    store: &SubvolumeStore,
    config: &EngineConfig,
    image: &ImageId,
    id: &ContainerId,
    cmd: &str,
) -> Result<()> {
    store.snapshot(image.as_str(), id.as_str())?;
    let root = store.path_of(id.as_str());
    artifacts::write_resolv_conf(&root, &config.nameserver)?;
    artifacts::write_command(&root, id, cmd)?;

    let cgroup = Cgroup::create(&config.cgroup_parent(), id.as_str())?;
    cgroup.apply_limits(config.cpu_share, config.mem_limit_mb);

    launch(&cgroup, &root, id, cmd)
}

/// Stage markers sent over the status pipe when the middle or init
/// process fails before exec.
const STAGE_STDIO: u8 = b'o';
const STAGE_CGROUP: u8 = b'c';
const STAGE_NETNS: u8 = b'n';
const STAGE_UNSHARE: u8 = b'u';
const STAGE_FORK: u8 = b'f';
const STAGE_MOUNTS: u8 = b'm';
const STAGE_PROC: u8 = b'p';
const STAGE_CHROOT: u8 = b'r';

fn stage_op(stage: u8) -> &'static str {
    match stage {
        STAGE_STDIO => "output redirection",
        STAGE_CGROUP => "cgroup join",
        STAGE_NETNS => "network namespace entry",
        STAGE_UNSHARE => "namespace creation",
        STAGE_FORK => "init fork",
        STAGE_MOUNTS => "mount isolation",
        STAGE_PROC => "proc mount",
        STAGE_CHROOT => "chroot",
        _ => "container setup",
    }
}

#[cfg(target_os = "linux")]
fn launch(
    cgroup: &Cgroup,
    root: &std::path::Path,
    id: &ContainerId,
    cmd: &str,
) -> Result<()> {
    use std::io::Write;

    use nix::unistd::{fork, ForkResult};

    let log_path = artifacts::log_path(root, id);
    let mut log = std::fs::File::create(&log_path).map_err(|e| SnapboxError::Io {
        path: log_path.clone(),
        source: e,
    })?;

    let (out_r, out_w) = nix::unistd::pipe().map_err(|e| SnapboxError::Kernel {
        op: "pipe",
        message: e.to_string(),
    })?;
    let (status_r, status_w) =
        nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).map_err(|e| SnapboxError::Kernel {
            op: "pipe",
            message: e.to_string(),
        })?;

    // Flush before forking so the children cannot replay buffered bytes.
    let _ = std::io::stdout().flush();

    match unsafe { fork() }.map_err(|e| SnapboxError::Kernel {
        op: "fork",
        message: e.to_string(),
    })? {
        ForkResult::Parent { child } => {
            drop(out_w);
            drop(status_w);
            supervise(child, out_r, status_r, &mut log, &log_path, id)
        }
        ForkResult::Child => {
            drop(out_r);
            drop(status_r);
            let code = middle(cgroup, root, id, cmd, out_w, status_w);
            std::process::exit(code);
        }
    }
}

/// Tees the container's combined output into the log file and the
/// caller's stdout, then reaps the middle process and interprets the
/// status pipe.
#[cfg(target_os = "linux")]
fn supervise(
    child: nix::unistd::Pid,
    out_r: std::os::fd::OwnedFd,
    status_r: std::os::fd::OwnedFd,
    log: &mut std::fs::File,
    log_path: &std::path::Path,
    id: &ContainerId,
) -> Result<()> {
    use std::io::{Read, Write};

    use nix::sys::wait::{waitpid, WaitStatus};

    let mut reader = std::fs::File::from(out_r);
    let mut stdout = std::io::stdout();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                log.write_all(&buf[..n]).map_err(|e| SnapboxError::Io {
                    path: log_path.to_path_buf(),
                    source: e,
                })?;
                let _ = stdout.write_all(&buf[..n]);
                let _ = stdout.flush();
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(SnapboxError::Kernel {
                    op: "pipe read",
                    message: e.to_string(),
                })
            }
        }
    }

    let mut failure = Vec::new();
    let _ = std::fs::File::from(status_r).read_to_end(&mut failure);

    let status = waitpid(child, None).map_err(|e| SnapboxError::Kernel {
        op: "waitpid",
        message: e.to_string(),
    })?;

    if let Some(&stage) = failure.first() {
        let detail = String::from_utf8_lossy(&failure[1..]).trim().to_string();
        return Err(SnapboxError::Kernel {
            op: stage_op(stage),
            message: detail,
        });
    }

    match status {
        WaitStatus::Exited(_, 0) => tracing::info!(id = %id, "container exited cleanly"),
        WaitStatus::Exited(_, code) => {
            tracing::warn!(id = %id, code, "payload exited nonzero");
        }
        other => tracing::warn!(id = %id, status = ?other, "container stopped abnormally"),
    }
    Ok(())
}

/// The middle process: joins the cgroup, enters the container's network
/// namespace, unshares the remaining namespaces, forks the actual init,
/// records its PID, and waits for it.
#[cfg(target_os = "linux")]
fn middle(
    cgroup: &Cgroup,
    root: &std::path::Path,
    id: &ContainerId,
    cmd: &str,
    out_w: std::os::fd::OwnedFd,
    status_w: std::os::fd::OwnedFd,
) -> i32 {
    use std::os::fd::AsRawFd;
    use std::path::Path;

    use nix::sys::wait::{waitpid, WaitStatus};
    use nix::unistd::{dup2, fork, ForkResult};

    use snapbox_common::constants::NETNS_RUN_DIR;
    use snapbox_core::namespace;

    let redirect = dup2(out_w.as_raw_fd(), 1).and_then(|_| dup2(out_w.as_raw_fd(), 2));
    if let Err(e) = redirect {
        report(&status_w, STAGE_STDIO, &e.to_string());
        return 1;
    }
    drop(out_w);

    let pid = nix::unistd::getpid().as_raw();
    if let Err(e) = cgroup.add_process(pid as u32) {
        report(&status_w, STAGE_CGROUP, &e.to_string());
        return 1;
    }
    if let Err(e) = namespace::enter_netns(Path::new(NETNS_RUN_DIR), &network::netns_name(id)) {
        report(&status_w, STAGE_NETNS, &e.to_string());
        return 1;
    }
    if let Err(e) = namespace::unshare_isolation() {
        report(&status_w, STAGE_UNSHARE, &e.to_string());
        return 1;
    }

    match unsafe { fork() } {
        Err(e) => {
            report(&status_w, STAGE_FORK, &e.to_string());
            1
        }
        Ok(ForkResult::Parent { child }) => {
            drop(status_w);
            if let Err(e) = artifacts::write_pid(root, id, child.as_raw()) {
                tracing::warn!(id = %id, error = %e, "init pid not recorded");
            }
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => code,
                Ok(WaitStatus::Signaled(_, signal, _)) => 128 + signal as i32,
                _ => 1,
            }
        }
        Ok(ForkResult::Child) => container_init(root, cmd, &status_w),
    }
}

/// PID 1 of the new namespace set: isolates mounts, mounts proc, chroots
/// into the snapshot, and execs the payload through `/bin/sh -c`.
///
/// An exec failure is a payload failure: it is written to the (already
/// redirected) stderr and surfaces only in the log.
#[cfg(target_os = "linux")]
fn container_init(
    root: &std::path::Path,
    cmd: &str,
    status_w: &std::os::fd::OwnedFd,
) -> i32 {
    use std::ffi::CString;

    use snapbox_core::namespace;

    if let Err(e) = namespace::make_mounts_private() {
        report(status_w, STAGE_MOUNTS, &e.to_string());
        return 1;
    }
    if let Err(e) = namespace::mount_proc() {
        report(status_w, STAGE_PROC, &e.to_string());
        return 1;
    }
    if let Err(e) = namespace::enter_container_root(root) {
        report(status_w, STAGE_CHROOT, &e.to_string());
        return 1;
    }

    let line = format!("/bin/mount -t proc proc /proc && {cmd}");
    let argv = match (
        CString::new("/bin/sh"),
        CString::new("-c"),
        CString::new(line),
    ) {
        (Ok(sh), Ok(dash_c), Ok(line)) => [sh, dash_c, line],
        _ => {
            eprintln!("command contains an interior NUL byte");
            return 127;
        }
    };
    if let Err(e) = nix::unistd::execv(&argv[0], &argv) {
        eprintln!("exec /bin/sh failed: {e}");
    }
    127
}

#[cfg(target_os = "linux")]
fn report(status_w: &std::os::fd::OwnedFd, stage: u8, detail: &str) {
    let mut message = vec![stage];
    message.extend_from_slice(detail.as_bytes());
    let _ = nix::unistd::write(status_w, &message);
}

#[cfg(not(target_os = "linux"))]
fn launch(
    _cgroup: &Cgroup,
    _root: &std::path::Path,
    _id: &ContainerId,
    _cmd: &str,
) -> Result<()> {
    Err(SnapboxError::Config {
        message: "Linux required for native container operations".into(),
    })
}
