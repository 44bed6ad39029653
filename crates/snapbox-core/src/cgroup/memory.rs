//! Memory resource control via cgroups v2.

use std::path::Path;

use snapbox_common::error::{Result, SnapboxError};

/// Converts a megabyte limit into the byte value written to `memory.max`.
#[must_use]
pub fn megabytes_to_bytes(megabytes: u64) -> u64 {
    megabytes * 1_000_000
}

/// Writes the hard memory limit for a cgroup.
///
/// Processes exceeding this limit are subject to the OOM killer.
///
/// # Errors
///
/// Returns an error if `memory.max` is absent or the write fails.
pub fn set_memory_max(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let file = cgroup_path.join("memory.max");
    if !file.exists() {
        return Err(SnapboxError::Precondition {
            message: format!(
                "memory controller not delegated at {}",
                cgroup_path.display()
            ),
        });
    }
    std::fs::write(&file, bytes.to_string()).map_err(|e| SnapboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(bytes, "memory max set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megabyte_conversion_uses_decimal_millions() {
        assert_eq!(megabytes_to_bytes(512), 512_000_000);
        assert_eq!(megabytes_to_bytes(1), 1_000_000);
    }

    #[test]
    fn set_memory_max_overwrites_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("memory.max"), "max").expect("seed");
        set_memory_max(dir.path(), 512_000_000).expect("write");
        let value = std::fs::read_to_string(dir.path().join("memory.max")).expect("read");
        assert_eq!(value, "512000000");
    }

    #[test]
    fn set_memory_max_missing_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(set_memory_max(dir.path(), 1_000_000).is_err());
    }
}
