//! CPU resource control via cgroups v2.

use std::path::Path;

use snapbox_common::error::{Result, SnapboxError};

/// Transforms a legacy CPU share into the cgroup v2 weight range.
///
/// The v1 default of 1024 shares maps to the v2 maximum weight of 10000;
/// results are clamped into the valid `[1, 10000]` range.
#[must_use]
pub fn share_to_weight(share: u64) -> u64 {
    (share * 10000 / 1024).clamp(1, 10000)
}

/// Writes the CPU weight for a cgroup.
///
/// # Errors
///
/// Returns an error if `cpu.weight` is absent or the write fails.
pub fn set_cpu_weight(cgroup_path: &Path, weight: u64) -> Result<()> {
    let file = cgroup_path.join("cpu.weight");
    if !file.exists() {
        return Err(SnapboxError::Precondition {
            message: format!("cpu controller not delegated at {}", cgroup_path.display()),
        });
    }
    std::fs::write(&file, weight.to_string()).map_err(|e| SnapboxError::Io {
        path: file,
        source: e,
    })?;
    tracing::debug!(weight, "cpu weight set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_share_maps_to_half_weight() {
        assert_eq!(share_to_weight(512), 5000);
    }

    #[test]
    fn full_share_maps_to_max_weight() {
        assert_eq!(share_to_weight(1024), 10000);
    }

    #[test]
    fn oversized_share_clamps_to_max() {
        assert_eq!(share_to_weight(4096), 10000);
    }

    #[test]
    fn zero_share_clamps_to_min() {
        assert_eq!(share_to_weight(0), 1);
    }

    #[test]
    fn set_cpu_weight_overwrites_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cpu.weight"), "100").expect("seed");
        set_cpu_weight(dir.path(), 5000).expect("write");
        let value = std::fs::read_to_string(dir.path().join("cpu.weight")).expect("read");
        assert_eq!(value, "5000");
    }

    #[test]
    fn set_cpu_weight_missing_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(set_cpu_weight(dir.path(), 5000).is_err());
    }
}
