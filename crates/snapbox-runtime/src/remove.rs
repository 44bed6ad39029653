//! Image and container removal.

use snapbox_common::config::EngineConfig;
use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::kind_label;
use snapbox_core::btrfs::SubvolumeStore;
use snapbox_core::cgroup;

/// Deletes an image or container subvolume and, if present, the engine's
/// cgroup for that identifier. Stray processes still in the cgroup are
/// migrated up to the root cgroup first.
///
/// # Errors
///
/// Returns `NotFound` for an unknown identifier, and surfaces store or
/// cgroup removal failures. A missing cgroup is not an error.
pub fn remove(store: &SubvolumeStore, config: &EngineConfig, id: &str) -> Result<()> {
    if !store.exists(id)? {
        return Err(SnapboxError::NotFound {
            kind: kind_label(id),
            id: id.to_string(),
        });
    }
    store.delete(id)?;
    cgroup::remove(&config.cgroup_root, &config.cgroup_parent(), id)?;
    tracing::info!(id, "removed");
    Ok(())
}
