//! Commit a container's filesystem state back to an image.

use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::{ContainerId, ImageId};
use snapbox_core::btrfs::SubvolumeStore;

/// Replaces an image with a snapshot of a container.
///
/// The container is snapshotted to a temporary name first, so a failed
/// snapshot never destroys the destination image; the swap happens with
/// a delete plus rename once the new snapshot exists.
///
/// # Errors
///
/// Returns `NotFound` if either object is missing, and surfaces store
/// failures.
pub fn commit(store: &SubvolumeStore, container: &ContainerId, image: &ImageId) -> Result<()> {
    if !store.exists(container.as_str())? {
        return Err(SnapboxError::NotFound {
            kind: "container",
            id: container.to_string(),
        });
    }
    if !store.exists(image.as_str())? {
        return Err(SnapboxError::NotFound {
            kind: "image",
            id: image.to_string(),
        });
    }

    let staged = format!("{image}.tmp");
    if store.exists(&staged)? {
        store.delete(&staged)?;
    }
    store.snapshot(container.as_str(), &staged)?;
    store.delete(image.as_str())?;

    let from = store.path_of(&staged);
    let to = store.path_of(image.as_str());
    std::fs::rename(&from, &to).map_err(|e| SnapboxError::Io {
        path: from,
        source: e,
    })?;
    tracing::info!(container = %container, image = %image, "container committed");
    Ok(())
}
