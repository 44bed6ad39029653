//! Image creation from a local directory tree.

use std::path::Path;

use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::ImageId;
use snapbox_core::btrfs::SubvolumeStore;

/// Name of the origin marker file inside every image subvolume.
pub const SOURCE_MARKER: &str = "img.source";

/// Creates an image from the contents of a local directory.
///
/// Allocates a fresh image ID, creates the subvolume, copies the tree in,
/// and writes the origin marker unless the source already carried one
/// (the pull pipeline stages its own `name:tag` marker).
///
/// # Errors
///
/// Returns `NotFound` if `src_dir` is not a directory, or surfaces any
/// store failure.
pub fn create_image(store: &SubvolumeStore, src_dir: &Path) -> Result<ImageId> {
    if !src_dir.is_dir() {
        return Err(SnapboxError::NotFound {
            kind: "directory",
            id: src_dir.display().to_string(),
        });
    }
    let id = store.allocate_image_id()?;
    store.create(id.as_str())?;
    store.populate(id.as_str(), src_dir)?;

    let marker = store.path_of(id.as_str()).join(SOURCE_MARKER);
    if !marker.exists() {
        let origin = src_dir
            .canonicalize()
            .unwrap_or_else(|_| src_dir.to_path_buf());
        std::fs::write(&marker, origin.display().to_string()).map_err(|e| SnapboxError::Io {
            path: marker,
            source: e,
        })?;
    }
    tracing::info!(id = %id, src = %src_dir.display(), "image created");
    Ok(id)
}

/// Reads an image's origin marker.
///
/// # Errors
///
/// Returns an error if the marker exists but cannot be read.
pub fn read_source(image_root: &Path) -> Result<Option<String>> {
    let marker = image_root.join(SOURCE_MARKER);
    if !marker.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&marker).map_err(|e| SnapboxError::Io {
        path: marker,
        source: e,
    })?;
    Ok(Some(content.trim().to_string()))
}
