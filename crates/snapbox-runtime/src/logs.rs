//! Container log retrieval.

use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::ContainerId;
use snapbox_core::btrfs::SubvolumeStore;

use crate::artifacts;

/// Returns the captured output of a container; a container that never
/// wrote a log yields the empty string.
///
/// # Errors
///
/// Returns `NotFound` for an unknown container, or an I/O error if the
/// log exists but cannot be read.
pub fn read(store: &SubvolumeStore, id: &ContainerId) -> Result<String> {
    if !store.exists(id.as_str())? {
        return Err(SnapboxError::NotFound {
            kind: "container",
            id: id.to_string(),
        });
    }
    artifacts::read_log(&store.path_of(id.as_str()), id)
}
