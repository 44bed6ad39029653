//! Container roster.
//!
//! Like the image catalog, the filesystem is the source of truth: every
//! `ps_` subvolume with a command record is a listed container.

use std::path::Path;

use snapbox_common::constants::CONTAINER_PREFIX;
use snapbox_common::error::Result;
use snapbox_common::types::ContainerId;
use snapbox_core::btrfs::SubvolumeStore;

use crate::artifacts;

/// One row of the container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Container identifier.
    pub id: String,
    /// Command the container was launched with.
    pub command: String,
}

/// Lists all containers with their launch commands.
///
/// Subvolumes without a readable command record are skipped.
///
/// # Errors
///
/// Returns an error if the subvolume listing fails.
pub fn list_containers(store: &SubvolumeStore) -> Result<Vec<ContainerRecord>> {
    let prefix = format!("{CONTAINER_PREFIX}_");
    collect(store.root(), &store.list(&prefix)?)
}

fn collect(root: &Path, names: &[String]) -> Result<Vec<ContainerRecord>> {
    let mut records = Vec::with_capacity(names.len());
    for name in names {
        let Ok(id) = ContainerId::parse(name.clone()) else {
            continue;
        };
        if let Some(command) = artifacts::read_command(&root.join(name), &id)? {
            records.push(ContainerRecord {
                id: name.clone(),
                command,
            });
        }
    }
    Ok(records)
}
