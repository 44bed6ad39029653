//! Local image catalog.
//!
//! The filesystem is the catalog: every `img_` subvolume with an origin
//! marker is a listed image.

use std::path::Path;

use snapbox_common::constants::IMAGE_PREFIX;
use snapbox_common::error::Result;
use snapbox_core::btrfs::SubvolumeStore;

use crate::init;

/// One row of the image listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Image identifier.
    pub id: String,
    /// Origin string: a local path or a `name:tag` reference.
    pub source: String,
}

/// Lists all images with their origins.
///
/// Subvolumes without a readable origin marker are skipped.
///
/// # Errors
///
/// Returns an error if the subvolume listing fails.
pub fn list_images(store: &SubvolumeStore) -> Result<Vec<ImageRecord>> {
    let prefix = format!("{IMAGE_PREFIX}_");
    collect(store.root(), &store.list(&prefix)?)
}

fn collect(root: &Path, names: &[String]) -> Result<Vec<ImageRecord>> {
    let mut records = Vec::with_capacity(names.len());
    for name in names {
        if let Some(source) = init::read_source(&root.join(name))? {
            records.push(ImageRecord {
                id: name.clone(),
                source,
            });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_reads_origin_markers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("img_042");
        std::fs::create_dir(&image).expect("mkdir");
        std::fs::write(image.join("img.source"), "/tmp/rootfs\n").expect("marker");

        let records =
            collect(dir.path(), &["img_042".to_string()]).expect("collect");
        assert_eq!(
            records,
            vec![ImageRecord {
                id: "img_042".into(),
                source: "/tmp/rootfs".into(),
            }]
        );
    }

    #[test]
    fn collect_skips_subvolumes_without_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("img_100")).expect("mkdir");

        let records =
            collect(dir.path(), &["img_100".to_string()]).expect("collect");
        assert!(records.is_empty());
    }
}
