//! Image manifest handling for the pull pipeline.
//!
//! A pulled archive carries a `manifest.json` enumerating layer tarballs
//! in application order plus a config blob. Layers are flattened in-place
//! over the staging tree; later layers overwrite earlier ones. Whiteout
//! entries are extracted as plain files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use snapbox_common::error::{Result, SnapboxError};

/// One entry of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative path of the image config blob.
    #[serde(rename = "Config")]
    pub config: Option<String>,

    /// Relative paths of the layer tarballs, bottom to top.
    #[serde(rename = "Layers", default)]
    pub layers: Vec<String>,
}

/// Parses a manifest from its JSON text.
///
/// # Errors
///
/// Returns a serialization error for malformed JSON.
pub fn parse(json: &str) -> Result<Vec<ManifestEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Locates `manifest.json` under an extracted archive.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or no manifest exists.
pub fn locate(dir: &Path) -> Result<PathBuf> {
    fn walk(dir: &Path) -> std::io::Result<Option<PathBuf>> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if let Some(found) = walk(&path)? {
                    return Ok(Some(found));
                }
            } else if path.file_name().is_some_and(|n| n == "manifest.json") {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    walk(dir)
        .map_err(|e| SnapboxError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?
        .ok_or_else(|| SnapboxError::Precondition {
            message: format!("no manifest.json under {}", dir.display()),
        })
}

/// Flattens every layer over the staging tree in manifest order, deleting
/// each tarball after extraction, then deletes the config blob.
///
/// # Errors
///
/// Returns an error if a listed layer is missing or fails to extract.
pub fn apply_layers(staging: &Path, entries: &[ManifestEntry]) -> Result<()> {
    for entry in entries {
        for layer in &entry.layers {
            let tarball = staging.join(layer);
            let file = std::fs::File::open(&tarball).map_err(|e| SnapboxError::Io {
                path: tarball.clone(),
                source: e,
            })?;
            let mut archive = tar::Archive::new(file);
            archive.set_overwrite(true);
            archive.unpack(staging).map_err(|e| SnapboxError::Io {
                path: tarball.clone(),
                source: e,
            })?;
            std::fs::remove_file(&tarball).map_err(|e| SnapboxError::Io {
                path: tarball.clone(),
                source: e,
            })?;
            tracing::debug!(layer, "layer applied");
        }
        if let Some(config) = &entry.config {
            let blob = staging.join(config);
            if blob.exists() {
                std::fs::remove_file(&blob).map_err(|e| SnapboxError::Io {
                    path: blob,
                    source: e,
                })?;
            }
        }
    }
    Ok(())
}
