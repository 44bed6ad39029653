//! Registry pull pipeline.
//!
//! Downloads the layered archive for `name:tag` into a process-scoped
//! staging directory, flattens its layers in manifest order, strips the
//! registry metadata, stages the `name:tag` origin marker, and hands the
//! finished tree to the init path. The staging directory is removed when
//! the pull completes or fails.

use std::io;
use std::path::Path;

use flate2::read::GzDecoder;

use snapbox_common::config::EngineConfig;
use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::ImageId;
use snapbox_core::btrfs::SubvolumeStore;

use crate::init::{self, SOURCE_MARKER};
use crate::manifest;

/// Pulls `name:tag` from the configured registry and materializes it as
/// an image subvolume.
///
/// # Errors
///
/// Returns an error if the download, extraction, manifest handling, or
/// image creation fails.
pub fn pull_image(
    store: &SubvolumeStore,
    config: &EngineConfig,
    name: &str,
    tag: &str,
) -> Result<ImageId> {
    let staging = tempfile::Builder::new()
        .prefix("snapbox-pull-")
        .tempdir()
        .map_err(|e| SnapboxError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;

    let url = archive_url(&config.registry_base, name, tag);
    let archive = staging.path().join(format!("{name}_{tag}.tar.gz"));
    tracing::info!(name, tag, url = %url, "downloading image archive");
    download(&url, &archive)?;

    let extract_dir = staging.path().join("extract");
    std::fs::create_dir(&extract_dir).map_err(|e| SnapboxError::Io {
        path: extract_dir.clone(),
        source: e,
    })?;
    unpack_archive(&archive, &extract_dir)?;

    let manifest_path = manifest::locate(&extract_dir)?;
    let tree = manifest_path
        .parent()
        .unwrap_or(extract_dir.as_path())
        .to_path_buf();
    let manifest_json =
        std::fs::read_to_string(&manifest_path).map_err(|e| SnapboxError::Io {
            path: manifest_path.clone(),
            source: e,
        })?;
    let entries = manifest::parse(&manifest_json)?;
    manifest::apply_layers(&tree, &entries)?;
    strip_registry_artifacts(&tree, &manifest_path)?;

    let marker = tree.join(SOURCE_MARKER);
    std::fs::write(&marker, format!("{name}:{tag}")).map_err(|e| SnapboxError::Io {
        path: marker,
        source: e,
    })?;

    let id = init::create_image(store, &tree)?;
    tracing::info!(id = %id, name, tag, "image pulled");
    Ok(id)
}

/// Builds the archive URL for a `name:tag` reference.
fn archive_url(base: &str, name: &str, tag: &str) -> String {
    format!("{}/{name}_{tag}.tar.gz", base.trim_end_matches('/'))
}

fn download(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| SnapboxError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    let mut file = std::fs::File::create(dest).map_err(|e| SnapboxError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    io::copy(&mut response, &mut file).map_err(|e| SnapboxError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive).map_err(|e| SnapboxError::Io {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.unpack(dest).map_err(|e| SnapboxError::Io {
        path: archive.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Removes the manifest and any registry index artifacts from the staged
/// tree; only the flattened rootfs and the origin marker go into the
/// image.
fn strip_registry_artifacts(tree: &Path, manifest_path: &Path) -> Result<()> {
    std::fs::remove_file(manifest_path).map_err(|e| SnapboxError::Io {
        path: manifest_path.to_path_buf(),
        source: e,
    })?;
    let repositories = tree.join("repositories");
    if repositories.is_dir() {
        std::fs::remove_dir_all(&repositories).map_err(|e| SnapboxError::Io {
            path: repositories,
            source: e,
        })?;
    } else if repositories.is_file() {
        std::fs::remove_file(&repositories).map_err(|e| SnapboxError::Io {
            path: repositories,
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    #[test]
    fn archive_url_joins_base_name_and_tag() {
        assert_eq!(
            archive_url("https://images.example.com", "centos", "7"),
            "https://images.example.com/centos_7.tar.gz"
        );
    }

    #[test]
    fn archive_url_tolerates_trailing_slash() {
        assert_eq!(
            archive_url("https://images.example.com/", "alpine", "3.18"),
            "https://images.example.com/alpine_3.18.tar.gz"
        );
    }

    #[test]
    fn unpack_archive_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("bundle.tar.gz");

        let file = std::fs::File::create(&archive).expect("create");
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let data = b"[]";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "manifest.json", &data[..])
            .expect("append");
        builder.into_inner().expect("tar").finish().expect("gzip");

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).expect("mkdir");
        unpack_archive(&archive, &dest).expect("unpack");
        assert_eq!(
            std::fs::read_to_string(dest.join("manifest.json")).expect("read"),
            "[]"
        );
    }

    #[test]
    fn strip_registry_artifacts_removes_manifest_and_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("manifest.json");
        std::fs::write(&manifest, "[]").expect("manifest");
        std::fs::write(dir.path().join("repositories"), "{}").expect("repositories");
        std::fs::write(dir.path().join("etc-kept"), "rootfs data").expect("payload");

        strip_registry_artifacts(dir.path(), &manifest).expect("strip");

        assert!(!manifest.exists());
        assert!(!dir.path().join("repositories").exists());
        assert!(dir.path().join("etc-kept").exists());
    }
}
