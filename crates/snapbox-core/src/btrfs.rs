//! Copy-on-write snapshot store backed by btrfs subvolumes.
//!
//! Every image and container is a subvolume directly under the configured
//! root; containers are writable snapshots of images. All btrfs operations
//! are invoked as argv vectors, never through a shell.

use std::path::{Path, PathBuf};

use rand::Rng;

use snapbox_common::constants::{ID_POOL_MAX, ID_POOL_MIN};
use snapbox_common::error::{Result, SnapboxError};
use snapbox_common::types::{kind_label, ContainerId, ImageId};

/// Upper bound on allocation retries before the pool is declared full.
const MAX_ALLOC_ATTEMPTS: u32 = 1024;

/// Handle to the subvolume store at a fixed btrfs root.
#[derive(Debug, Clone)]
pub struct SubvolumeStore {
    root: PathBuf,
}

impl SubvolumeStore {
    /// Opens the store at the given root directory.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the root directory does not exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SnapboxError::Precondition {
                message: format!("snapshot root {} is not mounted", root.display()),
            });
        }
        Ok(Self { root })
    }

    /// Returns the store's root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path of a subvolume by name.
    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Tests whether a subvolume with the exact given name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the subvolume listing cannot be obtained.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let listing = self.subvolume_listing()?;
        Ok(parse_subvolume_names(&listing).iter().any(|n| n == name))
    }

    /// Creates an empty subvolume.
    ///
    /// # Errors
    ///
    /// Returns an `Exists` error if a subvolume by that name is already
    /// present, or surfaces the btrfs failure otherwise.
    pub fn create(&self, name: &str) -> Result<()> {
        if self.exists(name)? {
            return Err(SnapboxError::Exists {
                kind: kind_label(name),
                id: name.to_string(),
            });
        }
        let dst = self.path_of(name);
        run_btrfs(&["subvolume", "create", &dst.to_string_lossy()])?;
        tracing::debug!(name, "subvolume created");
        Ok(())
    }

    /// Copies the contents of `src_dir` into an existing subvolume,
    /// preserving modes and sharing extents where the filesystem allows.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the copy fails.
    pub fn populate(&self, name: &str, src_dir: &Path) -> Result<()> {
        let dst = self.path_of(name);
        let entries: Vec<PathBuf> = std::fs::read_dir(src_dir)
            .map_err(|e| SnapboxError::Io {
                path: src_dir.to_path_buf(),
                source: e,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        let mut args: Vec<String> = vec!["-a".into(), "--reflink=auto".into()];
        args.extend(entries.iter().map(|p| p.to_string_lossy().into_owned()));
        args.push(dst.to_string_lossy().into_owned());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        crate::tool::run("cp", &arg_refs)?;
        tracing::debug!(name, src = %src_dir.display(), "subvolume populated");
        Ok(())
    }

    /// Creates `dst` as a writable copy-on-write snapshot of `src`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing source, `Exists` for a destination
    /// collision, or surfaces the btrfs failure otherwise.
    pub fn snapshot(&self, src: &str, dst: &str) -> Result<()> {
        if !self.exists(src)? {
            return Err(SnapboxError::NotFound {
                kind: kind_label(src),
                id: src.to_string(),
            });
        }
        if self.exists(dst)? {
            return Err(SnapboxError::Exists {
                kind: kind_label(dst),
                id: dst.to_string(),
            });
        }
        let src_path = self.path_of(src);
        let dst_path = self.path_of(dst);
        run_btrfs(&[
            "subvolume",
            "snapshot",
            &src_path.to_string_lossy(),
            &dst_path.to_string_lossy(),
        ])?;
        tracing::debug!(src, dst, "snapshot created");
        Ok(())
    }

    /// Removes a subvolume and everything inside it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no subvolume by that name exists, or surfaces
    /// the btrfs failure otherwise.
    pub fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name)? {
            return Err(SnapboxError::NotFound {
                kind: kind_label(name),
                id: name.to_string(),
            });
        }
        let path = self.path_of(name);
        run_btrfs(&["subvolume", "delete", &path.to_string_lossy()])?;
        tracing::debug!(name, "subvolume deleted");
        Ok(())
    }

    /// Enumerates subvolume names beginning with the given prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the subvolume listing cannot be obtained.
    pub fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let listing = self.subvolume_listing()?;
        let mut names: Vec<String> = parse_subvolume_names(&listing)
            .into_iter()
            .filter(|n| n.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Allocates a fresh image identifier, retrying on collision.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails or the pool is exhausted.
    pub fn allocate_image_id(&self) -> Result<ImageId> {
        let n = pick_free_suffix(|n| self.exists(ImageId::from_suffix(n).as_str()))?;
        Ok(ImageId::from_suffix(n))
    }

    /// Allocates a fresh container identifier, retrying on collision.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails or the pool is exhausted.
    pub fn allocate_container_id(&self) -> Result<ContainerId> {
        let n = pick_free_suffix(|n| self.exists(ContainerId::from_suffix(n).as_str()))?;
        Ok(ContainerId::from_suffix(n))
    }

    fn subvolume_listing(&self) -> Result<String> {
        run_btrfs(&["subvolume", "list", &self.root.to_string_lossy()])
    }
}

/// Runs a btrfs subcommand, mapping the "not a btrfs filesystem" refusal
/// into the precondition category.
fn run_btrfs(args: &[&str]) -> Result<String> {
    crate::tool::run("btrfs", args).map_err(|e| match e {
        SnapboxError::External { stderr, .. } if stderr.contains("not a btrfs filesystem") => {
            SnapboxError::Precondition {
                message: format!("store root is not on btrfs: {stderr}"),
            }
        }
        other => other,
    })
}

/// Draws a random suffix from the pool until `taken` reports it free.
fn pick_free_suffix(mut taken: impl FnMut(u16) -> Result<bool>) -> Result<u16> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ALLOC_ATTEMPTS {
        let n = rng.gen_range(ID_POOL_MIN..=ID_POOL_MAX);
        if !taken(n)? {
            return Ok(n);
        }
    }
    Err(SnapboxError::Precondition {
        message: "identifier pool exhausted".into(),
    })
}

/// Extracts subvolume names from `btrfs subvolume list` output.
///
/// Each line ends in `path <name>`; nested subvolumes are reported with
/// a slash and are not part of the flat store namespace.
fn parse_subvolume_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let (_, name) = line.rsplit_once(" path ")?;
            let name = name.trim();
            if name.is_empty() || name.contains('/') {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_listing_extracts_names() {
        let listing = "\
ID 256 gen 31 top level 5 path img_042
ID 257 gen 35 top level 5 path ps_100
ID 258 gen 36 top level 5 path img_200
";
        let names = parse_subvolume_names(listing);
        assert_eq!(names, vec!["img_042", "ps_100", "img_200"]);
    }

    #[test]
    fn parse_listing_skips_nested_subvolumes() {
        let listing = "ID 260 gen 40 top level 256 path img_042/var/lib/machines\n";
        assert!(parse_subvolume_names(listing).is_empty());
    }

    #[test]
    fn parse_listing_handles_empty_output() {
        assert!(parse_subvolume_names("").is_empty());
    }

    #[test]
    fn pick_free_suffix_returns_untaken_slot() {
        let n = pick_free_suffix(|n| Ok(n != 77)).expect("one slot free");
        assert_eq!(n, 77);
    }

    #[test]
    fn pick_free_suffix_stays_in_pool() {
        let n = pick_free_suffix(|_| Ok(false)).expect("all free");
        assert!((ID_POOL_MIN..=ID_POOL_MAX).contains(&n));
    }

    #[test]
    fn pick_free_suffix_exhausted_pool_errors() {
        let result = pick_free_suffix(|_| Ok(true));
        assert!(matches!(
            result,
            Err(SnapboxError::Precondition { .. })
        ));
    }

    #[test]
    fn pick_free_suffix_propagates_listing_errors() {
        let result = pick_free_suffix(|_| {
            Err(SnapboxError::Precondition {
                message: "listing failed".into(),
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn path_of_joins_root_and_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SubvolumeStore::open(dir.path()).expect("open");
        assert_eq!(store.path_of("img_042"), dir.path().join("img_042"));
    }

    #[test]
    fn open_missing_root_is_precondition_error() {
        let result = SubvolumeStore::open("/nonexistent/snapbox-root");
        assert!(matches!(
            result,
            Err(SnapboxError::Precondition { .. })
        ));
    }
}
