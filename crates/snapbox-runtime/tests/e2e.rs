//! Privileged end-to-end scenarios for the Snapbox engine.
//!
//! These exercise the real store, network fabric, and supervisor, so they
//! need root, a btrfs filesystem mounted at the default store root, the
//! provisioned `bridge0`, and a rootfs directory (with a working
//! `/bin/sh`, `/bin/mount`, and coreutils) named by `SNAPBOX_TEST_ROOTFS`.
//!
//! Run with: `SNAPBOX_TEST_ROOTFS=/tmp/rootfs cargo test -- --ignored`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use snapbox_common::config::EngineConfig;
use snapbox_common::types::ImageId;
use snapbox_core::btrfs::SubvolumeStore;
use snapbox_core::network;

fn test_rootfs() -> PathBuf {
    PathBuf::from(
        std::env::var("SNAPBOX_TEST_ROOTFS").expect("SNAPBOX_TEST_ROOTFS must name a rootfs"),
    )
}

fn engine() -> (SubvolumeStore, EngineConfig) {
    let config = EngineConfig::default();
    let store = SubvolumeStore::open(&config.btrfs_root).expect("store root mounted");
    (store, config)
}

fn init_test_image(store: &SubvolumeStore) -> ImageId {
    snapbox_image::init::create_image(store, &test_rootfs()).expect("init image")
}

fn cleanup(store: &SubvolumeStore, config: &EngineConfig, ids: &[&str]) {
    for id in ids {
        let _ = snapbox_runtime::remove::remove(store, config, id);
    }
}

// S1: init from a directory, then list it with its origin.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn init_lists_image_with_origin() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let records = snapbox_image::catalog::list_images(&store).expect("images");
    let row = records
        .iter()
        .find(|r| r.id == image.as_str())
        .expect("new image listed");
    assert_eq!(
        row.source,
        test_rootfs().canonicalize().expect("canonical").display().to_string()
    );

    cleanup(&store, &config, &[image.as_str()]);
}

// S2: run a command and read it back from the log.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn run_captures_payload_output() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let container =
        snapbox_runtime::supervisor::run(&store, &config, &image, "/bin/echo hi").expect("run");
    let log = snapbox_runtime::logs::read(&store, &container).expect("logs");
    assert!(log.contains("hi"));

    cleanup(&store, &config, &[container.as_str(), image.as_str()]);
}

// S3: the container reaches the gateway through its derived address.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn container_reaches_gateway() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let container =
        snapbox_runtime::supervisor::run(&store, &config, &image, "ping -c1 10.0.0.1")
            .expect("run");
    let log = snapbox_runtime::logs::read(&store, &container).expect("logs");
    assert!(log.contains("1 packets transmitted"), "log was: {log}");

    cleanup(&store, &config, &[container.as_str(), image.as_str()]);
}

// S4: a file created in one container does not leak into the image.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn snapshots_isolate_writes_from_the_image() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let writer =
        snapbox_runtime::supervisor::run(&store, &config, &image, "touch /marker").expect("run");
    let reader =
        snapbox_runtime::supervisor::run(&store, &config, &image, "ls /marker").expect("run");
    let log = snapbox_runtime::logs::read(&store, &reader).expect("logs");
    assert!(
        log.contains("No such file"),
        "image gained the marker: {log}"
    );

    cleanup(
        &store,
        &config,
        &[writer.as_str(), reader.as_str(), image.as_str()],
    );
}

// S5: committing a container makes its writes visible to later runs.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn commit_round_trip_preserves_writes() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let writer =
        snapbox_runtime::supervisor::run(&store, &config, &image, "touch /marker").expect("run");
    snapbox_runtime::commit::commit(&store, &writer, &image).expect("commit");

    let reader =
        snapbox_runtime::supervisor::run(&store, &config, &image, "ls /marker").expect("run");
    let log = snapbox_runtime::logs::read(&store, &reader).expect("logs");
    assert!(log.contains("/marker"), "marker missing after commit: {log}");

    cleanup(
        &store,
        &config,
        &[writer.as_str(), reader.as_str(), image.as_str()],
    );
}

// S6: a failing payload still leaves a clean network and a usable log.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn network_is_torn_down_after_payload_failure() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let container =
        snapbox_runtime::supervisor::run(&store, &config, &image, "/nonexistent-binary")
            .expect("run survives payload failure");

    assert!(store.exists(container.as_str()).expect("exists"));
    snapbox_runtime::logs::read(&store, &container).expect("log readable");
    let veth = network::host_veth(&container);
    assert!(
        !Path::new("/sys/class/net").join(&veth).exists(),
        "{veth} still present"
    );
    assert!(
        !Path::new("/var/run/netns")
            .join(network::netns_name(&container))
            .exists(),
        "netns still present"
    );

    cleanup(&store, &config, &[container.as_str(), image.as_str()]);
}

// Unknown image: hard error before any mutation.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn run_unknown_image_mutates_nothing() {
    let (store, config) = engine();
    let ghost = ImageId::parse("img_199").expect("id");
    if store.exists(ghost.as_str()).expect("exists") {
        return;
    }

    let before = store.list("ps_").expect("list");
    let result = snapbox_runtime::supervisor::run(&store, &config, &ghost, "true");
    assert!(result.is_err());
    let after = store.list("ps_").expect("list");
    assert_eq!(before, after);
}

// rm removes both the subvolume and the cgroup directory.
#[test]
#[ignore = "requires root, btrfs, and a provisioned bridge"]
fn rm_deletes_subvolume_and_cgroup() {
    let (store, config) = engine();
    let image = init_test_image(&store);

    let container =
        snapbox_runtime::supervisor::run(&store, &config, &image, "/bin/true").expect("run");
    let cgroup_dir = config.cgroup_parent().join(container.as_str());
    assert!(cgroup_dir.exists(), "cgroup missing after run");

    snapbox_runtime::remove::remove(&store, &config, container.as_str()).expect("rm");
    assert!(!store.exists(container.as_str()).expect("exists"));
    assert!(!cgroup_dir.exists());

    cleanup(&store, &config, &[image.as_str()]);
}
