//! `sbx commit` — Replace an image with a container's state.

use clap::Args;

use snapbox_common::config::EngineConfig;
use snapbox_common::types::{ContainerId, ImageId};

/// Arguments for the `commit` command.
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Source container ID.
    pub container: String,

    /// Destination image ID, replaced in place.
    pub image: String,
}

/// Executes the `commit` command.
///
/// # Errors
///
/// Returns an error if either object is missing or the snapshot fails.
pub fn execute(args: CommitArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let container = ContainerId::parse(args.container)?;
    let image = ImageId::parse(args.image)?;
    snapbox_runtime::commit::commit(&store, &container, &image)?;
    println!("Created: {image}");
    Ok(())
}
