//! `sbx rm` — Delete an image or container.

use clap::Args;

use snapbox_common::config::EngineConfig;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Image or container ID.
    pub id: String,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if the object does not exist or deletion fails.
pub fn execute(args: RmArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    snapbox_runtime::remove::remove(&store, config, &args.id)?;
    println!("Removed: {}", args.id);
    Ok(())
}
