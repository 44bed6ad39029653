//! `sbx pull` — Fetch and materialize a remote image.

use clap::Args;

use snapbox_common::config::EngineConfig;

/// Arguments for the `pull` command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Image name in the registry.
    pub name: String,

    /// Image tag.
    pub tag: String,
}

/// Executes the `pull` command.
///
/// # Errors
///
/// Returns an error if the download or image creation fails.
pub fn execute(args: PullArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let id = snapbox_image::pull::pull_image(&store, config, &args.name, &args.tag)?;
    println!("Created: {id}");
    Ok(())
}
