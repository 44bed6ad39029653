//! `sbx init` — Create an image from a local directory tree.

use std::path::PathBuf;

use clap::Args;

use snapbox_common::config::EngineConfig;

/// Arguments for the `init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory whose contents become the image rootfs.
    pub directory: PathBuf,
}

/// Executes the `init` command.
///
/// # Errors
///
/// Returns an error if the directory is missing or image creation fails.
pub fn execute(args: InitArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let id = snapbox_image::init::create_image(&store, &args.directory)?;
    println!("Created: {id}");
    Ok(())
}
