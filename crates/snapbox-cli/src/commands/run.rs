//! `sbx run` — Create and run a container in the foreground.

use clap::Args;

use snapbox_common::config::EngineConfig;
use snapbox_common::types::ImageId;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image to snapshot the container from.
    pub image: String,

    /// Command to run, executed via `/bin/sh -c` inside the container.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// The container's combined output streams to the terminal and into the
/// container log; the engine's exit status reflects the supervisor, not
/// the payload.
///
/// # Errors
///
/// Returns an error for an unknown image or a hard setup failure.
pub fn execute(args: RunArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let image = ImageId::parse(args.image)?;
    let cmd = args.command.join(" ");
    let id = snapbox_runtime::supervisor::run(&store, config, &image, &cmd)?;
    tracing::info!(id = %id, "container finished");
    Ok(())
}
