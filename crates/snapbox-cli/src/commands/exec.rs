//! `sbx exec` — Run a command inside a running container.

use clap::Args;

use snapbox_common::config::EngineConfig;
use snapbox_common::types::ContainerId;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Target container ID.
    pub container: String,

    /// Command to execute, argv passed through without a shell.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, not running, or the
/// namespace entry fails.
pub fn execute(args: ExecArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let id = ContainerId::parse(args.container)?;
    snapbox_runtime::attach::exec(&store, &id, &args.command)?;
    Ok(())
}
