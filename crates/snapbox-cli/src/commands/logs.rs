//! `sbx logs` — Print a container's captured output.

use clap::Args;

use snapbox_common::config::EngineConfig;
use snapbox_common::types::ContainerId;

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Container ID.
    pub container: String,
}

/// Executes the `logs` command.
///
/// # Errors
///
/// Returns an error if the container does not exist.
pub fn execute(args: LogsArgs, config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let id = ContainerId::parse(args.container)?;
    let contents = snapbox_runtime::logs::read(&store, &id)?;
    print!("{contents}");
    Ok(())
}
