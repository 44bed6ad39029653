//! `sbx ps` — List containers with their commands.

use snapbox_common::config::EngineConfig;

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the store cannot be listed.
pub fn execute(config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    println!("CONTAINER_ID\t\tCOMMAND");
    for record in snapbox_runtime::roster::list_containers(&store)? {
        println!("{}\t\t{}", record.id, record.command);
    }
    Ok(())
}
