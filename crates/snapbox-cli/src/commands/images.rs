//! `sbx images` — List images with their origins.

use snapbox_common::config::EngineConfig;

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if the store cannot be listed.
pub fn execute(config: &EngineConfig) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    println!("IMAGE_ID\t\tSOURCE");
    for record in snapbox_image::catalog::list_images(&store)? {
        println!("{}\t\t{}", record.id, record.source);
    }
    Ok(())
}
