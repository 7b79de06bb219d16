use anyhow::Result;

use crate::config::Layout;
use crate::manifest::{CONFIG_VERSION, ManifestStore};
use crate::runtime::Runtime;

/// Upgrade the manifest of one environment to the current schema
#[tracing::instrument(skip(runtime, layout))]
pub fn migrate<R: Runtime>(runtime: R, name: &str, layout: Layout) -> Result<()> {
    let store = ManifestStore::new(&runtime, layout.venvs_root);
    let migration = store.migrate(name)?;
    if migration.upgraded {
        println!("Upgraded manifest of {} to {}", name, CONFIG_VERSION);
    } else {
        println!("Manifest of {} is already at {}", name, CONFIG_VERSION);
    }
    Ok(())
}
