use anyhow::Result;
use log::debug;

use crate::application::RemoveAction;
use crate::config::Layout;
use crate::manifest::Manifest;
use crate::runtime::Runtime;

/// Remove an environment and every program it exposes
#[tracing::instrument(skip(runtime, layout))]
pub fn remove<R: Runtime>(runtime: R, name: &str, yes: bool, layout: Layout) -> Result<()> {
    let action = RemoveAction::new(&runtime, &layout);
    let manifest = action.store().load_required(name)?;

    if !yes {
        show_removal_plan(name, &manifest, &action);
        if !runtime.confirm("Proceed with removal?")? {
            println!("Removal cancelled.");
            return Ok(());
        }
    }

    let removed = action.remove(name, &manifest)?;
    debug!("Removed links: {:?}", removed);
    println!("Removed environment {}", name);
    Ok(())
}

fn show_removal_plan<R: Runtime>(name: &str, manifest: &Manifest, action: &RemoveAction<'_, R>) {
    println!();
    println!("=== Removal Plan ===");
    println!();
    println!("Environment: {}", name);
    println!();
    println!("Directories to remove:");
    println!("  [DEL] {}", action.store().env_dir(name).display());

    if !manifest.exposed.apps.is_empty() {
        println!();
        println!("Links to remove:");
        for app in manifest.exposed.apps.values() {
            println!("  [DEL] {}", app.exposed_path.display());
        }
    }
    println!();
}
