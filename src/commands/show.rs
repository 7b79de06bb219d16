use anyhow::Result;

use crate::application::ListAction;
use crate::config::Layout;
use crate::runtime::Runtime;

/// Show one environment with the state of its links
#[tracing::instrument(skip(runtime, layout))]
pub fn show<R: Runtime>(runtime: R, name: &str, layout: Layout) -> Result<()> {
    let view = ListAction::new(&runtime, &layout).show(name)?;
    let manifest = &view.manifest;

    println!("Environment: {}", view.name);
    println!("Directory: {}", manifest.venv.dir.display());
    println!(
        "Package: {} ({})",
        manifest.main_package.resolved_name, manifest.main_package.spec
    );
    if !manifest.injected_packages.is_empty() {
        println!("\nInjected packages:");
        for package in manifest.injected_packages.values() {
            println!("  {} ({})", package.resolved_name, package.spec);
        }
    }

    println!("\nExposed programs:");
    if view.apps.is_empty() {
        println!("  (none)");
    }
    for (app, status) in &view.apps {
        println!(
            "  {} -> {} [{}]",
            app.bin_name,
            app.exposed_path.display(),
            status
        );
    }

    if !manifest.exposed.install_sets.is_empty() {
        println!("\nInstall sets:");
        for set in &manifest.exposed.install_sets {
            println!(
                "  [{}] rules: [{}]",
                set.package_names.join(", "),
                set.expose_rules.join(", ")
            );
        }
    }
    Ok(())
}
