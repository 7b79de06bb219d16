use anyhow::Result;
use log::debug;

use crate::application::ListAction;
use crate::config::Layout;
use crate::runtime::Runtime;

/// List all environments
#[tracing::instrument(skip(runtime, layout))]
pub fn list<R: Runtime>(runtime: R, layout: Layout) -> Result<()> {
    debug!("Listing environments from {:?}", layout.venvs_root);

    let views = ListAction::new(&runtime, &layout).list()?;
    if views.is_empty() {
        println!("No environments found.");
        return Ok(());
    }

    for view in views {
        let apps: Vec<&str> = view
            .apps
            .iter()
            .map(|(app, _)| app.bin_name.as_str())
            .collect();
        println!(
            "{} ({}): {}",
            view.name,
            view.manifest.main_package.spec,
            if apps.is_empty() {
                "-".to_string()
            } else {
                apps.join(", ")
            }
        );
    }
    Ok(())
}
