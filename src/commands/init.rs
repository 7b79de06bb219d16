use anyhow::Result;

use crate::application::InitAction;
use crate::config::Layout;
use crate::runtime::Runtime;

/// Write the manifest of an existing environment
#[tracing::instrument(skip(runtime, layout))]
pub fn init<R: Runtime>(runtime: R, spec: &str, name: Option<&str>, layout: Layout) -> Result<()> {
    let manifest = InitAction::new(&runtime, &layout).init(spec, name)?;
    println!(
        "Initialized {} ({}) in {}",
        manifest.name(),
        manifest.main_package.spec,
        manifest.venv.dir.display()
    );
    Ok(())
}
