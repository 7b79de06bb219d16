//! Init action - writes the first manifest of an environment.

use anyhow::{Context, Result, bail};
use log::info;

use crate::config::Layout;
use crate::manifest::{Manifest, ManifestStore, PackageModel};
use crate::runtime::Runtime;

pub struct InitAction<'a, R: Runtime> {
    runtime: &'a R,
    store: ManifestStore<'a, R>,
}

impl<'a, R: Runtime> InitAction<'a, R> {
    pub fn new(runtime: &'a R, layout: &Layout) -> Self {
        Self {
            runtime,
            store: ManifestStore::new(runtime, layout.venvs_root.clone()),
        }
    }

    /// Describe an environment that already exists on disk. `name` defaults
    /// to the package name taken from `spec`.
    #[tracing::instrument(skip(self))]
    pub fn init(&self, spec: &str, name: Option<&str>) -> Result<Manifest> {
        let package = PackageModel::from_spec(spec)
            .with_context(|| format!("Cannot find a package name in {:?}", spec))?;
        let name = name.unwrap_or(&package.resolved_name).to_string();

        let venv = self.store.venv(&name);
        if !self.runtime.is_dir(&venv.venv_dir()) {
            bail!(
                "No environment at {:?}, create it before running init",
                venv.venv_dir()
            );
        }
        if self.store.is_initialized(&name) {
            bail!("Environment {} already has a manifest", name);
        }

        let mut manifest = Manifest::new(venv.root(), package, &venv.bin_dir());
        if name != manifest.main_package.resolved_name {
            manifest.venv.name_override = Some(name.clone());
        }

        self.store.save(&name, &manifest)?;
        info!("Initialized {} in {:?}", name, venv.root());
        Ok(manifest)
    }
}
