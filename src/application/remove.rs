//! Remove action - tears an environment down completely.

use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::config::Layout;
use crate::exposure::Reconciler;
use crate::manifest::{Manifest, ManifestStore};
use crate::runtime::Runtime;

pub struct RemoveAction<'a, R: Runtime> {
    runtime: &'a R,
    store: ManifestStore<'a, R>,
    bin_dir: PathBuf,
}

impl<'a, R: Runtime> RemoveAction<'a, R> {
    pub fn new(runtime: &'a R, layout: &Layout) -> Self {
        Self {
            runtime,
            store: ManifestStore::new(runtime, layout.venvs_root.clone()),
            bin_dir: layout.bin_dir.clone(),
        }
    }

    pub fn store(&self) -> &ManifestStore<'a, R> {
        &self.store
    }

    /// Unlink every exposed program, whatever it points to now, then delete
    /// the environment directory. Returns the removed link paths.
    #[tracing::instrument(skip(self, manifest))]
    pub fn remove(&self, name: &str, manifest: &Manifest) -> Result<Vec<PathBuf>> {
        let reconciler = Reconciler::new(
            self.runtime,
            manifest.exposed.venv_bin_dir.clone(),
            self.bin_dir.clone(),
        );
        let removed = reconciler.teardown(&manifest.exposed.apps)?;
        debug!("Removed {} link(s) of {}", removed.len(), name);

        self.store.remove_env_dir(name)?;
        Ok(removed)
    }
}
