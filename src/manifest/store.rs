//! Manifest persistence under the venvs root.
//!
//! Layout: `<venvs_root>/<name>/venvx.json`, next to the environment itself
//! in `<venvs_root>/<name>/.venv`.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::{Manifest, Migration, MigrationContext, migrate_str};
use crate::runtime::Runtime;
use crate::venv::Venv;

pub const MANIFEST_FILE: &str = "venvx.json";

pub struct ManifestStore<'a, R: Runtime> {
    runtime: &'a R,
    venvs_root: PathBuf,
}

impl<'a, R: Runtime> ManifestStore<'a, R> {
    pub fn new(runtime: &'a R, venvs_root: PathBuf) -> Self {
        Self {
            runtime,
            venvs_root,
        }
    }

    pub fn venvs_root(&self) -> &Path {
        &self.venvs_root
    }

    /// Returns: `<venvs_root>/<name>`
    pub fn env_dir(&self, name: &str) -> PathBuf {
        self.venvs_root.join(name)
    }

    /// Returns: `<venvs_root>/<name>/venvx.json`
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.env_dir(name).join(MANIFEST_FILE)
    }

    pub fn venv(&self, name: &str) -> Venv {
        Venv::new(self.env_dir(name))
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.runtime.exists(&self.manifest_path(name))
    }

    /// Load a manifest, upgrading it on disk when it was in a legacy layout.
    ///
    /// Returns `None` if the environment has no manifest.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, name: &str) -> Result<Option<Manifest>> {
        let path = self.manifest_path(name);
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        self.migrate_path(&path).map(|m| Some(m.manifest))
    }

    /// Load a manifest, returning an error if the environment has none.
    pub fn load_required(&self, name: &str) -> Result<Manifest> {
        self.load(name)?.ok_or_else(|| {
            anyhow::anyhow!(
                "Environment {} has no manifest in {:?}",
                name,
                self.env_dir(name)
            )
        })
    }

    /// Bring an environment's manifest to the current schema, persisting it
    /// when it was upgraded.
    pub fn migrate(&self, name: &str) -> Result<Migration> {
        let path = self.manifest_path(name);
        if !self.runtime.exists(&path) {
            anyhow::bail!("Environment {} has no manifest in {:?}", name, self.env_dir(name));
        }
        self.migrate_path(&path)
    }

    fn migrate_path(&self, path: &Path) -> Result<Migration> {
        let content = self
            .runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        let migration = migrate_str(&content, &MigrationContext::new(&self.venvs_root))
            .with_context(|| format!("Cannot load manifest {:?}", path))?;

        if migration.upgraded {
            debug!("Writing upgraded manifest back to {:?}", path);
            self.write(path, &migration.manifest)?;
        }
        Ok(migration)
    }

    /// Save to the same location `load(name)` reads from.
    pub fn save(&self, name: &str, manifest: &Manifest) -> Result<()> {
        self.write(&self.manifest_path(name), manifest)
    }

    fn write(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        if let Some(parent) = path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(manifest)?;
        self.runtime
            .write(path, content.as_bytes())
            .with_context(|| format!("Failed to save manifest to {:?}", path))
    }

    /// Names of all environments that have a manifest, sorted.
    #[tracing::instrument(skip(self))]
    pub fn find_all(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.runtime.exists(&self.venvs_root) {
            return Ok(names);
        }

        for entry in self.runtime.read_dir(&self.venvs_root)? {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && self.runtime.is_dir(&entry)
                && self.runtime.exists(&entry.join(MANIFEST_FILE))
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Load every manifest. Unreadable ones are skipped with a warning.
    pub fn find_all_with_manifest(&self) -> Result<Vec<(String, Manifest)>> {
        let names = self.find_all()?;
        let mut results = Vec::with_capacity(names.len());

        for name in names {
            match self.migrate_path(&self.manifest_path(&name)) {
                Ok(migration) => results.push((name, migration.manifest)),
                Err(e) => warn!("Skipping environment {}: {:#}", name, e),
            }
        }

        Ok(results)
    }

    /// Delete the whole environment directory, manifest included.
    pub fn remove_env_dir(&self, name: &str) -> Result<()> {
        let dir = self.env_dir(name);
        if self.runtime.exists(&dir) {
            self.runtime
                .remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {:?}", dir))?;
        }
        Ok(())
    }
}
