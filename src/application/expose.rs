//! Expose action - resolves rules and reconciles published links.

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::config::Layout;
use crate::exposure::{ReconcileReport, Reconciler, RuleResolver};
use crate::manifest::{InstallSet, Manifest, ManifestStore};
use crate::runtime::Runtime;
use crate::venv::{Venv, VenvInspector};

/// Result of exposing one environment.
#[derive(Debug)]
pub struct ExposeOutcome {
    pub manifest: Manifest,
    pub report: ReconcileReport,
}

pub struct ExposeAction<'a, R: Runtime> {
    runtime: &'a R,
    store: ManifestStore<'a, R>,
    layout: Layout,
}

impl<'a, R: Runtime> ExposeAction<'a, R> {
    pub fn new(runtime: &'a R, layout: &Layout) -> Self {
        Self {
            runtime,
            store: ManifestStore::new(runtime, layout.venvs_root.clone()),
            layout: layout.clone(),
        }
    }

    pub fn store(&self) -> &ManifestStore<'a, R> {
        &self.store
    }

    /// Apply `rules` to the main package of environment `name`.
    #[tracing::instrument(skip(self))]
    pub fn expose(&self, name: &str, rules: &[String]) -> Result<ExposeOutcome> {
        let manifest = self.store.load_required(name)?;
        self.apply(name, manifest, rules)
    }

    /// Re-apply the rules last recorded for the main package.
    #[tracing::instrument(skip(self))]
    pub fn reexpose(&self, name: &str) -> Result<ExposeOutcome> {
        let manifest = self.store.load_required(name)?;
        let rules = manifest
            .exposed
            .last_rules_for(&manifest.main_package.resolved_name)
            .map(<[String]>::to_vec)
            .with_context(|| format!("No expose rules recorded for {}", name))?;
        debug!("Re-exposing {} with {:?}", name, rules);
        self.apply(name, manifest, &rules)
    }

    /// Apply `rules` to every environment. A failing environment does not
    /// stop the others.
    #[tracing::instrument(skip(self))]
    pub fn expose_all(&self, rules: &[String]) -> Result<Vec<(String, Result<ExposeOutcome>)>> {
        let names = self.store.find_all()?;
        Ok(names
            .into_iter()
            .map(|name| {
                let outcome = self.expose(&name, rules);
                if let Err(e) = &outcome {
                    warn!("Failed to expose {}: {:#}", name, e);
                }
                (name, outcome)
            })
            .collect())
    }

    /// One full pass. The manifest is written only after every link change
    /// succeeded.
    fn apply(&self, name: &str, mut manifest: Manifest, rules: &[String]) -> Result<ExposeOutcome> {
        let main_package = manifest.main_package.resolved_name.clone();
        let venv_bin_dir = manifest.exposed.venv_bin_dir.clone();

        let inspector = VenvInspector::new(self.runtime, &Venv::new(&manifest.venv.dir))
            .with_bin_dir(venv_bin_dir.clone());
        let resolution = RuleResolver::new(&inspector, &main_package)?.resolve(rules)?;

        let owners = vec![main_package.clone()];
        let reconciler = Reconciler::new(self.runtime, venv_bin_dir, self.layout.bin_dir.clone());
        let report = reconciler.reconcile(&resolution, Some(&manifest.exposed.apps), &owners)?;

        manifest.exposed.apps = report.apps.clone();
        manifest
            .exposed
            .record_install_set(InstallSet::new(owners, rules.to_vec()));
        self.store.save(name, &manifest)?;

        Ok(ExposeOutcome { manifest, report })
    }
}
