//! List action - environments with the live state of their links.

use anyhow::Result;
use std::fmt;

use crate::config::Layout;
use crate::exposure::PathLink;
use crate::manifest::{ExposedApp, Manifest, ManifestStore};
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Points at this environment.
    Valid,
    /// Nothing at the exposed path.
    Missing,
    /// Something else occupies the exposed path.
    Conflict,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkStatus::Valid => "ok",
            LinkStatus::Missing => "missing",
            LinkStatus::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct EnvironmentView {
    pub name: String,
    pub manifest: Manifest,
    pub apps: Vec<(ExposedApp, LinkStatus)>,
}

pub struct ListAction<'a, R: Runtime> {
    runtime: &'a R,
    store: ManifestStore<'a, R>,
}

impl<'a, R: Runtime> ListAction<'a, R> {
    pub fn new(runtime: &'a R, layout: &Layout) -> Self {
        Self {
            runtime,
            store: ManifestStore::new(runtime, layout.venvs_root.clone()),
        }
    }

    pub fn list(&self) -> Result<Vec<EnvironmentView>> {
        self.store
            .find_all_with_manifest()?
            .into_iter()
            .map(|(name, manifest)| self.view(name, manifest))
            .collect()
    }

    pub fn show(&self, name: &str) -> Result<EnvironmentView> {
        let manifest = self.store.load_required(name)?;
        self.view(name.to_string(), manifest)
    }

    fn view(&self, name: String, manifest: Manifest) -> Result<EnvironmentView> {
        let mut apps = Vec::with_capacity(manifest.exposed.apps.len());
        for app in manifest.exposed.apps.values() {
            let link = PathLink::with_dest(
                manifest.exposed.venv_bin_dir.join(&app.bin_name),
                &app.exposed_path,
            );
            let status = if !link.link_exists(self.runtime)? {
                LinkStatus::Missing
            } else if link.is_valid(self.runtime)? {
                LinkStatus::Valid
            } else {
                LinkStatus::Conflict
            };
            apps.push((app.clone(), status));
        }

        Ok(EnvironmentView {
            name,
            manifest,
            apps,
        })
    }
}
