//! Exposure reconciliation.
//!
//! Compares the programs a rule list resolved to against what the previous
//! manifest published and the live contents of the shared bin directory,
//! then applies the difference. Every removal is ownership checked: only a
//! link that still points at this environment is ever deleted. The pass is
//! not transactional. A filesystem error aborts it and leaves whatever was
//! already applied in place.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{PathLink, Resolution, ResolutionWarning};
use crate::manifest::ExposedApp;
use crate::runtime::{Runtime, is_path_under, normalize_path};

/// Outcome of one pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// New `exposed.apps` map, keyed by program name.
    pub apps: BTreeMap<String, ExposedApp>,
    pub created: Vec<PathLink>,
    pub kept: Vec<PathLink>,
    /// Destinations occupied by something that is not our link, or lying
    /// outside the shared bin directory.
    pub conflicts: Vec<PathLink>,
    /// Resolved programs whose file is absent from the environment.
    pub missing: Vec<PathLink>,
    pub removed: Vec<PathBuf>,
    /// Stale destinations left alone because they no longer point here.
    pub left_in_place: Vec<PathBuf>,
    pub warnings: Vec<ResolutionWarning>,
}

impl ReconcileReport {
    /// Number of filesystem changes the pass made.
    pub fn mutations(&self) -> usize {
        self.created.len() + self.removed.len()
    }
}

pub struct Reconciler<'a, R: Runtime> {
    runtime: &'a R,
    venv_bin_dir: PathBuf,
    shared_bin_dir: PathBuf,
}

impl<'a, R: Runtime> Reconciler<'a, R> {
    pub fn new(runtime: &'a R, venv_bin_dir: PathBuf, shared_bin_dir: PathBuf) -> Self {
        Self {
            runtime,
            venv_bin_dir,
            shared_bin_dir,
        }
    }

    fn desired_link(&self, resolution: &Resolution, bin_name: &str) -> PathLink {
        PathLink::for_program(
            &self.venv_bin_dir,
            bin_name,
            &self.shared_bin_dir,
            resolution.renames.get(bin_name).map(String::as_str),
        )
    }

    /// Apply `resolution`, given the previously published `apps`. New
    /// entries are recorded as owned by `owners`.
    #[tracing::instrument(skip(self, resolution, previous))]
    pub fn reconcile(
        &self,
        resolution: &Resolution,
        previous: Option<&BTreeMap<String, ExposedApp>>,
        owners: &[String],
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            warnings: resolution.warnings.clone(),
            ..Default::default()
        };

        let desired: Vec<(&String, PathLink)> = resolution
            .binaries
            .iter()
            .map(|bin_name| (bin_name, self.desired_link(resolution, bin_name)))
            .collect();

        if let Some(previous) = previous {
            self.remove_stale(previous, &desired, &mut report)?;
        }

        if !desired.is_empty() && !self.runtime.exists(&self.shared_bin_dir) {
            debug!("Creating shared bin directory {:?}", self.shared_bin_dir);
            self.runtime
                .create_dir_all(&self.shared_bin_dir)
                .with_context(|| format!("Failed to create {:?}", self.shared_bin_dir))?;
        }

        for (bin_name, link) in desired {
            self.apply(bin_name, link, owners, &mut report)?;
        }

        Ok(report)
    }

    fn remove_stale(
        &self,
        previous: &BTreeMap<String, ExposedApp>,
        desired: &[(&String, PathLink)],
        report: &mut ReconcileReport,
    ) -> Result<()> {
        for (bin_name, app) in previous {
            let still_here = desired
                .iter()
                .any(|(name, link)| *name == bin_name && link.dest() == Some(app.exposed_path.as_path()));
            if still_here {
                continue;
            }

            let old = PathLink::with_dest(self.venv_bin_dir.join(bin_name), &app.exposed_path);
            if old.unlink(self.runtime, true)? {
                info!("Removed {:?}", app.exposed_path);
                report.removed.push(app.exposed_path.clone());
            } else {
                debug!(
                    "{:?} no longer points to {}, leaving it",
                    app.exposed_path, bin_name
                );
                report.left_in_place.push(app.exposed_path.clone());
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        bin_name: &str,
        link: PathLink,
        owners: &[String],
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let Some(dest) = link.dest().map(Path::to_path_buf) else {
            return Ok(());
        };

        if normalize_path(&dest).parent() != Some(normalize_path(&self.shared_bin_dir).as_path()) {
            let warning = ResolutionWarning::OutsideBinDir {
                bin_name: bin_name.to_string(),
                dest,
            };
            warn!("{}", warning);
            report.warnings.push(warning);
            report.conflicts.push(link);
            return Ok(());
        }

        let source_inside = is_path_under(link.source(), &self.venv_bin_dir);
        if !source_inside || !link.exists(self.runtime) {
            let warning = ResolutionWarning::MissingExecutable {
                name: bin_name.to_string(),
            };
            warn!("{}", warning);
            report.warnings.push(warning);
            // a link of ours to a vanished program goes with it
            if source_inside && link.unlink(self.runtime, true)? {
                info!("Removed dangling {:?}", dest);
                report.removed.push(dest);
            }
            report.missing.push(link);
            return Ok(());
        }

        if !link.link_exists(self.runtime)? {
            link.link(self.runtime)?;
            info!("Exposed {}", link.display_name());
            report.created.push(link);
        } else if link.is_valid(self.runtime)? {
            debug!("{} already exposed", link.display_name());
            report.kept.push(link);
        } else {
            let warning = ResolutionWarning::Conflict {
                bin_name: bin_name.to_string(),
                dest,
            };
            warn!("{}", warning);
            report.warnings.push(warning);
            report.conflicts.push(link);
            return Ok(());
        }

        report.apps.insert(
            bin_name.to_string(),
            ExposedApp {
                bin_name: bin_name.to_string(),
                exposed_path: dest,
                owning_package_names: owners.to_vec(),
            },
        );
        Ok(())
    }

    /// Remove every published link of an environment that is being deleted,
    /// whoever it points to now. Returns the removed paths.
    pub fn teardown(&self, apps: &BTreeMap<String, ExposedApp>) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for (bin_name, app) in apps {
            let link = PathLink::with_dest(self.venv_bin_dir.join(bin_name), &app.exposed_path);
            if link.unlink(self.runtime, false)? {
                info!("Removed {:?}", app.exposed_path);
                removed.push(app.exposed_path.clone());
            }
        }
        Ok(removed)
    }
}
