//! Versioned on-disk description of one environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Schema version written by this crate.
pub const CONFIG_VERSION: &str = "0.2.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VenvModel {
    #[serde(alias = "uvpipx_dir")]
    pub dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,
}

impl VenvModel {
    /// Environment name: the override when set, else the directory name.
    pub fn name(&self) -> String {
        self.name_override.clone().unwrap_or_else(|| {
            self.dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageModel {
    /// Requirement as given by the user, e.g. `jc==1.25`.
    #[serde(alias = "package_name_spec")]
    pub spec: String,
    /// Distribution name, e.g. `jc`.
    #[serde(alias = "package_name")]
    pub resolved_name: String,
}

impl PackageModel {
    pub fn new(spec: impl Into<String>, resolved_name: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            resolved_name: resolved_name.into(),
        }
    }

    /// Derive the distribution name from a requirement spec.
    ///
    /// The name is the leading run of letters, digits, `-`, `_` and `.`;
    /// extras, version operators and markers are dropped.
    pub fn from_spec(spec: &str) -> Option<Self> {
        let trimmed = spec.trim();
        let name: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(trimmed, name))
    }
}

/// One published executable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExposedApp {
    /// Program name inside the environment's bin directory.
    #[serde(alias = "bin_app_name")]
    pub bin_name: String,
    /// Symlink path in the shared bin directory.
    #[serde(alias = "exposed_app_path")]
    pub exposed_path: PathBuf,
    #[serde(alias = "packages_name_sets")]
    pub owning_package_names: Vec<String>,
}

/// Audit record of a rule list applied to a package grouping.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstallSet {
    #[serde(alias = "package_name_sets")]
    pub package_names: Vec<String>,
    #[serde(alias = "exposed_apps_rules")]
    pub expose_rules: Vec<String>,
}

impl InstallSet {
    pub fn new(package_names: Vec<String>, expose_rules: Vec<String>) -> Self {
        Self {
            package_names,
            expose_rules,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExposedModel {
    pub venv_bin_dir: PathBuf,
    #[serde(default)]
    pub install_sets: Vec<InstallSet>,
    #[serde(default)]
    pub apps: BTreeMap<String, ExposedApp>,
}

impl ExposedModel {
    pub fn new(venv_bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            venv_bin_dir: venv_bin_dir.into(),
            install_sets: Vec::new(),
            apps: BTreeMap::new(),
        }
    }

    /// Append `set` unless an identical record is already present.
    /// Returns whether it was appended.
    pub fn record_install_set(&mut self, set: InstallSet) -> bool {
        if self.install_sets.contains(&set) {
            return false;
        }
        self.install_sets.push(set);
        true
    }

    /// Rules of the most recent install set naming `package`.
    pub fn last_rules_for(&self, package: &str) -> Option<&[String]> {
        self.install_sets
            .iter()
            .rev()
            .find(|set| set.package_names.iter().any(|p| p == package))
            .map(|set| set.expose_rules.as_slice())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub venv: VenvModel,
    pub main_package: PackageModel,
    #[serde(default)]
    pub injected_packages: BTreeMap<String, PackageModel>,
    pub exposed: ExposedModel,
    pub config_version: String,
}

impl Manifest {
    /// Fresh manifest for an environment rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, main_package: PackageModel, venv_bin_dir: &Path) -> Self {
        Self {
            venv: VenvModel {
                dir: dir.into(),
                name_override: None,
            },
            main_package,
            injected_packages: BTreeMap::new(),
            exposed: ExposedModel::new(venv_bin_dir),
            config_version: CONFIG_VERSION.to_string(),
        }
    }

    pub fn name(&self) -> String {
        self.venv.name()
    }
}
