//! Read-only access to one isolated environment.
//!
//! The exposure engine only needs three questions answered about an
//! environment: does a program exist in its bin directory, which programs
//! are there, and which console scripts did a distribution declare. Those
//! are captured by [`EnvironmentInspector`]; [`VenvInspector`] answers them
//! from disk.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Directory holding the environment inside its package directory.
pub const VENV_DIR_NAME: &str = ".venv";

/// Console-script metadata written next to the environment by the installer.
pub const PIP_METADATA_FILE: &str = "pip_metadata.json";

#[cfg(not(windows))]
const BIN_DIR_NAME: &str = "bin";
#[cfg(windows)]
const BIN_DIR_NAME: &str = "Scripts";

/// Paths of one environment: `<venvs>/<name>/` with the interpreter tree in
/// `.venv/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venv {
    root: PathBuf,
}

impl Venv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The package directory (`<venvs>/<name>`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.root.join(VENV_DIR_NAME)
    }

    pub fn bin_dir(&self) -> PathBuf {
        Self::bin_dir_of(&self.root)
    }

    /// Bin directory of the environment rooted at `root`.
    pub fn bin_dir_of(root: &Path) -> PathBuf {
        root.join(VENV_DIR_NAME).join(BIN_DIR_NAME)
    }

    pub fn pip_metadata_path(&self) -> PathBuf {
        self.root.join(PIP_METADATA_FILE)
    }
}

/// Questions the rule resolver asks about an environment.
#[cfg_attr(test, mockall::automock)]
pub trait EnvironmentInspector {
    /// Is there an executable named `name` in the environment's bin directory?
    fn has_executable(&self, name: &str) -> bool;

    /// Names of the executables in the bin directory, sorted.
    fn executables(&self) -> Result<Vec<String>>;

    /// Console scripts declared by the installed distribution `package`, in
    /// a stable order. Empty when the package declares none or is unknown.
    fn console_scripts(&self, package: &str) -> Result<Vec<String>>;
}

/// `pip_metadata.json`: distribution name to `{script: entry point}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PipMetadata {
    #[serde(default)]
    pub console_scripts: BTreeMap<String, BTreeMap<String, String>>,
}

impl PipMetadata {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No console-script metadata at {:?}", path);
            return Ok(Self::default());
        }
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid console-script metadata in {:?}", path))
    }

    /// Scripts of `package`, matching the distribution name exactly first and
    /// then by normalized name (`Foo_Bar` finds `foo-bar`).
    pub fn scripts_for(&self, package: &str) -> Vec<String> {
        let entry = self.console_scripts.get(package).or_else(|| {
            let wanted = normalize_dist_name(package);
            self.console_scripts
                .iter()
                .find(|(name, _)| normalize_dist_name(name) == wanted)
                .map(|(_, scripts)| scripts)
        });

        entry
            .map(|scripts| scripts.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Lowercase with runs of `-`, `_` and `.` collapsed to a single `-`.
pub fn normalize_dist_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

/// [`EnvironmentInspector`] backed by the real environment on disk.
pub struct VenvInspector<'a, R: Runtime> {
    runtime: &'a R,
    bin_dir: PathBuf,
    metadata_path: PathBuf,
}

impl<'a, R: Runtime> VenvInspector<'a, R> {
    pub fn new(runtime: &'a R, venv: &Venv) -> Self {
        Self {
            runtime,
            bin_dir: venv.bin_dir(),
            metadata_path: venv.pip_metadata_path(),
        }
    }

    /// Inspect a bin directory recorded in a manifest, which may differ from
    /// the one derived from the current layout.
    pub fn with_bin_dir(mut self, bin_dir: PathBuf) -> Self {
        self.bin_dir = bin_dir;
        self
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}

impl<R: Runtime> EnvironmentInspector for VenvInspector<'_, R> {
    fn has_executable(&self, name: &str) -> bool {
        !name.is_empty() && self.runtime.exists(&self.bin_dir.join(name))
    }

    fn executables(&self) -> Result<Vec<String>> {
        if !self.runtime.is_dir(&self.bin_dir) {
            debug!("Bin directory {:?} does not exist", self.bin_dir);
            return Ok(vec![]);
        }

        let mut names: Vec<String> = self
            .runtime
            .read_dir(&self.bin_dir)
            .with_context(|| format!("Failed to list {:?}", self.bin_dir))?
            .into_iter()
            .filter(|path| self.runtime.is_executable(path))
            .filter_map(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(String::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn console_scripts(&self, package: &str) -> Result<Vec<String>> {
        Ok(PipMetadata::load(self.runtime, &self.metadata_path)?.scripts_for(package))
    }
}
