//! Flat manifest layout written before documents carried a `config_version`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{ExposedApp, ExposedModel, InstallSet, Manifest, PackageModel, VenvModel};
use crate::venv::Venv;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyDocument {
    pub package_name_ref: String,
    pub package_name: String,
    #[serde(default)]
    pub venv_name: Option<String>,
    #[serde(default)]
    pub bin_names: Vec<String>,
    /// `[program in the environment, link in the shared bin directory]`.
    #[serde(default)]
    pub exposed_bins: Vec<(PathBuf, PathBuf)>,
    #[serde(default)]
    pub injected_package: BTreeMap<String, String>,
}

impl LegacyDocument {
    /// Rebuild the current layout. The environment always lives under
    /// `venvs_root`, whatever `uvpipx_package_path` the document recorded.
    pub fn into_manifest(self, venvs_root: &Path) -> Manifest {
        let dir = venvs_root.join(self.venv_name.as_deref().unwrap_or(&self.package_name));
        let main_owners = vec![self.package_name.clone()];

        let apps = self
            .exposed_bins
            .iter()
            .filter_map(|(program, link)| {
                let bin_name = program.file_name()?.to_string_lossy().into_owned();
                let alias = legacy_alias(program, link);
                let exposed_path = link
                    .parent()?
                    .join(alias.as_deref().unwrap_or(&bin_name));
                Some((
                    bin_name.clone(),
                    ExposedApp {
                        bin_name,
                        exposed_path,
                        owning_package_names: main_owners.clone(),
                    },
                ))
            })
            .collect();

        let injected_packages: BTreeMap<String, PackageModel> = self
            .injected_package
            .into_iter()
            .map(|(name, spec)| (name.clone(), PackageModel::new(spec, name)))
            .collect();

        let install_sets = vec![
            InstallSet::new(main_owners, self.bin_names),
            InstallSet::new(injected_packages.keys().cloned().collect(), Vec::new()),
        ];

        Manifest {
            venv: VenvModel {
                dir: dir.clone(),
                name_override: self.venv_name,
            },
            main_package: PackageModel::new(self.package_name_ref, self.package_name),
            injected_packages,
            exposed: ExposedModel {
                venv_bin_dir: Venv::bin_dir_of(&dir),
                install_sets,
                apps,
            },
            config_version: super::CONFIG_VERSION.to_string(),
        }
    }
}

/// Published name of a legacy pair when it differs from the program name.
fn legacy_alias(program: &Path, link: &Path) -> Option<String> {
    let link_name = link.file_name()?;
    if program.file_name() == Some(link_name) {
        return None;
    }
    Some(link_name.to_string_lossy().into_owned())
}
