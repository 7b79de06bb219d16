//! Where environments live and where their programs are published.

use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

pub const HOME_ENV: &str = "VENVX_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Directory holding one subdirectory per environment.
    pub venvs_root: PathBuf,
    /// Shared directory the exposed links are created in.
    pub bin_dir: PathBuf,
}

impl Layout {
    /// Resolve the layout. Explicit values (command line or their environment
    /// variables) win over `VENVX_HOME` and the built-in defaults.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime>(
        runtime: &R,
        venvs_root: Option<PathBuf>,
        bin_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let venvs_root = match venvs_root {
            Some(path) => path,
            None => venvx_home(runtime)?.join("venvs"),
        };
        let bin_dir = match bin_dir {
            Some(path) => path,
            None => default_bin_dir(runtime)?,
        };

        debug!("Using venvs root {:?} and bin dir {:?}", venvs_root, bin_dir);
        Ok(Self {
            venvs_root,
            bin_dir,
        })
    }
}

fn home_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    runtime
        .home_dir()
        .context("Could not find home directory")
}

/// `$VENVX_HOME`, else `~/.local/venvx`.
pub fn venvx_home<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    match runtime.env_var(HOME_ENV) {
        Ok(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Ok(home_dir(runtime)?.join(".local").join("venvx")),
    }
}

/// `~/.local/bin`, or the system-wide bin directory when privileged.
pub fn default_bin_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_bin_dir())
    } else {
        Ok(home_dir(runtime)?.join(".local").join("bin"))
    }
}

#[cfg(not(windows))]
fn system_bin_dir() -> PathBuf {
    PathBuf::from("/usr/local/bin")
}

#[cfg(windows)]
fn system_bin_dir() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\venvx\bin")
}
