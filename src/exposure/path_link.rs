//! A single candidate publication.
//!
//! A [`PathLink`] pairs one program inside an environment's bin directory
//! with the symlink that exposes it in the shared bin directory. It is built
//! fresh for every reconciliation pass and never persisted itself.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::runtime::{Runtime, normalize_path};

/// Contract violations and refusals raised by [`PathLink`].
///
/// Filesystem failures are not represented here; they propagate as plain
/// I/O errors with context attached.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The link was queried or mutated before a destination was set.
    #[error("no link destination set for {program:?}")]
    Precondition { program: PathBuf },

    /// The destination is fixed once set.
    #[error("link destination for {program:?} is already set to {dest:?}")]
    DestinationFixed { program: PathBuf, dest: PathBuf },

    /// Something already occupies the destination.
    #[error("{dest:?} already exists")]
    AlreadyExists { dest: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLink {
    source: PathBuf,
    dest: Option<PathBuf>,
}

impl PathLink {
    /// A link whose destination is not decided yet.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: None,
        }
    }

    pub fn with_dest(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: Some(dest.into()),
        }
    }

    /// Build the link exposing `bin_name` from `venv_bin_dir` into
    /// `shared_bin_dir`, named `alias` when one is given.
    pub fn for_program(
        venv_bin_dir: &Path,
        bin_name: &str,
        shared_bin_dir: &Path,
        alias: Option<&str>,
    ) -> Self {
        Self::with_dest(
            venv_bin_dir.join(bin_name),
            shared_bin_dir.join(alias.unwrap_or(bin_name)),
        )
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    /// Set the destination. Fails once a destination has been set.
    pub fn set_dest(&mut self, dest: impl Into<PathBuf>) -> Result<(), LinkError> {
        if let Some(existing) = &self.dest {
            return Err(LinkError::DestinationFixed {
                program: self.source.clone(),
                dest: existing.clone(),
            });
        }
        self.dest = Some(dest.into());
        Ok(())
    }

    fn require_dest(&self) -> Result<&Path, LinkError> {
        self.dest.as_deref().ok_or_else(|| LinkError::Precondition {
            program: self.source.clone(),
        })
    }

    /// True iff the program itself is present on disk.
    pub fn exists<R: Runtime>(&self, runtime: &R) -> bool {
        runtime.exists(&self.source)
    }

    /// True iff something occupies the destination. A dangling symlink counts.
    pub fn link_exists<R: Runtime>(&self, runtime: &R) -> Result<bool> {
        let dest = self.require_dest()?;
        Ok(runtime.is_symlink(dest) || runtime.exists(dest))
    }

    /// True iff the destination is a symlink whose resolved target is exactly
    /// this link's source.
    pub fn is_valid<R: Runtime>(&self, runtime: &R) -> Result<bool> {
        let dest = self.require_dest()?;
        if !runtime.is_symlink(dest) {
            return Ok(false);
        }

        match runtime.resolve_link(dest) {
            Ok(target) => Ok(target == normalize_path(&self.source)),
            Err(e) => {
                debug!("Cannot resolve {:?}: {}", dest, e);
                Ok(false)
            }
        }
    }

    /// Create the symlink. Never overwrites whatever is at the destination.
    pub fn link<R: Runtime>(&self, runtime: &R) -> Result<()> {
        let dest = self.require_dest()?;
        if self.link_exists(runtime)? {
            return Err(LinkError::AlreadyExists {
                dest: dest.to_path_buf(),
            }
            .into());
        }

        runtime
            .symlink(&self.source, dest)
            .with_context(|| format!("Failed to link {:?} to {:?}", dest, self.source))
    }

    /// Remove the destination.
    ///
    /// With `only_if_valid` the destination is removed only when it is a
    /// valid link to this source; otherwise anything at the destination is
    /// removed. Returns whether something was removed.
    pub fn unlink<R: Runtime>(&self, runtime: &R, only_if_valid: bool) -> Result<bool> {
        let dest = self.require_dest()?;
        let removable = if only_if_valid {
            self.is_valid(runtime)?
        } else {
            self.link_exists(runtime)?
        };

        if !removable {
            debug!(
                "Leaving {:?} in place (only_if_valid={})",
                dest, only_if_valid
            );
            return Ok(false);
        }

        runtime
            .remove_symlink(dest)
            .with_context(|| format!("Failed to remove {:?}", dest))?;
        Ok(true)
    }

    /// `jc` when the link keeps the program name, `jc -> myjc` when aliased.
    pub fn display_name(&self) -> String {
        let program = file_name(&self.source);
        match self.dest.as_deref().map(file_name) {
            Some(exposed) if exposed != program => format!("{} -> {}", program, exposed),
            _ => program,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
