use std::path::PathBuf;
use thiserror::Error;

/// Non-fatal findings collected while resolving and applying expose rules.
/// Processing always continues for the remaining programs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionWarning {
    #[error("no program named {package} in the environment, trying console scripts")]
    EponymMissing { package: String },

    #[error("{package} declares no console scripts, falling back")]
    NoConsoleScripts { package: String },

    #[error("{name} not exist in the environment, cannot expose")]
    MissingExecutable { name: String },

    #[error("{name:?} is not a plain program name, cannot expose")]
    InvalidName { name: String },

    #[error("{name} is replaced by {winner} for exposed name {exposed}")]
    Shadowed {
        name: String,
        winner: String,
        exposed: String,
    },

    #[error("{dest:?} is not directly inside the shared bin directory, cannot expose {bin_name}")]
    OutsideBinDir { bin_name: String, dest: PathBuf },

    #[error("{dest:?} already exists and is not a link to {bin_name}, skipping")]
    Conflict { bin_name: String, dest: PathBuf },
}
