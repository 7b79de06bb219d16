//! Schema detection and upgrade of raw manifest documents.

use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::legacy::LegacyDocument;
use super::{CONFIG_VERSION, Manifest};

#[derive(Debug, Error)]
pub enum ManifestError {
    /// Written by a newer or unknown release; reinstall the environment.
    #[error("unsupported manifest version {version}, reinstall the environment")]
    Unsupported { version: String },

    #[error("malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A parsed document, tagged by its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestDocument {
    Legacy(LegacyDocument),
    Current(Manifest),
}

impl ManifestDocument {
    /// Classify by `config_version`: absent (or null) is legacy, the
    /// supported version is current, anything else is unsupported.
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        match value.get("config_version") {
            None | Some(Value::Null) => Ok(Self::Legacy(serde_json::from_value(value)?)),
            Some(Value::String(version)) if version == CONFIG_VERSION => {
                Ok(Self::Current(serde_json::from_value(value)?))
            }
            Some(Value::String(version)) => Err(ManifestError::Unsupported {
                version: version.clone(),
            }),
            Some(other) => Err(ManifestError::Unsupported {
                version: other.to_string(),
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Self::from_value(serde_json::from_str(content)?)
    }
}

/// Facts a legacy document may not record about itself.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    pub venvs_root: PathBuf,
}

impl MigrationContext {
    pub fn new(venvs_root: impl Into<PathBuf>) -> Self {
        Self {
            venvs_root: venvs_root.into(),
        }
    }

    pub fn venvs_root(&self) -> &Path {
        &self.venvs_root
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub manifest: Manifest,
    /// True when the document was rewritten and should be persisted.
    pub upgraded: bool,
}

/// Bring a document to the current schema. Current documents pass through
/// unchanged.
pub fn migrate(document: ManifestDocument, context: &MigrationContext) -> Migration {
    match document {
        ManifestDocument::Current(manifest) => {
            debug!("Manifest for {} is current", manifest.name());
            Migration {
                manifest,
                upgraded: false,
            }
        }
        ManifestDocument::Legacy(legacy) => {
            info!(
                "Upgrading legacy manifest for {} to {}",
                legacy.package_name, CONFIG_VERSION
            );
            Migration {
                manifest: legacy.into_manifest(context.venvs_root()),
                upgraded: true,
            }
        }
    }
}

/// Parse and migrate in one step.
pub fn migrate_str(content: &str, context: &MigrationContext) -> Result<Migration, ManifestError> {
    Ok(migrate(ManifestDocument::parse(content)?, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> MigrationContext {
        MigrationContext::new("/venvs")
    }

    fn legacy_value() -> Value {
        json!({
            "package_name_ref": "jc",
            "package_name": "jc",
            "venv_name": null,
            "bin_names": ["jc:myjc"],
            "exposed_bins": [["/venvs/jc/.venv/bin/jc", "/home/user/.local/bin/myjc"]],
            "injected_package": {}
        })
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            ManifestDocument::from_value(legacy_value()),
            Ok(ManifestDocument::Legacy(_))
        ));

        let mut explicit_null = legacy_value();
        explicit_null["config_version"] = Value::Null;
        assert!(matches!(
            ManifestDocument::from_value(explicit_null),
            Ok(ManifestDocument::Legacy(_))
        ));
    }

    #[test]
    fn test_unsupported_version_is_an_error() {
        let err = ManifestDocument::from_value(json!({"config_version": "9.0.0"})).unwrap_err();
        assert!(matches!(err, ManifestError::Unsupported { ref version } if version == "9.0.0"));
        assert!(err.to_string().contains("reinstall"));

        let err = ManifestDocument::from_value(json!({"config_version": 2})).unwrap_err();
        assert!(matches!(err, ManifestError::Unsupported { ref version } if version == "2"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            ManifestDocument::parse("{not json"),
            Err(ManifestError::Parse(_))
        ));
        assert!(matches!(
            ManifestDocument::parse(r#"{"config_version": "0.2.0"}"#),
            Err(ManifestError::Parse(_))
        ));
        assert!(matches!(
            ManifestDocument::parse(r#"{"package_name": "jc"}"#),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_current_passes_through_unchanged() {
        let legacy = migrate(ManifestDocument::from_value(legacy_value()).unwrap(), &context());
        let current = legacy.manifest.clone();

        let migration = migrate(ManifestDocument::Current(current.clone()), &context());
        assert!(!migration.upgraded);
        assert_eq!(migration.manifest, current);
    }

    #[test]
    fn test_legacy_upgrade_is_stable() {
        let content = legacy_value().to_string();
        let first = migrate_str(&content, &context()).unwrap();
        let second = migrate_str(&content, &context()).unwrap();

        assert!(first.upgraded);
        assert_eq!(first, second);
        assert_eq!(first.manifest.config_version, CONFIG_VERSION);
        assert_eq!(
            first.manifest.exposed.apps["jc"].exposed_path,
            PathBuf::from("/home/user/.local/bin/myjc")
        );
    }

    #[test]
    fn test_upgraded_document_reloads_as_current() {
        let upgraded = migrate_str(&legacy_value().to_string(), &context()).unwrap();
        let written = serde_json::to_string_pretty(&upgraded.manifest).unwrap();

        let reloaded = migrate_str(&written, &context()).unwrap();
        assert!(!reloaded.upgraded);
        assert_eq!(reloaded.manifest, upgraded.manifest);
    }
}
