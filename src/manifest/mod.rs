mod legacy;
mod migrate;
mod model;
mod store;

pub use legacy::LegacyDocument;
pub use migrate::{
    ManifestDocument, ManifestError, Migration, MigrationContext, migrate, migrate_str,
};
pub use model::{
    CONFIG_VERSION, ExposedApp, ExposedModel, InstallSet, Manifest, PackageModel, VenvModel,
};
pub use store::{MANIFEST_FILE, ManifestStore};
