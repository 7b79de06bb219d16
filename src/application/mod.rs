//! Application layer - use cases that coordinate manifests and links.
//!
//! Actions never print; the `commands` layer turns their results into
//! terminal output.

mod expose;
mod init;
mod list;
mod remove;

pub use expose::{ExposeAction, ExposeOutcome};
pub use init::InitAction;
pub use list::{EnvironmentView, LinkStatus, ListAction};
pub use remove::RemoveAction;
