//! CLI-facing commands. Each one resolves its action, runs it and prints
//! the result.

mod expose;
mod init;
mod list;
mod migrate;
mod remove;
mod show;

pub use expose::{expose, expose_all, reexpose};
pub use init::init;
pub use list::list;
pub use migrate::migrate;
pub use remove::remove;
pub use show::show;
