//! CLI commands module.

mod config;
mod ingest;
mod persons;
mod reset;
mod util;

pub use config::ConfigCommand;
pub use ingest::IngestCommand;
pub use persons::PersonsCommand;
pub use reset::ResetCommand;

pub(crate) use util::*;
