//! Kindred CLI library.
//!
//! Argument parsing, configuration, command execution and output formatting
//! for the `kindred` binary, which drives the kinship engine against a SQLite
//! database.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;

use kindred_engine::KinshipEngine;
use kindred_store::SqliteStore;
use std::fs;
use std::path::PathBuf;

/// Open the engine over the configured database.
///
/// `database` overrides the path from the configuration. Missing parent
/// directories are created.
pub fn open_engine(config: &Config, database: Option<&str>) -> Result<KinshipEngine<SqliteStore>> {
    let path = match database {
        Some(path) => PathBuf::from(path),
        None => config.database_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    tracing::debug!(database = %path.display(), "Opening database");
    let store = SqliteStore::new(&path)?;
    Ok(KinshipEngine::new(store, config.engine.clone())?)
}
