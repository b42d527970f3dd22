//! Command-line and environment configuration.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use directories::BaseDirs;

use crate::db::DbTarget;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".library-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";

#[derive(Debug, Parser)]
#[command(name = "library-manager", about = "Track books, users, and loans", version)]
pub struct Config {
    /// SQLite database file. Defaults to ~/.library-manager/library.sqlite.
    /// Ignored when `--in-memory` is given.
    #[arg(long, env = "LIBRARY_DB")]
    pub database: Option<PathBuf>,

    /// Use a throwaway in-memory database.
    #[arg(long)]
    pub in_memory: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "LIBRARY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Directory for the log file. Defaults to the data directory.
    #[arg(long, env = "LIBRARY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn db_target(&self) -> Result<DbTarget> {
        if self.in_memory {
            return Ok(DbTarget::Memory);
        }
        match &self.database {
            Some(path) => Ok(DbTarget::File(path.clone())),
            None => Ok(DbTarget::File(data_dir()?.join(DB_FILE_NAME))),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => data_dir(),
        }
    }
}

/// Resolve the application data directory inside the user's home.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
