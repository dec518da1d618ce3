//! Runtime configuration: where the database lives and how chatty logging is

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "SCAN_HISTORY_DB";

/// Default `env_logger` filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

const APP_DIR: &str = "scan-history";
const DB_FILE: &str = "scan_history.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self { db_path: db_path.into() }
    }

    /// Resolve the database path: explicit path, then `SCAN_HISTORY_DB`,
    /// then the per-user data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let from_env = std::env::var_os(DB_PATH_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::resolve_with(explicit, from_env, dirs::data_dir())
    }

    fn resolve_with(
        explicit: Option<PathBuf>,
        from_env: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if let Some(path) = explicit.or(from_env) {
            return Ok(Self::new(path));
        }

        let data_dir = data_dir
            .or_else(dirs::home_dir)
            .context("Could not determine user data directory")?;

        Ok(Self::new(data_dir.join(APP_DIR).join(DB_FILE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let config = Config::resolve_with(
            Some(PathBuf::from("/tmp/explicit.db")),
            Some(PathBuf::from("/tmp/env.db")),
            Some(PathBuf::from("/data")),
        ).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/explicit.db"));
    }

    #[test]
    fn test_env_path_before_data_dir() {
        let config = Config::resolve_with(
            None,
            Some(PathBuf::from("/tmp/env.db")),
            Some(PathBuf::from("/data")),
        ).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/env.db"));
    }

    #[test]
    fn test_data_dir_default() {
        let config = Config::resolve_with(None, None, Some(PathBuf::from("/data"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/scan-history/scan_history.db"));
    }
}
