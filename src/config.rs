//! Runtime configuration, read from the environment.
//!
//! | Variable                   | Default                          |
//! |----------------------------|----------------------------------|
//! | `DEALERDESK_PORT`          | `3000`                           |
//! | `DEALERDESK_DATABASE_URL`  | `sqlite:dealerdesk.db?mode=rwc`  |
//! | `DEALERDESK_DEALER_ID`     | `default`                        |
//! | `DEALERDESK_MODEL_CATALOG` | unset (built-in model table)     |

use std::env;
use std::path::PathBuf;

use crate::catalog::ModelCatalog;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:dealerdesk.db?mode=rwc";

/// Dealer id used when the site serves a single lot.
pub const DEFAULT_DEALER_ID: &str = "default";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,

    /// Every row written or read by this instance is scoped to this dealer.
    pub dealer_id: String,

    /// JSON model catalog to use instead of the built-in table.
    pub model_catalog: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DB_PATH.to_string(),
            dealer_id: DEFAULT_DEALER_ID.to_string(),
            model_catalog: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            port: lookup("DEALERDESK_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: lookup("DEALERDESK_DATABASE_URL").unwrap_or(defaults.database_url),
            dealer_id: lookup("DEALERDESK_DEALER_ID")
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(defaults.dealer_id),
            model_catalog: lookup("DEALERDESK_MODEL_CATALOG")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    /// The configured catalog file, or the built-in table when none is set.
    pub fn load_catalog(&self) -> anyhow::Result<ModelCatalog> {
        match &self.model_catalog {
            Some(path) => ModelCatalog::from_json_file(path),
            None => Ok(ModelCatalog::builtin()),
        }
    }
}
