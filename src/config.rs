//! Runtime configuration read from the environment
//!
//! `main` loads a `.env` file first (if present), so every variable below can
//! also be set there.
//!
//! - `PORT` - Server port number (default: 8080)
//! - `DATABASE_URL` - Path to database file (default: "data.db")
//! - `URL` - Base URL used to build short links (default: "http://localhost")
//! - `BCRYPT_COST` - Work factor for password hashes (default: bcrypt's default)
//! - `IMPORT_DOCUMENT` - Optional JSON document to import at startup

use std::env;
use std::ops::RangeInclusive;

use tracing::warn;

/// Work factors bcrypt accepts
pub const BCRYPT_COST_RANGE: RangeInclusive<u32> = 4..=31;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub base_url: String,
    pub bcrypt_cost: u32,
    pub import_document: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            base_url: "http://localhost".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            import_document: None,
        }
    }
}

impl Config {
    /// Reads the configuration, falling back to defaults for missing or
    /// unparsable values
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            base_url: env::var("URL").unwrap_or(defaults.base_url),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|cost| cost.parse::<u32>().ok())
                .map(|cost| {
                    if BCRYPT_COST_RANGE.contains(&cost) {
                        cost
                    } else {
                        warn!(
                            "BCRYPT_COST {} outside {:?}, using {}",
                            cost, BCRYPT_COST_RANGE, defaults.bcrypt_cost
                        );
                        defaults.bcrypt_cost
                    }
                })
                .unwrap_or(defaults.bcrypt_cost),
            import_document: env::var("IMPORT_DOCUMENT")
                .ok()
                .filter(|path| !path.is_empty()),
        }
    }

    /// Domain prefixed to short codes, e.g. "http://localhost:8080"
    pub fn short_domain(&self) -> String {
        format!("{}:{}", self.base_url, self.port)
    }
}
