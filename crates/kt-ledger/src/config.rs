//! # Ledger Configuration
//!
//! Where the database lives and how to reach the exchange-rate source.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KT_DATABASE_PATH=/srv/kt/kt.db                                     │
//! │     KT_RATES_API_KEY=...                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kt-backoffice/kt.toml (Linux)                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fee percentage and shuttle pricing are NOT here. Operators edit them at
//! runtime, so they live in the settings table and are read on every save.
//!
//! ## Configuration File Format
//! ```toml
//! # kt.toml
//! [database]
//! path = "/srv/kt/kt.db"
//! max_connections = 5
//!
//! [rates]
//! api_base_url = "https://v6.exchangerate-api.com/v6"
//! api_key = "your-key"
//! timeout_secs = 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use kt_db::DbConfig;

use crate::error::{LedgerError, LedgerResult};

// =============================================================================
// Database Section
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first start.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("kt.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Rates Section
// =============================================================================

/// Exchange-rate API settings. The base currency is always EUR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSettings {
    /// API root; the key and `latest/EUR` are appended.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Whole-request timeout. A slow source fails the save instead of
    /// hanging it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://v6.exchangerate-api.com/v6".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RateSettings {
    fn default() -> Self {
        RateSettings {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RateSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub rates: RateSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kt.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.rates.api_key.trim().is_empty() {
            return Err(LedgerError::Config(
                "rates.api_key is required (or set KT_RATES_API_KEY)".into(),
            ));
        }

        let url = &self.rates.api_base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(LedgerError::Config(format!(
                "rates.api_base_url must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.rates.timeout_secs == 0 {
            return Err(LedgerError::Config(
                "rates.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(LedgerError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `KT_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("KT_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("KT_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric KT_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(url) = lookup("KT_RATES_API_URL") {
            debug!(url = %url, "Overriding rate API URL from environment");
            self.rates.api_base_url = url;
        }

        if let Some(key) = lookup("KT_RATES_API_KEY") {
            self.rates.api_key = key;
        }

        if let Some(secs) = lookup("KT_RATES_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(n) => self.rates.timeout_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric KT_RATES_TIMEOUT_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "kt", "backoffice")
            .map(|dirs| dirs.config_dir().join("kt.toml"))
    }

    /// Pool settings for [`kt_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> LedgerConfig {
        let mut config = LedgerConfig::default();
        config.rates.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.rates.api_base_url, "https://v6.exchangerate-api.com/v6");
        assert_eq!(config.rates.timeout(), Duration::from_secs(10));
        // No key by default
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [rates]
            api_key = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.rates.api_key, "abc");
        assert_eq!(config.rates.timeout_secs, 10);
        assert_eq!(config.database.path, PathBuf::from("kt.db"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("KT_DATABASE_PATH", "/tmp/other.db"),
            ("KT_DB_MAX_CONNECTIONS", "not-a-number"),
            ("KT_RATES_API_KEY", "from-env"),
            ("KT_RATES_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.rates.api_key, "from-env");
        assert_eq!(config.rates.timeout_secs, 3);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = valid();
        config.rates.api_base_url = "ftp://rates.example".to_string();
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));

        let mut config = valid();
        config.rates.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
