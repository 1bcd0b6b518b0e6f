//! Configuration loaded from `config.toml`.
//!
//! ```toml
//! [store]
//! log_path = "data/events.log"
//! minimum_offer = 4000
//!
//! [ids]
//! digits = 5
//! max_attempts = 64
//!
//! [admin]
//! password = "secret"
//! ```

use std::path::{Path, PathBuf};

use bieter_engine::domain::{Rules, DEFAULT_MINIMUM_OFFER};
use bieter_engine::ids::MAX_ID_DIGITS;
use serde::Deserialize;
use thiserror::Error;

use crate::id_gen::IdGenerator;

/// Default configuration embedded in the binary.
pub const DEFAULT_CONFIG: &str = r#"
[store]
log_path = "data/events.log"
minimum_offer = 4000

[ids]
digits = 5
max_attempts = 64

[admin]
password = ""
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("ids.digits must be between 1 and {max}, got {got}")]
    Digits { got: u32, max: u32 },

    #[error("ids.max_attempts must be at least 1")]
    Attempts,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub log_path: PathBuf,
    #[serde(default = "default_minimum_offer")]
    pub minimum_offer: i64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct IdConfig {
    pub digits: u32,
    pub max_attempts: u32,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            digits: IdGenerator::DEFAULT_DIGITS,
            max_attempts: IdGenerator::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AdminConfig {
    /// Empty disables every admin privilege.
    #[serde(default)]
    pub password: String,
}

fn default_minimum_offer() -> i64 {
    DEFAULT_MINIMUM_OFFER
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ID_DIGITS).contains(&self.ids.digits) {
            return Err(ConfigError::Digits {
                got: self.ids.digits,
                max: MAX_ID_DIGITS,
            });
        }
        if self.ids.max_attempts == 0 {
            return Err(ConfigError::Attempts);
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            minimum_offer: self.store.minimum_offer,
        }
    }

    pub fn id_generator(&self) -> IdGenerator {
        IdGenerator::new(self.ids.digits, self.ids.max_attempts)
    }

    /// Whether a request credential grants admin rights. Always false while
    /// no admin password is configured.
    pub fn is_admin(&self, credential: Option<&str>) -> bool {
        if self.admin.password.is_empty() {
            return false;
        }
        credential == Some(self.admin.password.as_str())
    }
}

/// Load configuration from `path`, or the embedded default when `path` is
/// `None` or the file does not exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        if path.exists() {
            tracing::info!("Loading config from: {}", path.display());
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            return Config::from_toml(&contents);
        }
        tracing::warn!("config not found at: {}", path.display());
    }

    tracing::info!("Using default embedded configuration");
    Config::from_toml(DEFAULT_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = Config::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.store.log_path, PathBuf::from("data/events.log"));
        assert_eq!(config.rules().minimum_offer, 4000);
        assert_eq!(config.id_generator().digits(), 5);
        assert!(config.admin.password.is_empty());
    }

    #[test]
    fn test_optional_sections_default() {
        let config = Config::from_toml("[store]\nlog_path = \"x.log\"\n").unwrap();
        assert_eq!(config.ids, IdConfig::default());
        assert_eq!(config.store.minimum_offer, DEFAULT_MINIMUM_OFFER);
    }

    #[test]
    fn test_digits_are_validated() {
        let err = Config::from_toml("[store]\nlog_path = \"x\"\n[ids]\ndigits = 12\nmax_attempts = 3\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Digits { got: 12, .. }));

        let err = Config::from_toml("[store]\nlog_path = \"x\"\n[ids]\ndigits = 3\nmax_attempts = 0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Attempts));
    }

    #[test]
    fn test_is_admin() {
        let mut config = Config::from_toml(DEFAULT_CONFIG).unwrap();
        assert!(!config.is_admin(Some("")));
        assert!(!config.is_admin(None));

        config.admin.password = "hunter2".into();
        assert!(config.is_admin(Some("hunter2")));
        assert!(!config.is_admin(Some("hunter")));
        assert!(!config.is_admin(None));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let path = std::env::temp_dir().join("bieter_runtime_unit").join("no_such_config.toml");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, Config::from_toml(DEFAULT_CONFIG).unwrap());
    }
}
