//! Store configuration from environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KEY_PREFIX_VAR: &str = "INSTI_KEY_PREFIX";
pub const DATA_DIR_VAR: &str = "INSTI_DATA_DIR";
pub const SEED_VAR: &str = "INSTI_SEED_SAMPLE_DATA";

pub const DEFAULT_KEY_PREFIX: &str = "instichain_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Prepended to every storage key.
    pub key_prefix: String,
    /// Directory for the file-backed store; in-memory when unset.
    pub data_dir: Option<PathBuf>,
    /// Write the demo accounts and events into an empty store.
    pub seed_sample_data: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            data_dir: None,
            seed_sample_data: true,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Empty values are
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(prefix) = get(KEY_PREFIX_VAR) {
            config.key_prefix = prefix;
        }
        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = get(SEED_VAR) {
            config.seed_sample_data = parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: SEED_VAR,
                value: raw,
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.key_prefix, "instichain_");
        assert!(config.seed_sample_data);
    }

    #[test]
    fn env_overrides_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (KEY_PREFIX_VAR, "test_"),
            (DATA_DIR_VAR, "/var/lib/insti"),
            (SEED_VAR, "off"),
        ]))
        .unwrap();
        assert_eq!(config.key_prefix, "test_");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/insti")));
        assert!(!config.seed_sample_data);
    }

    #[test]
    fn bad_bool_is_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[(SEED_VAR, "maybe")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: SEED_VAR,
                value: "maybe".into()
            }
        );
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: LedgerConfig = serde_json::from_str(r#"{"data_dir": "/tmp/x"}"#).unwrap();
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/x")));
    }
}
