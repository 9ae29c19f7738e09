//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Access policy knobs
    #[serde(default)]
    pub access: RawAccessConfig,

    /// Where the enforcement ledger keeps its data
    #[serde(default)]
    pub store: RawStoreConfig,
}

/// Access policy settings. Every field falls back to the built-in default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAccessConfig {
    /// Lifetime access-day budget per enrollment
    pub lifetime_budget_days: Option<u32>,

    /// How many days before expiry the learner is warned
    pub expiring_soon_days: Option<u32>,

    /// Extension lengths offered to the learner, in days
    pub extension_options: Option<Vec<u32>>,
}

/// Store settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStoreConfig {
    /// Data directory for the SQLite database
    pub data_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [access]
            lifetime_budget_days = 180
            expiring_soon_days = 3
            extension_options = [7, 30]

            [store]
            data_dir = "/srv/coursekeep"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.access.lifetime_budget_days, Some(180));
        assert_eq!(config.access.expiring_soon_days, Some(3));
        assert_eq!(config.access.extension_options, Some(vec![7, 30]));
        assert_eq!(config.store.data_dir, Some(PathBuf::from("/srv/coursekeep")));
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.access.lifetime_budget_days.is_none());
        assert!(config.access.extension_options.is_none());
        assert!(config.store.data_dir.is_none());
    }
}
