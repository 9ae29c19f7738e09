//! Configuration parsing and validation for coursekeep
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Access policy knobs (lifetime budget, warning window, extension lengths)
//! - Store location
//! - Validation with clear error messages
//!
//! A missing config file is not an error for callers that use
//! [`load_config_or_default`]; every setting has a built-in default.

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("config_version = 1").unwrap();
        assert_eq!(config.access, AccessPolicy::default());
    }

    #[test]
    fn parse_custom_policy() {
        let config = parse_config(
            r#"
            config_version = 1

            [access]
            lifetime_budget_days = 120
            extension_options = [60, 15]
            "#,
        )
        .unwrap();

        assert_eq!(config.access.lifetime_budget_days, 120);
        assert_eq!(config.access.expiring_soon_days, DEFAULT_EXPIRING_SOON_DAYS);
        assert_eq!(config.access.extension_options, vec![15, 60]);
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_policy() {
        let result = parse_config(
            r#"
            config_version = 1
            [access]
            lifetime_budget_days = 0
            "#,
        );
        match result {
            Err(ConfigError::ValidationFailed { errors }) => {
                assert_eq!(errors, vec![ValidationError::ZeroBudget]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "config_version = 1\n[access]\nexpiring_soon_days = 3").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.access.expiring_soon_days, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.access, AccessPolicy::default());

        assert!(matches!(
            load_config(dir.path().join("absent.toml")),
            Err(ConfigError::ReadError(_))
        ));
    }
}
