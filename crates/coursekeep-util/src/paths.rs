//! Default paths for coursekeep components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/coursekeep/config.toml` or `~/.config/coursekeep/config.toml`
//! - Data: `$XDG_DATA_HOME/coursekeep` or `~/.local/share/coursekeep`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const COURSEKEEP_CONFIG_ENV: &str = "COURSEKEEP_CONFIG";

/// Environment variable for overriding the data directory
pub const COURSEKEEP_DATA_DIR_ENV: &str = "COURSEKEEP_DATA_DIR";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "coursekeep";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$COURSEKEEP_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/coursekeep/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/coursekeep/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(COURSEKEEP_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$COURSEKEEP_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/coursekeep` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/coursekeep` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(COURSEKEEP_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
