//! Validated configuration structures

use crate::schema::{RawAccessConfig, RawConfig, RawStoreConfig};
use coursekeep_util::default_data_dir;
use std::path::PathBuf;

/// Lifetime access-day budget when none is configured
pub const DEFAULT_LIFETIME_BUDGET_DAYS: u32 = 365;

/// Days before expiry at which learners are warned
pub const DEFAULT_EXPIRING_SOON_DAYS: u32 = 7;

/// Extension lengths offered when none are configured
pub const DEFAULT_EXTENSION_OPTIONS: [u32; 4] = [7, 14, 30, 60];

/// Validated configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub access: AccessPolicy,
    pub store: StoreConfig,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            access: AccessPolicy::from_raw(raw.access),
            store: StoreConfig::from_raw(raw.store),
        }
    }
}

/// Rules applied to every enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Lifetime access-day budget
    pub lifetime_budget_days: u32,
    /// Expiry within this many days counts as "expiring soon"
    pub expiring_soon_days: u32,
    /// Offered extension lengths, ascending
    pub extension_options: Vec<u32>,
}

impl AccessPolicy {
    fn from_raw(raw: RawAccessConfig) -> Self {
        let mut extension_options = raw
            .extension_options
            .unwrap_or_else(|| DEFAULT_EXTENSION_OPTIONS.to_vec());
        extension_options.sort_unstable();
        extension_options.dedup();

        Self {
            lifetime_budget_days: raw
                .lifetime_budget_days
                .unwrap_or(DEFAULT_LIFETIME_BUDGET_DAYS),
            expiring_soon_days: raw
                .expiring_soon_days
                .unwrap_or(DEFAULT_EXPIRING_SOON_DAYS),
            extension_options,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            lifetime_budget_days: DEFAULT_LIFETIME_BUDGET_DAYS,
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
            extension_options: DEFAULT_EXTENSION_OPTIONS.to_vec(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl StoreConfig {
    fn from_raw(raw: RawStoreConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }

    /// Path of the SQLite database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("coursekeep.db")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}
