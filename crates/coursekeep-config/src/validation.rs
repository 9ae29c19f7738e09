//! Configuration validation

use crate::policy::{
    DEFAULT_EXPIRING_SOON_DAYS, DEFAULT_EXTENSION_OPTIONS, DEFAULT_LIFETIME_BUDGET_DAYS,
};
use crate::schema::{RawAccessConfig, RawConfig};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("lifetime_budget_days must be greater than zero")]
    ZeroBudget,

    #[error("expiring_soon_days ({window}) must be less than lifetime_budget_days ({budget})")]
    WarningWindowTooLarge { window: u32, budget: u32 },

    #[error("extension_options cannot be empty")]
    NoExtensionOptions,

    #[error("Extension option must be at least one day")]
    ZeroLengthOption,

    #[error("Duplicate extension option: {0} days")]
    DuplicateOption(u32),

    #[error("Extension option {days} days exceeds lifetime budget of {budget} days")]
    OptionExceedsBudget { days: u32, budget: u32 },
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    validate_access(&config.access)
}

fn validate_access(access: &RawAccessConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let budget = access
        .lifetime_budget_days
        .unwrap_or(DEFAULT_LIFETIME_BUDGET_DAYS);
    if budget == 0 {
        errors.push(ValidationError::ZeroBudget);
    }

    let window = access
        .expiring_soon_days
        .unwrap_or(DEFAULT_EXPIRING_SOON_DAYS);
    if budget > 0 && window >= budget {
        errors.push(ValidationError::WarningWindowTooLarge { window, budget });
    }

    let options = access
        .extension_options
        .as_deref()
        .unwrap_or(&DEFAULT_EXTENSION_OPTIONS);
    if options.is_empty() {
        errors.push(ValidationError::NoExtensionOptions);
    }

    let mut seen = HashSet::new();
    for &days in options {
        if days == 0 {
            errors.push(ValidationError::ZeroLengthOption);
            continue;
        }
        if !seen.insert(days) {
            errors.push(ValidationError::DuplicateOption(days));
        }
        if budget > 0 && days > budget {
            errors.push(ValidationError::OptionExceedsBudget { days, budget });
        }
    }

    errors
}
