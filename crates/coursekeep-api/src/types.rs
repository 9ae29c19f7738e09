//! Access status and presentation types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an enrollment's current access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Active,
    ExpiringSoon,
    Expired,
    Revoked,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Active => "active",
            AccessStatus::ExpiringSoon => "expiring_soon",
            AccessStatus::Expired => "expired",
            AccessStatus::Revoked => "revoked",
        }
    }

    /// Whether course materials may be opened in this state
    pub fn allows_access(&self) -> bool {
        matches!(self, AccessStatus::Active | AccessStatus::ExpiringSoon)
    }

    /// Revocation can never be undone
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccessStatus::Revoked)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStatusReport {
    pub status: AccessStatus,
    pub message: String,
    /// Whole days left before expiry. None when the enrollment has no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<u32>,
}

impl AccessStatusReport {
    /// Days remaining with an unset expiry reported as zero
    pub fn days_remaining_or_zero(&self) -> u32 {
        self.days_remaining.unwrap_or(0)
    }

    pub fn has_expiry(&self) -> bool {
        self.days_remaining.is_some()
    }
}

/// One selectable extension length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionOption {
    pub days: u32,
    /// False when the length exceeds the remaining lifetime budget
    pub enabled: bool,
}

/// Why an enrollment lost access for good
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RevocationReason {
    /// Lifetime budget spent and the last granted window has run out
    BudgetExhausted,
    /// Revoked by an administrator
    Administrative { note: Option<String> },
}

/// Visual weight of the access banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerTone {
    Info,
    Warning,
    Critical,
}

/// What the access banner should show for an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerView {
    pub status: AccessStatus,
    pub tone: BannerTone,
    pub title: String,
    pub message: String,
    pub show_extend_action: bool,
}
