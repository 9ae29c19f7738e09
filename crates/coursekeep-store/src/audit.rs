//! Audit event types

use chrono::{DateTime, Utc};
use coursekeep_api::{ErrorCode, RevocationReason};
use coursekeep_util::{EnrollmentId, RequestId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Enrollment record created or replaced from a backend snapshot
    EnrollmentImported { enrollment_id: EnrollmentId },

    /// Extension granted
    AccessExtended {
        enrollment_id: EnrollmentId,
        request_id: RequestId,
        days: u32,
        total_access_days: u32,
        new_expires_at: DateTime<Utc>,
    },

    /// Extension refused
    ExtensionRejected {
        enrollment_id: EnrollmentId,
        request_id: RequestId,
        days: u32,
        code: ErrorCode,
    },

    /// Access revoked for good
    AccessRevoked {
        enrollment_id: EnrollmentId,
        reason: RevocationReason,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: coursekeep_util::now(),
            event,
        }
    }

    pub fn at(event: AuditEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            timestamp,
            event,
        }
    }
}
