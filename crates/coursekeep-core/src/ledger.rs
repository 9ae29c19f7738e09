//! Enforcement point for access extensions
//!
//! The evaluator only disables choices that would overrun the lifetime
//! budget. The ledger is where the ceiling is actually enforced: it refuses
//! any grant that would push `total_access_days` past the budget, never
//! clamps, and keeps revocation one-way.

use chrono::{DateTime, Utc};
use coursekeep_api::{
    AccessStatusReport, Enrollment, ErrorCode, ExtendAccessRequest, ExtensionOption,
    RevocationReason,
};
use coursekeep_config::AccessPolicy;
use coursekeep_store::{AuditEvent, AuditEventType, Store, StoreError};
use coursekeep_util::{EnrollmentId, RequestId, days};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{AccessEvaluator, ExtensionClient, ExtensionError};

/// Ledger errors
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Enrollment not found: {0}")]
    EnrollmentNotFound(EnrollmentId),

    #[error("Extension length must be at least one day")]
    InvalidLength,

    #[error("Access to enrollment {0} has been revoked")]
    AccessRevoked(EnrollmentId),

    #[error("Requested {requested} days but only {remaining} remain in the lifetime budget")]
    LimitExceeded { requested: u32, remaining: u32 },

    #[error("Enrollment {0} has no expiry to extend")]
    NoExpiryConfigured(EnrollmentId),

    #[error("Request {request_id} was already applied to enrollment {applied_to}")]
    RequestConflict {
        request_id: RequestId,
        applied_to: EnrollmentId,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AccessError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AccessError::EnrollmentNotFound(_) => ErrorCode::EnrollmentNotFound,
            AccessError::InvalidLength => ErrorCode::InvalidRequest,
            AccessError::AccessRevoked(_) => ErrorCode::AccessRevoked,
            AccessError::LimitExceeded { .. } => ErrorCode::LimitExceeded,
            AccessError::NoExpiryConfigured(_) => ErrorCode::NoExpiryConfigured,
            AccessError::RequestConflict { .. } => ErrorCode::InvalidRequest,
            AccessError::Store(_) => ErrorCode::InternalError,
        }
    }
}

pub type AccessResult<T> = Result<T, AccessError>;

/// What `reconcile` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Unchanged,
    Revoked,
}

/// Grants, revokes and reconciles enrollment access over a store
pub struct AccessLedger {
    evaluator: AccessEvaluator,
    store: Arc<dyn Store>,
    /// Serializes read-modify-write cycles on enrollments
    write_lock: Mutex<()>,
}

impl AccessLedger {
    pub fn new(policy: AccessPolicy, store: Arc<dyn Store>) -> Self {
        info!(
            lifetime_budget_days = policy.lifetime_budget_days,
            expiring_soon_days = policy.expiring_soon_days,
            "Access ledger initialized"
        );

        Self {
            evaluator: AccessEvaluator::new(policy),
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn evaluator(&self) -> &AccessEvaluator {
        &self.evaluator
    }

    fn lock(&self) -> AccessResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AccessError::Store(StoreError::LockPoisoned))
    }

    /// Fetch an enrollment
    pub fn get(&self, id: &EnrollmentId) -> AccessResult<Enrollment> {
        self.store
            .get_enrollment(id)?
            .ok_or_else(|| AccessError::EnrollmentNotFound(id.clone()))
    }

    /// All known enrollments
    pub fn list(&self) -> AccessResult<Vec<Enrollment>> {
        Ok(self.store.list_enrollments()?)
    }

    /// Most recent audit events, newest first
    pub fn recent_audits(&self, limit: usize) -> AccessResult<Vec<AuditEvent>> {
        Ok(self.store.get_recent_audits(limit)?)
    }

    /// Take in a snapshot from the course backend.
    ///
    /// An existing record is merged so that the lifetime invariants hold:
    /// consumed days never drop, revocation is never undone and a set
    /// expiry never moves earlier.
    pub fn import(&self, snapshot: Enrollment, now: DateTime<Utc>) -> AccessResult<Enrollment> {
        let _guard = self.lock()?;

        let merged = match self.store.get_enrollment(&snapshot.id)? {
            Some(existing) => merge_snapshot(existing, snapshot),
            None => snapshot,
        };

        self.store.put_enrollment(&merged)?;
        self.store.append_audit(AuditEvent::at(
            AuditEventType::EnrollmentImported {
                enrollment_id: merged.id.clone(),
            },
            now,
        ))?;

        debug!(enrollment_id = %merged.id, "Enrollment imported");
        Ok(merged)
    }

    /// Classify a stored enrollment
    pub fn status(&self, id: &EnrollmentId, now: DateTime<Utc>) -> AccessResult<AccessStatusReport> {
        let enrollment = self.get(id)?;
        Ok(self.evaluator.access_status(&enrollment, now))
    }

    /// Extension choices for a stored enrollment
    pub fn options(&self, id: &EnrollmentId) -> AccessResult<Vec<ExtensionOption>> {
        let enrollment = self.get(id)?;
        Ok(self.evaluator.extension_options(&enrollment))
    }

    /// Grant an extension.
    ///
    /// The new expiry is `days` after the later of the current expiry and
    /// `now`, so an expired enrollment gets the full length. A request id
    /// already applied to this enrollment returns the current record
    /// untouched; one applied to a different enrollment is refused.
    pub fn grant_extension(
        &self,
        request: &ExtendAccessRequest,
        now: DateTime<Utc>,
    ) -> AccessResult<Enrollment> {
        let _guard = self.lock()?;

        if let Some(applied_to) = self.store.applied_request_enrollment(&request.request_id)? {
            return self.replayed(request, applied_to);
        }

        let mut enrollment = self.get(&request.enrollment_id)?;

        if let Err(e) = self.check_grant(&enrollment, request.days) {
            warn!(
                enrollment_id = %enrollment.id,
                request_id = %request.request_id,
                days = request.days,
                error = %e,
                "Extension rejected"
            );
            self.store.append_audit(AuditEvent::at(
                AuditEventType::ExtensionRejected {
                    enrollment_id: enrollment.id.clone(),
                    request_id: request.request_id,
                    days: request.days,
                    code: e.code(),
                },
                now,
            ))?;
            return Err(e);
        }

        let current_expiry = enrollment
            .access_expires_at
            .ok_or_else(|| AccessError::NoExpiryConfigured(enrollment.id.clone()))?;
        let new_expiry = current_expiry.max(now) + days(request.days);

        enrollment.access_expires_at = Some(new_expiry);
        enrollment.total_access_days += request.days;

        let applied = self.store.apply_extension(
            &enrollment,
            &request.request_id,
            AuditEvent::at(
                AuditEventType::AccessExtended {
                    enrollment_id: enrollment.id.clone(),
                    request_id: request.request_id,
                    days: request.days,
                    total_access_days: enrollment.total_access_days,
                    new_expires_at: new_expiry,
                },
                now,
            ),
        )?;
        if !applied {
            let applied_to = self
                .store
                .applied_request_enrollment(&request.request_id)?
                .unwrap_or_else(|| request.enrollment_id.clone());
            return self.replayed(request, applied_to);
        }

        info!(
            enrollment_id = %enrollment.id,
            days = request.days,
            total_access_days = enrollment.total_access_days,
            new_expires_at = %new_expiry,
            "Access extended"
        );

        Ok(enrollment)
    }

    /// Answer for a request id that is already on record
    fn replayed(
        &self,
        request: &ExtendAccessRequest,
        applied_to: EnrollmentId,
    ) -> AccessResult<Enrollment> {
        if applied_to != request.enrollment_id {
            warn!(
                request_id = %request.request_id,
                enrollment_id = %request.enrollment_id,
                applied_to = %applied_to,
                "Request id reused for another enrollment"
            );
            return Err(AccessError::RequestConflict {
                request_id: request.request_id,
                applied_to,
            });
        }

        debug!(
            request_id = %request.request_id,
            enrollment_id = %request.enrollment_id,
            "Extension request already applied"
        );
        self.get(&request.enrollment_id)
    }

    fn check_grant(&self, enrollment: &Enrollment, requested: u32) -> AccessResult<()> {
        if requested == 0 {
            return Err(AccessError::InvalidLength);
        }
        if enrollment.is_access_revoked {
            return Err(AccessError::AccessRevoked(enrollment.id.clone()));
        }
        let remaining = self.evaluator.remaining_access_days(enrollment);
        if requested > remaining {
            return Err(AccessError::LimitExceeded {
                requested,
                remaining,
            });
        }
        if enrollment.access_expires_at.is_none() {
            return Err(AccessError::NoExpiryConfigured(enrollment.id.clone()));
        }
        Ok(())
    }

    /// Revoke access for good. Revoking twice is a no-op.
    pub fn revoke(
        &self,
        id: &EnrollmentId,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AccessResult<Enrollment> {
        let _guard = self.lock()?;
        let enrollment = self.get(id)?;
        self.revoke_locked(enrollment, reason, now)
    }

    fn revoke_locked(
        &self,
        mut enrollment: Enrollment,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AccessResult<Enrollment> {
        if enrollment.is_access_revoked {
            debug!(enrollment_id = %enrollment.id, "Already revoked");
            return Ok(enrollment);
        }

        enrollment.is_access_revoked = true;
        self.store.put_enrollment(&enrollment)?;
        self.store.append_audit(AuditEvent::at(
            AuditEventType::AccessRevoked {
                enrollment_id: enrollment.id.clone(),
                reason: reason.clone(),
            },
            now,
        ))?;

        info!(enrollment_id = %enrollment.id, reason = ?reason, "Access revoked");
        Ok(enrollment)
    }

    /// Revoke an enrollment whose budget is spent and whose last granted
    /// window has run out.
    pub fn reconcile(&self, id: &EnrollmentId, now: DateTime<Utc>) -> AccessResult<ReconcileOutcome> {
        let _guard = self.lock()?;
        let enrollment = self.get(id)?;

        if enrollment.is_access_revoked {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let budget_spent = self.evaluator.remaining_access_days(&enrollment) == 0;
        let window_over = enrollment
            .access_expires_at
            .is_some_and(|expires_at| expires_at < now);

        if budget_spent && window_over {
            self.revoke_locked(enrollment, RevocationReason::BudgetExhausted, now)?;
            Ok(ReconcileOutcome::Revoked)
        } else {
            Ok(ReconcileOutcome::Unchanged)
        }
    }
}

impl ExtensionClient for AccessLedger {
    fn extend_access(
        &self,
        request: ExtendAccessRequest,
    ) -> impl Future<Output = Result<Enrollment, ExtensionError>> + Send {
        let result = self
            .grant_extension(&request, coursekeep_util::now())
            .map_err(ExtensionError::from);
        std::future::ready(result)
    }
}

fn merge_snapshot(existing: Enrollment, incoming: Enrollment) -> Enrollment {
    let access_expires_at = match (existing.access_expires_at, incoming.access_expires_at) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    };

    Enrollment {
        id: incoming.id,
        course_id: incoming.course_id.or(existing.course_id),
        access_expires_at,
        total_access_days: existing.total_access_days.max(incoming.total_access_days),
        is_access_revoked: existing.is_access_revoked || incoming.is_access_revoked,
    }
}
