//! Store trait definitions

use coursekeep_api::Enrollment;
use coursekeep_util::{EnrollmentId, RequestId};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Enrollments

    /// Fetch one enrollment
    fn get_enrollment(&self, id: &EnrollmentId) -> StoreResult<Option<Enrollment>>;

    /// Insert or replace an enrollment
    fn put_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()>;

    /// All enrollments, ordered by id
    fn list_enrollments(&self) -> StoreResult<Vec<Enrollment>>;

    // Extension requests

    /// Apply a granted extension as one unit: store the updated enrollment,
    /// record the request id against it and append the audit event.
    ///
    /// Either all three land or none do. Returns false, changing nothing,
    /// if the request id was already recorded.
    fn apply_extension(
        &self,
        enrollment: &Enrollment,
        request_id: &RequestId,
        event: AuditEvent,
    ) -> StoreResult<bool>;

    /// Enrollment a request id was applied to, if it was applied at all
    fn applied_request_enrollment(
        &self,
        request_id: &RequestId,
    ) -> StoreResult<Option<EnrollmentId>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
