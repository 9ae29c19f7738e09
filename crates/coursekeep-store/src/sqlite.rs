//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use coursekeep_api::Enrollment;
use coursekeep_util::{CourseId, EnrollmentId, RequestId};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enrollment access state
            CREATE TABLE IF NOT EXISTS enrollments (
                id TEXT PRIMARY KEY,
                course_id TEXT,
                access_expires_at TEXT,
                total_access_days INTEGER NOT NULL DEFAULT 0,
                is_access_revoked INTEGER NOT NULL DEFAULT 0
            );

            -- Extension requests already applied
            CREATE TABLE IF NOT EXISTS applied_requests (
                request_id TEXT PRIMARY KEY,
                enrollment_id TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn enrollment_from_row(row: &Row<'_>) -> rusqlite::Result<(Enrollment, Option<String>)> {
    let id: String = row.get(0)?;
    let course_id: Option<String> = row.get(1)?;
    let expires_at: Option<String> = row.get(2)?;
    let total_access_days: u32 = row.get(3)?;
    let is_access_revoked: bool = row.get(4)?;

    let enrollment = Enrollment {
        id: EnrollmentId::new(id),
        course_id: course_id.map(CourseId::new),
        access_expires_at: None,
        total_access_days,
        is_access_revoked,
    };
    Ok((enrollment, expires_at))
}

/// Attach the stored expiry. A stored value that no longer parses is a
/// corrupt row, not an unset expiry.
fn finish_enrollment(
    (mut enrollment, expires_at): (Enrollment, Option<String>),
) -> StoreResult<Enrollment> {
    if let Some(text) = expires_at {
        let parsed = DateTime::parse_from_rfc3339(&text).map_err(|e| {
            StoreError::Corrupt(format!(
                "enrollment {} has invalid expiry '{}': {}",
                enrollment.id, text, e
            ))
        })?;
        enrollment.access_expires_at = Some(parsed.with_timezone(&Utc));
    }
    Ok(enrollment)
}

fn upsert_enrollment(conn: &Connection, enrollment: &Enrollment) -> StoreResult<()> {
    conn.execute(
        r#"
        INSERT INTO enrollments
            (id, course_id, access_expires_at, total_access_days, is_access_revoked)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            course_id = excluded.course_id,
            access_expires_at = excluded.access_expires_at,
            total_access_days = excluded.total_access_days,
            is_access_revoked = excluded.is_access_revoked
        "#,
        params![
            enrollment.id.as_str(),
            enrollment.course_id.as_ref().map(|c| c.as_str()),
            enrollment.access_expires_at.map(|dt| dt.to_rfc3339()),
            enrollment.total_access_days,
            enrollment.is_access_revoked,
        ],
    )?;
    Ok(())
}

fn insert_audit(conn: &Connection, event: &AuditEvent) -> StoreResult<i64> {
    let event_json = serde_json::to_string(&event.event)?;
    conn.execute(
        "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
        params![event.timestamp.to_rfc3339(), event_json],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Store for SqliteStore {
    fn get_enrollment(&self, id: &EnrollmentId) -> StoreResult<Option<Enrollment>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT id, course_id, access_expires_at, total_access_days, is_access_revoked
                 FROM enrollments WHERE id = ?",
                [id.as_str()],
                enrollment_from_row,
            )
            .optional()?;

        row.map(finish_enrollment).transpose()
    }

    fn put_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let conn = self.conn()?;
        upsert_enrollment(&conn, enrollment)?;

        debug!(enrollment_id = %enrollment.id, "Enrollment stored");
        Ok(())
    }

    fn list_enrollments(&self) -> StoreResult<Vec<Enrollment>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, course_id, access_expires_at, total_access_days, is_access_revoked
             FROM enrollments ORDER BY id",
        )?;
        let rows = stmt.query_map([], enrollment_from_row)?;

        let mut enrollments = Vec::new();
        for row in rows {
            enrollments.push(finish_enrollment(row?)?);
        }
        Ok(enrollments)
    }

    fn apply_extension(
        &self,
        enrollment: &Enrollment,
        request_id: &RequestId,
        event: AuditEvent,
    ) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO applied_requests (request_id, enrollment_id, applied_at)
             VALUES (?, ?, ?)",
            params![
                request_id.to_string(),
                enrollment.id.as_str(),
                event.timestamp.to_rfc3339()
            ],
        )?;
        if inserted == 0 {
            debug!(request_id = %request_id, "Request already applied, nothing written");
            return Ok(false);
        }

        upsert_enrollment(&tx, enrollment)?;
        let event_id = insert_audit(&tx, &event)?;
        tx.commit()?;

        debug!(
            enrollment_id = %enrollment.id,
            request_id = %request_id,
            event_id,
            "Extension applied"
        );
        Ok(true)
    }

    fn applied_request_enrollment(
        &self,
        request_id: &RequestId,
    ) -> StoreResult<Option<EnrollmentId>> {
        let conn = self.conn()?;

        let enrollment_id: Option<String> = conn
            .query_row(
                "SELECT enrollment_id FROM applied_requests WHERE request_id = ?",
                [request_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(enrollment_id.map(EnrollmentId::new))
    }

    fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_id = insert_audit(&conn, &event)?;
        debug!(event_id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Corrupt(format!("audit event {}: {}", id, e)))?;
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;
    use chrono::TimeZone;
    use coursekeep_api::RevocationReason;

    fn sample() -> Enrollment {
        Enrollment::new("enr-1")
            .with_course(CourseId::new("rust-101"))
            .with_expiry(Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap())
            .with_total_days(30)
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_enrollment_upsert() {
        let store = SqliteStore::in_memory().unwrap();
        let id = EnrollmentId::new("enr-1");

        assert!(store.get_enrollment(&id).unwrap().is_none());

        store.put_enrollment(&sample()).unwrap();
        assert_eq!(store.get_enrollment(&id).unwrap(), Some(sample()));

        let updated = sample().with_total_days(60).revoked();
        store.put_enrollment(&updated).unwrap();
        assert_eq!(store.get_enrollment(&id).unwrap(), Some(updated));
    }

    #[test]
    fn test_unset_expiry_round_trips() {
        let store = SqliteStore::in_memory().unwrap();
        let enrollment = Enrollment::new("open-ended");
        store.put_enrollment(&enrollment).unwrap();

        let loaded = store.get_enrollment(&enrollment.id).unwrap().unwrap();
        assert!(loaded.access_expires_at.is_none());
        assert!(loaded.course_id.is_none());
    }

    #[test]
    fn test_list_enrollments_sorted() {
        let store = SqliteStore::in_memory().unwrap();
        store.put_enrollment(&Enrollment::new("b")).unwrap();
        store.put_enrollment(&Enrollment::new("a")).unwrap();

        let ids: Vec<String> = store
            .list_enrollments()
            .unwrap()
            .into_iter()
            .map(|e| e.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    fn extended_event(enrollment: &Enrollment, request_id: RequestId) -> AuditEvent {
        AuditEvent::new(AuditEventType::AccessExtended {
            enrollment_id: enrollment.id.clone(),
            request_id,
            days: 30,
            total_access_days: enrollment.total_access_days,
            new_expires_at: Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_extension_applied_once() {
        let store = SqliteStore::in_memory().unwrap();
        store.put_enrollment(&sample()).unwrap();
        let request_id = RequestId::new();

        assert_eq!(store.applied_request_enrollment(&request_id).unwrap(), None);

        let extended = sample().with_total_days(60);
        assert!(store
            .apply_extension(&extended, &request_id, extended_event(&extended, request_id))
            .unwrap());
        assert_eq!(
            store.applied_request_enrollment(&request_id).unwrap(),
            Some(EnrollmentId::new("enr-1"))
        );

        // Replaying the same id writes nothing, not even the enrollment
        let replayed = sample().with_total_days(90);
        assert!(!store
            .apply_extension(&replayed, &request_id, extended_event(&replayed, request_id))
            .unwrap());
        assert_eq!(
            store.get_enrollment(&extended.id).unwrap(),
            Some(extended)
        );
        assert_eq!(store.get_recent_audits(10).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_extension_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        store.put_enrollment(&sample()).unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE audit_log")
            .unwrap();

        let request_id = RequestId::new();
        let extended = sample().with_total_days(60);
        let result =
            store.apply_extension(&extended, &request_id, extended_event(&extended, request_id));

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.get_enrollment(&extended.id).unwrap(), Some(sample()));
        assert_eq!(store.applied_request_enrollment(&request_id).unwrap(), None);
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::EnrollmentImported {
                enrollment_id: EnrollmentId::new("enr-1"),
            }))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::AccessRevoked {
                enrollment_id: EnrollmentId::new("enr-1"),
                reason: RevocationReason::BudgetExhausted,
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::AccessRevoked { .. }));
        assert!(matches!(
            events[1].event,
            AuditEventType::EnrollmentImported { .. }
        ));

        assert_eq!(store.get_recent_audits(1).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coursekeep.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_enrollment(&sample()).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get_enrollment(&EnrollmentId::new("enr-1")).unwrap(),
            Some(sample())
        );
    }
}
