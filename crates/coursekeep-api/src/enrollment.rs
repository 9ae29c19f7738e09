//! Enrollment snapshot as supplied by the course backend

use chrono::{DateTime, Utc};
use coursekeep_util::{CourseId, EnrollmentId, parse_timestamp};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Access-relevant part of an enrollment.
///
/// The backend owns this record; the access policy only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<CourseId>,

    /// Moment after which course content is inaccessible. None means the
    /// enrollment has no expiry.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub access_expires_at: Option<DateTime<Utc>>,

    /// Access-days consumed over the enrollment's lifetime
    #[serde(default, deserialize_with = "non_negative_days")]
    pub total_access_days: u32,

    /// Set once the lifetime budget is spent or an admin revokes access
    #[serde(default)]
    pub is_access_revoked: bool,
}

impl Enrollment {
    /// A fresh enrollment with no expiry and no consumed days
    pub fn new(id: impl Into<EnrollmentId>) -> Self {
        Self {
            id: id.into(),
            course_id: None,
            access_expires_at: None,
            total_access_days: 0,
            is_access_revoked: false,
        }
    }

    pub fn with_course(mut self, course_id: CourseId) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.access_expires_at = Some(expires_at);
        self
    }

    pub fn with_total_days(mut self, days: u32) -> Self {
        self.total_access_days = days;
        self
    }

    pub fn revoked(mut self) -> Self {
        self.is_access_revoked = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
    Other(IgnoredAny),
}

/// Malformed or unknown timestamps decode to `None` rather than failing the
/// whole record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    let parsed = match raw {
        None => None,
        Some(RawTimestamp::Text(text)) => {
            let parsed = parse_timestamp(&text);
            if parsed.is_none() && !text.trim().is_empty() {
                tracing::warn!(value = %text, "Unparseable accessExpiresAt, treating as no expiry");
            }
            parsed
        }
        Some(RawTimestamp::Millis(ms)) => {
            let parsed = DateTime::from_timestamp_millis(ms);
            if parsed.is_none() {
                tracing::warn!(value = ms, "Out-of-range accessExpiresAt, treating as no expiry");
            }
            parsed
        }
        Some(RawTimestamp::Other(_)) => {
            tracing::warn!("accessExpiresAt is neither text nor epoch millis, treating as no expiry");
            None
        }
    };
    Ok(parsed)
}

fn non_negative_days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?.unwrap_or(0);
    Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}
