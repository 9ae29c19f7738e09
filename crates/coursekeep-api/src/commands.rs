//! Extension request/response envelopes

use coursekeep_util::{EnrollmentId, RequestId};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, Enrollment};

/// Ask the enforcement point to add `days` of access to an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendAccessRequest {
    /// Stable across resubmissions of the same user action
    pub request_id: RequestId,
    pub enrollment_id: EnrollmentId,
    pub days: u32,
}

impl ExtendAccessRequest {
    pub fn new(enrollment_id: EnrollmentId, days: u32) -> Self {
        Self {
            request_id: RequestId::new(),
            enrollment_id,
            days,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendAccessResponse {
    pub request_id: RequestId,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl ExtendAccessResponse {
    pub fn success(request_id: RequestId, enrollment: Enrollment) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(enrollment),
        }
    }

    pub fn error(request_id: RequestId, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, ResponseResult::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(Enrollment),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes returned by the extension endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    EnrollmentNotFound,
    AccessRevoked,
    LimitExceeded,
    NoExpiryConfigured,
    Unavailable,
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = ExtendAccessRequest::new(EnrollmentId::new("enr-1"), 14);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"enrollmentId\":\"enr-1\""));

        let parsed: ExtendAccessRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn error_response_serialization() {
        let resp = ExtendAccessResponse::error(
            RequestId::new(),
            ErrorInfo::new(ErrorCode::LimitExceeded, "only 5 days left"),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("limit_exceeded"));

        let parsed: ExtendAccessResponse = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_success());
        assert_eq!(parsed.api_version, API_VERSION);
    }
}
