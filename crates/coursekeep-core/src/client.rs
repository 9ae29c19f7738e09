//! Seam to the "extend access" endpoint

use coursekeep_api::{Enrollment, ErrorCode, ErrorInfo, ExtendAccessRequest};
use std::future::Future;
use thiserror::Error;

use crate::AccessError;

/// Why an extension request did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// The endpoint answered and refused
    #[error("{message}")]
    Rejected { code: ErrorCode, message: String },

    /// The endpoint could not be reached or answered garbage
    #[error("Extension endpoint unavailable: {0}")]
    Transport(String),
}

impl ExtensionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExtensionError::Rejected { code, .. } => *code,
            ExtensionError::Transport(_) => ErrorCode::Unavailable,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::new(self.code(), self.to_string())
    }
}

impl From<ErrorInfo> for ExtensionError {
    fn from(info: ErrorInfo) -> Self {
        ExtensionError::Rejected {
            code: info.code,
            message: info.message,
        }
    }
}

impl From<AccessError> for ExtensionError {
    fn from(e: AccessError) -> Self {
        ExtensionError::Rejected {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// Something that can grant access extensions.
///
/// One call per user action; implementations must not retry on their own.
/// On success the returned enrollment is the server's view after the grant.
pub trait ExtensionClient {
    fn extend_access(
        &self,
        request: ExtendAccessRequest,
    ) -> impl Future<Output = Result<Enrollment, ExtensionError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_to_unavailable() {
        let err = ExtensionError::Transport("connection reset".into());
        let info = err.to_error_info();
        assert_eq!(info.code, ErrorCode::Unavailable);
        assert!(info.message.contains("connection reset"));
    }

    #[test]
    fn error_info_round_trips_through_rejection() {
        let info = ErrorInfo::new(ErrorCode::LimitExceeded, "only 3 days left");
        let err = ExtensionError::from(info.clone());
        assert_eq!(err.to_error_info(), info);
    }
}
