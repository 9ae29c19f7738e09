//! Shared utilities for coursekeep
//!
//! This crate provides:
//! - ID types (EnrollmentId, CourseId, RequestId)
//! - Clock access with debug-only mock time
//! - Day arithmetic used by the access policy
//! - Default paths for config and data directories

mod days;
mod ids;
mod paths;
mod time;

pub use days::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
