//! Data types shared between the access policy and its callers
//!
//! This crate defines:
//! - The `Enrollment` snapshot as the course backend sends it
//! - Access status reports, extension options and banner views
//! - Extension request/response envelopes and error codes

mod commands;
mod enrollment;
mod types;

pub use commands::*;
pub use enrollment::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
