//! Course access policy for coursekeep
//!
//! This crate is the heart of coursekeep, containing:
//! - Access status classification (active, expiring soon, expired, revoked)
//! - Lifetime budget accounting and extension eligibility
//! - The extend-access dialog state machine (Idle -> Selecting -> Submitting -> Idle)
//! - The ledger that grants extensions and owns the lifetime ceiling
//!
//! Evaluation is pure: every function takes the enrollment snapshot and
//! `now` explicitly and never touches the clock or the store.

mod banner;
mod client;
mod dialog;
mod evaluator;
mod ledger;

pub use banner::*;
pub use client::*;
pub use dialog::*;
pub use evaluator::*;
pub use ledger::*;
