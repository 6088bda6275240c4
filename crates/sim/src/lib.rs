//! Simulated backend for continuity
//!
//! An in-memory store that speaks a handful of statement verbs through the
//! [`PhysicalLink`](continuity_core::PhysicalLink) seam, with fault
//! injection for the failures a resilient session has to survive:
//!
//! | Fault | Effect |
//! |-------|--------|
//! | [`SimBackend::switchover`] | every open link breaks on its next use |
//! | [`SimBackend::fail_next_opens`] | link acquisition fails N times |
//! | [`SimBackend::set_endpoint_down`] | acquisition against one host fails |
//! | [`SimBackend::break_next_execute`] | the next execution loses its link, before or after applying |
//! | [`SimBackend::set_confirmation_available`] | commit confirmation queries fail |
//!
//! ## Statements
//!
//! The verb is the first word of the statement, case-insensitive:
//!
//! - `MERGE`: insert `[key, values...]` if the key is absent (idempotent)
//! - `INSERT`: insert `[key, values...]`, rejected on a duplicate key
//! - `UPDATE`: add `params[1]` (default 1) to the named counter `params[0]`
//!   (not idempotent)
//! - `DELETE`: remove `[key]`
//!
//! Anything else is rejected as a statement error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod fault;
pub mod link;

pub use backend::{Row, SimBackend};
pub use fault::BreakMode;
pub use link::{SimConfirmation, SimConnector, SimLink};
