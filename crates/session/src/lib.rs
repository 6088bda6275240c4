//! Session layer for continuity
//!
//! This crate owns the physical link and drives the session state machine:
//!
//! ```text
//!                 link failure                 immediately
//!     ACTIVE ------------------> DISRUPTED ------------------> RECONNECTING
//!       ^                            ^                              |
//!       |                            |     acquisition failed       |
//!       |                            +------------------------------+
//!       |          link acquired and in-flight operations replayed  |
//!       +-----------------------------------------------------------+
//!
//!     any state --[close / attempts exhausted]--> CLOSED
//! ```
//!
//! - `state`: session states and legal transitions
//! - `backoff`: capped exponential backoff
//! - `endpoint`: static endpoint resolution strategy
//! - `metrics`: per-session and process-wide counters
//! - `handle`: the caller-side API (`SessionHandle`)
//! - `manager`: the worker that owns the link and replays operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod endpoint;
pub mod error;
pub mod handle;
mod manager;
pub mod metrics;
mod shared;
pub mod state;

pub use backoff::Backoff;
pub use endpoint::StaticEndpoints;
pub use error::SessionError;
pub use handle::{CancelStatus, Collaborators, SessionHandle};
pub use metrics::{process_counters, ContinuityCounters, CounterEvent, CountersSnapshot};
pub use state::SessionState;
