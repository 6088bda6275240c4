//! Resilient executor for continuity
//!
//! The caller-facing surface. A [`ResilientExecutor`] owns one logical
//! session; every submitted operation is appended to the session's replay
//! log before anything is sent, and the caller gets back a terminal
//! outcome no matter how many times the backend link is replaced in
//! between.
//!
//! ```ignore
//! let executor = ResilientExecutor::builder(connector)
//!     .endpoints(StaticEndpoints::new(vec![primary, standby]).unwrap())
//!     .build()?;
//!
//! let completion = executor.submit(
//!     "MERGE INTO demo t USING ...",
//!     vec![Value::I64(1001), Value::from("note")],
//!     IdempotencyClass::Idempotent,
//! )?;
//! assert!(completion.is_committed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod convert;
mod error;
mod executor;
mod ticket;

pub use error::{Error, Result};
pub use executor::{ExecutorBuilder, ResilientExecutor};
pub use ticket::Ticket;
