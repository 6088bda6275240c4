//! # continuity
//!
//! Resilient database sessions: a logical session that survives the loss
//! of its physical link. Every operation is recorded in a replay log before
//! it is sent; when the link dies, the session acquires a replacement and
//! replays in-flight work according to each operation's idempotency class:
//!
//! - **Idempotent**: re-executed
//! - **AtMostOnce**: re-executed only if the backend confirms it did not
//!   commit
//! - **Unsafe**: never re-executed; the caller gets `Outcome::Unknown`
//!
//! ## Quick start
//!
//! ```ignore
//! use continuity::{ResilientExecutor, Endpoint, IdempotencyClass, Value};
//!
//! let executor = ResilientExecutor::builder(my_connector)
//!     .endpoint("//primary-scan:1521/svc".parse()?)
//!     .build()?;
//!
//! let done = executor.submit(
//!     "MERGE INTO t USING ...",
//!     vec![Value::I64(1001), Value::from("note")],
//!     IdempotencyClass::Idempotent,
//! )?;
//! assert!(done.is_committed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod types;

pub use continuity_executor::{Error, ExecutorBuilder, ResilientExecutor, Result, Ticket};
pub use types::*;
