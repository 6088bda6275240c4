//! Durability layer for continuity
//!
//! - `replay_log`: bounded in-memory journal of submitted operations
//! - `journal`: optional on-disk record of every append and outcome change
//!
//! The replay log is owned by the session manager; nothing above the
//! session layer mutates it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod journal;
pub mod replay_log;

pub use journal::{
    read_journal, JournalCorruption, JournalError, JournalReadResult, JournalRecord, JournalWriter,
};
pub use replay_log::{LogError, ReplayLog};
