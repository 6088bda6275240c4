//! Persisted journal
//!
//! - `record`: the per-entry record format
//! - `writer`: append-only writer (JournalWriter)
//! - `reader`: tolerant reader (read_journal)
//!
//! ## File Format
//!
//! ```text
//! +-----------+-----------+-------------------+
//! | len (u32) | crc (u32) | bincode(record)   |  ... repeated
//! +-----------+-----------+-------------------+
//! ```
//!
//! Both integers are little-endian; `crc` is CRC32 of the payload. A record
//! is written on every append and on every outcome change, so the newest
//! record for a sequence carries its latest outcome.

mod reader;
mod record;
mod writer;

pub use reader::{read_journal, JournalCorruption, JournalReadResult};
pub use record::JournalRecord;
pub use writer::JournalWriter;

use thiserror::Error;

/// Frame header size: length + checksum
pub(crate) const HEADER_LEN: usize = 8;

/// Records larger than this are treated as corruption
pub(crate) const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// Journal errors
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying file error
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("failed to encode journal record: {reason}")]
    Encode {
        /// Encoder message
        reason: String,
    },

    /// An earlier append failed; the file may end in a partial frame
    #[error("journal {path} is unusable after a failed write")]
    Poisoned {
        /// Journal file
        path: String,
    },
}
