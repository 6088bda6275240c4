//! Journal reader
//!
//! Reads every intact record and stops at the first torn or corrupt frame.
//! A crash mid-append leaves a partial tail; that is reported, not fatal.

use super::record::JournalRecord;
use super::{JournalError, HEADER_LEN, MAX_RECORD_LEN};
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

/// Where and why reading stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalCorruption {
    /// Byte offset of the bad frame
    pub offset: u64,
    /// Description
    pub reason: String,
}

/// Result of reading a journal
#[derive(Debug, Clone, Default)]
pub struct JournalReadResult {
    /// Intact records in file order
    pub records: Vec<JournalRecord>,
    /// Set if reading stopped before the end of the file
    pub corruption: Option<JournalCorruption>,
}

impl JournalReadResult {
    /// Newest record per sequence
    pub fn latest_by_sequence(&self) -> BTreeMap<u64, JournalRecord> {
        let mut latest = BTreeMap::new();
        for record in &self.records {
            latest.insert(record.sequence, record.clone());
        }
        latest
    }
}

/// Read all intact records from a journal file
pub fn read_journal(path: impl AsRef<Path>) -> Result<JournalReadResult, JournalError> {
    let bytes = std::fs::read(path)?;
    let mut result = JournalReadResult::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < HEADER_LEN {
            result.corruption = Some(corruption(offset, "torn frame header"));
            break;
        }

        let mut header = Cursor::new(&bytes[offset..offset + HEADER_LEN]);
        let len = header.read_u32::<LittleEndian>()?;
        let crc = header.read_u32::<LittleEndian>()?;

        if len > MAX_RECORD_LEN {
            result.corruption = Some(corruption(offset, &format!("record length {} too large", len)));
            break;
        }
        let start = offset + HEADER_LEN;
        let end = start + len as usize;
        if end > bytes.len() {
            result.corruption = Some(corruption(offset, "torn record payload"));
            break;
        }

        let payload = &bytes[start..end];
        if crc32fast::hash(payload) != crc {
            result.corruption = Some(corruption(offset, "checksum mismatch"));
            break;
        }
        match bincode::deserialize::<JournalRecord>(payload) {
            Ok(record) => result.records.push(record),
            Err(e) => {
                result.corruption = Some(corruption(offset, &format!("undecodable record: {}", e)));
                break;
            }
        }
        offset = end;
    }

    Ok(result)
}

fn corruption(offset: usize, reason: &str) -> JournalCorruption {
    JournalCorruption {
        offset: offset as u64,
        reason: reason.to_string(),
    }
}
