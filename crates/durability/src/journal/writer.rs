//! Append-only journal writer

use super::record::JournalRecord;
use super::{JournalError, HEADER_LEN, MAX_RECORD_LEN};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends framed records to a journal file
///
/// Each frame goes to the file in a single write. After a failed write
/// the writer refuses further appends, since a partial frame may now sit
/// at the end of the file and the reader stops there.
#[derive(Debug)]
pub struct JournalWriter {
    file: File,
    path: PathBuf,
    sync: bool,
    records_written: u64,
    poisoned: bool,
}

impl JournalWriter {
    /// Open (or create) a journal for appending
    ///
    /// # Arguments
    ///
    /// * `path` - Journal file
    /// * `sync` - fsync after every record
    pub fn open(path: impl AsRef<Path>, sync: bool) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file,
            path,
            sync,
            records_written: 0,
            poisoned: false,
        })
    }

    /// Append one record
    ///
    /// # Errors
    ///
    /// - `Encode` if the record cannot be serialized or exceeds the
    ///   maximum frame size; nothing is written
    /// - `Poisoned` if an earlier append failed mid-write
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        if self.poisoned {
            return Err(JournalError::Poisoned {
                path: self.path.display().to_string(),
            });
        }

        let frame = encode_frame(record)?;
        if let Err(err) = self.write_frame(&frame) {
            self.poisoned = true;
            return Err(err.into());
        }

        self.records_written += 1;
        debug!(
            sequence = record.sequence,
            outcome = %record.outcome,
            bytes = frame.len(),
            "journal record appended"
        );
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.file.write_all(frame)?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written by this writer
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

/// `[len][crc][payload]` for one record
fn encode_frame(record: &JournalRecord) -> Result<Vec<u8>, JournalError> {
    let payload = bincode::serialize(record).map_err(|e| JournalError::Encode {
        reason: e.to_string(),
    })?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_RECORD_LEN)
        .ok_or_else(|| JournalError::Encode {
            reason: format!(
                "record of {} bytes exceeds the {} byte limit",
                payload.len(),
                MAX_RECORD_LEN
            ),
        })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.write_u32::<LittleEndian>(len)?;
    frame.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
    frame.extend_from_slice(&payload);
    Ok(frame)
}
