//! Record log for a single DenHash database file
//!
//! The database file is one append-only log of checksummed records. Opening a
//! database replays the log front to back; each `Put` overwrites, each
//! `Delete` removes, each `SetSubkeys` replaces a key's subkey list. The last
//! record for a key wins.
//!
//! Durability follows the write ordering the log enforces:
//! 1. Serialize record to buffer
//! 2. Append buffer to the database file
//! 3. Optionally durable_sync() per configuration
//! 4. Return success (caller updates RAM AFTER this returns)

use crate::durability::durable_sync;
use crate::error::{DenError, DenResult};
use crate::format::{deserialize_record, serialize_record, Operation, Record, HEADER_SIZE, MAGIC};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Appends records to the database file.
///
/// INVARIANT: `append()` must complete BEFORE the caller updates the
/// in-memory index, so a replayed log never claims more than the index held.
pub struct LogWriter {
    /// Open database file handle
    file: File,
    /// Path to the database file (for error context)
    path: PathBuf,
    /// Whether every append is followed by a durable sync
    sync_writes: bool,
}

impl LogWriter {
    /// Open the database file for appending.
    ///
    /// `create` permits creating a missing file, `truncate` discards prior
    /// contents, and `permissions` is applied only when the file is created
    /// (unix mode bits, advisory; ignored on other platforms).
    pub fn open<P: AsRef<Path>>(
        path: P,
        create: bool,
        truncate: bool,
        permissions: u32,
        sync_writes: bool,
    ) -> DenResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.write(true).append(!truncate).create(create).truncate(truncate);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(permissions);
        }
        #[cfg(not(unix))]
        let _ = permissions;

        let file = options.open(&path).map_err(|e| DenError::Io {
            path: Some(path.clone()),
            kind: e.kind(),
            message: format!("Failed to open database file: {}", e),
        })?;

        Ok(Self { file, path, sync_writes })
    }

    /// Append a record to the log.
    ///
    /// Write ordering:
    /// 1. serialize: convert key/value to binary format with CRC32C
    /// 2. write:     append serialized bytes to the database file
    /// 3. sync:      durable_sync() when `sync_writes` is set
    /// 4. return:    only AFTER this does the caller update RAM
    pub fn append(&mut self, key: &[u8], value: &[u8], op: Operation) -> DenResult<()> {
        let record_bytes = serialize_record(key, value, op)?;

        self.file.write_all(&record_bytes).map_err(|e| DenError::Io {
            path: Some(self.path.clone()),
            kind: e.kind(),
            message: format!("Log write failed: {}", e),
        })?;

        if self.sync_writes {
            self.sync()?;
        }

        Ok(())
    }

    /// Sync the database file to persistent storage without writing a record.
    pub fn sync(&self) -> DenResult<()> {
        durable_sync(&self.file).map_err(|e| DenError::Io {
            path: Some(self.path.clone()),
            kind: e.kind(),
            message: format!("Log sync failed: {}", e),
        })
    }
}

/// Replays records from a database file.
pub struct LogReader {
    path: PathBuf,
}

impl LogReader {
    /// Create a reader for the database file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Replay all records from the database file in write order.
    ///
    /// Recovery algorithm:
    /// 1. Read 16-byte header
    /// 2. Validate magic bytes ("DENH")
    /// 3. Check key_len + value_len against remaining file size
    /// 4. Read payload, compute CRC32C, compare with header.checksum
    /// 5. On mismatch/corruption: find_next_magic() to resync
    /// 6. On torn write (incomplete record at EOF): stop — this is the crash point
    pub fn replay(&self) -> DenResult<Vec<Record>> {
        let mut file = File::open(&self.path).map_err(|e| DenError::Io {
            path: Some(self.path.clone()),
            kind: e.kind(),
            message: format!("Failed to open database file for replay: {}", e),
        })?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(|e| DenError::Io {
            path: Some(self.path.clone()),
            kind: e.kind(),
            message: format!("Failed to read database file: {}", e),
        })?;

        let mut records = Vec::new();
        let mut offset = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            // Step 1: Check magic bytes at current position
            if buffer[offset..offset + 4] != MAGIC {
                eprintln!("[DenHash] Bad magic at offset {}, scanning for next record", offset);
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => { offset = next; continue; }
                    None => break, // no more records
                }
            }

            // Step 2: Payload length = key_len + value_len from the header
            let key_len = u16::from_le_bytes([buffer[offset + 8], buffer[offset + 9]]) as usize;
            let value_len = u32::from_le_bytes([
                buffer[offset + 10], buffer[offset + 11],
                buffer[offset + 12], buffer[offset + 13],
            ]) as usize;

            let total_record_size = HEADER_SIZE + key_len + value_len;

            // Step 3: Check if full record fits in remaining data
            if offset + total_record_size > buffer.len() {
                // Torn write — record started but didn't complete. This is the crash point.
                eprintln!("[DenHash] Torn write at offset {}: need {} bytes, have {}",
                         offset, total_record_size, buffer.len() - offset);
                break; // stop replay here — everything after is incomplete
            }

            // Step 4: Deserialize and verify CRC32C
            let record_slice = &buffer[offset..offset + total_record_size];
            match deserialize_record(record_slice) {
                Ok(record) => {
                    records.push(record);
                    offset += total_record_size;
                }
                Err(e) => {
                    // CRC mismatch or other corruption — skip and resync
                    eprintln!("[DenHash] Corrupt record at offset {}: {}", offset, e);
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => { offset = next; continue; }
                        None => break,
                    }
                }
            }
        }

        Ok(records)
    }
}

/// Scan forward in buffer to find next occurrence of DENH magic bytes.
/// Used for resynchronization after encountering corruption.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    for i in start..buffer.len().saturating_sub(3) {
        if buffer[i..i + 4] == MAGIC {
            return Some(i);
        }
    }
    None
}
