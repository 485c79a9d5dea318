//! Core storage engine — one handle per database file.
//!
//! DenEngine replays the record log into a RAM hash table on open, serves
//! reads from RAM, and appends every mutation to the log before touching RAM.
//!
//! **Read path**: RAM-first via RwLock
//! **Write path**: log-first, then RAM
//! **Cursor**: `first_key`/`next_key` walk the RAM index in ascending byte
//! order; the strictly-increasing position makes mid-iteration mutation safe.

use std::path::{Path, PathBuf};

use hashbrown::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{DenError, DenResult};
use crate::format::{decode_subkeys, encode_subkeys, Operation};
use crate::log::{LogReader, LogWriter};

/// How to open the database file.
///
/// The caller's access-mode policy (read-only, create-if-missing, truncate)
/// lowers to these three switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Create the file when it does not exist
    pub create: bool,
    /// Discard any prior contents
    pub truncate: bool,
    /// Open without a writer; all mutations fail with `ReadOnly`
    pub read_only: bool,
}

/// Storage engine handle: RAM hash table + append-only record log.
///
/// All public methods take `&self`. Reads go through the RwLock read guard;
/// writes serialize through the log Mutex, then briefly hold the write guard.
pub struct DenEngine {
    /// RAM working set — concurrent reads via RwLock
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    /// Subkey lists attached to keys (persisted via SetSubkeys records)
    subkeys: RwLock<HashMap<Vec<u8>, Vec<Vec<u8>>>>,
    /// Record log — single writer via Mutex; None when opened read-only
    writer: Option<Mutex<LogWriter>>,
    /// Database file path
    path: PathBuf,
    /// Engine configuration
    config: Config,
}

impl DenEngine {
    /// Open a database file and replay its record log into RAM.
    ///
    /// Without `flags.create` the file must already exist; with
    /// `flags.truncate` prior contents are discarded. `permissions` applies
    /// only when the file is created (unix mode bits, advisory).
    pub fn open<P: AsRef<Path>>(
        path: P,
        flags: OpenFlags,
        permissions: u32,
        config: Config,
    ) -> DenResult<Self> {
        let path = path.as_ref().to_path_buf();

        config.validate().map_err(|reason| DenError::Io {
            path: Some(path.clone()),
            kind: std::io::ErrorKind::InvalidInput,
            message: format!("Invalid engine configuration: {}", reason),
        })?;

        // The writer opens (and possibly creates/truncates) the file first so
        // replay below observes the post-truncation state.
        let writer = if flags.read_only {
            None
        } else {
            Some(Mutex::new(LogWriter::open(
                &path,
                flags.create,
                flags.truncate,
                permissions,
                config.sync_writes,
            )?))
        };

        let mut data = HashMap::new();
        let mut subkeys: HashMap<Vec<u8>, Vec<Vec<u8>>> = HashMap::new();
        let records = LogReader::new(&path).replay()?;

        for record in records {
            match record.operation {
                Operation::Put => {
                    data.insert(record.key, record.value);
                }
                Operation::Delete => {
                    data.remove(&record.key);
                    subkeys.remove(&record.key);
                }
                Operation::SetSubkeys => match decode_subkeys(&record.value) {
                    Ok(list) if list.is_empty() => {
                        subkeys.remove(&record.key);
                    }
                    Ok(list) => {
                        subkeys.insert(record.key, list);
                    }
                    Err(e) => {
                        // Passed CRC but undecodable — skip, matching the
                        // log reader's tolerance for damaged records
                        eprintln!("[DenHash] Skipping undecodable subkey record: {}", e);
                    }
                },
            }
        }

        Ok(Self {
            data: RwLock::new(data),
            subkeys: RwLock::new(subkeys),
            writer,
            path,
            config,
        })
    }

    fn writer(&self) -> DenResult<&Mutex<LogWriter>> {
        self.writer.as_ref().ok_or_else(|| DenError::ReadOnly { path: self.path.clone() })
    }

    fn check_entry_size(&self, key: &[u8], value: &[u8]) -> DenResult<()> {
        if key.len() > self.config.max_key_size {
            return Err(DenError::OversizedEntry {
                entry_size: key.len() as u64,
                max_size: self.config.max_key_size as u64,
                component: "key".to_string(),
            });
        }
        if value.len() > self.config.max_value_size {
            return Err(DenError::OversizedEntry {
                entry_size: value.len() as u64,
                max_size: self.config.max_value_size as u64,
                component: "value".to_string(),
            });
        }
        Ok(())
    }

    /// Get value for key from RAM. This is the hot path.
    pub fn get(&self, key: &[u8]) -> DenResult<Option<Vec<u8>>> {
        let data = self.data.read();
        Ok(data.get(key).cloned())
    }

    /// Put key-value pair.
    ///
    /// WRITE ORDERING: log append first, RAM second. If the log write fails,
    /// RAM is NEVER modified.
    pub fn put(&self, key: &[u8], value: &[u8]) -> DenResult<()> {
        self.check_entry_size(key, value)?;
        {
            let mut writer = self.writer()?.lock();
            writer.append(key, value, Operation::Put)?;
        }
        let mut data = self.data.write();
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Delete a key, its subkey list, and (recursively) the entries named by
    /// its subkeys. Returns whether the key itself held a value.
    ///
    /// Deleting an absent key is not an error and writes no record.
    pub fn delete(&self, key: &[u8]) -> DenResult<bool> {
        let mut visited = HashSet::new();
        self.delete_recursive(key, &mut visited)
    }

    fn delete_recursive(&self, key: &[u8], visited: &mut HashSet<Vec<u8>>) -> DenResult<bool> {
        // Subkey graphs may contain cycles; visit each key once
        if !visited.insert(key.to_vec()) {
            return Ok(false);
        }

        let had_value = self.data.read().contains_key(key);
        let had_subkeys = self.subkeys.read().contains_key(key);
        if !had_value && !had_subkeys {
            return Ok(false);
        }

        {
            let mut writer = self.writer()?.lock();
            writer.append(key, &[], Operation::Delete)?;
        }
        {
            let mut data = self.data.write();
            data.remove(key);
        }
        let children = {
            let mut subkeys = self.subkeys.write();
            subkeys.remove(key)
        };

        if let Some(children) = children {
            for child in children {
                self.delete_recursive(&child, visited)?;
            }
        }

        Ok(had_value)
    }

    /// Replace the subkey list attached to `key`. An empty list removes the
    /// association.
    pub fn set_subkeys(&self, key: &[u8], list: &[Vec<u8>]) -> DenResult<()> {
        let encoded = encode_subkeys(list);
        self.check_entry_size(key, &encoded)?;
        {
            let mut writer = self.writer()?.lock();
            writer.append(key, &encoded, Operation::SetSubkeys)?;
        }
        let mut subkeys = self.subkeys.write();
        if list.is_empty() {
            subkeys.remove(key);
        } else {
            subkeys.insert(key.to_vec(), list.to_vec());
        }
        Ok(())
    }

    /// Subkey list attached to `key`; empty when none is registered.
    pub fn subkeys(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let subkeys = self.subkeys.read();
        subkeys.get(key).cloned().unwrap_or_default()
    }

    /// Check if key exists in RAM.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        let data = self.data.read();
        data.contains_key(key)
    }

    /// Number of key-value pairs.
    pub fn len(&self) -> usize {
        let data = self.data.read();
        data.len()
    }

    /// Returns true if the store has no entries.
    pub fn is_empty(&self) -> bool {
        let data = self.data.read();
        data.is_empty()
    }

    /// Smallest key in byte order, or None when empty.
    ///
    /// Together with `next_key` this is the engine's cursor primitive. The
    /// scan is O(n) over the RAM index, which keeps the cursor position
    /// independent of the hash table's internal ordering and therefore stable
    /// under concurrent insertions and deletions.
    pub fn first_key(&self) -> Option<Vec<u8>> {
        let data = self.data.read();
        data.keys().min().cloned()
    }

    /// Smallest key strictly greater than `after`, or None at the end.
    pub fn next_key(&self, after: &[u8]) -> Option<Vec<u8>> {
        let data = self.data.read();
        data.keys().filter(|k| k.as_slice() > after).min().cloned()
    }

    /// Sync the record log to persistent storage. No-op when read-only.
    pub fn sync(&self) -> DenResult<()> {
        match &self.writer {
            Some(writer) => writer.lock().sync(),
            None => Ok(()),
        }
    }

    /// Whether the engine was opened without a writer.
    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }
}

impl Drop for DenEngine {
    fn drop(&mut self) {
        if let Some(writer) = &self.writer {
            let _ = writer.lock().sync();
        }
    }
}
