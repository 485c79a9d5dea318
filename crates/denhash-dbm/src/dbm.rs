//! The DBM facade: a persistent database that behaves like a mapping.
//!
//! `DenHash` wraps exactly one engine handle and exposes dictionary-shaped
//! operations over it. Keys and values are opaque byte sequences throughout:
//! `&[u8]` in, `Vec<u8>` out. A missing key is `Ok(None)`, never an error;
//! only handle-state and argument-type violations are hard errors.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use denhash_core::Config;

use crate::adapter::StoreHandle;
use crate::error::DbmResult;
use crate::mode::OpenMode;

/// A DBM-style persistent mapping bound to one database file.
///
/// Constructed open; `close()` (or drop) releases the underlying engine
/// exactly once. After close, every operation except `close`-state queries
/// fails with `DbmError::Closed`.
pub struct DenHash {
    handle: StoreHandle,
    path: PathBuf,
}

impl DenHash {
    /// Open the database at `path` with default engine configuration.
    ///
    /// `permissions` are unix mode bits applied only if the file is created
    /// (advisory; ignored on non-unix platforms). The mode decides the
    /// existence precondition and writability (see [`OpenMode`]).
    pub fn open<P: AsRef<Path>>(path: P, permissions: u32, mode: OpenMode) -> DbmResult<Self> {
        Self::open_with_config(path, permissions, mode, Config::default())
    }

    /// Open with an explicit engine configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        permissions: u32,
        mode: OpenMode,
        config: Config,
    ) -> DbmResult<Self> {
        let path = path.as_ref().to_path_buf();
        let handle = StoreHandle::open(&path, permissions, mode, config)?;
        Ok(Self { handle, path })
    }

    /// Stored value for `key`, or `Ok(None)` when absent.
    pub fn get(&self, key: &[u8]) -> DbmResult<Option<Vec<u8>>> {
        self.handle.get(key)
    }

    /// Store `value` under `key`, silently overwriting any existing value.
    pub fn store(&self, key: &[u8], value: &[u8]) -> DbmResult<()> {
        self.handle.put(key, value)
    }

    /// Remove `key`, returning the value it held; `Ok(None)` when it was
    /// absent (not an error).
    pub fn delete(&self, key: &[u8]) -> DbmResult<Option<Vec<u8>>> {
        let previous = self.handle.get(key)?;
        // Engine delete also drops the key's subkey association and cascades;
        // it no-ops when the key is truly absent
        self.handle.delete(key)?;
        Ok(previous)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &[u8]) -> DbmResult<bool> {
        self.handle.contains_key(key)
    }

    /// Whether any entry holds `value`. Full scan: the engine has no value
    /// index, so this is O(n) over all entries.
    pub fn contains_value(&self, value: &[u8]) -> DbmResult<bool> {
        for pair in self.pairs() {
            let (_, v) = pair?;
            if v == value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// All keys, in cursor traversal order.
    pub fn keys(&self) -> DbmResult<Vec<Vec<u8>>> {
        self.pairs().map(|pair| pair.map(|(k, _)| k)).collect()
    }

    /// All values, in cursor traversal order.
    pub fn values(&self) -> DbmResult<Vec<Vec<u8>>> {
        self.pairs().map(|pair| pair.map(|(_, v)| v)).collect()
    }

    /// Values for the requested keys, in request order; missing keys are
    /// omitted (non-fatal).
    pub fn values_at<K: AsRef<[u8]>>(&self, keys: &[K]) -> DbmResult<Vec<Vec<u8>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key.as_ref())? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Fresh in-memory mapping from value to key. When two entries share a
    /// value, the later-iterated entry's key wins.
    pub fn invert(&self) -> DbmResult<HashMap<Vec<u8>, Vec<u8>>> {
        let mut inverted = HashMap::new();
        for pair in self.pairs() {
            let (k, v) = pair?;
            inverted.insert(v, k);
        }
        Ok(inverted)
    }

    /// Remove and return the first pair the cursor yields, or `Ok(None)`
    /// when the database is empty.
    pub fn shift(&self) -> DbmResult<Option<(Vec<u8>, Vec<u8>)>> {
        // A mutation even when the store turns out to be empty
        self.handle.check_writable()?;
        let key = match self.handle.first_key()? {
            Some(key) => key,
            None => return Ok(None),
        };
        match self.delete(&key)? {
            Some(value) => Ok(Some((key, value))),
            // Vanished between cursor and delete; the database may simply be
            // empty now
            None => Ok(None),
        }
    }

    /// Remove every entry. Leaves the handle open with `len() == 0`.
    pub fn clear(&self) -> DbmResult<()> {
        // Mutation legality is judged by the operation, not by whether any
        // entries exist to remove
        self.handle.check_writable()?;
        // Walk the cursor rather than snapshotting: deletes never disturb a
        // strictly-increasing position
        let mut position = self.handle.first_key()?;
        while let Some(key) = position {
            self.handle.delete(&key)?;
            position = self.handle.next_key(&key)?;
        }
        Ok(())
    }

    /// Current entry count.
    pub fn len(&self) -> DbmResult<usize> {
        self.handle.len()
    }

    /// Whether the database has no entries.
    pub fn is_empty(&self) -> DbmResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Attach a subkey list to `key`; an empty list removes the association.
    /// Deleting `key` later also deletes the entries its subkeys name.
    pub fn store_subkeys<K: AsRef<[u8]>>(&self, key: &[u8], subkeys: &[K]) -> DbmResult<()> {
        let subkeys: Vec<Vec<u8>> = subkeys.iter().map(|s| s.as_ref().to_vec()).collect();
        self.handle.set_subkeys(key, &subkeys)
    }

    /// Subkey list attached to `key`; empty when none is registered.
    pub fn fetch_subkeys(&self, key: &[u8]) -> DbmResult<Vec<Vec<u8>>> {
        self.handle.subkeys(key)
    }

    /// Close the handle. Terminal: a second close fails with `Closed`.
    pub fn close(&self) -> DbmResult<()> {
        self.handle.close()
    }

    /// Whether the handle has been closed. Legal in every state.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode the database was opened with.
    pub fn mode(&self) -> OpenMode {
        self.handle.mode()
    }

    pub(crate) fn handle(&self) -> &StoreHandle {
        &self.handle
    }
}

impl Drop for DenHash {
    fn drop(&mut self) {
        if !self.handle.is_closed() {
            let _ = self.handle.close();
        }
    }
}

impl std::fmt::Debug for DenHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenHash")
            .field("path", &self.path)
            .field("mode", &self.handle.mode())
            .field("closed", &self.handle.is_closed())
            .finish()
    }
}
