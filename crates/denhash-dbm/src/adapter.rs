//! Storage engine adapter and open-mode state machine.
//!
//! `StoreHandle` owns the engine behind an `RwLock<Option<_>>`: `Some` is the
//! `Open` state, `None` is `Closed`. Every raw operation checks the state
//! before reaching the engine, and `close` is the only transition — it takes
//! the engine out exactly once, making the closed state terminal.

use std::path::Path;

use parking_lot::RwLock;

use denhash_core::{Config, DenEngine};

use crate::error::{DbmError, DbmResult};
use crate::mode::OpenMode;

/// Ownership-safe wrapper around one engine handle.
///
/// Operations on a closed handle fail with `DbmError::Closed` without
/// touching the engine; mutations through a Reader-mode handle fail with
/// `DbmError::ReadOnly` the same way.
pub(crate) struct StoreHandle {
    engine: RwLock<Option<DenEngine>>,
    mode: OpenMode,
}

impl StoreHandle {
    /// Open the database file per the mode's existence/truncation policy.
    ///
    /// On failure no handle exists; construction itself fails.
    pub(crate) fn open(
        path: &Path,
        permissions: u32,
        mode: OpenMode,
        config: Config,
    ) -> DbmResult<Self> {
        let engine = DenEngine::open(path, mode.open_flags(), permissions, config)
            .map_err(|source| DbmError::Open { path: path.to_path_buf(), source })?;

        Ok(Self {
            engine: RwLock::new(Some(engine)),
            mode,
        })
    }

    /// Run a read-side operation against the open engine.
    fn with_engine<R>(&self, f: impl FnOnce(&DenEngine) -> DbmResult<R>) -> DbmResult<R> {
        let guard = self.engine.read();
        match guard.as_ref() {
            Some(engine) => f(engine),
            None => Err(DbmError::Closed),
        }
    }

    /// Run a mutating operation; rejects Reader-mode handles first.
    fn with_engine_mut<R>(&self, f: impl FnOnce(&DenEngine) -> DbmResult<R>) -> DbmResult<R> {
        if !self.mode.writable() {
            // State check still comes first: a closed handle reports Closed
            // even for an operation the mode would forbid
            let guard = self.engine.read();
            if guard.is_none() {
                return Err(DbmError::Closed);
            }
            return Err(DbmError::ReadOnly);
        }
        self.with_engine(f)
    }

    /// Up-front legality check for compound mutation operations.
    ///
    /// A mutating operation is illegal on a Reader-mode handle even when it
    /// would end up issuing no raw writes (clearing an empty store, a merge
    /// from an empty source). Closed still wins over ReadOnly.
    pub(crate) fn check_writable(&self) -> DbmResult<()> {
        if self.engine.read().is_none() {
            return Err(DbmError::Closed);
        }
        if !self.mode.writable() {
            return Err(DbmError::ReadOnly);
        }
        Ok(())
    }

    pub(crate) fn mode(&self) -> OpenMode {
        self.mode
    }

    pub(crate) fn get(&self, key: &[u8]) -> DbmResult<Option<Vec<u8>>> {
        self.with_engine(|engine| Ok(engine.get(key)?))
    }

    pub(crate) fn put(&self, key: &[u8], value: &[u8]) -> DbmResult<()> {
        self.with_engine_mut(|engine| Ok(engine.put(key, value)?))
    }

    /// Delete a key; Ok(false) when it was absent.
    pub(crate) fn delete(&self, key: &[u8]) -> DbmResult<bool> {
        self.with_engine_mut(|engine| Ok(engine.delete(key)?))
    }

    pub(crate) fn contains_key(&self, key: &[u8]) -> DbmResult<bool> {
        self.with_engine(|engine| Ok(engine.contains_key(key)))
    }

    pub(crate) fn len(&self) -> DbmResult<usize> {
        self.with_engine(|engine| Ok(engine.len()))
    }

    pub(crate) fn first_key(&self) -> DbmResult<Option<Vec<u8>>> {
        self.with_engine(|engine| Ok(engine.first_key()))
    }

    pub(crate) fn next_key(&self, after: &[u8]) -> DbmResult<Option<Vec<u8>>> {
        self.with_engine(|engine| Ok(engine.next_key(after)))
    }

    pub(crate) fn set_subkeys(&self, key: &[u8], subkeys: &[Vec<u8>]) -> DbmResult<()> {
        self.with_engine_mut(|engine| Ok(engine.set_subkeys(key, subkeys)?))
    }

    pub(crate) fn subkeys(&self, key: &[u8]) -> DbmResult<Vec<Vec<u8>>> {
        self.with_engine(|engine| Ok(engine.subkeys(key)))
    }

    /// Transition `Open -> Closed`. Terminal: a second close fails with
    /// `Closed`, and the engine is never handed a double-close.
    pub(crate) fn close(&self) -> DbmResult<()> {
        let mut guard = self.engine.write();
        match guard.take() {
            Some(engine) => {
                engine.sync()?;
                drop(engine);
                Ok(())
            }
            None => Err(DbmError::Closed),
        }
    }

    /// Legal in every state.
    pub(crate) fn is_closed(&self) -> bool {
        self.engine.read().is_none()
    }
}
