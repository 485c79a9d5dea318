//! Enumeration and bulk transforms over the mapping facade.
//!
//! Traversal is built on the engine's `first_key`/`next_key` cursor
//! primitives. The cursor position only ever moves to a strictly greater
//! key, so mutating the database mid-iteration cannot revisit a key or loop
//! forever: deleted keys are skipped, and keys inserted behind the position
//! are simply not seen.
//!
//! `replace`/`update` accept any container implementing [`EntrySource`], not
//! just `DenHash` itself.

use hashbrown::HashMap;

use crate::dbm::DenHash;
use crate::error::DbmResult;

/// Lazy iterator over (key, value) pairs in cursor order.
///
/// Each call to [`DenHash::pairs`] starts a fresh cursor from the beginning.
/// The iterator fuses after yielding an error or reaching the end.
pub struct Pairs<'a> {
    db: &'a DenHash,
    /// Last key handed to the caller; the next step resumes strictly after it
    position: Option<Vec<u8>>,
    done: bool,
}

impl<'a> Pairs<'a> {
    pub(crate) fn new(db: &'a DenHash) -> Self {
        Self { db, position: None, done: false }
    }
}

impl<'a> Iterator for Pairs<'a> {
    type Item = DbmResult<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let step = match &self.position {
                None => self.db.handle().first_key(),
                Some(key) => self.db.handle().next_key(key),
            };

            let key = match step {
                Ok(Some(key)) => key,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            self.position = Some(key.clone());

            match self.db.handle().get(&key) {
                Ok(Some(value)) => return Some(Ok((key, value))),
                // Deleted between cursor step and lookup; skip it
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Capability for containers whose (key, value) pairs can be merged into a
/// database via `replace`/`update`.
///
/// Implementations must visit every pair once and propagate the callback's
/// error immediately. A closed `DenHash` fails with `DbmError::Closed` even
/// when it holds no entries; implementors representing other containers may
/// signal incompatibility with `DbmError::InvalidArgument`.
pub trait EntrySource {
    /// Visit every (key, value) pair, stopping at the first error.
    fn try_for_each_pair(
        &self,
        f: &mut dyn FnMut(&[u8], &[u8]) -> DbmResult<()>,
    ) -> DbmResult<()>;
}

impl EntrySource for DenHash {
    fn try_for_each_pair(
        &self,
        f: &mut dyn FnMut(&[u8], &[u8]) -> DbmResult<()>,
    ) -> DbmResult<()> {
        for pair in self.pairs() {
            let (key, value) = pair?;
            f(&key, &value)?;
        }
        Ok(())
    }
}

impl EntrySource for HashMap<Vec<u8>, Vec<u8>> {
    fn try_for_each_pair(
        &self,
        f: &mut dyn FnMut(&[u8], &[u8]) -> DbmResult<()>,
    ) -> DbmResult<()> {
        for (key, value) in self {
            f(key, value)?;
        }
        Ok(())
    }
}

impl EntrySource for std::collections::BTreeMap<Vec<u8>, Vec<u8>> {
    fn try_for_each_pair(
        &self,
        f: &mut dyn FnMut(&[u8], &[u8]) -> DbmResult<()>,
    ) -> DbmResult<()> {
        for (key, value) in self {
            f(key, value)?;
        }
        Ok(())
    }
}

impl DenHash {
    /// Lazy, restartable traversal of all (key, value) pairs.
    pub fn pairs(&self) -> Pairs<'_> {
        Pairs::new(self)
    }

    /// Visit every (key, value) pair.
    pub fn each_pair(&self, mut f: impl FnMut(&[u8], &[u8])) -> DbmResult<()> {
        for pair in self.pairs() {
            let (key, value) = pair?;
            f(&key, &value);
        }
        Ok(())
    }

    /// Visit every key.
    pub fn each_key(&self, mut f: impl FnMut(&[u8])) -> DbmResult<()> {
        self.each_pair(|key, _| f(key))
    }

    /// Visit every value.
    pub fn each_value(&self, mut f: impl FnMut(&[u8])) -> DbmResult<()> {
        self.each_pair(|_, value| f(value))
    }

    /// Pairs for which the predicate holds, in cursor order. The store is
    /// not mutated.
    pub fn select(
        &self,
        mut pred: impl FnMut(&[u8], &[u8]) -> bool,
    ) -> DbmResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut selected = Vec::new();
        for pair in self.pairs() {
            let (key, value) = pair?;
            if pred(&key, &value) {
                selected.push((key, value));
            }
        }
        Ok(selected)
    }

    /// Brand-new in-memory mapping of every pair the predicate does NOT
    /// hold for. The persistent store is untouched; contrast `delete_if`.
    pub fn reject(
        &self,
        mut pred: impl FnMut(&[u8], &[u8]) -> bool,
    ) -> DbmResult<HashMap<Vec<u8>, Vec<u8>>> {
        let mut kept = HashMap::new();
        for pair in self.pairs() {
            let (key, value) = pair?;
            if !pred(&key, &value) {
                kept.insert(key, value);
            }
        }
        Ok(kept)
    }

    /// Remove every entry the predicate holds for, in place.
    pub fn delete_if(&self, mut pred: impl FnMut(&[u8], &[u8]) -> bool) -> DbmResult<()> {
        // Illegal on a Reader handle even when no entry matches
        self.handle().check_writable()?;
        let mut position = self.handle().first_key()?;
        while let Some(key) = position {
            if let Some(value) = self.handle().get(&key)? {
                if pred(&key, &value) {
                    self.handle().delete(&key)?;
                }
            }
            position = self.handle().next_key(&key)?;
        }
        Ok(())
    }

    /// Clear the receiver, then copy every pair from `other`.
    ///
    /// Postcondition on success: the receiver's entry set equals `other`'s.
    /// Not atomic: a failure mid-copy (e.g. `other` closed during iteration)
    /// leaves the receiver partially modified.
    pub fn replace<S: EntrySource + ?Sized>(&self, other: &S) -> DbmResult<()> {
        self.handle().check_writable()?;
        self.clear()?;
        other.try_for_each_pair(&mut |key, value| self.store(key, value))
    }

    /// Merge every pair from `other` into the receiver without clearing.
    /// On key collision the value from `other` wins. Not atomic mid-copy.
    pub fn update<S: EntrySource + ?Sized>(&self, other: &S) -> DbmResult<()> {
        // Checked up front: a closed or read-only receiver fails before
        // `other` is traversed, even when `other` is empty
        self.handle().check_writable()?;
        other.try_for_each_pair(&mut |key, value| self.store(key, value))
    }

    /// All pairs materialized in cursor traversal order.
    pub fn to_vec(&self) -> DbmResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.pairs().collect()
    }

    /// All pairs materialized as an in-memory mapping.
    pub fn to_map(&self) -> DbmResult<HashMap<Vec<u8>, Vec<u8>>> {
        self.pairs().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbmError;
    use crate::mode::OpenMode;
    use tempfile::TempDir;

    fn new_db() -> (DenHash, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = DenHash::open(dir.path().join("db.den"), 0o644, OpenMode::Newdb).unwrap();
        (db, dir)
    }

    fn empty_reader() -> (DenHash, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.den");
        DenHash::open(&path, 0o644, OpenMode::Newdb).unwrap().close().unwrap();
        let db = DenHash::open(&path, 0o644, OpenMode::Reader).unwrap();
        (db, dir)
    }

    fn seeded_db() -> (DenHash, TempDir) {
        let (db, dir) = new_db();
        db.store(b"key1", b"value1").unwrap();
        db.store(b"key2", b"value2").unwrap();
        db.store(b"key3", b"value3").unwrap();
        (db, dir)
    }

    #[test]
    fn test_pairs_cursor_order() {
        let (db, _dir) = seeded_db();
        let pairs: Vec<_> = db.pairs().map(|p| p.unwrap()).collect();
        assert_eq!(pairs, vec![
            (b"key1".to_vec(), b"value1".to_vec()),
            (b"key2".to_vec(), b"value2".to_vec()),
            (b"key3".to_vec(), b"value3".to_vec()),
        ]);
    }

    #[test]
    fn test_pairs_restartable() {
        let (db, _dir) = seeded_db();
        let first: Vec<_> = db.pairs().map(|p| p.unwrap()).collect();
        let second: Vec<_> = db.pairs().map(|p| p.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pairs_empty_db() {
        let (db, _dir) = new_db();
        assert_eq!(db.pairs().count(), 0);
    }

    #[test]
    fn test_mutation_during_iteration_is_safe() {
        let (db, _dir) = seeded_db();
        let mut visited = Vec::new();
        for pair in db.pairs() {
            let (key, _) = pair.unwrap();
            // Delete ahead of the cursor and insert behind it
            db.delete(b"key3").unwrap();
            db.store(b"aaa", b"behind").unwrap();
            visited.push(key);
        }
        // key3 was deleted before the cursor reached it; "aaa" sorts before
        // the position and is never visited; nothing is visited twice
        assert_eq!(visited, vec![b"key1".to_vec(), b"key2".to_vec()]);
    }

    #[test]
    fn test_iteration_after_close_yields_error_then_fuses() {
        let (db, _dir) = seeded_db();
        let mut iter = db.pairs();
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.0, b"key1".to_vec());

        db.close().unwrap();
        assert!(matches!(iter.next(), Some(Err(DbmError::Closed))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_each_pair_each_key_each_value() {
        let (db, _dir) = seeded_db();

        let mut pairs = 0;
        db.each_pair(|k, v| {
            assert!(k.starts_with(b"key"));
            assert!(v.starts_with(b"value"));
            pairs += 1;
        }).unwrap();
        assert_eq!(pairs, 3);

        let mut keys = Vec::new();
        db.each_key(|k| keys.push(k.to_vec())).unwrap();
        assert_eq!(keys, vec![b"key1".to_vec(), b"key2".to_vec(), b"key3".to_vec()]);

        let mut values = Vec::new();
        db.each_value(|v| values.push(v.to_vec())).unwrap();
        assert_eq!(values, vec![b"value1".to_vec(), b"value2".to_vec(), b"value3".to_vec()]);
    }

    #[test]
    fn test_select() {
        let (db, _dir) = seeded_db();
        let selected = db.select(|key, _| key == b"key1").unwrap();
        assert_eq!(selected, vec![(b"key1".to_vec(), b"value1".to_vec())]);
        // Store untouched
        assert_eq!(db.len().unwrap(), 3);
    }

    #[test]
    fn test_reject_returns_fresh_map() {
        let (db, _dir) = seeded_db();
        let kept = db.reject(|key, _| key == b"key1").unwrap();

        assert!(!kept.contains_key(b"key1".as_slice()));
        assert!(kept.contains_key(b"key2".as_slice()));
        assert!(kept.contains_key(b"key3".as_slice()));
        // Persistent store untouched
        assert!(db.contains_key(b"key1").unwrap());
    }

    #[test]
    fn test_delete_if_mutates_in_place() {
        let (db, _dir) = seeded_db();
        db.delete_if(|key, _| key == b"key1").unwrap();

        assert_eq!(db.len().unwrap(), 2);
        assert_eq!(db.get(b"key1").unwrap(), None);
        assert_eq!(db.get(b"key2").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_delete_if_by_value() {
        let (db, _dir) = seeded_db();
        db.delete_if(|_, value| value != b"value2").unwrap();
        assert_eq!(db.keys().unwrap(), vec![b"key2".to_vec()]);
    }

    #[test]
    fn test_reader_delete_if_rejected_even_without_matches() {
        let (db, _dir) = empty_reader();
        assert!(matches!(db.delete_if(|_, _| true), Err(DbmError::ReadOnly)));
    }

    #[test]
    fn test_reader_bulk_ops_rejected_even_from_empty_source() {
        let (db, _dir) = empty_reader();
        let source: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
        assert!(matches!(db.update(&source), Err(DbmError::ReadOnly)));
        assert!(matches!(db.replace(&source), Err(DbmError::ReadOnly)));
    }

    #[test]
    fn test_replace_from_other_db() {
        let (db, _dir) = seeded_db();
        let (other, _other_dir) = new_db();
        other.store(b"other_key1", b"other_value1").unwrap();
        other.store(b"other_key2", b"other_value2").unwrap();

        db.replace(&other).unwrap();

        assert!(!db.contains_key(b"key1").unwrap());
        assert!(!db.contains_key(b"key2").unwrap());
        assert!(!db.contains_key(b"key3").unwrap());
        assert!(db.contains_key(b"other_key1").unwrap());
        assert!(db.contains_key(b"other_key2").unwrap());
        assert_eq!(db.len().unwrap(), other.len().unwrap());
    }

    #[test]
    fn test_replace_from_in_memory_map() {
        let (db, _dir) = seeded_db();
        let mut source = HashMap::new();
        source.insert(b"m1".to_vec(), b"v1".to_vec());

        db.replace(&source).unwrap();
        assert_eq!(db.len().unwrap(), 1);
        assert_eq!(db.get(b"m1").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn test_replace_fails_when_other_closed() {
        let (db, _dir) = seeded_db();
        let (other, _other_dir) = new_db();
        other.close().unwrap();

        assert!(matches!(db.replace(&other), Err(DbmError::Closed)));
    }

    #[test]
    fn test_update_merges_other_wins() {
        let (db, _dir) = seeded_db();
        let (other, _other_dir) = new_db();
        other.store(b"key1", b"other_value1").unwrap();
        other.store(b"other_key2", b"other_value2").unwrap();

        db.update(&other).unwrap();

        // Collision: other wins
        assert_eq!(db.get(b"key1").unwrap(), Some(b"other_value1".to_vec()));
        // Keys unique to receiver keep their values
        assert_eq!(db.get(b"key2").unwrap(), Some(b"value2".to_vec()));
        assert_eq!(db.get(b"key3").unwrap(), Some(b"value3".to_vec()));
        // Keys unique to other are added
        assert_eq!(db.get(b"other_key2").unwrap(), Some(b"other_value2".to_vec()));
    }

    #[test]
    fn test_update_fails_when_receiver_closed() {
        let (db, _dir) = new_db();
        let (other, _other_dir) = seeded_db();
        db.close().unwrap();

        assert!(matches!(db.update(&other), Err(DbmError::Closed)));
    }

    #[test]
    fn test_to_vec_cursor_order() {
        let (db, _dir) = seeded_db();
        let entries = db.to_vec().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, b"key1".to_vec());
        assert_eq!(entries[2].0, b"key3".to_vec());
    }

    #[test]
    fn test_to_map_roundtrips_gets() {
        let (db, _dir) = seeded_db();
        let map = db.to_map().unwrap();
        assert_eq!(map.len(), db.len().unwrap());
        for (key, value) in &map {
            assert_eq!(db.get(key).unwrap(), Some(value.clone()));
        }
    }
}
