//! Access modes for opening a database.

use denhash_core::OpenFlags;

/// How a database file is opened, and which operations the handle permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// File must exist; only read operations permitted
    Reader,
    /// File must exist; read and write operations permitted
    Writer,
    /// Open existing for read/write, or create empty if absent
    Wrcreat,
    /// Truncate/create empty for read/write, discarding prior contents
    Newdb,
}

impl OpenMode {
    /// Whether the file must already exist at open time.
    pub fn requires_existing(self) -> bool {
        matches!(self, OpenMode::Reader | OpenMode::Writer)
    }

    /// Whether opening discards prior contents.
    pub fn truncates(self) -> bool {
        matches!(self, OpenMode::Newdb)
    }

    /// Whether the handle permits mutation.
    pub fn writable(self) -> bool {
        !matches!(self, OpenMode::Reader)
    }

    /// Lower the mode to engine open flags.
    pub(crate) fn open_flags(self) -> OpenFlags {
        OpenFlags {
            create: !self.requires_existing(),
            truncate: self.truncates(),
            read_only: !self.writable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existence_preconditions() {
        assert!(OpenMode::Reader.requires_existing());
        assert!(OpenMode::Writer.requires_existing());
        assert!(!OpenMode::Wrcreat.requires_existing());
        assert!(!OpenMode::Newdb.requires_existing());
    }

    #[test]
    fn test_only_newdb_truncates() {
        assert!(OpenMode::Newdb.truncates());
        assert!(!OpenMode::Wrcreat.truncates());
        assert!(!OpenMode::Writer.truncates());
        assert!(!OpenMode::Reader.truncates());
    }

    #[test]
    fn test_only_reader_is_read_only() {
        assert!(!OpenMode::Reader.writable());
        assert!(OpenMode::Writer.writable());
        assert!(OpenMode::Wrcreat.writable());
        assert!(OpenMode::Newdb.writable());
    }
}
