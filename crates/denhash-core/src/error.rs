//! Error types for DenHash engine operations
//!
//! All engine errors are represented by the DenError enum, which provides
//! detailed context for debugging and recovery.

use std::fmt;
use std::error::Error;
use std::path::PathBuf;

/// Engine error types with detailed context
#[derive(Debug, Clone)]
pub enum DenError {
    /// I/O operation failed
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Record log is corrupted and cannot be recovered
    LogCorrupted {
        /// Path to the corrupted database file
        path: PathBuf,
        /// Byte offset where corruption was detected
        offset: u64,
        /// Description of the corruption
        reason: String,
    },

    /// Checksum verification failed
    ChecksumMismatch {
        /// File where checksum failed
        path: PathBuf,
        /// Expected checksum value
        expected: u32,
        /// Actual checksum computed
        actual: u32,
        /// Byte offset of the corrupted record
        offset: u64,
    },

    /// Torn write detected (partial record at end of file)
    TornWrite {
        /// File with torn write
        path: PathBuf,
        /// Expected record size
        expected_size: u32,
        /// Actual bytes available
        available_bytes: u64,
        /// Offset where torn write begins
        offset: u64,
    },

    /// Key or value size exceeds maximum allowed
    OversizedEntry {
        /// Size of the oversized component
        entry_size: u64,
        /// Maximum allowed size
        max_size: u64,
        /// Whether it's the key or value that's oversized
        component: String,
    },

    /// Magic bytes not found at expected location
    NoMagicFound {
        /// File being read
        path: PathBuf,
        /// Offset where magic was expected
        offset: u64,
        /// Bytes actually found
        found_bytes: [u8; 4],
    },

    /// Mutation attempted on an engine opened read-only
    ReadOnly {
        /// Path of the read-only database file
        path: PathBuf,
    },
}

impl fmt::Display for DenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenError::Io { path, kind, message } => {
                if let Some(path) = path {
                    write!(f, "I/O error in {}: {} ({})", path.display(), message, kind)
                } else {
                    write!(f, "I/O error: {} ({})", message, kind)
                }
            }

            DenError::LogCorrupted { path, offset, reason } => {
                write!(f, "Record log corrupted in {} at offset {}: {}", path.display(), offset, reason)
            }

            DenError::ChecksumMismatch { path, expected, actual, offset } => {
                write!(f, "Checksum mismatch in {} at offset {}: expected 0x{:08x}, got 0x{:08x}",
                       path.display(), offset, expected, actual)
            }

            DenError::TornWrite { path, expected_size, available_bytes, offset } => {
                write!(f, "Torn write in {} at offset {}: expected {} bytes, only {} available",
                       path.display(), offset, expected_size, available_bytes)
            }

            DenError::OversizedEntry { entry_size, max_size, component } => {
                write!(f, "Entry {} too large: {} bytes exceeds limit of {} bytes",
                       component, entry_size, max_size)
            }

            DenError::NoMagicFound { path, offset, found_bytes } => {
                write!(f, "Magic bytes not found in {} at offset {}: found {:02x}{:02x}{:02x}{:02x}",
                       path.display(), offset, found_bytes[0], found_bytes[1], found_bytes[2], found_bytes[3])
            }

            DenError::ReadOnly { path } => {
                write!(f, "Database {} is opened read-only", path.display())
            }
        }
    }
}

impl Error for DenError {}

/// Convert std::io::Error to DenError::Io
impl From<std::io::Error> for DenError {
    fn from(err: std::io::Error) -> Self {
        DenError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for engine operations
pub type DenResult<T> = Result<T, DenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DenError::ChecksumMismatch {
            path: PathBuf::from("/tmp/test.den"),
            expected: 0x12345678,
            actual: 0x87654321,
            offset: 1024,
        };

        let display = format!("{}", err);
        assert!(display.contains("Checksum mismatch"));
        assert!(display.contains("0x12345678"));
        assert!(display.contains("0x87654321"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let den_err: DenError = io_err.into();

        match den_err {
            DenError::Io { kind, .. } => assert_eq!(kind, std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_read_only_display() {
        let err = DenError::ReadOnly { path: PathBuf::from("/tmp/ro.den") };
        assert!(format!("{}", err).contains("read-only"));
    }
}
