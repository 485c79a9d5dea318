//! Error types for the DBM facade
//!
//! Key-not-found is never an error here: lookups return `Ok(None)`. Hard
//! errors are reserved for handle-state violations, construction failures,
//! argument-type violations, and engine faults.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use denhash_core::DenError;

/// Facade error types
#[derive(Debug)]
pub enum DbmError {
    /// Operation invoked after the handle was closed (including a second close)
    Closed,

    /// Opening the database failed during construction
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// Engine-level cause
        source: DenError,
    },

    /// `replace`/`update` called with an incompatible merge source
    InvalidArgument(String),

    /// Mutation attempted through a handle opened in Reader mode
    ReadOnly,

    /// Engine failure surfaced through a facade operation
    Engine(DenError),
}

impl fmt::Display for DbmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbmError::Closed => {
                write!(f, "Database handle is closed")
            }

            DbmError::Open { path, source } => {
                write!(f, "Failed to open database {}: {}", path.display(), source)
            }

            DbmError::InvalidArgument(reason) => {
                write!(f, "Invalid argument: {}", reason)
            }

            DbmError::ReadOnly => {
                write!(f, "Database handle is opened read-only")
            }

            DbmError::Engine(source) => {
                write!(f, "Engine error: {}", source)
            }
        }
    }
}

impl Error for DbmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbmError::Open { source, .. } | DbmError::Engine(source) => Some(source),
            _ => None,
        }
    }
}

/// Engine errors surfacing mid-operation wrap as `Engine`; `open` maps its
/// own failures to `Open` explicitly.
impl From<DenError> for DbmError {
    fn from(err: DenError) -> Self {
        match err {
            DenError::ReadOnly { .. } => DbmError::ReadOnly,
            other => DbmError::Engine(other),
        }
    }
}

/// Result type alias for facade operations
pub type DbmResult<T> = Result<T, DbmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_display() {
        assert!(format!("{}", DbmError::Closed).contains("closed"));
    }

    #[test]
    fn test_open_carries_source() {
        let err = DbmError::Open {
            path: PathBuf::from("/tmp/missing.den"),
            source: DenError::Io {
                path: Some(PathBuf::from("/tmp/missing.den")),
                kind: std::io::ErrorKind::NotFound,
                message: "file not found".to_string(),
            },
        };
        assert!(err.source().is_some());
        assert!(format!("{}", err).contains("/tmp/missing.den"));
    }

    #[test]
    fn test_engine_read_only_maps_to_read_only() {
        let err: DbmError = DenError::ReadOnly { path: PathBuf::from("/tmp/ro.den") }.into();
        assert!(matches!(err, DbmError::ReadOnly));
    }
}
