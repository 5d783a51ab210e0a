//! Error types shared across the conversion engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reconciling a vault with its site tree.
#[derive(Debug, Error)]
pub enum KilncastError {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A document could not be converted. Aborts the run.
    #[error("Conversion of '{}' failed: {reason}", .source_path.display())]
    Conversion {
        /// Vault-relative path of the failing document.
        source_path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// Filesystem operation failed.
    #[error("IO error at '{}': {source}", .path.display())]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger or asset registry could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl KilncastError {
    /// Wraps an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a conversion error for a source document.
    pub fn conversion(source_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for KilncastError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Result alias used throughout the engine.
pub type KilncastResult<T> = Result<T, KilncastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_names_the_source() {
        let err = KilncastError::conversion("docs/broken.md", "nested callout");
        let msg = err.to_string();
        assert!(msg.contains("docs/broken.md"));
        assert!(msg.contains("nested callout"));
    }

    #[test]
    fn io_error_carries_the_path() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = KilncastError::io("site/docs/a.md", inner);
        assert!(err.to_string().contains("site/docs/a.md"));
    }
}
