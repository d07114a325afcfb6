//! Error types shared across cropcut crates.

use std::path::PathBuf;

/// Top-level error type for cropcut operations.
#[derive(Debug, thiserror::Error)]
pub enum CropcutError {
    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Encoding engine error: {message}")]
    Engine { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CropcutError.
pub type CropcutResult<T> = Result<T, CropcutError>;

impl CropcutError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CropcutError::probe("no video stream").to_string(),
            "Probe error: no video stream"
        );
        assert_eq!(
            CropcutError::timeout("ffprobe", 30).to_string(),
            "ffprobe timed out after 30s"
        );
        assert_eq!(
            CropcutError::ExportInProgress.to_string(),
            "An export is already in progress"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: CropcutError = std::io::Error::other("disk full").into();
        assert!(matches!(err, CropcutError::Io(_)));
    }
}
