//! Error types for layered configuration operations.
//!
//! Every fallible operation in the crate returns [`ApiError`], so callers have
//! one failure surface to render regardless of where the failure started.

use std::path::PathBuf;
use thiserror::Error;

/// Classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upward path search produced the same candidate twice.
    Discovery,
    /// A layer file (or downloaded document) is not valid JSON.
    Parse,
    /// A mutation broke a structural rule.
    Validation,
    /// Persisting a layer or pushing a secure value failed.
    Write,
    /// A state that cannot occur unless the crate itself is wrong.
    Internal,
    /// Environment or logging setup failed.
    Setup,
}

/// Uniform error envelope for the configuration engine.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("internal search error: candidate repeated ({0})")]
    Discovery(PathBuf),

    #[error("error reading config file: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error reading config file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("error writing \"{path}\": {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error writing \"{path}\": failed to save secure value {property}: {source}")]
    SecureSave {
        path: PathBuf,
        property: String,
        #[source]
        source: Box<ApiError>,
    },

    #[error("vault error: {0}")]
    Vault(String),

    #[error("unable to download config from {url}: {message}")]
    Download { url: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Discovery(_) => ErrorKind::Discovery,
            ApiError::Parse { .. } | ApiError::Read { .. } | ApiError::Download { .. } => {
                ErrorKind::Parse
            }
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Write { .. } | ApiError::SecureSave { .. } | ApiError::Vault(_) => {
                ErrorKind::Write
            }
            ApiError::Internal(_) => ErrorKind::Internal,
            ApiError::ConfigError(_) => ErrorKind::Setup,
        }
    }
}
