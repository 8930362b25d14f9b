//! Unified error types for shellcache.
//!
//! Every message starts with a stable code so hosts can match on the text
//! as well as on the variant.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, the transport and the worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed or uses a scheme the transport cannot reach.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The fetch was rejected before any response arrived (offline, DNS, connect, timeout).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A response arrived but was not usable (non-OK status where one was required).
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Storage(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be encoded or decoded.
    #[error("CACHE_ERROR: serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced partition does not exist.
    #[error("CACHE_ERROR: unknown partition {0}")]
    UnknownPartition(String),

    /// The network failed and nothing was cached for the request.
    #[error("NO_CACHE: network error and no cache for {0}")]
    NoCache(String),

    /// A manifest asset could not be precached.
    #[error("INSTALL_FAILED: {path}: {reason}")]
    InstallFailed { path: String, reason: String },

    /// A lifecycle checkpoint was invoked out of order.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// A background cache write panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Stable code prefix for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK_ERROR",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::Storage(_)
            | Error::MigrationFailed(_)
            | Error::Serialization(_)
            | Error::UnknownPartition(_) => "CACHE_ERROR",
            Error::NoCache(_) => "NO_CACHE",
            Error::InstallFailed { .. } => "INSTALL_FAILED",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::TaskFailed(_) => "TASK_FAILED",
        }
    }

    /// Whether this error means the network could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}
