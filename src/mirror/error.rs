//! Fetch failure taxonomy.

use std::io;
use std::sync::Arc;

use axum::http::StatusCode;

use super::path::PathError;

/// Why a resource could not be made available locally.
///
/// `Clone` so a single fetch result can be handed to every caller waiting on
/// the same logical path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("upstream has no such resource")]
    NotFound,

    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("upstream body ended after {received} of {expected} bytes")]
    Incomplete { expected: u64, received: u64 },

    #[error("upstream transport failure: {0}")]
    Transport(Arc<reqwest::Error>),

    #[error("filesystem failure: {0}")]
    Filesystem(Arc<io::Error>),

    #[error("fetch task ended without a result")]
    Interrupted,
}

impl FetchError {
    /// Status code the client receives for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FetchError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            FetchError::NotFound => StatusCode::NOT_FOUND,
            FetchError::UpstreamStatus(_)
            | FetchError::Incomplete { .. }
            | FetchError::Transport(_)
            | FetchError::Filesystem(_)
            | FetchError::Interrupted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidPath(_) => "invalid_path",
            FetchError::NotFound => "not_found",
            FetchError::UpstreamStatus(_) => "upstream_status",
            FetchError::Incomplete { .. } => "incomplete",
            FetchError::Transport(_) => "transport",
            FetchError::Filesystem(_) => "filesystem",
            FetchError::Interrupted => "interrupted",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(Arc::new(e))
    }
}

impl From<io::Error> for FetchError {
    fn from(e: io::Error) -> Self {
        FetchError::Filesystem(Arc::new(e))
    }
}
