//! Error types for page, search, and cover fetches.

use thiserror::Error;

/// Errors that can occur while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered 404 Not Found.
    #[error("not found: {url}")]
    NotFound {
        /// The URL that was not found.
        url: String,
    },

    /// Request did not complete within its timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level failure (DNS, connection refused, TLS, body read).
    #[error("network error fetching {url}: {reason}")]
    Transport {
        /// The URL that failed.
        url: String,
        /// Description of the underlying failure.
        reason: String,
    },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The abort signal fired while the fetch was pending.
    #[error("fetch cancelled: {url}")]
    Cancelled {
        /// The URL whose fetch was abandoned.
        url: String,
    },
}

impl FetchError {
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error; 404 maps to [`FetchError::NotFound`].
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        if status == 404 {
            return Self::not_found(url);
        }
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Classifies this error for logging and worker bookkeeping.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::HttpStatus { .. } | Self::Transport { .. } | Self::InvalidUrl { .. } => {
                FailureKind::Transport
            }
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

/// Coarse classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 404 or a literal not-found marker in the body.
    NotFound,
    /// Socket-level timeout.
    Timeout,
    /// Any other transport or status failure.
    Transport,
    /// Abandoned because the abort signal fired.
    Cancelled,
}
