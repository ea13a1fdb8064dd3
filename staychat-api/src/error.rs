//! Error taxonomy for backend calls.

/// Errors that can occur when talking to the marketplace backend.
///
/// Periodic operations (poll, status refresh) swallow these and retry on
/// the next cycle; one-shot user-triggered operations surface them
/// individually.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never completed (connect failure, timeout, etc.).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an unexpected HTTP status and no
    /// well-formed rejection body. Authentication failures that survive
    /// the fallback retry land here too.
    #[error("unexpected status {code}")]
    Status {
        /// The HTTP status code received.
        code: u16,
    },

    /// The backend rejected the operation with a structured reason
    /// (rate limiting, moderation, blocked pair, etc.).
    #[error("rejected by server: {reason}")]
    Rejected {
        /// The server-provided reason.
        reason: String,
    },

    /// The response body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A request URL could not be constructed.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether this error is in the transient "network" category that
    /// periodic operations retry silently.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Malformed(_)
        )
    }
}
