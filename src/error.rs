//! Error taxonomy for the search-engine gateway.
//!
//! Remote failures fall into two classes: transient ones (the engine is
//! temporarily unavailable) that the retry machinery in [`crate::retry`]
//! may re-attempt, and permanent ones (bad request, missing object) that
//! propagate immediately. [`GatewayError::is_transient`] is the single
//! place that classification lives.

use thiserror::Error;

/// Errors produced by gateway operations against the search engine.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The collection or document does not exist (engine returned 404).
    #[error("{0} not found")]
    NotFound(String),

    /// The engine is unreachable or reported itself unavailable (503,
    /// connection refused, request timeout).
    #[error("search engine unavailable: {0}")]
    Unavailable(String),

    /// The engine returned a non-success status outside the cases above.
    #[error("search engine returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// A document failed local validation before it reached the engine.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The retry deadline elapsed; wraps the last transient error seen.
    #[error("deadline of {deadline_ms} ms exceeded: {source}")]
    DeadlineExceeded {
        deadline_ms: u64,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Whether the retry loop may re-attempt the operation.
    ///
    /// 429 and 5xx follow the same split used for the other remote APIs
    /// this crate talks to: rate limits and server errors retry, other
    /// client errors fail fast.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Unavailable(_) => true,
            GatewayError::Remote { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures (refused connection, DNS, timeout) are
        // indistinguishable from the engine being down.
        GatewayError::Unavailable(err.to_string())
    }
}
