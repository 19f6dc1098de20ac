//! Shared error taxonomy above the [`crate::fetcher::FetchOutcome`] boundary.

use std::time::Duration;

/// Escapes [`crate::retry::get_page`] when a failure kind exceeds its backoff cap.
///
/// None of these are meant to reach the caller of the synchronizer: the
/// [`crate::supervisor::Supervisor`] catches all of them and restarts the
/// retriever pair instead.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("rate limited beyond the {cap:?} backoff cap (waited {waited:?})")]
    RateLimitExceeded { cap: Duration, waited: Duration },

    #[error("connection errors exceeded the {cap:?} backoff cap")]
    ConnectionExceeded { cap: Duration },

    #[error("request failed with status {0}, treated as fatal")]
    RequestFailed(reqwest::StatusCode),

    #[error("unclassified errors exceeded the {cap:?} backoff cap: {source}")]
    Exhausted {
        cap: Duration,
        #[source]
        source: anyhow::Error,
    },
}

/// Escapes a retriever loop: either a [`RetryError`] that bubbled up, or the
/// sticky-session invariant (I2) being violated.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverFault {
    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("LB server mismatch: session cookies diverged between retrievers")]
    SessionMismatch,

    #[error("queue consumer was dropped")]
    QueueClosed,
}
