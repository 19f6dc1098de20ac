//! The two cooperating state machines that walk the changes feed (§4.3,
//! §4.4).

pub mod backward;
pub mod forward;

pub use backward::{BackwardOutcome, BackwardRetriever};
pub use forward::ForwardRetriever;

use time::OffsetDateTime;

/// Observable retriever status (§3). `None`/absent means "not started";
/// modeled here as [`RetrieverStatus::Initialized`] being the constructed
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieverStatus {
    Initialized,
    ProcessRequest,
    ProcessData,
    Sleep,
    Finished,
    Broken,
}

/// Per-retriever observable state (§3), shared via `Arc<parking_lot::Mutex<_>>`
/// with the metrics pump and, potentially, operator tooling.
#[derive(Debug, Clone)]
pub struct RetrieverInfo {
    pub status: RetrieverStatus,
    pub last_response_time: Option<OffsetDateTime>,
}

impl Default for RetrieverInfo {
    fn default() -> Self {
        Self {
            status: RetrieverStatus::Initialized,
            last_response_time: None,
        }
    }
}

impl RetrieverInfo {
    /// Reset to a fresh generation's starting state, keeping the same
    /// `Arc` handle alive across `restart_sync` (§4.6).
    pub fn reset(&mut self) {
        self.status = RetrieverStatus::Initialized;
        self.last_response_time = None;
    }

    pub fn mark_response(&mut self) {
        self.last_response_time = Some(OffsetDateTime::now_utc());
    }
}
