//! CLI argument groups for the `tender-sync-cli` binary, mirroring the
//! teacher's `walker-common::cli::client::ClientArguments` shape: typed
//! `clap::Parser` structs that convert into the library's own config
//! types, kept behind the `cli` feature so the core library does not force
//! a `clap` dependency on embedders (§1: CLI wrapping is out of scope for
//! the core).

use crate::config::{RetrieverParams, SyncConfig};
use std::time::Duration;
use url::Url;

#[derive(Debug, clap::Parser)]
#[command(next_help_heading = "Feed")]
pub struct FeedArguments {
    /// Base URL of the tender-registry API.
    #[arg(long, default_value = "https://lb.api-sandbox.openprocurement.org/")]
    pub host: Url,

    /// API version path segment.
    #[arg(long, default_value = "2.3")]
    pub version: String,

    /// Broker access key.
    #[arg(long, env = "TENDER_SYNC_KEY", default_value = "")]
    pub key: String,

    /// Resource name (e.g. `tenders`).
    #[arg(long, default_value = "tenders")]
    pub resource: String,

    /// Per-request HTTP timeout.
    #[arg(long, default_value = "60s")]
    pub timeout: humantime::Duration,
}

#[derive(Debug, clap::Parser)]
#[command(next_help_heading = "Retrieval")]
pub struct RetrievalArguments {
    /// Gap between backward (history) pages.
    #[arg(long, default_value = "5s")]
    pub down_requests_sleep: humantime::Duration,

    /// Gap between non-empty forward (tail) pages.
    #[arg(long, default_value = "1s")]
    pub up_requests_sleep: humantime::Duration,

    /// Gap after an empty forward poll.
    #[arg(long, default_value = "30s")]
    pub up_wait_sleep: humantime::Duration,

    /// Adaptive floor for `up-wait-sleep`.
    #[arg(long, default_value = "5s")]
    pub up_wait_sleep_min: humantime::Duration,

    /// Bounded queue capacity.
    #[arg(long, default_value_t = 101)]
    pub queue_size: usize,

    /// Shrink `up-wait-sleep` towards the floor when polls return items,
    /// grow it back towards 30s when they don't.
    #[arg(long)]
    pub adaptive: bool,
}

impl From<RetrievalArguments> for RetrieverParams {
    fn from(value: RetrievalArguments) -> Self {
        RetrieverParams {
            down_requests_sleep: value.down_requests_sleep.into(),
            up_requests_sleep: value.up_requests_sleep.into(),
            up_wait_sleep: value.up_wait_sleep.into(),
            up_wait_sleep_min: value.up_wait_sleep_min.into(),
            up_wait_sleep_max: Duration::from_secs(30),
            queue_size: value.queue_size,
            adaptive: value.adaptive,
        }
    }
}

impl FeedArguments {
    pub fn into_config(self, retrieval: RetrievalArguments) -> SyncConfig {
        let timeout: Duration = self.timeout.into();
        SyncConfig::new()
            .host(self.host)
            .version(self.version)
            .key(self.key)
            .resource(self.resource)
            .retriever_params(retrieval.into())
            .request_timeout(timeout)
    }
}
