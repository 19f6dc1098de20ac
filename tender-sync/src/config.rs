//! Configuration surface, enumerated in full per the external interfaces
//! section: every field has a documented default, mirroring the defaults
//! the original Python `sync.py` module-level constants carried.

use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_HOST: &str = "https://lb.api-sandbox.openprocurement.org/";
pub const DEFAULT_API_VERSION: &str = "2.3";
pub const DEFAULT_RESOURCE: &str = "tenders";

/// Sleep/queue tuning for the two retrievers (§3 RetrieverParams).
///
/// `down_requests_sleep`/`up_requests_sleep`/`up_wait_sleep`/`up_wait_sleep_min`
/// are kept as [`Duration`] rather than bare seconds so tests can shrink them
/// without unit confusion.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverParams {
    pub down_requests_sleep: Duration,
    pub up_requests_sleep: Duration,
    pub up_wait_sleep: Duration,
    pub up_wait_sleep_min: Duration,
    pub up_wait_sleep_max: Duration,
    pub queue_size: usize,
    pub adaptive: bool,
}

impl Default for RetrieverParams {
    fn default() -> Self {
        Self {
            down_requests_sleep: Duration::from_secs(5),
            up_requests_sleep: Duration::from_secs(1),
            up_wait_sleep: Duration::from_secs(30),
            up_wait_sleep_min: Duration::from_secs(5),
            up_wait_sleep_max: Duration::from_secs(30),
            queue_size: 101,
            adaptive: false,
        }
    }
}

impl RetrieverParams {
    /// Adjust `up_wait_sleep` by one second, bounded to
    /// `[up_wait_sleep_min, up_wait_sleep_max]` (P6). Decreases when the
    /// last poll returned items, increases when it was empty. No-op unless
    /// `adaptive` is set.
    pub fn adapt(&mut self, last_poll_had_items: bool) {
        if !self.adaptive {
            return;
        }
        let one_sec = Duration::from_secs(1);
        if last_poll_had_items {
            if self.up_wait_sleep > self.up_wait_sleep_min {
                self.up_wait_sleep -= one_sec;
            }
        } else if self.up_wait_sleep < self.up_wait_sleep_max {
            self.up_wait_sleep += one_sec;
        }
    }
}

/// Top-level configuration (§6).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub host: Url,
    pub version: String,
    pub key: String,
    pub resource: String,
    pub extra_params: BTreeMap<String, String>,
    pub retriever_params: RetrieverParams,
    /// Forwarded verbatim to whatever [`crate::metrics::MetricsSink`] is
    /// configured; the sink itself is out of scope for the core (§1).
    pub metric_args: BTreeMap<String, String>,
    /// Per-request timeout; recommended <= 60s by §5, default matches that.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let mut extra_params = BTreeMap::new();
        extra_params.insert("opt_fields".to_string(), "status".to_string());
        extra_params.insert("mode".to_string(), "_all_".to_string());

        Self {
            host: Url::parse(DEFAULT_API_HOST).expect("default host is a valid URL"),
            version: DEFAULT_API_VERSION.to_string(),
            key: String::new(),
            resource: DEFAULT_RESOURCE.to_string(),
            extra_params,
            retriever_params: RetrieverParams::default(),
            metric_args: BTreeMap::new(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: Url) -> Self {
        self.host = host;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.retriever_params.adaptive = adaptive;
        self
    }

    pub fn retriever_params(mut self, params: RetrieverParams) -> Self {
        self.retriever_params = params;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The feed endpoint for this configuration: `{host}/api/{version}/{resource}`.
    pub fn endpoint(&self) -> Url {
        let mut url = self.host.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("host is not a cannot-be-a-base URL");
            segments.push("api");
            segments.push(&self.version);
            segments.push(&self.resource);
        }
        url
    }
}

/// The `TZ` environment variable names the time zone used to label
/// `last_response` timestamps; no IANA time zone database crate is
/// available in this dependency graph, so this only ever returns the name
/// — timestamps themselves stay in UTC.
pub fn configured_tz_name() -> String {
    std::env::var("TZ").unwrap_or_else(|_| "Europe/Kiev".to_string())
}
