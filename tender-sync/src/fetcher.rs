//! Fetching remote resources.
//!
//! [`Fetcher`] performs exactly one request against the changes feed and
//! translates the transport/HTTP outcome into a [`FetchOutcome`] — a tagged
//! sum rather than an exception. It does no retrying; that is
//! [`crate::retry::get_page`]'s job.

use crate::config::SyncConfig;
use crate::session::Session;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// An item is an opaque JSON record; the domain schema is out of scope
/// (§1) and the core never inspects it beyond passing it through.
pub type Item = serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct PageCursor {
    pub offset: String,
}

/// The result of one feed request (§3 Page).
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(rename = "data", default)]
    pub items: Vec<Item>,
    pub next_page: PageCursor,
    #[serde(default)]
    pub prev_page: Option<PageCursor>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Query parameters for one feed request (§3 FetchParams). `feed` is
/// always `"changes"` per the data model; `extra` is caller-supplied and
/// merged verbatim.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub offset: Option<String>,
    pub descending: bool,
    pub extra: BTreeMap<String, String>,
}

impl FetchParams {
    pub fn backward(extra: BTreeMap<String, String>) -> Self {
        Self {
            offset: None,
            descending: true,
            extra,
        }
    }

    pub fn forward(extra: BTreeMap<String, String>) -> Self {
        Self {
            offset: None,
            descending: false,
            extra,
        }
    }

    fn as_query(&self, key: &str) -> Vec<(String, String)> {
        let mut query = vec![("feed".to_string(), "changes".to_string())];
        if self.descending {
            query.push(("descending".to_string(), "1".to_string()));
        }
        if let Some(offset) = &self.offset {
            query.push(("offset".to_string(), offset.clone()));
        }
        if !key.is_empty() {
            query.push(("key".to_string(), key.to_string()));
        }
        for (k, v) in &self.extra {
            query.push((k.clone(), v.clone()));
        }
        query
    }
}

/// One attempt's outcome.
#[derive(Debug)]
pub enum FetchOutcome {
    Ok(Page),
    PreconditionFailed,
    ResourceNotFound,
    RateLimited,
    RequestFailed(StatusCode),
    ConnectionError,
    Other(anyhow::Error),
}

/// Performs one page request. Holds its own `reqwest::Client`, wired at
/// construction time to a [`Session`]'s cookie store so every request made
/// through this Fetcher automatically carries and updates the sticky
/// cookies.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    endpoint: Url,
    key: String,
}

impl Fetcher {
    pub fn new(config: &SyncConfig, session: &Session) -> anyhow::Result<Self> {
        Self::with_timeout(config, session, config.request_timeout)
    }

    pub fn with_timeout(
        config: &SyncConfig,
        session: &Session,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .cookie_provider(session.cookie_provider())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            key: config.key.clone(),
        })
    }

    /// Perform one GET request against the changes feed.
    pub async fn fetch(&self, params: &FetchParams) -> FetchOutcome {
        let query = params.as_query(&self.key);

        let response = match self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_connect() || err.is_timeout() => {
                return FetchOutcome::ConnectionError;
            }
            Err(err) => return FetchOutcome::Other(err.into()),
        };

        match response.status() {
            StatusCode::OK => match response.json::<Page>().await {
                Ok(page) => FetchOutcome::Ok(page),
                Err(err) => FetchOutcome::Other(err.into()),
            },
            StatusCode::PRECONDITION_FAILED => FetchOutcome::PreconditionFailed,
            StatusCode::NOT_FOUND => FetchOutcome::ResourceNotFound,
            StatusCode::TOO_MANY_REQUESTS => FetchOutcome::RateLimited,
            other => FetchOutcome::RequestFailed(other),
        }
    }
}
