//! Wraps [`Fetcher`] with a failure-kind-specific backoff/sleep/reset
//! policy, returning a [`Page`] or a fatal [`RetryError`].

use crate::error::RetryError;
use crate::fetcher::{FetchOutcome, FetchParams, Fetcher, Page};
use crate::metrics::MetricsSink;
use crate::session::Session;
use std::time::Duration;
use tokio::time::sleep;

/// Which retriever is calling, used only to namespace metric names
/// (`{direction}_process_request`, `{direction}_success_requests`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Backward => "backward",
            Direction::Forward => "forward",
        }
    }
}

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const CONNECTION_ERROR_CAP: Duration = Duration::from_secs(300);
const RATE_LIMIT_CAP: Duration = Duration::from_secs(120);
const OTHER_CAP: Duration = Duration::from_secs(300);

/// Invoke [`Fetcher::fetch`] repeatedly until success or unrecoverable
/// exhaustion. Backoff state (`sleep_interval`) is local to this call: every
/// invocation starts fresh at [`INITIAL_BACKOFF`] (§4.2).
///
/// `session` is only needed here to implement the `ResourceNotFound`
/// recovery (clear cookies, drop `offset`); the cookies backing `fetcher`
/// and `session` must be the same shared jar for that to have any effect.
pub async fn get_page(
    fetcher: &Fetcher,
    session: &Session,
    params: &mut FetchParams,
    direction: Direction,
    metrics: &dyn MetricsSink,
) -> Result<Page, RetryError> {
    let mut sleep_interval = INITIAL_BACKOFF;

    loop {
        let start = std::time::Instant::now();
        let outcome = fetcher.fetch(params).await;

        match outcome {
            FetchOutcome::Ok(page) => {
                metrics.record_duration(
                    &format!("{}_process_request", direction.as_str()),
                    start.elapsed(),
                );
                metrics.increment(&format!("{}_success_requests", direction.as_str()), 1);
                return Ok(page);
            }
            FetchOutcome::PreconditionFailed => {
                metrics.increment(&format!("{}_precondition_failed", direction.as_str()), 1);
                log::error!("{}: PreconditionFailed, retrying immediately", direction.as_str());
                continue;
            }
            FetchOutcome::ConnectionError => {
                metrics.increment(&format!("{}_connection_error", direction.as_str()), 1);
                log::error!("{}: ConnectionError", direction.as_str());
                if sleep_interval > CONNECTION_ERROR_CAP {
                    return Err(RetryError::ConnectionExceeded {
                        cap: CONNECTION_ERROR_CAP,
                    });
                }
                log::debug!(
                    "{}: sleeping {:?} after ConnectionError",
                    direction.as_str(),
                    sleep_interval
                );
                sleep(sleep_interval).await;
                sleep_interval *= 2;
                continue;
            }
            FetchOutcome::RateLimited => {
                metrics.increment(&format!("{}_request_failed", direction.as_str()), 1);
                log::error!("{}: RateLimited (429)", direction.as_str());
                if sleep_interval > RATE_LIMIT_CAP {
                    return Err(RetryError::RateLimitExceeded {
                        cap: RATE_LIMIT_CAP,
                        waited: sleep_interval,
                    });
                }
                log::debug!(
                    "{}: sleeping {:?} after RateLimited",
                    direction.as_str(),
                    sleep_interval
                );
                sleep(sleep_interval).await;
                sleep_interval *= 2;
                continue;
            }
            FetchOutcome::RequestFailed(status) => {
                metrics.increment(&format!("{}_request_failed", direction.as_str()), 1);
                log::error!(
                    "{}: request failed, status code {status}, treating as fatal",
                    direction.as_str()
                );
                // An unclassified non-2xx status is not worth retrying
                // blindly, unlike the rate-limit/connection-error cases
                // above: it escalates to the supervisor immediately.
                return Err(RetryError::RequestFailed(status));
            }
            FetchOutcome::ResourceNotFound => {
                metrics.increment(&format!("{}_resource_not_found", direction.as_str()), 1);
                log::error!(
                    "{}: resource not found, clearing offset and cookies",
                    direction.as_str()
                );
                session.clear();
                params.offset = None;
                continue;
            }
            FetchOutcome::Other(err) => {
                metrics.increment(&format!("{}_exception", direction.as_str()), 1);
                log::error!("{}: unclassified error: {err}", direction.as_str());
                if sleep_interval > OTHER_CAP {
                    return Err(RetryError::Exhausted {
                        cap: OTHER_CAP,
                        source: err,
                    });
                }
                log::debug!(
                    "{}: sleeping {:?} after unclassified error",
                    direction.as_str(),
                    sleep_interval
                );
                sleep(sleep_interval).await;
                sleep_interval *= 2;
                continue;
            }
        }
    }
}
