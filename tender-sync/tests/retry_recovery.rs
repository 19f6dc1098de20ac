//! Scenario 2 (rate-limit recovery) and scenario 4 (cursor lost), both
//! exercised directly against [`tender_sync::retry::get_page`] so the
//! assertions can inspect the exact retry count and offset/cookie
//! recovery without the supervisor's extra layers.

mod common;

use common::start_mock_server;
use hyper::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tender_sync::config::SyncConfig;
use tender_sync::fetcher::{FetchParams, Fetcher};
use tender_sync::metrics::NoopMetricsSink;
use tender_sync::retry::{Direction, get_page};
use tender_sync::session::Session;
use url::Url;

fn config_for(server: &str) -> SyncConfig {
    SyncConfig::new().host(Url::parse(server).unwrap())
}

#[tokio::test]
async fn rate_limit_then_success_is_not_fatal() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();

    let server = start_mock_server(move |_req| {
        let n = attempts_clone.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            hyper::Response::builder()
                .status(StatusCode::TOO_MANY_REQUESTS)
                .body(String::new())
                .unwrap()
        } else {
            hyper::Response::builder()
                .status(StatusCode::OK)
                .body(r#"{"data":[{"id":"x"}],"next_page":{"offset":"n1"}}"#.to_string())
                .unwrap()
        }
    })
    .await;

    let config = config_for(&server);
    let session = Session::new(config.host.clone());
    let fetcher = Fetcher::new(&config, &session).unwrap();
    let mut params = FetchParams::forward(config.extra_params.clone());

    let page = get_page(
        &fetcher,
        &session,
        &mut params,
        Direction::Forward,
        &NoopMetricsSink,
    )
    .await
    .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn resource_not_found_clears_cookies_and_offset_then_recovers() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();

    let server = start_mock_server(move |_req| {
        let n = attempts_clone.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            hyper::Response::builder()
                .status(StatusCode::OK)
                .header("Set-Cookie", "AWSELB=node-1")
                .body(r#"{"data":[],"next_page":{"offset":"stale"}}"#.to_string())
                .unwrap()
        } else if n == 1 {
            hyper::Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(String::new())
                .unwrap()
        } else {
            hyper::Response::builder()
                .status(StatusCode::OK)
                .body(r#"{"data":[{"id":"y"}],"next_page":{"offset":"n2"}}"#.to_string())
                .unwrap()
        }
    })
    .await;

    let config = config_for(&server);
    let session = Session::new(config.host.clone());
    let fetcher = Fetcher::new(&config, &session).unwrap();
    let mut params = FetchParams::forward(config.extra_params.clone());

    // First page establishes a cookie and a cursor.
    let first = get_page(
        &fetcher,
        &session,
        &mut params,
        Direction::Forward,
        &NoopMetricsSink,
    )
    .await
    .unwrap();
    params.offset = Some(first.next_page.offset);
    assert_eq!(session.snapshot().aws_elb.as_deref(), Some("node-1"));

    // Second page 404s: cookies and offset must be cleared, then the next
    // attempt (still inside this same get_page call) succeeds.
    let recovered = get_page(
        &fetcher,
        &session,
        &mut params,
        Direction::Forward,
        &NoopMetricsSink,
    )
    .await
    .unwrap();

    assert_eq!(recovered.items.len(), 1);
    assert_eq!(params.offset, None);
    assert_eq!(session.snapshot().aws_elb, None);
}

#[tokio::test]
async fn request_failed_is_fatal_without_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();

    let server = start_mock_server(move |_req| {
        attempts_clone.fetch_add(1, Ordering::SeqCst);
        hyper::Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(String::new())
            .unwrap()
    })
    .await;

    let config = config_for(&server);
    let session = Session::new(config.host.clone());
    let fetcher = Fetcher::new(&config, &session).unwrap();
    let mut params = FetchParams::forward(config.extra_params.clone());

    let result = get_page(
        &fetcher,
        &session,
        &mut params,
        Direction::Forward,
        &NoopMetricsSink,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
