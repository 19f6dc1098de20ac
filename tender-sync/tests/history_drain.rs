//! Scenario 1 (clean history drain): upstream has two non-empty backward
//! pages then an empty one, and never returns forward items. The iterator
//! yields every historical item in descending order, then blocks.

mod common;

use common::{page_body, query_param, start_mock_server};
use futures::StreamExt;
use hyper::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tender_sync::config::{RetrieverParams, SyncConfig};
use tender_sync::metrics::NoopMetricsSink;
use tender_sync::supervisor::Supervisor;
use url::Url;

#[tokio::test]
async fn clean_history_drain_yields_then_blocks() {
    let backward_calls = Arc::new(AtomicUsize::new(0));
    let backward_calls_clone = backward_calls.clone();

    let server = start_mock_server(move |req| {
        let body = if query_param(&req, "descending").is_some() {
            let n = backward_calls_clone.fetch_add(1, Ordering::SeqCst);
            match n {
                0 => page_body(r#"[{"id":"a"},{"id":"b"}]"#, "b2", Some("f0")),
                1 => page_body(r#"[{"id":"c"}]"#, "b3", None),
                _ => page_body("[]", "b3", None),
            }
        } else {
            let offset = query_param(&req, "offset").unwrap_or_else(|| "f0".to_string());
            page_body("[]", &offset, None)
        };

        hyper::Response::builder()
            .status(StatusCode::OK)
            .body(body)
            .unwrap()
    })
    .await;

    let config = SyncConfig::new()
        .host(Url::parse(&server).unwrap())
        .retriever_params(RetrieverParams {
            down_requests_sleep: Duration::from_millis(5),
            up_requests_sleep: Duration::from_millis(5),
            up_wait_sleep: Duration::from_millis(20),
            up_wait_sleep_min: Duration::from_millis(5),
            up_wait_sleep_max: Duration::from_millis(20),
            queue_size: 10,
            adaptive: false,
        });

    let supervisor = Supervisor::start(config, Arc::new(NoopMetricsSink))
        .await
        .unwrap();
    let mut items = Box::pin(supervisor.into_stream());

    let a = timeout_next(&mut items).await.expect("item a");
    let b = timeout_next(&mut items).await.expect("item b");
    let c = timeout_next(&mut items).await.expect("item c");

    assert_eq!(a["id"], "a");
    assert_eq!(b["id"], "b");
    assert_eq!(c["id"], "c");

    // No further items should arrive: backward is FINISHED, forward keeps
    // polling but upstream never has anything new for it.
    let fourth = tokio::time::timeout(Duration::from_millis(300), items.next()).await;
    assert!(fourth.is_err(), "stream should still be blocked, got {fourth:?}");
}

async fn timeout_next(
    items: &mut (impl StreamExt<Item = serde_json::Value> + Unpin),
) -> Option<serde_json::Value> {
    tokio::time::timeout(Duration::from_secs(2), items.next())
        .await
        .expect("timed out waiting for item")
}
