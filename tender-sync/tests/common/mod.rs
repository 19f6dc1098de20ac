//! Shared mock-server harness for integration tests, same shape as the
//! teacher's `common/tests/fetcher.rs` helper.

use std::sync::Arc;
use tokio::net::TcpListener;

/// Start a mock HTTP/1 server on an ephemeral port, returning its base URL.
/// `handler` is invoked once per request and must be cheap/non-blocking.
pub async fn start_mock_server<F>(handler: F) -> String
where
    F: Fn(hyper::Request<hyper::body::Incoming>) -> hyper::Response<String> + Send + Sync + 'static,
{
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let handler = handler.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler(req)) }
                });

                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Pull the value of a single query parameter out of a request URI.
pub fn query_param(req: &hyper::Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

pub fn page_body(data: &str, next_offset: &str, prev_offset: Option<&str>) -> String {
    match prev_offset {
        Some(prev) => format!(
            r#"{{"data":{data},"next_page":{{"offset":"{next_offset}"}},"prev_page":{{"offset":"{prev}"}}}}"#
        ),
        None => format!(r#"{{"data":{data},"next_page":{{"offset":"{next_offset}"}}}}"#),
    }
}
