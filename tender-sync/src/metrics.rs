//! Periodic snapshot publishing (§4.7). `MetricsPump` is on the core's
//! component list (§2), but the concrete metrics sink is an out-of-scope
//! external collaborator (§1) — this module only defines the boundary
//! trait, a `log`-backed default implementation, and a no-op used by
//! tests.

use crate::config::RetrieverParams;
use crate::queue::QueueConsumer;
use crate::retriever::{RetrieverInfo, RetrieverStatus};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// The contract a metrics backend must satisfy. The core only ever calls
/// these three methods plus `flush`; what happens downstream (statsd,
/// Prometheus, a gevent-style Kadabra client as in the original) is out of
/// scope.
pub trait MetricsSink: Send + Sync {
    fn record_duration(&self, name: &str, value: Duration);
    fn increment(&self, name: &str, value: u64);
    fn set_gauge(&self, name: &str, value: f64);

    /// Flush accumulated counters. Default no-op; sinks that batch can
    /// override it.
    fn flush(&self) {}
}

/// Discards everything. Used in tests and as a safe default.
#[derive(Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_duration(&self, _name: &str, _value: Duration) {}
    fn increment(&self, _name: &str, _value: u64) {}
    fn set_gauge(&self, _name: &str, _value: f64) {}
}

/// Logs every metric at `debug` via the `log` facade, tagged with
/// `metric_args` as a fixed label suffix. This is the default sink: it
/// requires no external transport.
pub struct LogMetricsSink {
    tags: String,
}

impl LogMetricsSink {
    pub fn new(metric_args: &BTreeMap<String, String>) -> Self {
        let tags = metric_args
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        Self { tags }
    }
}

impl MetricsSink for LogMetricsSink {
    fn record_duration(&self, name: &str, value: Duration) {
        log::debug!("metric {name}={value:?} [{}]", self.tags);
    }

    fn increment(&self, name: &str, value: u64) {
        log::debug!("metric {name}+={value} [{}]", self.tags);
    }

    fn set_gauge(&self, name: &str, value: f64) {
        log::debug!("metric {name}={value} [{}]", self.tags);
    }
}

/// Periodic publisher, spawned once per [`crate::supervisor::Supervisor`]
/// and surviving across `restart_sync` generations, since it only ever
/// reads the long-lived `RetrieverInfo`/queue-length handles.
pub struct MetricsPump {
    sink: Arc<dyn MetricsSink>,
    backward_info: Arc<Mutex<RetrieverInfo>>,
    forward_info: Arc<Mutex<RetrieverInfo>>,
    queue_len: Arc<AtomicUsize>,
    retriever_params: Arc<RwLock<RetrieverParams>>,
    tick: Duration,
}

impl MetricsPump {
    pub fn new(
        sink: Arc<dyn MetricsSink>,
        backward_info: Arc<Mutex<RetrieverInfo>>,
        forward_info: Arc<Mutex<RetrieverInfo>>,
        queue: &QueueConsumer<crate::fetcher::Item>,
        retriever_params: Arc<RwLock<RetrieverParams>>,
    ) -> Self {
        Self {
            sink,
            backward_info,
            forward_info,
            queue_len: queue.len_handle(),
            retriever_params,
            tick: Duration::from_secs(1),
        }
    }

    /// Runs forever, once per second. Spawned as its own task so a panic
    /// here cannot fault the data path (§4.7).
    pub async fn run(self) {
        loop {
            tokio::time::sleep(self.tick).await;
            self.publish_once();
        }
    }

    fn publish_once(&self) {
        let backward = self.backward_info.lock();
        let forward = self.forward_info.lock();

        self.sink.set_gauge("queue_size", self.queue_len.load(Ordering::SeqCst) as f64);
        self.sink.set_gauge(
            "backward_finished",
            matches!(backward.status, RetrieverStatus::Finished) as u8 as f64,
        );
        if let Some(last) = backward.last_response_time {
            self.sink
                .set_gauge("backward_last_response", last.unix_timestamp() as f64);
        }
        if let Some(last) = forward.last_response_time {
            self.sink
                .set_gauge("forward_last_response", last.unix_timestamp() as f64);
        }
        self.sink.set_gauge(
            "forward_up_wait_sleep",
            self.retriever_params.read().up_wait_sleep.as_secs_f64(),
        );
        self.sink.flush();
    }
}
