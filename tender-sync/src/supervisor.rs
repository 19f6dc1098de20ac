//! Owns both retrievers and the shared session; detects failure and
//! restarts the pair; exposes the two consumer shapes (§4.6, §6).

use crate::config::{RetrieverParams, SyncConfig};
use crate::error::RetrieverFault;
use crate::fetcher::{FetchParams, Fetcher, Item};
use crate::metrics::{MetricsPump, MetricsSink};
use crate::queue::{QueueConsumer, QueueProducer, bounded};
use crate::retriever::{
    BackwardOutcome, BackwardRetriever, ForwardRetriever, RetrieverInfo, RetrieverStatus,
};
use crate::retry::{Direction, get_page};
use crate::session::Session;
use futures::Stream;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long the iterator form blocks on queue arrival before re-checking
/// worker health (§4.5, §4.6).
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// How often the push-form background task re-checks worker health when
/// it has no queue draining of its own to do (mirrors the original
/// `feeder()`'s `sleep(2)`).
const FEEDER_TICK: Duration = Duration::from_secs(2);

/// The supervising half: everything except the consumer handle, so the
/// consumer can be handed out separately by [`Supervisor::run_feeder`]
/// while this keeps running in a background task.
struct SupervisorCore {
    config: SyncConfig,
    metrics: Arc<dyn MetricsSink>,
    retriever_params: Arc<RwLock<RetrieverParams>>,
    backward_info: Arc<Mutex<RetrieverInfo>>,
    forward_info: Arc<Mutex<RetrieverInfo>>,
    queue_producer: QueueProducer<Item>,
    backward_handle: Option<JoinHandle<BackwardOutcome>>,
    forward_handle: Option<JoinHandle<RetrieverFault>>,
    /// The "should I still poll the backward worker" flag. Reset to `true`
    /// on every restart, even if backward had already finished cleanly
    /// before — a previously-drained history is expected to drain again.
    watching_backward: bool,
}

impl SupervisorCore {
    async fn init_and_seed(&mut self) -> anyhow::Result<()> {
        let session = Session::new(self.config.host.clone());
        let backward_fetcher = Fetcher::new(&self.config, &session)?;
        let forward_fetcher = Fetcher::new(&self.config, &session)?;

        let mut backward_params = FetchParams::backward(self.config.extra_params.clone());
        let mut forward_params = FetchParams::forward(self.config.extra_params.clone());

        self.backward_info.lock().reset();
        self.forward_info.lock().reset();

        let seed = get_page(
            &backward_fetcher,
            &session,
            &mut backward_params,
            Direction::Backward,
            self.metrics.as_ref(),
        )
        .await?;
        self.backward_info.lock().mark_response();

        for item in seed.items {
            if self.queue_producer.push(item).await.is_err() {
                anyhow::bail!("queue consumer dropped during seeding");
            }
        }

        backward_params.offset = Some(seed.next_page.offset);
        forward_params.offset = seed.prev_page.map(|p| p.offset);

        let canonical = session.share();

        let backward = BackwardRetriever::new(
            backward_fetcher,
            session.share(),
            canonical.share(),
            backward_params,
            self.retriever_params.clone(),
            self.backward_info.clone(),
            self.queue_producer.clone(),
            self.metrics.clone(),
        );
        let forward = ForwardRetriever::new(
            forward_fetcher,
            session.share(),
            canonical.share(),
            forward_params,
            self.retriever_params.clone(),
            self.forward_info.clone(),
            self.queue_producer.clone(),
            self.metrics.clone(),
        );

        self.backward_handle = Some(tokio::spawn(backward.run()));
        self.forward_handle = Some(tokio::spawn(forward.run()));

        Ok(())
    }

    /// `restart_sync`: cancel both retrievers, rebuild clients and session,
    /// re-seed, respawn. Retries the seed fetch with a fixed delay rather
    /// than giving up — the supervisor is meant to be resilient to
    /// persistent upstream failure (§7: "restart is the universal response").
    async fn restart(&mut self) {
        log::warn!("restarting retriever pair");
        if let Some(handle) = self.backward_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.forward_handle.take() {
            handle.abort();
        }

        loop {
            match self.init_and_seed().await {
                Ok(()) => break,
                Err(err) => {
                    log::error!("restart seeding failed: {err:#}, retrying in 1s");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        self.watching_backward = true;
    }

    /// One pass of the supervision logic in §4.6: check for a finished
    /// backward worker (restart on fault, stop watching on clean finish),
    /// check for a finished forward worker (always a fault), restarting
    /// the pair as needed.
    async fn check_workers(&mut self) {
        if self.watching_backward
            && matches!(&self.backward_handle, Some(handle) if handle.is_finished())
        {
            let handle = self.backward_handle.take().expect("checked above");
            match handle.await {
                Ok(BackwardOutcome::Finished) => {
                    log::info!("backward: stop watching, finished cleanly");
                    self.watching_backward = false;
                }
                Ok(BackwardOutcome::Fault(fault)) => {
                    log::warn!("backward retriever faulted: {fault}");
                    self.restart().await;
                    return;
                }
                Err(join_err) => {
                    log::warn!("backward retriever task panicked: {join_err}");
                    self.restart().await;
                    return;
                }
            }
        }

        if matches!(&self.forward_handle, Some(handle) if handle.is_finished()) {
            let handle = self.forward_handle.take().expect("checked above");
            match handle.await {
                Ok(fault) => log::warn!("forward retriever faulted: {fault}"),
                Err(join_err) => log::warn!("forward retriever task panicked: {join_err}"),
            }
            self.restart().await;
        }
    }
}

/// Owns both retrievers and the shared session for one synchronizer;
/// exposes the iterator (`into_stream`) and push (`run_feeder`) consumer
/// shapes described in §6.
pub struct Supervisor {
    core: SupervisorCore,
    queue_consumer: QueueConsumer<Item>,
}

impl Supervisor {
    /// Build a fresh synchronizer and perform the initial seed fetch and
    /// worker spawn. Unlike `restart`, this does not retry on seed
    /// failure — a caller who cannot even start once should see the error.
    pub async fn start(
        config: SyncConfig,
        metrics_sink: Arc<dyn MetricsSink>,
    ) -> anyhow::Result<Self> {
        let (queue_producer, queue_consumer) = bounded(config.retriever_params.queue_size);
        let retriever_params = Arc::new(RwLock::new(config.retriever_params.clone()));

        let mut core = SupervisorCore {
            config,
            metrics: metrics_sink,
            retriever_params,
            backward_info: Arc::new(Mutex::new(RetrieverInfo::default())),
            forward_info: Arc::new(Mutex::new(RetrieverInfo::default())),
            queue_producer,
            backward_handle: None,
            forward_handle: None,
            watching_backward: true,
        };

        core.init_and_seed().await?;

        Ok(Self {
            core,
            queue_consumer,
        })
    }

    /// Spawn the [`MetricsPump`] for this synchronizer. Independent of
    /// both consumer shapes; call at most once per [`Supervisor`].
    pub fn spawn_metrics_pump(&self) -> JoinHandle<()> {
        let pump = MetricsPump::new(
            self.core.metrics.clone(),
            self.core.backward_info.clone(),
            self.core.forward_info.clone(),
            &self.queue_consumer,
            self.core.retriever_params.clone(),
        );
        tokio::spawn(pump.run())
    }

    /// Snapshot of the current `(backward, forward)` status (§3 RetrieverInfo
    /// is explicitly observable state).
    pub fn retriever_status(&self) -> (RetrieverStatus, RetrieverStatus) {
        (
            self.core.backward_info.lock().status,
            self.core.forward_info.lock().status,
        )
    }

    /// Iterator form: an unending [`Stream`] of items, draining the queue
    /// and re-checking worker health on every idle tick (§6).
    pub fn into_stream(self) -> impl Stream<Item = Item> {
        futures::stream::unfold(self, |mut sup| async move {
            loop {
                sup.core.check_workers().await;

                if let Some(item) = sup.queue_consumer.try_pop() {
                    return Some((item, sup));
                }

                if let Some(item) = sup.queue_consumer.pop_timeout(POLL_TIMEOUT).await {
                    return Some((item, sup));
                }
            }
        })
    }

    /// Push form: returns the queue consumer directly and spawns a
    /// background task that only supervises (no draining of its own),
    /// mirroring the original `run_feeder`/`feeder` pair.
    pub fn run_feeder(self) -> QueueConsumer<Item> {
        let Supervisor {
            mut core,
            queue_consumer,
        } = self;

        tokio::spawn(async move {
            loop {
                core.check_workers().await;
                tokio::time::sleep(FEEDER_TICK).await;
            }
        });

        queue_consumer
    }
}
