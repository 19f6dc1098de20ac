//! Drains historical items from "now" back to the epoch (§4.3).
//!
//! ```text
//! INITIALIZED -> PROCESS_REQUEST -> PROCESS_DATA -> SLEEP -> PROCESS_REQUEST ...
//!                                          `--(empty page)--> FINISHED
//! ```

use crate::config::RetrieverParams;
use crate::error::RetrieverFault;
use crate::fetcher::{FetchParams, Fetcher, Item};
use crate::metrics::MetricsSink;
use crate::queue::QueueProducer;
use crate::retriever::{RetrieverInfo, RetrieverStatus};
use crate::retry::{Direction, get_page};
use crate::session::{Session, check_affinity};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::time::sleep;

/// Distinguishes clean termination (empty page reached) from a fault, so
/// the [`crate::supervisor::Supervisor`] can decide whether to keep
/// watching this worker (§4.6).
#[derive(Debug)]
pub enum BackwardOutcome {
    Finished,
    Fault(RetrieverFault),
}

pub struct BackwardRetriever {
    fetcher: Fetcher,
    session: Session,
    canonical_session: Session,
    params: FetchParams,
    retriever_params: Arc<RwLock<RetrieverParams>>,
    info: Arc<Mutex<RetrieverInfo>>,
    queue: QueueProducer<Item>,
    metrics: Arc<dyn MetricsSink>,
}

impl BackwardRetriever {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fetcher: Fetcher,
        session: Session,
        canonical_session: Session,
        params: FetchParams,
        retriever_params: Arc<RwLock<RetrieverParams>>,
        info: Arc<Mutex<RetrieverInfo>>,
        queue: QueueProducer<Item>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            fetcher,
            session,
            canonical_session,
            params,
            retriever_params,
            info,
            queue,
            metrics,
        }
    }

    fn set_status(&self, status: RetrieverStatus) {
        self.info.lock().status = status;
    }

    pub async fn run(mut self) -> BackwardOutcome {
        log::info!("backward: start worker");

        loop {
            self.set_status(RetrieverStatus::ProcessRequest);
            log::debug!("backward: process request, offset={:?}", self.params.offset);

            let page = match get_page(
                &self.fetcher,
                &self.session,
                &mut self.params,
                Direction::Backward,
                self.metrics.as_ref(),
            )
            .await
            {
                Ok(page) => page,
                Err(err) => {
                    self.set_status(RetrieverStatus::Broken);
                    return BackwardOutcome::Fault(RetrieverFault::Retry(err));
                }
            };

            self.info.lock().mark_response();
            self.metrics
                .increment("backward_resource_count", page.items.len() as u64);

            if !check_affinity(&self.session, &self.canonical_session) {
                self.set_status(RetrieverStatus::Broken);
                return BackwardOutcome::Fault(RetrieverFault::SessionMismatch);
            }

            if page.is_empty() {
                log::info!("backward: finished");
                self.set_status(RetrieverStatus::Finished);
                return BackwardOutcome::Finished;
            }

            self.set_status(RetrieverStatus::ProcessData);
            log::debug!("backward: process data, {} item(s)", page.items.len());
            for item in page.items {
                if self.queue.push(item).await.is_err() {
                    self.set_status(RetrieverStatus::Broken);
                    return BackwardOutcome::Fault(RetrieverFault::QueueClosed);
                }
            }

            self.params.offset = Some(page.next_page.offset);

            let down_requests_sleep = self.retriever_params.read().down_requests_sleep;
            log::info!("backward: pause {:?} between requests", down_requests_sleep);
            self.set_status(RetrieverStatus::Sleep);
            sleep(down_requests_sleep).await;
        }
    }
}
