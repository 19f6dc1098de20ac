//! Tails live changes forever (§4.4). Never terminates cleanly — the
//! return type only ever carries a fault, since the
//! [`crate::supervisor::Supervisor`] treats *any* completion of this
//! worker as unexpected and restarts the pair.
//!
//! ```text
//! INITIALIZED -> PROCESS_REQUEST <-> PROCESS_DATA
//!                     |
//!                   SLEEP (idle) --> PROCESS_REQUEST
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

pub struct ForwardRetriever {
    fetcher: Fetcher,
    session: Session,
    canonical_session: Session,
    params: FetchParams,
    retriever_params: Arc<RwLock<RetrieverParams>>,
    info: Arc<Mutex<RetrieverInfo>>,
    queue: QueueProducer<Item>,
    metrics: Arc<dyn MetricsSink>,
}

impl ForwardRetriever {
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

    async fn fetch(&mut self) -> Result<crate::fetcher::Page, RetrieverFault> {
        self.set_status(RetrieverStatus::ProcessRequest);
        let page = get_page(
            &self.fetcher,
            &self.session,
            &mut self.params,
            Direction::Forward,
            self.metrics.as_ref(),
        )
        .await
        .map_err(RetrieverFault::Retry)?;

        self.info.lock().mark_response();
        self.metrics
            .increment("forward_resource_count", page.items.len() as u64);

        if !check_affinity(&self.session, &self.canonical_session) {
            return Err(RetrieverFault::SessionMismatch);
        }

        Ok(page)
    }

    pub async fn run(mut self) -> RetrieverFault {
        log::info!("forward: start worker");

        let mut page = match self.fetch().await {
            Ok(page) => page,
            Err(fault) => {
                self.set_status(RetrieverStatus::Broken);
                return fault;
            }
        };

        loop {
            while !page.is_empty() {
                self.set_status(RetrieverStatus::ProcessData);
                log::debug!("forward: process data, {} item(s)", page.items.len());
                for item in std::mem::take(&mut page.items) {
                    if self.queue.push(item).await.is_err() {
                        self.set_status(RetrieverStatus::Broken);
                        return RetrieverFault::QueueClosed;
                    }
                }
                self.params.offset = Some(page.next_page.offset.clone());

                let up_requests_sleep = self.retriever_params.read().up_requests_sleep;
                log::info!("forward: pause {:?} between requests", up_requests_sleep);
                self.set_status(RetrieverStatus::Sleep);
                sleep(up_requests_sleep).await;

                page = match self.fetch().await {
                    Ok(page) => page,
                    Err(fault) => {
                        self.set_status(RetrieverStatus::Broken);
                        return fault;
                    }
                };
            }

            let up_wait_sleep = self.retriever_params.read().up_wait_sleep;
            log::info!("forward: pause {:?} after empty response", up_wait_sleep);
            self.set_status(RetrieverStatus::Sleep);
            sleep(up_wait_sleep).await;

            self.params.offset = Some(page.next_page.offset.clone());

            page = match self.fetch().await {
                Ok(page) => page,
                Err(fault) => {
                    self.set_status(RetrieverStatus::Broken);
                    return fault;
                }
            };

            self.retriever_params.write().adapt(!page.is_empty());
        }
    }
}
