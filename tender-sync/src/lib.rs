//! A streaming synchronizer over a tender-registry changes feed.
//!
//! Two cooperating retrievers — one walking history backward to the epoch,
//! one tailing new changes forward indefinitely — feed a single bounded
//! queue. A [`supervisor::Supervisor`] detects failure and restarts the
//! pair while preserving load-balancer session affinity.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use tender_sync::config::SyncConfig;
//! use tender_sync::metrics::NoopMetricsSink;
//! use tender_sync::supervisor::Supervisor;
//!
//! async fn sync() -> anyhow::Result<()> {
//!     let supervisor = Supervisor::start(SyncConfig::new(), Arc::new(NoopMetricsSink)).await?;
//!     supervisor.spawn_metrics_pump();
//!
//!     let mut items = Box::pin(supervisor.into_stream());
//!     while let Some(item) = items.next().await {
//!         log::info!("tender {item:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod queue;
pub mod retriever;
pub mod retry;
pub mod session;
pub mod supervisor;

#[cfg(feature = "cli")]
pub mod cli;
