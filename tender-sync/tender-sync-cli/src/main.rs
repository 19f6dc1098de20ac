use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use tender_sync::cli::{FeedArguments, RetrievalArguments};
use tender_sync::metrics::LogMetricsSink;
use tender_sync::supervisor::Supervisor;

/// Stream every historical and live item of a tender-registry changes feed
/// to stdout, one JSON object per line.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    feed: FeedArguments,

    #[command(flatten)]
    retrieval: RetrievalArguments,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.feed.into_config(cli.retrieval);

    let metrics = Arc::new(LogMetricsSink::new(&config.metric_args));
    let supervisor = Supervisor::start(config, metrics.clone()).await?;
    supervisor.spawn_metrics_pump();

    let mut items = Box::pin(supervisor.into_stream());
    while let Some(item) = items.next().await {
        println!("{item}");
    }

    Ok(())
}
