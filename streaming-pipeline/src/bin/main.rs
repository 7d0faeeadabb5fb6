//! Real-time fraud transaction scorer: a long-running binary that decodes
//! the input stream, enriches and scores each transaction, and routes the
//! result to the `enriched`, `features`, and `alerts` output streams (§6),
//! alongside a Prometheus metrics endpoint and a checkpointing orchestrator.

use std::sync::Arc;

use fraud_core::PipelineConfig;
use streaming_pipeline::{ChannelSink, ChannelSource, InMemoryStateStore, PipelineMetrics, PipelineOrchestrator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = PipelineConfig::from_args(&args)?;
    tracing::info!(
        parallelism = config.parallelism,
        checkpoint_interval_ms = config.checkpoint_interval_ms,
        fraud_threshold = config.fraud_threshold,
        "starting fraud pipeline"
    );

    let metrics = PipelineMetrics::new();
    let metrics_for_server = Arc::clone(&metrics);
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = streaming_pipeline::metrics::serve(metrics_for_server, metrics_port).await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });

    let state_store = Arc::new(InMemoryStateStore::new());
    let orchestrator = PipelineOrchestrator::new(config, state_store, metrics);

    // The broker connection itself is out of scope (§1); input and output
    // streams are bounded channels a real Kafka/Redpanda client would feed
    // in its place (`record_stream::RecordSource`/`RecordSink`).
    let (_input_sink, input_source) = ChannelSink::channel(4096);
    let (enriched_sink, mut enriched_rx) = ChannelSink::channel(4096);
    let (alert_sink, mut alert_rx) = ChannelSink::channel(4096);
    let (feature_sink, mut feature_rx) = ChannelSink::channel(4096);

    tokio::spawn(async move { while enriched_rx.recv().await.is_some() {} });
    tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            tracing::warn!(%alert, "fraud alert");
        }
    });
    tokio::spawn(async move { while feature_rx.recv().await.is_some() {} });

    let source = ChannelSource::new(input_source);
    orchestrator.run(source, enriched_sink, alert_sink, feature_sink).await;

    tracing::info!("fraud pipeline shut down");
    Ok(())
}
