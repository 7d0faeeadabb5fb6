//! Prometheus-compatible scrape endpoint (§4.10, §6 `metrics-port`). A small
//! `prometheus::Registry` wrapping the counters/histograms the orchestrator
//! updates, served over `axum` the same way the corpus exposes a `/metrics`
//! route alongside `/health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{extract::State, response::IntoResponse, Router};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tower_http::trace::TraceLayer;

pub struct PipelineMetrics {
    registry: Registry,
    pub transactions_processed: IntCounter,
    pub transactions_by_decision: IntCounterVec,
    pub decode_errors: IntCounter,
    pub alerts_emitted: IntCounter,
    pub alerts_rate_limited: IntCounter,
    pub checkpoints_completed: IntCounter,
    pub watermark_lag_seconds: IntGauge,
    pub scoring_latency_ms: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Arc<Self> {
        let registry = Registry::new();

        let transactions_processed =
            IntCounter::with_opts(Opts::new("fraud_transactions_processed_total", "Transactions processed")).unwrap();
        let transactions_by_decision = IntCounterVec::new(
            Opts::new("fraud_transactions_by_decision_total", "Transactions processed by decision"),
            &["decision"],
        )
        .unwrap();
        let decode_errors =
            IntCounter::with_opts(Opts::new("fraud_decode_errors_total", "Records that failed to decode")).unwrap();
        let alerts_emitted =
            IntCounter::with_opts(Opts::new("fraud_alerts_emitted_total", "Alerts sent to the alert sink")).unwrap();
        let alerts_rate_limited = IntCounter::with_opts(Opts::new(
            "fraud_alerts_rate_limited_total",
            "Alerts dropped by the token-bucket rate limiter",
        ))
        .unwrap();
        let checkpoints_completed = IntCounter::with_opts(Opts::new(
            "fraud_checkpoints_completed_total",
            "Checkpoint barrier cycles completed",
        ))
        .unwrap();
        let watermark_lag_seconds = IntGauge::with_opts(Opts::new(
            "fraud_watermark_lag_seconds",
            "Wall-clock minus current event-time watermark",
        ))
        .unwrap();
        let scoring_latency_ms = Histogram::with_opts(HistogramOpts::new(
            "fraud_scoring_latency_ms",
            "End-to-end decode-to-score latency in milliseconds",
        ))
        .unwrap();

        registry.register(Box::new(transactions_processed.clone())).unwrap();
        registry.register(Box::new(transactions_by_decision.clone())).unwrap();
        registry.register(Box::new(decode_errors.clone())).unwrap();
        registry.register(Box::new(alerts_emitted.clone())).unwrap();
        registry.register(Box::new(alerts_rate_limited.clone())).unwrap();
        registry.register(Box::new(checkpoints_completed.clone())).unwrap();
        registry.register(Box::new(watermark_lag_seconds.clone())).unwrap();
        registry.register(Box::new(scoring_latency_ms.clone())).unwrap();

        Arc::new(Self {
            registry,
            transactions_processed,
            transactions_by_decision,
            decode_errors,
            alerts_emitted,
            alerts_rate_limited,
            checkpoints_completed,
            watermark_lag_seconds,
            scoring_latency_ms,
        })
    }

    fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf).expect("metric encoding cannot fail");
        String::from_utf8(buf).expect("prometheus text format is always valid utf8")
    }
}

async fn metrics_handler(State(metrics): State<Arc<PipelineMetrics>>) -> impl IntoResponse {
    ([("content-type", "text/plain; version=0.0.4")], metrics.render())
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Serve `/metrics` and `/health` on `port`, returning once the listener is
/// bound so the caller can log the actual address.
pub async fn serve(metrics: Arc<PipelineMetrics>, port: u16) -> std::io::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(metrics)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");
    axum::serve(listener, app).await
}
