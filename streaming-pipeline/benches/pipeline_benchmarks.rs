use std::sync::Arc;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fraud_core::Transaction;
use streaming_pipeline::windowed_aggregator::{AggInput, WindowedAggregator};
use streaming_pipeline::{ChannelSink, InMemoryStateStore, PipelineMetrics, PipelineOrchestrator, StreamJoiner};
use tokio::runtime::Runtime;

fn sample_transaction(user_id: &str, merchant_id: &str) -> Transaction {
    Transaction {
        transaction_id: "bench-tx".to_string(),
        user_id: user_id.to_string(),
        merchant_id: merchant_id.to_string(),
        amount: 87.25,
        currency: "USD".to_string(),
        timestamp: Utc::now(),
        payment_method: "credit_card".to_string(),
        card_type: "visa".to_string(),
        transaction_type: "purchase".to_string(),
        ip_address: "192.168.1.10".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        device_fingerprint: "bench-device".to_string(),
        geolocation: None,
        merchant_location: None,
        hour_of_day: Some(15),
        is_weekend: Some(false),
        is_fraud: None,
        prior_fraud_score: None,
    }
}

fn bench_windowed_aggregator_insert(c: &mut Criterion) {
    let aggregator = WindowedAggregator::new();
    let input = AggInput::from_enriched(&fraud_core::codec::error_placeholder("bench"));
    c.bench_function("windowed_aggregator_ingest", |b| {
        b.iter(|| {
            aggregator.ingest(&input);
        })
    });
}

fn bench_stream_joiner_empty_join(c: &mut Criterion) {
    let joiner = StreamJoiner::new();
    let tx = sample_transaction("u1", "m1");
    c.bench_function("stream_joiner_join_with_no_side_input", |b| {
        b.iter(|| joiner.join(&tx, "retail"))
    });
}

fn bench_process_one_by_parallelism(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("process_one_by_parallelism");
    for parallelism in [1usize, 4, 12] {
        group.bench_with_input(BenchmarkId::new("parallelism", parallelism), &parallelism, |b, &parallelism| {
            let config = fraud_core::PipelineConfig::default()
                .with_kafka_brokers(vec!["broker:9092".to_string()])
                .with_consumer_group_id("bench")
                .with_redis("localhost", 6379, None)
                .with_parallelism(parallelism);
            let orchestrator = PipelineOrchestrator::new(config, Arc::new(InMemoryStateStore::new()), PipelineMetrics::new());
            let (enriched_sink, mut enriched_rx) = ChannelSink::channel(64);
            let (alert_sink, mut alert_rx) = ChannelSink::channel(64);
            let (feature_sink, mut feature_rx) = ChannelSink::channel(64);
            let tx = sample_transaction("bench-user", "bench-merchant");

            b.to_async(&rt).iter(|| async {
                orchestrator.process_one(&tx, &enriched_sink, &alert_sink, &feature_sink).await;
                let _ = enriched_rx.try_recv();
                let _ = alert_rx.try_recv();
                let _ = feature_rx.try_recv();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_windowed_aggregator_insert,
    bench_stream_joiner_empty_join,
    bench_process_one_by_parallelism
);
criterion_main!(benches);
