use std::sync::Arc;

use chrono::Utc;
use fraud_core::{MerchantProfile, PipelineConfig, Transaction, UserProfile};
use streaming_pipeline::{ChannelSink, InMemoryStateStore, PipelineMetrics, PipelineOrchestrator, ProfileCache};

fn config() -> PipelineConfig {
    PipelineConfig::default()
        .with_kafka_brokers(vec!["broker1:9092".to_string()])
        .with_consumer_group_id("fraud-scorer")
        .with_redis("localhost", 6379, None)
        .with_parallelism(4)
}

fn transaction(user_id: &str, merchant_id: &str, amount: f64, hour: u32) -> Transaction {
    Transaction {
        transaction_id: format!("t-{user_id}-{merchant_id}-{amount}"),
        user_id: user_id.to_string(),
        merchant_id: merchant_id.to_string(),
        amount,
        currency: "USD".to_string(),
        timestamp: Utc::now(),
        payment_method: "credit_card".to_string(),
        card_type: "visa".to_string(),
        transaction_type: "purchase".to_string(),
        ip_address: "192.168.1.5".to_string(),
        user_agent: "Mozilla/5.0 (compatible; normal browser)".to_string(),
        device_fingerprint: "known-device".to_string(),
        geolocation: None,
        merchant_location: None,
        hour_of_day: Some(hour),
        is_weekend: Some(false),
        is_fraud: None,
        prior_fraud_score: None,
    }
}

/// §8 scenario 1: routine small purchase from a known, trusted user at a
/// known low-risk merchant should approve with very low risk and never alert.
#[tokio::test]
async fn routine_small_purchase_approves_without_alert() {
    let store = Arc::new(InMemoryStateStore::new());
    let cache = ProfileCache::new(Arc::clone(&store));

    let mut user = UserProfile::default_on_miss();
    user.verified = true;
    user.risk_score = 0.1;
    user.avg_transaction_amount = 50.0;
    user.account_age_days = 400;
    user.device_fingerprints.insert("known-device".to_string());
    cache.put_user("u1", &user).await;

    let mut merchant = MerchantProfile::default_on_miss();
    merchant.category = "retail".to_string();
    merchant.fraud_rate = 0.01;
    merchant.avg_transaction_amount = 60.0;
    cache.put_merchant("m1", &merchant).await;

    let orchestrator = PipelineOrchestrator::new(config(), store, PipelineMetrics::new());
    let (enriched_sink, mut enriched_rx) = ChannelSink::channel(4);
    let (alert_sink, mut alert_rx) = ChannelSink::channel(4);
    let (feature_sink, mut feature_rx) = ChannelSink::channel(4);

    orchestrator
        .process_one(&transaction("u1", "m1", 42.50, 14), &enriched_sink, &alert_sink, &feature_sink)
        .await;

    assert!(enriched_rx.recv().await.is_some());
    assert!(feature_rx.recv().await.is_some());
    assert!(alert_rx.try_recv().is_err(), "routine purchase must not alert");
}

/// §8 scenario 3: a blacklisted merchant forces DECLINE/CRITICAL and an
/// alert regardless of amount or the transaction's own prior score.
#[tokio::test]
async fn blacklisted_merchant_always_declines_and_alerts() {
    let store = Arc::new(InMemoryStateStore::new());
    let cache = ProfileCache::new(Arc::clone(&store));
    let mut merchant = MerchantProfile::default_on_miss();
    merchant.is_blacklisted = true;
    cache.put_merchant("m1", &merchant).await;

    let orchestrator = PipelineOrchestrator::new(config(), store, PipelineMetrics::new());
    let (enriched_sink, mut enriched_rx) = ChannelSink::channel(4);
    let (alert_sink, mut alert_rx) = ChannelSink::channel(4);
    let (feature_sink, _feature_rx) = ChannelSink::channel(4);

    let mut tx = transaction("u2", "m1", 5.0, 10);
    tx.prior_fraud_score = Some(0.1);
    orchestrator.process_one(&tx, &enriched_sink, &alert_sink, &feature_sink).await;

    assert!(enriched_rx.recv().await.is_some());
    let alert = alert_rx.recv().await.expect("blacklisted merchant must alert");
    assert!(alert.contains("DECLINE"));
}

/// §8 scenario 4: an unknown user making a large, round, late-night
/// purchase picks up every documented default but still approves at low risk.
#[tokio::test]
async fn unknown_user_large_round_amount_at_night_approves_low_risk() {
    let store = Arc::new(InMemoryStateStore::new());
    let cache = ProfileCache::new(Arc::clone(&store));
    let mut merchant = MerchantProfile::default_on_miss();
    merchant.category = "retail".to_string();
    merchant.fraud_rate = 0.01;
    cache.put_merchant("m1", &merchant).await;

    let orchestrator = PipelineOrchestrator::new(config(), Arc::clone(&store), PipelineMetrics::new());
    let (enriched_sink, mut enriched_rx) = ChannelSink::channel(4);
    let (alert_sink, mut alert_rx) = ChannelSink::channel(4);
    let (feature_sink, _feature_rx) = ChannelSink::channel(4);

    let mut tx = transaction("ghost-user", "m1", 1000.0, 2);
    tx.device_fingerprint = "never-seen-device".to_string();
    tx.ip_address = "203.0.113.5".to_string();
    orchestrator.process_one(&tx, &enriched_sink, &alert_sink, &feature_sink).await;

    assert!(enriched_rx.recv().await.is_some());
    assert!(alert_rx.try_recv().is_err(), "score ~0.345 is below the 0.7 alert threshold");
}

/// Ambient-stack test (§8): after routing a handful of transactions through
/// the full pipeline, the Prometheus registry exposes at least one counter
/// and one histogram sample.
#[tokio::test]
async fn metrics_are_populated_after_processing_transactions() {
    let store = Arc::new(InMemoryStateStore::new());
    let metrics = PipelineMetrics::new();
    let orchestrator = PipelineOrchestrator::new(config(), store, Arc::clone(&metrics));
    let (enriched_sink, mut enriched_rx) = ChannelSink::channel(16);
    let (alert_sink, mut alert_rx) = ChannelSink::channel(16);
    let (feature_sink, mut feature_rx) = ChannelSink::channel(16);

    for i in 0..5 {
        orchestrator
            .process_one(&transaction("u3", "m3", 10.0 + i as f64, 11), &enriched_sink, &alert_sink, &feature_sink)
            .await;
    }
    drop(enriched_sink);
    drop(alert_sink);
    drop(feature_sink);
    while enriched_rx.recv().await.is_some() {}
    while feature_rx.recv().await.is_some() {}
    while alert_rx.recv().await.is_some() {}

    assert_eq!(orchestrator.processed_count(), 5);
    assert_eq!(metrics.transactions_processed.get(), 5);
    assert!(metrics.scoring_latency_ms.get_sample_count() >= 5);
}

/// §8 scenario 2: six rapid micro-transactions for the same user cross the
/// `velocity_5min_count > 5` trigger on exactly the sixth event. The user
/// and merchant are known but carry modest base risk (new account, not yet
/// verified, a moderately risky merchant) so the velocity flag is the thing
/// that visibly tips the combined score over the 0.7 alert threshold, rather
/// than an unknown-entity default doing the work unseen.
#[tokio::test]
async fn high_velocity_card_testing_alerts_on_the_sixth_event() {
    let store = Arc::new(InMemoryStateStore::new());
    let cache = ProfileCache::new(Arc::clone(&store));

    let mut user = UserProfile::default_on_miss();
    user.account_age_days = 3;
    user.risk_score = 1.0;
    user.preferred_time_start = 8;
    user.preferred_time_end = 20;
    cache.put_user("card-tester", &user).await;

    let mut merchant = MerchantProfile::default_on_miss();
    merchant.category = "retail".to_string();
    merchant.is_high_risk_category = true;
    merchant.fraud_rate = 0.3;
    merchant.operating_hours = (8..=18).collect();
    cache.put_merchant("m9", &merchant).await;

    let orchestrator = PipelineOrchestrator::new(config(), Arc::clone(&store), PipelineMetrics::new());
    let (enriched_sink, mut enriched_rx) = ChannelSink::channel(16);
    let (alert_sink, mut alert_rx) = ChannelSink::channel(16);
    let (feature_sink, mut feature_rx) = ChannelSink::channel(16);

    for i in 0..6 {
        let mut tx = transaction("card-tester", "m9", 1.0, 2);
        tx.transaction_id = format!("card-test-{i}");
        tx.device_fingerprint = "unrecognized-device".to_string();
        tx.ip_address = "203.0.113.9".to_string();
        orchestrator.process_one(&tx, &enriched_sink, &alert_sink, &feature_sink).await;
        assert!(enriched_rx.recv().await.is_some());
        assert!(feature_rx.recv().await.is_some());

        if i < 5 {
            assert!(alert_rx.try_recv().is_err(), "event {i} must stay below the alert threshold");
        } else {
            assert!(alert_rx.try_recv().is_ok(), "sixth event must cross velocity_5min_count > 5 and alert");
        }
    }

    let updater = streaming_pipeline::VelocityUpdater::new(store);
    let recent = updater.recent_user_transactions("card-tester", 10).await;
    assert_eq!(recent.len(), 6);
}
