//! Pipeline Orchestrator (C10, §4.10): wires decode → enrich → score → sink
//! into `parallelism` worker pools connected by bounded `mpsc` channels,
//! routed by `hash(user_id) % parallelism` so per-user ordering holds
//! through velocity updates without a global lock (§5). A `tokio::time::interval`
//! checkpoint barrier advances the event-time watermark, closing windowed
//! aggregates and evicting stale joiner state.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::Utc;
use fraud_core::{
    decode, encode_enriched, encode_feature_record, Decoded, EntityType, FeatureRecord, MerchantProfile,
    PipelineConfig, Transaction, UserProfile,
};
use scoring_engine::{FeatureExtractor, FeatureStoreFacade, RuleScorer, ScoringConfig, VelocitySnapshot};
use tokio::sync::{mpsc, Mutex};

use crate::profile_cache::ProfileCache;
use crate::record_stream::{RecordSink, RecordSource};
use crate::state_store::StateStore;
use crate::stream_joiner::StreamJoiner;
use crate::velocity_updater::VelocityUpdater;
use crate::windowed_aggregator::{AggInput, WindowedAggregator, DEFAULT_BOUNDED_OUT_OF_ORDERNESS};
use crate::PipelineMetrics;

fn hash_user_id(user_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}

/// Token bucket over alert emission, refilled once per second (§4.10).
pub struct AlertRateLimiter {
    capacity: f64,
    refill_per_second: f64,
    tokens: Mutex<f64>,
    last_refill: Mutex<Instant>,
}

impl AlertRateLimiter {
    pub fn new(max_per_minute: u32) -> Self {
        let capacity = max_per_minute.max(1) as f64;
        Self {
            capacity,
            refill_per_second: capacity / 60.0,
            tokens: Mutex::new(capacity),
            last_refill: Mutex::new(Instant::now()),
        }
    }

    pub async fn try_acquire(&self) -> bool {
        let mut tokens = self.tokens.lock().await;
        let mut last = self.last_refill.lock().await;
        let elapsed_seconds = last.elapsed().as_secs();
        if elapsed_seconds > 0 {
            *tokens = (*tokens + elapsed_seconds as f64 * self.refill_per_second).min(self.capacity);
            *last = Instant::now();
        }
        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct PipelineOrchestrator<S: StateStore + 'static> {
    config: PipelineConfig,
    scoring_config: ScoringConfig,
    state_store: Arc<S>,
    feature_store: Arc<FeatureStoreFacade>,
    aggregator: Arc<WindowedAggregator>,
    joiner: Arc<StreamJoiner>,
    alert_limiter: Arc<AlertRateLimiter>,
    metrics: Arc<PipelineMetrics>,
    processed: AtomicU64,
}

impl<S: StateStore + 'static> PipelineOrchestrator<S> {
    pub fn new(config: PipelineConfig, state_store: Arc<S>, metrics: Arc<PipelineMetrics>) -> Arc<Self> {
        let alert_limiter = Arc::new(AlertRateLimiter::new(config.max_alerts_per_minute));
        Arc::new(Self {
            scoring_config: ScoringConfig::default(),
            feature_store: Arc::new(FeatureStoreFacade::new()),
            aggregator: Arc::new(WindowedAggregator::new()),
            joiner: Arc::new(StreamJoiner::new()),
            alert_limiter,
            config,
            state_store,
            metrics,
            processed: AtomicU64::new(0),
        })
    }

    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn aggregator(&self) -> &WindowedAggregator {
        &self.aggregator
    }

    pub fn joiner(&self) -> &StreamJoiner {
        &self.joiner
    }

    /// Drive the pipeline until `source` is exhausted: decode on the main
    /// loop (cheap, CPU-only), route by `hash(user_id) % parallelism` into
    /// per-worker channels, and run a checkpoint barrier alongside.
    pub async fn run<Src, Sink1, Sink2, Sink3>(
        self: Arc<Self>,
        mut source: Src,
        enriched_sink: Sink1,
        alert_sink: Sink2,
        feature_sink: Sink3,
    ) where
        Src: RecordSource + 'static,
        Sink1: RecordSink + Clone + 'static,
        Sink2: RecordSink + Clone + 'static,
        Sink3: RecordSink + Clone + 'static,
    {
        let parallelism = self.config.parallelism.max(1);
        let mut senders = Vec::with_capacity(parallelism);
        let mut handles = Vec::with_capacity(parallelism);

        for _ in 0..parallelism {
            let (tx, rx) = mpsc::channel::<Transaction>(1024);
            senders.push(tx);
            let orchestrator = Arc::clone(&self);
            let enriched_sink = enriched_sink.clone();
            let alert_sink = alert_sink.clone();
            let feature_sink = feature_sink.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.run_worker(rx, enriched_sink, alert_sink, feature_sink).await;
            }));
        }

        let checkpoint_orchestrator = Arc::clone(&self);
        let checkpoint_handle = tokio::spawn(async move {
            checkpoint_orchestrator.run_checkpoint_barrier().await;
        });

        while let Some(raw) = source.next().await {
            match decode(&raw) {
                Decoded::Ok(tx) => {
                    let worker = (hash_user_id(&tx.user_id) as usize) % parallelism;
                    if senders[worker].send(tx).await.is_err() {
                        tracing::error!(worker, "worker channel closed, dropping transaction");
                    }
                }
                Decoded::ErrorPlaceholder(record) => {
                    self.metrics.decode_errors.inc();
                    let _ = enriched_sink.send(encode_enriched(&record)).await;
                }
            }
        }

        drop(senders);
        for handle in handles {
            let _ = handle.await;
        }
        checkpoint_handle.abort();
    }

    async fn run_worker<Sink1, Sink2, Sink3>(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<Transaction>,
        enriched_sink: Sink1,
        alert_sink: Sink2,
        feature_sink: Sink3,
    ) where
        Sink1: RecordSink,
        Sink2: RecordSink,
        Sink3: RecordSink,
    {
        while let Some(tx) = rx.recv().await {
            self.process_one(&tx, &enriched_sink, &alert_sink, &feature_sink).await;
        }
    }

    /// Decode → enrich → score → join → sink for one transaction. Every
    /// suspension point here (profile reads, velocity writes, sink sends)
    /// is scoped to the worker that owns this user's partition.
    pub async fn process_one(
        &self,
        tx: &Transaction,
        enriched_sink: &impl RecordSink,
        alert_sink: &impl RecordSink,
        feature_sink: &impl RecordSink,
    ) {
        let start = Instant::now();
        let profile_cache = ProfileCache::new(Arc::clone(&self.state_store));
        let velocity_updater = VelocityUpdater::new(Arc::clone(&self.state_store));

        // `None` here is a genuine cache miss, fed to the Feature Extractor
        // as-is so its §4.4 unknown-entity overrides apply (distinct from
        // the §4.3 profile defaults synthesized below for the enriched
        // output and the joiner's merchant-category key).
        let user_profile = profile_cache.get_user(&tx.user_id).await;
        let merchant_profile = profile_cache.get_merchant(&tx.merchant_id).await;

        let counters = velocity_updater
            .record(&tx.transaction_id, &tx.user_id, &tx.merchant_id, tx.amount)
            .await;
        let velocity = VelocitySnapshot {
            five_min: Some(counters[0]),
            one_hour: Some(counters[1]),
            twenty_four_hour: Some(counters[2]),
        };

        let features = FeatureExtractor::extract(tx, user_profile.as_ref(), merchant_profile.as_ref(), &velocity);

        if self.config.enable_feature_store {
            self.feature_store
                .store_feature_values(&tx.transaction_id, EntityType::Transaction, 1, features.clone());
        }

        let outcome = if self.config.enable_real_time_scoring {
            RuleScorer::score(&features, tx.prior_fraud_score, &self.scoring_config)
        } else {
            fraud_core::ScoredOutcome::error_placeholder()
        };

        let merchant_category = merchant_profile.as_ref().map(|m| m.category.as_str()).unwrap_or("unknown");
        let risk_factors = self.joiner.join(tx, merchant_category);

        let user_profile = user_profile.unwrap_or_else(UserProfile::default_on_miss);
        let merchant_profile = merchant_profile.unwrap_or_else(MerchantProfile::default_on_miss);

        let enriched = fraud_core::EnrichedTransaction {
            transaction: tx.clone(),
            user_profile: Some(user_profile),
            merchant_profile: Some(merchant_profile),
            features: features.clone(),
            fraud_score: outcome.fraud_score,
            risk_level: outcome.risk_level,
            decision: outcome.decision,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            risk_factors,
        };

        self.processed.fetch_add(1, Ordering::Relaxed);
        self.metrics.transactions_processed.inc();
        self.metrics
            .transactions_by_decision
            .with_label_values(&[enriched.decision.as_str()])
            .inc();
        self.metrics.scoring_latency_ms.observe(enriched.processing_time_ms);

        for eager in self.aggregator.ingest(&AggInput::from_enriched(&enriched)) {
            tracing::debug!(?eager, "windowed aggregate emitted eagerly mid-stream");
        }

        if self.config.enable_alerting && enriched.is_alertable(self.config.fraud_threshold) {
            if self.alert_limiter.try_acquire().await {
                let payload = format!(
                    "ALERT transaction_id={} fraud_score={:.3} decision={}",
                    enriched.transaction.transaction_id,
                    enriched.fraud_score.value(),
                    enriched.decision.as_str(),
                );
                if alert_sink.send(payload).await.is_ok() {
                    self.metrics.alerts_emitted.inc();
                }
            } else {
                self.metrics.alerts_rate_limited.inc();
            }
        }

        let feature_record = FeatureRecord {
            entity_id: tx.transaction_id.clone(),
            entity_type: EntityType::Transaction,
            timestamp: Utc::now(),
            version: 1,
            feature_map: features,
        };
        let _ = feature_sink.send(encode_feature_record(&feature_record)).await;
        let _ = enriched_sink.send(encode_enriched(&enriched)).await;
    }

    /// Tick every `checkpoint-interval` ms: advance the watermark past the
    /// bounded out-of-orderness window, close whatever aggregates that
    /// passes, evict stale joiner state, and record checkpoint metrics.
    /// Aggregator accumulator state itself is not checkpointed — it lives
    /// until window close and simply re-emits on replay (§5).
    async fn run_checkpoint_barrier(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(StdDuration::from_millis(self.config.checkpoint_interval_ms.max(1)));
        loop {
            ticker.tick().await;
            let watermark = Utc::now()
                - chrono::Duration::from_std(DEFAULT_BOUNDED_OUT_OF_ORDERNESS).unwrap_or_default();
            let emitted = self.aggregator.advance_watermark(watermark);
            for aggregate in emitted {
                tracing::debug!(?aggregate, "windowed aggregate emitted");
            }
            self.joiner.evict_before(watermark);
            self.metrics.checkpoints_completed.inc();
            self.metrics
                .watermark_lag_seconds
                .set(Utc::now().signed_duration_since(watermark).num_seconds());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_stream::ChannelSink;
    use crate::state_store::InMemoryStateStore;
    use crate::PipelineMetrics;

    fn sample_config() -> PipelineConfig {
        PipelineConfig::default()
            .with_kafka_brokers(vec!["broker1:9092".to_string()])
            .with_consumer_group_id("fraud-scorer")
            .with_redis("localhost", 6379, None)
            .with_parallelism(2)
    }

    fn sample_transaction() -> Transaction {
        Transaction {
            transaction_id: "t1".into(),
            user_id: "u1".into(),
            merchant_id: "m1".into(),
            amount: 42.5,
            currency: "USD".into(),
            timestamp: Utc::now(),
            payment_method: "credit_card".into(),
            card_type: "visa".into(),
            transaction_type: "purchase".into(),
            ip_address: "10.0.0.1".into(),
            user_agent: "test".into(),
            device_fingerprint: "d1".into(),
            geolocation: None,
            merchant_location: None,
            hour_of_day: Some(14),
            is_weekend: Some(false),
            is_fraud: None,
            prior_fraud_score: None,
        }
    }

    #[tokio::test]
    async fn process_one_routes_output_to_all_three_sinks() {
        let orchestrator = PipelineOrchestrator::new(
            sample_config(),
            Arc::new(InMemoryStateStore::new()),
            PipelineMetrics::new(),
        );
        let (enriched_sink, mut enriched_rx) = ChannelSink::channel(4);
        let (alert_sink, _alert_rx) = ChannelSink::channel(4);
        let (feature_sink, mut feature_rx) = ChannelSink::channel(4);

        orchestrator
            .process_one(&sample_transaction(), &enriched_sink, &alert_sink, &feature_sink)
            .await;

        assert!(enriched_rx.recv().await.is_some());
        assert!(feature_rx.recv().await.is_some());
        assert_eq!(orchestrator.processed_count(), 1);
    }

    #[tokio::test]
    async fn blacklisted_merchant_emits_an_alert() {
        let orchestrator = PipelineOrchestrator::new(
            sample_config(),
            Arc::new(InMemoryStateStore::new()),
            PipelineMetrics::new(),
        );
        let store = Arc::clone(&orchestrator.state_store);
        let cache = ProfileCache::new(store);
        let mut blacklisted = fraud_core::MerchantProfile::default_on_miss();
        blacklisted.is_blacklisted = true;
        cache.put_merchant("m1", &blacklisted).await;

        let (enriched_sink, mut enriched_rx) = ChannelSink::channel(4);
        let (alert_sink, mut alert_rx) = ChannelSink::channel(4);
        let (feature_sink, _feature_rx) = ChannelSink::channel(4);

        orchestrator
            .process_one(&sample_transaction(), &enriched_sink, &alert_sink, &feature_sink)
            .await;

        assert!(enriched_rx.recv().await.is_some());
        let alert = alert_rx.recv().await.expect("blacklisted merchant should alert");
        assert!(alert.contains("DECLINE"));
    }

    #[tokio::test]
    async fn alert_rate_limiter_caps_bursts() {
        let limiter = AlertRateLimiter::new(2);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }
}
