use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fraud_core::{MerchantProfile, Transaction, UserProfile};
use scoring_engine::{FeatureExtractor, RuleScorer, ScoringConfig, VelocitySnapshot};

fn sample_transaction() -> Transaction {
    Transaction {
        transaction_id: "bench-tx".into(),
        user_id: "bench-user".into(),
        merchant_id: "bench-merchant".into(),
        amount: 128.40,
        currency: "USD".into(),
        timestamp: Utc::now(),
        payment_method: "credit_card".into(),
        card_type: "visa".into(),
        transaction_type: "purchase".into(),
        ip_address: "203.0.113.5".into(),
        user_agent: "Mozilla/5.0".into(),
        device_fingerprint: "fp-bench".into(),
        geolocation: None,
        merchant_location: None,
        hour_of_day: None,
        is_weekend: None,
        is_fraud: None,
        prior_fraud_score: None,
    }
}

fn bench_feature_extraction(c: &mut Criterion) {
    let tx = sample_transaction();
    let user = UserProfile::default_on_miss();
    let merchant = MerchantProfile::default_on_miss();
    let velocity = VelocitySnapshot::default();

    c.bench_function("feature_extraction", |b| {
        b.iter(|| black_box(FeatureExtractor::extract(black_box(&tx), Some(&user), Some(&merchant), &velocity)));
    });
}

fn bench_rule_scoring(c: &mut Criterion) {
    let tx = sample_transaction();
    let features = FeatureExtractor::extract(&tx, None, None, &VelocitySnapshot::default());
    let config = ScoringConfig::default();

    c.bench_function("rule_scoring", |b| {
        b.iter(|| black_box(RuleScorer::score(black_box(&features), None, &config)));
    });
}

fn bench_extract_and_score_by_risk_tier(c: &mut Criterion) {
    let config = ScoringConfig::default();
    let mut group = c.benchmark_group("risk_tiers");

    let low_risk_tx = sample_transaction();
    let user = UserProfile::default_on_miss();
    group.bench_with_input(BenchmarkId::new("extract_and_score", "low_risk"), &low_risk_tx, |b, tx| {
        b.iter(|| {
            let features = FeatureExtractor::extract(tx, Some(&user), None, &VelocitySnapshot::default());
            RuleScorer::score(&features, None, &config)
        });
    });

    let mut high_risk_tx = sample_transaction();
    high_risk_tx.amount = 9_999.0;
    let mut high_risk_merchant = MerchantProfile::default_on_miss();
    high_risk_merchant.is_blacklisted = true;
    group.bench_with_input(BenchmarkId::new("extract_and_score", "blacklisted_merchant"), &high_risk_tx, |b, tx| {
        b.iter(|| {
            let features = FeatureExtractor::extract(tx, None, Some(&high_risk_merchant), &VelocitySnapshot::default());
            RuleScorer::score(&features, None, &config)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_feature_extraction, bench_rule_scoring, bench_extract_and_score_by_risk_tier);
criterion_main!(benches);
