//! Benchmarks for the codec's decode/encode path.
//!
//! Target SLO: decode+encode well under the 50ms-per-event feature-extraction
//! budget, since they sit upstream of it on every record.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fraud_core::{decode, encode_enriched, Decision, EnrichedTransaction, FraudScore, RiskLevel, Transaction};

fn sample_transaction_json() -> String {
    serde_json::json!({
        "transaction_id": "t-bench",
        "user_id": "u-bench",
        "merchant_id": "m-bench",
        "amount": 128.40,
        "currency": "USD",
        "timestamp": Utc::now(),
        "payment_method": "credit_card",
        "card_type": "visa",
        "transaction_type": "purchase",
        "ip_address": "10.0.0.5",
        "user_agent": "Mozilla/5.0",
        "device_fingerprint": "fp-bench",
    })
    .to_string()
}

fn sample_enriched() -> EnrichedTransaction {
    let tx: Transaction = serde_json::from_str(&sample_transaction_json()).unwrap();
    EnrichedTransaction {
        transaction: tx,
        user_profile: None,
        merchant_profile: None,
        features: Default::default(),
        fraud_score: FraudScore::new(0.12),
        risk_level: RiskLevel::VeryLow,
        decision: Decision::Approve,
        processing_time_ms: 2.3,
        risk_factors: Default::default(),
    }
}

fn bench_decode(c: &mut Criterion) {
    let raw = sample_transaction_json();
    c.bench_function("codec_decode", |b| {
        b.iter(|| {
            black_box(decode(black_box(&raw)));
        });
    });
}

fn bench_encode(c: &mut Criterion) {
    let record = sample_enriched();
    c.bench_function("codec_encode_enriched", |b| {
        b.iter(|| {
            black_box(encode_enriched(black_box(&record)));
        });
    });
}

fn bench_decode_encode_round_trip(c: &mut Criterion) {
    let raw = sample_transaction_json();
    c.bench_function("codec_round_trip", |b| {
        b.iter(|| {
            let decoded = decode(black_box(&raw));
            if let fraud_core::Decoded::Ok(tx) = decoded {
                let record = EnrichedTransaction {
                    transaction: tx,
                    user_profile: None,
                    merchant_profile: None,
                    features: Default::default(),
                    fraud_score: FraudScore::new(0.1),
                    risk_level: RiskLevel::VeryLow,
                    decision: Decision::Approve,
                    processing_time_ms: 1.0,
                    risk_factors: Default::default(),
                };
                black_box(encode_enriched(&record));
            }
        });
    });
}

criterion_group!(benches, bench_decode, bench_encode, bench_decode_encode_round_trip);
criterion_main!(benches);
