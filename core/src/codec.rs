//! Bidirectional text-format (JSON) mapping between wire records and the
//! structured types in §3 (C1, §4.1). Decode never fails the stream: a
//! malformed record becomes a well-typed placeholder. Encode is total.

use chrono::Utc;
use uuid::Uuid;

use crate::feature::FeatureRecord;
use crate::transaction::{EnrichedTransaction, Transaction};
use crate::types::ScoredOutcome;

/// Result of decoding one input record: either a well-formed `Transaction`,
/// or an `ErrorPlaceholder` already carrying the final, scored record that
/// downstream stages should emit unchanged (§9 Design Notes,
/// "Error-as-control-flow"). Downstream stages match on this rather than
/// inspecting sentinel fields on an otherwise-valid `Transaction`.
#[derive(Debug, Clone)]
pub enum Decoded {
    Ok(Transaction),
    ErrorPlaceholder(EnrichedTransaction),
}

/// Build the placeholder record emitted on decode failure (§4.1, §7): a
/// freshly-id'd transaction, `fraud_score=0.5`, `risk_level=ERROR`,
/// `decision=REVIEW`.
pub fn error_placeholder(reason: &str) -> EnrichedTransaction {
    let now = Utc::now();
    let outcome = ScoredOutcome::error_placeholder();
    let transaction = Transaction {
        transaction_id: format!("ERROR_{}", Uuid::new_v4()),
        user_id: String::new(),
        merchant_id: String::new(),
        amount: 0.0,
        currency: String::new(),
        timestamp: now,
        payment_method: String::new(),
        card_type: String::new(),
        transaction_type: String::new(),
        ip_address: String::new(),
        user_agent: String::new(),
        device_fingerprint: String::new(),
        geolocation: None,
        merchant_location: None,
        hour_of_day: None,
        is_weekend: None,
        is_fraud: None,
        prior_fraud_score: None,
    };
    tracing::warn!(reason, transaction_id = %transaction.transaction_id, "decode failed, emitting placeholder");
    EnrichedTransaction {
        transaction,
        user_profile: None,
        merchant_profile: None,
        features: Default::default(),
        fraud_score: outcome.fraud_score,
        risk_level: outcome.risk_level,
        decision: outcome.decision,
        processing_time_ms: 0.0,
        risk_factors: Default::default(),
    }
}

/// Decode one raw input record (§4.1). Never returns an `Err` — malformed
/// input becomes `Decoded::ErrorPlaceholder`.
pub fn decode(raw: &str) -> Decoded {
    match serde_json::from_str::<Transaction>(raw) {
        Ok(tx) => Decoded::Ok(tx),
        Err(e) => Decoded::ErrorPlaceholder(error_placeholder(&e.to_string())),
    }
}

/// Encode an enriched transaction for the `enriched` output stream (§4.1, §6).
/// On serialization failure, falls back to a minimal record rather than
/// dropping the event.
pub fn encode_enriched(record: &EnrichedTransaction) -> String {
    match serde_json::to_string(record) {
        Ok(s) => s,
        Err(e) => encode_failure_record(&record.transaction.transaction_id, &e.to_string()),
    }
}

/// Encode a feature record for the `features` output stream (§4.1, §6).
pub fn encode_feature_record(record: &FeatureRecord) -> String {
    match serde_json::to_string(record) {
        Ok(s) => s,
        Err(e) => encode_failure_record(&record.entity_id, &e.to_string()),
    }
}

/// Minimal record produced when encode itself fails (§4.1): encode is total,
/// so the stream never breaks on a bad outbound record either.
fn encode_failure_record(transaction_id: &str, reason: &str) -> String {
    serde_json::json!({
        "transaction_id": transaction_id,
        "error": "serialization_failed",
        "detail": reason,
        "timestamp": Utc::now(),
    })
    .to_string()
}
