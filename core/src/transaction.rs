use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feature::FeatureMap;
use crate::profile::{MerchantProfile, UserProfile};
use crate::types::{Decision, FraudScore, RiskLevel};

/// Geographic coordinate, used for both transaction and merchant locations (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A raw transaction record as decoded from the input stream (§3). Immutable
/// after decode — enrichment state lives alongside it in `EnrichedTransaction`,
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub user_id: String,
    pub merchant_id: String,
    pub amount: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub payment_method: String,
    pub card_type: String,
    pub transaction_type: String,
    pub ip_address: String,
    pub user_agent: String,
    pub device_fingerprint: String,
    #[serde(default)]
    pub geolocation: Option<GeoPoint>,
    #[serde(default)]
    pub merchant_location: Option<GeoPoint>,
    #[serde(default)]
    pub hour_of_day: Option<u32>,
    #[serde(default)]
    pub is_weekend: Option<bool>,
    /// Evaluation-only label; never consulted by the scorer.
    #[serde(default)]
    pub is_fraud: Option<bool>,
    /// Pre-existing fraud score carried on the record, if any (§4.5's `S_p`).
    #[serde(default)]
    pub prior_fraud_score: Option<f64>,
}

impl Transaction {
    pub fn hour_of_day(&self) -> u32 {
        self.hour_of_day.unwrap_or_else(|| self.timestamp.format("%H").to_string().parse().unwrap_or(0))
    }

    pub fn is_weekend(&self) -> bool {
        use chrono::Datelike;
        self.is_weekend.unwrap_or_else(|| {
            matches!(self.timestamp.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
        })
    }
}

/// A transaction after the enrich → extract → score stages have run (§3).
/// Produced once per input record and frozen before emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedTransaction {
    pub transaction: Transaction,
    pub user_profile: Option<UserProfile>,
    pub merchant_profile: Option<MerchantProfile>,
    pub features: FeatureMap,
    pub fraud_score: FraudScore,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    pub processing_time_ms: f64,
    /// Named risk-factor increments contributed by the Stream Joiner (§4.8).
    /// Informational context, not re-folded into `fraud_score`.
    #[serde(default)]
    pub risk_factors: HashMap<String, f64>,
}

impl EnrichedTransaction {
    pub fn is_alertable(&self, fraud_threshold: f64) -> bool {
        self.fraud_score.value() > fraud_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            transaction_id: "t1".into(),
            user_id: "u1".into(),
            merchant_id: "m1".into(),
            amount: 42.50,
            currency: "USD".into(),
            timestamp: "2024-01-15T14:00:00Z".parse().unwrap(),
            payment_method: "credit_card".into(),
            card_type: "visa".into(),
            transaction_type: "purchase".into(),
            ip_address: "192.168.1.1".into(),
            user_agent: "Mozilla/5.0 (compatible)".into(),
            device_fingerprint: "fp-1".into(),
            geolocation: None,
            merchant_location: None,
            hour_of_day: None,
            is_weekend: None,
            is_fraud: None,
            prior_fraud_score: None,
        }
    }

    #[test]
    fn derives_hour_of_day_from_timestamp_when_absent() {
        assert_eq!(sample().hour_of_day(), 14);
    }

    #[test]
    fn explicit_hour_of_day_takes_precedence() {
        let mut t = sample();
        t.hour_of_day = Some(23);
        assert_eq!(t.hour_of_day(), 23);
    }

    #[test]
    fn weekend_derived_from_timestamp() {
        // 2024-01-15 is a Monday.
        assert!(!sample().is_weekend());
    }
}
