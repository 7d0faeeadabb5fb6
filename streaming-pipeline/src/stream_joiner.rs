//! Stream Joiner (C8, §4.8): three window-bounded joins of a transaction
//! against side-input streams, each contributing named risk-factor
//! increments rather than re-scoring directly. Side-input state is folded
//! with OR/max — commutative, order-independent — exactly like the Windowed
//! Aggregator's accumulators, so a late-arriving side event never needs to
//! be reconciled against arrival order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fraud_core::Transaction;

const USER_BEHAVIOR_WINDOW_SECONDS: i64 = 5 * 60;
const MERCHANT_UPDATE_WINDOW_SECONDS: i64 = 10 * 60;
const HISTORICAL_PATTERN_WINDOW_SECONDS: i64 = 60 * 60;

/// A behavioral-analytics side event for a user (login cadence, session
/// shape, navigation sequence), joined against transactions by `user_id`.
#[derive(Debug, Clone)]
pub struct UserBehaviorEvent {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub recent_login_anomaly: bool,
    pub session_duration_anomaly: bool,
    pub navigation_pattern_anomaly: bool,
}

/// A merchant risk-posture update, joined against transactions by `merchant_id`.
#[derive(Debug, Clone)]
pub struct MerchantUpdateEvent {
    pub merchant_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_increased: bool,
    pub fraud_rate_increased: bool,
    pub newly_blacklisted: bool,
}

/// A historical fraud-pattern summary, joined against transactions on
/// `(payment_method, merchant_category, floor(amount/100)*100)`.
#[derive(Debug, Clone)]
pub struct HistoricalPattern {
    pub payment_method: String,
    pub merchant_category: String,
    pub reference_amount: f64,
    pub reference_hour: u32,
    pub fraud_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct UserBehaviorAcc {
    recent_login_anomaly: bool,
    session_duration_anomaly: bool,
    navigation_pattern_anomaly: bool,
}

#[derive(Default)]
struct MerchantUpdateAcc {
    risk_increased: bool,
    fraud_rate_increased: bool,
    newly_blacklisted: bool,
}

#[derive(Default)]
struct HistoricalPatternAcc {
    occurrences: u64,
    max_fraud_rate: f64,
    reference_amount: f64,
    reference_hour: u32,
}

fn tumbling_bucket(ts: DateTime<Utc>, size_seconds: i64) -> i64 {
    (ts.timestamp() / size_seconds) * size_seconds
}

fn amount_bucket_key(amount: f64) -> i64 {
    ((amount / 100.0).floor() * 100.0) as i64
}

/// Worker-local buffers for the three side-input joins, keyed by
/// `(join key, tumbling window start)`.
pub struct StreamJoiner {
    user_behavior: DashMap<(String, i64), UserBehaviorAcc>,
    merchant_update: DashMap<(String, i64), MerchantUpdateAcc>,
    historical_pattern: DashMap<(String, String, i64, i64), HistoricalPatternAcc>,
}

impl Default for StreamJoiner {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamJoiner {
    pub fn new() -> Self {
        Self {
            user_behavior: DashMap::new(),
            merchant_update: DashMap::new(),
            historical_pattern: DashMap::new(),
        }
    }

    pub fn ingest_user_behavior(&self, event: &UserBehaviorEvent) {
        let bucket = tumbling_bucket(event.timestamp, USER_BEHAVIOR_WINDOW_SECONDS);
        let mut acc = self
            .user_behavior
            .entry((event.user_id.clone(), bucket))
            .or_default();
        acc.recent_login_anomaly |= event.recent_login_anomaly;
        acc.session_duration_anomaly |= event.session_duration_anomaly;
        acc.navigation_pattern_anomaly |= event.navigation_pattern_anomaly;
    }

    pub fn ingest_merchant_update(&self, event: &MerchantUpdateEvent) {
        let bucket = tumbling_bucket(event.timestamp, MERCHANT_UPDATE_WINDOW_SECONDS);
        let mut acc = self
            .merchant_update
            .entry((event.merchant_id.clone(), bucket))
            .or_default();
        acc.risk_increased |= event.risk_increased;
        acc.fraud_rate_increased |= event.fraud_rate_increased;
        acc.newly_blacklisted |= event.newly_blacklisted;
    }

    pub fn ingest_historical_pattern(&self, pattern: &HistoricalPattern) {
        let bucket = tumbling_bucket(pattern.timestamp, HISTORICAL_PATTERN_WINDOW_SECONDS);
        let key = (
            pattern.payment_method.clone(),
            pattern.merchant_category.clone(),
            amount_bucket_key(pattern.reference_amount),
            bucket,
        );
        let mut acc = self.historical_pattern.entry(key).or_default();
        acc.occurrences += 1;
        acc.max_fraud_rate = acc.max_fraud_rate.max(pattern.fraud_rate);
        acc.reference_amount = pattern.reference_amount;
        acc.reference_hour = pattern.reference_hour;
    }

    /// Join `transaction` against whatever side-input state the current
    /// window holds, returning named risk-factor increments (§4.8). An
    /// empty map means none of the three joins matched anything.
    pub fn join(&self, transaction: &Transaction, merchant_category: &str) -> HashMap<String, f64> {
        let mut factors = HashMap::new();

        let ub_bucket = tumbling_bucket(transaction.timestamp, USER_BEHAVIOR_WINDOW_SECONDS);
        if let Some(acc) = self.user_behavior.get(&(transaction.user_id.clone(), ub_bucket)) {
            if acc.recent_login_anomaly {
                factors.insert("recent_login_anomaly".to_string(), 0.3);
            }
            if acc.session_duration_anomaly {
                factors.insert("session_duration_anomaly".to_string(), 0.2);
            }
            if acc.navigation_pattern_anomaly {
                factors.insert("navigation_pattern_anomaly".to_string(), 0.25);
            }
        }

        let mu_bucket = tumbling_bucket(transaction.timestamp, MERCHANT_UPDATE_WINDOW_SECONDS);
        if let Some(acc) = self.merchant_update.get(&(transaction.merchant_id.clone(), mu_bucket)) {
            if acc.risk_increased {
                factors.insert("merchant_risk_increase".to_string(), 0.4);
            }
            if acc.fraud_rate_increased {
                factors.insert("merchant_fraud_rate_increase".to_string(), 0.3);
            }
            if acc.newly_blacklisted {
                factors.insert("merchant_newly_blacklisted".to_string(), 0.8);
            }
        }

        let hp_bucket = tumbling_bucket(transaction.timestamp, HISTORICAL_PATTERN_WINDOW_SECONDS);
        let hp_key = (
            transaction.payment_method.clone(),
            merchant_category.to_string(),
            amount_bucket_key(transaction.amount),
            hp_bucket,
        );
        if let Some(acc) = self.historical_pattern.get(&hp_key) {
            let sim = pattern_similarity(
                transaction.amount,
                acc.reference_amount,
                transaction.hour_of_day(),
                acc.reference_hour,
            );
            factors.insert(
                "historical_pattern_similarity".to_string(),
                sim * acc.max_fraud_rate,
            );
            if sim > 0.7 && acc.max_fraud_rate > 0.3 {
                factors.insert("recent_high_fraud_pattern".to_string(), 0.4);
            }
            if acc.occurrences > 10 {
                factors.insert("frequent_fraud_pattern".to_string(), 0.3);
            }
        }

        factors
    }

    /// Drop buffered side-input state strictly older than `watermark` minus
    /// the widest join window, bounding memory for long-running workers.
    pub fn evict_before(&self, watermark: DateTime<Utc>) {
        let cutoff = watermark.timestamp() - HISTORICAL_PATTERN_WINDOW_SECONDS;
        self.user_behavior.retain(|(_, bucket), _| *bucket + USER_BEHAVIOR_WINDOW_SECONDS >= cutoff);
        self.merchant_update.retain(|(_, bucket), _| *bucket + MERCHANT_UPDATE_WINDOW_SECONDS >= cutoff);
        self.historical_pattern
            .retain(|(_, _, _, bucket), _| *bucket + HISTORICAL_PATTERN_WINDOW_SECONDS >= cutoff);
    }
}

/// `0.3·(same payment_method) + 0.4·(1 − amount_diff/max(a,b)) + 0.3·(1 − hour_diff/12)`,
/// clamped to `[0,1]` (§4.8). Payment method always matches here since it is
/// part of the join key, so that term is a constant contribution.
fn pattern_similarity(tx_amount: f64, reference_amount: f64, tx_hour: u32, reference_hour: u32) -> f64 {
    let amount_component = {
        let max = tx_amount.abs().max(reference_amount.abs()).max(1e-9);
        let amount_diff = (tx_amount - reference_amount).abs();
        1.0 - (amount_diff / max)
    };
    let hour_diff = (tx_hour as i64 - reference_hour as i64).unsigned_abs() as f64;
    let hour_component = 1.0 - (hour_diff / 12.0);
    (0.3 + 0.4 * amount_component + 0.3 * hour_component).clamp(0.0, 1.0)
}
