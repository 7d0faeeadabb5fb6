//! Windowed Aggregator (C7, §4.7): event-time tumbling, sliding, and session
//! windows over seven independent accumulators. Each accumulator only ever
//! folds in commutative/associative operations (count, sum, set-union,
//! min/max) so merges and replays can never depend on arrival order (§5).
//! Accumulators are worker-local `DashMap` entries, keyed by partition key
//! plus window-start epoch millis; `advance_watermark` closes and emits
//! whichever windows the new watermark has passed.

use std::collections::HashSet;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fraud_core::{
    AggregateOutput, AmountClusterAggregate, Decision, EnrichedTransaction, FraudPatternAggregate,
    GeoPoint, GeographicAggregate, HighFrequencyAlert, MerchantAggregate, RiskLevel,
    UserSessionAggregate, UserVelocityAggregate,
};

const USER_VELOCITY_SIZE: i64 = 5 * 60;
const USER_VELOCITY_SLIDE: i64 = 60;
const MERCHANT_SIZE: i64 = 60 * 60;
const SESSION_GAP: i64 = 30 * 60;
const GEOGRAPHIC_SIZE: i64 = 15 * 60;
const FRAUD_PATTERN_SIZE: i64 = 10 * 60;
const FRAUD_PATTERN_SLIDE: i64 = 2 * 60;
const HIGH_FREQUENCY_SIZE: i64 = 5 * 60;
const HIGH_FREQUENCY_TRIGGER_EVERY: u64 = 10;
const AMOUNT_CLUSTER_SIZE: i64 = 30 * 60;

pub const DEFAULT_BOUNDED_OUT_OF_ORDERNESS: StdDuration = StdDuration::from_secs(10);
pub const HIGH_FREQUENCY_BOUNDED_OUT_OF_ORDERNESS: StdDuration = StdDuration::from_secs(5);
pub const ALLOWED_LATENESS: StdDuration = StdDuration::from_secs(30);

/// The slice of an `EnrichedTransaction` the aggregator actually needs,
/// decoupled from the codec's wire shape so accumulators stay cheap to test.
#[derive(Debug, Clone)]
pub struct AggInput {
    pub user_id: String,
    pub merchant_id: String,
    pub merchant_category: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub payment_method: String,
    pub geolocation: Option<GeoPoint>,
    pub decision: Decision,
    pub risk_level: RiskLevel,
}

impl AggInput {
    pub fn from_enriched(record: &EnrichedTransaction) -> Self {
        let merchant_category = record
            .merchant_profile
            .as_ref()
            .map(|m| m.category.clone())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            user_id: record.transaction.user_id.clone(),
            merchant_id: record.transaction.merchant_id.clone(),
            merchant_category,
            amount: record.transaction.amount,
            timestamp: record.transaction.timestamp,
            payment_method: record.transaction.payment_method.clone(),
            geolocation: record.transaction.geolocation,
            decision: record.decision,
            risk_level: record.risk_level,
        }
    }

    fn is_fraud(&self) -> bool {
        self.decision == Decision::Decline
    }

    fn is_high_risk(&self) -> bool {
        matches!(self.risk_level, RiskLevel::High | RiskLevel::Critical)
    }
}

fn epoch_seconds(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

fn from_epoch(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_else(Utc::now)
}

fn tumbling_bucket(ts: DateTime<Utc>, size_seconds: i64) -> i64 {
    (epoch_seconds(ts) / size_seconds) * size_seconds
}

/// Every tumbling bucket start that a sliding window of `size`/`slide`
/// contains `ts` in — the standard Flink-style sliding fan-out.
fn sliding_buckets(ts: DateTime<Utc>, size_seconds: i64, slide_seconds: i64) -> Vec<i64> {
    let aligned = (epoch_seconds(ts) / slide_seconds) * slide_seconds;
    let count = size_seconds / slide_seconds;
    (0..count)
        .map(|k| aligned - k * slide_seconds)
        .filter(|&start| {
            let s = epoch_seconds(ts);
            s >= start && s < start + size_seconds
        })
        .collect()
}

/// `micro(<10), small(<100), medium(<500), large(<2000), very_large(<10000), extreme` (§4.7).
fn amount_bucket(amount: f64) -> &'static str {
    if amount < 10.0 {
        "micro"
    } else if amount < 100.0 {
        "small"
    } else if amount < 500.0 {
        "medium"
    } else if amount < 2000.0 {
        "large"
    } else if amount < 10_000.0 {
        "very_large"
    } else {
        "extreme"
    }
}

fn geo_bucket(geo: Option<GeoPoint>) -> String {
    match geo {
        Some(g) => format!("{},{}", g.lat.floor() as i64, g.lon.floor() as i64),
        None => "unknown".to_string(),
    }
}

fn log10_bucket(amount: f64) -> i32 {
    amount.max(1.0).log10().floor() as i32
}

struct UserVelocityAcc {
    window_start: i64,
    transaction_count: u64,
    total_amount: f64,
    fraud_count: u64,
    high_risk_count: u64,
    merchants: HashSet<String>,
    payment_methods: HashSet<String>,
}

impl UserVelocityAcc {
    fn new(window_start: i64) -> Self {
        Self {
            window_start,
            transaction_count: 0,
            total_amount: 0.0,
            fraud_count: 0,
            high_risk_count: 0,
            merchants: HashSet::new(),
            payment_methods: HashSet::new(),
        }
    }

    fn merge(&mut self, input: &AggInput) {
        self.transaction_count += 1;
        self.total_amount += input.amount;
        if input.is_fraud() {
            self.fraud_count += 1;
        }
        if input.is_high_risk() {
            self.high_risk_count += 1;
        }
        self.merchants.insert(input.merchant_id.clone());
        self.payment_methods.insert(input.payment_method.clone());
    }

    fn velocity_score(&self) -> f64 {
        let count = self.transaction_count;
        let mut score = 0.0;
        score += if count > 20 {
            0.4
        } else if count > 10 {
            0.2
        } else if count > 5 {
            0.1
        } else {
            0.0
        };
        score += if self.total_amount > 10_000.0 {
            0.3
        } else if self.total_amount > 5_000.0 {
            0.2
        } else if self.total_amount > 1_000.0 {
            0.1
        } else {
            0.0
        };
        let fraud_rate = if count > 0 { self.fraud_count as f64 / count as f64 } else { 0.0 };
        score += 0.4 * fraud_rate;
        if count > 0 && (self.merchants.len() as f64 / count as f64) < 0.2 {
            score += 0.2;
        }
        score.min(1.0)
    }

    fn into_output(self, user_id: String) -> AggregateOutput {
        let window_start = from_epoch(self.window_start);
        let window_end = window_start + Duration::seconds(USER_VELOCITY_SIZE);
        let avg_amount = if self.transaction_count > 0 {
            self.total_amount / self.transaction_count as f64
        } else {
            0.0
        };
        let fraud_rate = if self.transaction_count > 0 {
            self.fraud_count as f64 / self.transaction_count as f64
        } else {
            0.0
        };
        let velocity_score = self.velocity_score();
        AggregateOutput::UserVelocity(UserVelocityAggregate {
            user_id,
            window_start,
            window_end,
            transaction_count: self.transaction_count,
            total_amount: self.total_amount,
            fraud_count: self.fraud_count,
            high_risk_count: self.high_risk_count,
            unique_merchants: self.merchants.len() as u64,
            unique_payment_methods: self.payment_methods.len() as u64,
            avg_amount,
            fraud_rate,
            velocity_score,
        })
    }
}

struct MerchantAcc {
    window_start: i64,
    transaction_count: u64,
    total_amount: f64,
    sum_sq_amount: f64,
    fraud_count: u64,
    high_risk_count: u64,
    users: HashSet<String>,
}

impl MerchantAcc {
    fn new(window_start: i64) -> Self {
        Self {
            window_start,
            transaction_count: 0,
            total_amount: 0.0,
            sum_sq_amount: 0.0,
            fraud_count: 0,
            high_risk_count: 0,
            users: HashSet::new(),
        }
    }

    fn merge(&mut self, input: &AggInput) {
        self.transaction_count += 1;
        self.total_amount += input.amount;
        self.sum_sq_amount += input.amount * input.amount;
        if input.is_fraud() {
            self.fraud_count += 1;
        }
        if input.is_high_risk() {
            self.high_risk_count += 1;
        }
        self.users.insert(input.user_id.clone());
    }

    fn stddev(&self) -> f64 {
        let n = self.transaction_count as f64;
        if n < 2.0 {
            return 0.0;
        }
        let mean = self.total_amount / n;
        (self.sum_sq_amount / n - mean * mean).max(0.0).sqrt()
    }

    fn risk_score(&self, fraud_rate: f64, avg_amount: f64) -> f64 {
        let mut score = 0.5 * fraud_rate;
        score += if self.transaction_count > 1000 {
            0.2
        } else if self.transaction_count > 500 {
            0.1
        } else {
            0.0
        };
        let stddev = self.stddev();
        if avg_amount > 0.0 && stddev / avg_amount > 2.0 {
            score += 0.2;
        }
        if self.transaction_count > 0 && (self.users.len() as f64 / self.transaction_count as f64) < 0.1 {
            score += 0.3;
        }
        score.min(1.0)
    }

    fn into_output(self, merchant_id: String) -> AggregateOutput {
        let window_start = from_epoch(self.window_start);
        let window_end = window_start + Duration::seconds(MERCHANT_SIZE);
        let avg_amount = if self.transaction_count > 0 {
            self.total_amount / self.transaction_count as f64
        } else {
            0.0
        };
        let fraud_rate = if self.transaction_count > 0 {
            self.fraud_count as f64 / self.transaction_count as f64
        } else {
            0.0
        };
        let amount_stddev = self.stddev();
        let risk_score = self.risk_score(fraud_rate, avg_amount);
        AggregateOutput::Merchant(MerchantAggregate {
            merchant_id,
            window_start,
            window_end,
            transaction_count: self.transaction_count,
            total_amount: self.total_amount,
            fraud_count: self.fraud_count,
            high_risk_count: self.high_risk_count,
            unique_user_count: self.users.len() as u64,
            avg_amount,
            amount_stddev,
            fraud_rate,
            risk_score,
        })
    }
}

struct SessionAcc {
    window_start: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    transaction_count: u64,
    total_amount: f64,
}

struct GeoAcc {
    window_start: i64,
    transaction_count: u64,
    total_amount: f64,
    fraud_count: u64,
}

struct FraudPatternAcc {
    window_start: i64,
    transaction_count: u64,
    fraud_count: u64,
}

struct HighFrequencyAcc {
    window_start: i64,
    transaction_count: u64,
    last_trigger: u64,
}

struct AmountClusterAcc {
    window_start: i64,
    transaction_count: u64,
    total_amount: f64,
    fraud_count: u64,
}

/// Worker-local accumulator state for all seven aggregate kinds.
pub struct WindowedAggregator {
    user_velocity: DashMap<(String, i64), UserVelocityAcc>,
    merchant: DashMap<(String, i64), MerchantAcc>,
    user_session: DashMap<String, SessionAcc>,
    geographic: DashMap<(String, i64), GeoAcc>,
    fraud_pattern: DashMap<(String, String, String, i64), FraudPatternAcc>,
    high_frequency: DashMap<(String, i64), HighFrequencyAcc>,
    amount_cluster: DashMap<(i32, i64), AmountClusterAcc>,
}

impl Default for WindowedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowedAggregator {
    pub fn new() -> Self {
        Self {
            user_velocity: DashMap::new(),
            merchant: DashMap::new(),
            user_session: DashMap::new(),
            geographic: DashMap::new(),
            fraud_pattern: DashMap::new(),
            high_frequency: DashMap::new(),
            amount_cluster: DashMap::new(),
        }
    }

    /// Fold one transaction into every accumulator. Returns any eagerly
    /// emitted aggregates: high-frequency alerts (§4.7's "count trigger
    /// every 10 events" — these fire mid-window, not at window close) and,
    /// when this event's gap from the user's last one exceeds the session
    /// gap, the just-closed prior session (a session boundary is event-driven,
    /// so it can only ever be detected here, not on a later watermark tick).
    pub fn ingest(&self, input: &AggInput) -> Vec<AggregateOutput> {
        let mut eager = Vec::new();

        for start in sliding_buckets(input.timestamp, USER_VELOCITY_SIZE, USER_VELOCITY_SLIDE) {
            self.user_velocity
                .entry((input.user_id.clone(), start))
                .or_insert_with(|| UserVelocityAcc::new(start))
                .merge(input);
        }

        let merchant_bucket = tumbling_bucket(input.timestamp, MERCHANT_SIZE);
        self.merchant
            .entry((input.merchant_id.clone(), merchant_bucket))
            .or_insert_with(|| MerchantAcc::new(merchant_bucket))
            .merge(input);

        {
            let mut session = self
                .user_session
                .entry(input.user_id.clone())
                .or_insert_with(|| SessionAcc {
                    window_start: input.timestamp,
                    last_seen: input.timestamp,
                    transaction_count: 0,
                    total_amount: 0.0,
                });
            if input.timestamp.signed_duration_since(session.last_seen) > Duration::seconds(SESSION_GAP)
                && session.transaction_count > 0
            {
                eager.push(AggregateOutput::UserSession(UserSessionAggregate {
                    user_id: input.user_id.clone(),
                    window_start: session.window_start,
                    window_end: session.last_seen,
                    transaction_count: session.transaction_count,
                    total_amount: session.total_amount,
                }));
                session.window_start = input.timestamp;
                session.transaction_count = 0;
                session.total_amount = 0.0;
            }
            session.last_seen = input.timestamp;
            session.transaction_count += 1;
            session.total_amount += input.amount;
        }

        let geo_key = geo_bucket(input.geolocation);
        let geo_start = tumbling_bucket(input.timestamp, GEOGRAPHIC_SIZE);
        {
            let mut entry = self
                .geographic
                .entry((geo_key, geo_start))
                .or_insert_with(|| GeoAcc { window_start: geo_start, transaction_count: 0, total_amount: 0.0, fraud_count: 0 });
            entry.transaction_count += 1;
            entry.total_amount += input.amount;
            if input.is_fraud() {
                entry.fraud_count += 1;
            }
        }

        let bucket = amount_bucket(input.amount).to_string();
        for start in sliding_buckets(input.timestamp, FRAUD_PATTERN_SIZE, FRAUD_PATTERN_SLIDE) {
            let mut entry = self
                .fraud_pattern
                .entry((input.payment_method.clone(), input.merchant_category.clone(), bucket.clone(), start))
                .or_insert_with(|| FraudPatternAcc { window_start: start, transaction_count: 0, fraud_count: 0 });
            entry.transaction_count += 1;
            if input.is_fraud() {
                entry.fraud_count += 1;
            }
        }

        let hf_start = tumbling_bucket(input.timestamp, HIGH_FREQUENCY_SIZE);
        {
            let mut entry = self
                .high_frequency
                .entry((input.user_id.clone(), hf_start))
                .or_insert_with(|| HighFrequencyAcc { window_start: hf_start, transaction_count: 0, last_trigger: 0 });
            entry.transaction_count += 1;
            if entry.transaction_count / HIGH_FREQUENCY_TRIGGER_EVERY > entry.last_trigger {
                entry.last_trigger = entry.transaction_count / HIGH_FREQUENCY_TRIGGER_EVERY;
                let window_start = from_epoch(hf_start);
                eager.push(AggregateOutput::HighFrequency(HighFrequencyAlert {
                    user_id: input.user_id.clone(),
                    window_start,
                    window_end: window_start + Duration::seconds(HIGH_FREQUENCY_SIZE),
                    transaction_count: entry.transaction_count,
                    trigger_count: entry.last_trigger,
                }));
            }
        }

        let cluster = log10_bucket(input.amount);
        let cluster_start = tumbling_bucket(input.timestamp, AMOUNT_CLUSTER_SIZE);
        {
            let mut entry = self
                .amount_cluster
                .entry((cluster, cluster_start))
                .or_insert_with(|| AmountClusterAcc { window_start: cluster_start, transaction_count: 0, total_amount: 0.0, fraud_count: 0 });
            entry.transaction_count += 1;
            entry.total_amount += input.amount;
            if input.is_fraud() {
                entry.fraud_count += 1;
            }
        }

        eager
    }

    /// Close and emit every window whose `window_end + allowed_lateness` has
    /// passed the new watermark, plus any session whose gap has elapsed.
    pub fn advance_watermark(&self, watermark: DateTime<Utc>) -> Vec<AggregateOutput> {
        let lateness = Duration::from_std(ALLOWED_LATENESS).unwrap_or_default();
        let mut out = Vec::new();

        self.user_velocity.retain(|(user_id, start), acc| {
            let window_end = from_epoch(*start) + Duration::seconds(USER_VELOCITY_SIZE);
            if window_end + lateness <= watermark {
                let taken = std::mem::replace(acc, UserVelocityAcc::new(*start));
                out.push(taken.into_output(user_id.clone()));
                false
            } else {
                true
            }
        });

        self.merchant.retain(|(merchant_id, start), acc| {
            let window_end = from_epoch(*start) + Duration::seconds(MERCHANT_SIZE);
            if window_end + lateness <= watermark {
                let taken = std::mem::replace(acc, MerchantAcc::new(*start));
                out.push(taken.into_output(merchant_id.clone()));
                false
            } else {
                true
            }
        });

        self.user_session.retain(|user_id, session| {
            if watermark.signed_duration_since(session.last_seen) > Duration::seconds(SESSION_GAP) {
                out.push(AggregateOutput::UserSession(UserSessionAggregate {
                    user_id: user_id.clone(),
                    window_start: session.window_start,
                    window_end: session.last_seen,
                    transaction_count: session.transaction_count,
                    total_amount: session.total_amount,
                }));
                false
            } else {
                true
            }
        });

        self.geographic.retain(|(geo_bucket, start), acc| {
            let window_end = from_epoch(*start) + Duration::seconds(GEOGRAPHIC_SIZE);
            if window_end + lateness <= watermark {
                out.push(AggregateOutput::Geographic(GeographicAggregate {
                    geo_bucket: geo_bucket.clone(),
                    window_start: from_epoch(acc.window_start),
                    window_end,
                    transaction_count: acc.transaction_count,
                    total_amount: acc.total_amount,
                    fraud_count: acc.fraud_count,
                }));
                false
            } else {
                true
            }
        });

        self.fraud_pattern.retain(|(payment_method, merchant_category, bucket, start), acc| {
            let window_end = from_epoch(*start) + Duration::seconds(FRAUD_PATTERN_SIZE);
            if window_end + lateness <= watermark {
                let fraud_rate = if acc.transaction_count > 0 {
                    acc.fraud_count as f64 / acc.transaction_count as f64
                } else {
                    0.0
                };
                out.push(AggregateOutput::FraudPattern(FraudPatternAggregate {
                    payment_method: payment_method.clone(),
                    merchant_category: merchant_category.clone(),
                    amount_bucket: bucket.clone(),
                    window_start: from_epoch(acc.window_start),
                    window_end,
                    transaction_count: acc.transaction_count,
                    fraud_count: acc.fraud_count,
                    fraud_rate,
                }));
                false
            } else {
                true
            }
        });

        self.amount_cluster.retain(|(cluster, start), acc| {
            let window_end = from_epoch(*start) + Duration::seconds(AMOUNT_CLUSTER_SIZE);
            if window_end + lateness <= watermark {
                out.push(AggregateOutput::AmountCluster(AmountClusterAggregate {
                    log10_bucket: *cluster,
                    window_start: from_epoch(acc.window_start),
                    window_end,
                    transaction_count: acc.transaction_count,
                    total_amount: acc.total_amount,
                    fraud_count: acc.fraud_count,
                }));
                false
            } else {
                true
            }
        });

        // High-frequency alerts are emitted eagerly by `ingest`; drop any
        // leftover window state once it has passed out of lateness range.
        self.high_frequency.retain(|_, acc| {
            let window_end = from_epoch(acc.window_start) + Duration::seconds(HIGH_FREQUENCY_SIZE);
            window_end + lateness > watermark
        });

        out
    }
}
