use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sliding 5-minute user velocity aggregate (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVelocityAggregate {
    pub user_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub total_amount: f64,
    pub fraud_count: u64,
    pub high_risk_count: u64,
    pub unique_merchants: u64,
    pub unique_payment_methods: u64,
    pub avg_amount: f64,
    pub fraud_rate: f64,
    pub velocity_score: f64,
}

/// Tumbling 1-hour merchant aggregate (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantAggregate {
    pub merchant_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub total_amount: f64,
    pub fraud_count: u64,
    pub high_risk_count: u64,
    pub unique_user_count: u64,
    pub avg_amount: f64,
    pub amount_stddev: f64,
    pub fraud_rate: f64,
    pub risk_score: f64,
}

/// Session-windowed (30-min gap) per-user aggregate (§3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSessionAggregate {
    pub user_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub total_amount: f64,
}

/// Tumbling 15-min geographic bucket aggregate, keyed on `floor(lat),floor(lon)`
/// or the `"unknown"` bucket for missing geo (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographicAggregate {
    pub geo_bucket: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub total_amount: f64,
    pub fraud_count: u64,
}

/// Sliding 10-min fraud-pattern aggregate keyed on
/// `(payment_method, merchant_category, amount_bucket)` (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudPatternAggregate {
    pub payment_method: String,
    pub merchant_category: String,
    pub amount_bucket: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub fraud_count: u64,
    pub fraud_rate: f64,
}

/// Tumbling 30-min amount-cluster aggregate keyed on a log10 bucket (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountClusterAggregate {
    pub log10_bucket: i32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub total_amount: f64,
    pub fraud_count: u64,
}

/// Tumbling 5-min per-user alert, triggered every 10 events within the window (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighFrequencyAlert {
    pub user_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub transaction_count: u64,
    pub trigger_count: u64,
}

/// Union of every aggregate kind the Windowed Aggregator can emit (§9 Design
/// Notes, "Polymorphism": one variant enum rather than a class hierarchy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AggregateOutput {
    UserVelocity(UserVelocityAggregate),
    Merchant(MerchantAggregate),
    UserSession(UserSessionAggregate),
    Geographic(GeographicAggregate),
    FraudPattern(FraudPatternAggregate),
    AmountCluster(AmountClusterAggregate),
    HighFrequency(HighFrequencyAlert),
}

impl AggregateOutput {
    pub fn window_start(&self) -> DateTime<Utc> {
        match self {
            AggregateOutput::UserVelocity(a) => a.window_start,
            AggregateOutput::Merchant(a) => a.window_start,
            AggregateOutput::UserSession(a) => a.window_start,
            AggregateOutput::Geographic(a) => a.window_start,
            AggregateOutput::FraudPattern(a) => a.window_start,
            AggregateOutput::AmountCluster(a) => a.window_start,
            AggregateOutput::HighFrequency(a) => a.window_start,
        }
    }

    pub fn window_end(&self) -> DateTime<Utc> {
        match self {
            AggregateOutput::UserVelocity(a) => a.window_end,
            AggregateOutput::Merchant(a) => a.window_end,
            AggregateOutput::UserSession(a) => a.window_end,
            AggregateOutput::Geographic(a) => a.window_end,
            AggregateOutput::FraudPattern(a) => a.window_end,
            AggregateOutput::AmountCluster(a) => a.window_end,
            AggregateOutput::HighFrequency(a) => a.window_end,
        }
    }
}
