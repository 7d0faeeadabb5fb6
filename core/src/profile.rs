use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Party profile for a user (§3). Authored externally; the core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub account_age_days: i64,
    pub risk_score: f64,
    pub kyc_status: String,
    pub verified: bool,
    pub preferred_time_start: u32,
    pub preferred_time_end: u32,
    pub weekend_activity: f64,
    pub international_transactions: f64,
    pub avg_transaction_amount: f64,
    pub transaction_frequency: f64,
    #[serde(default)]
    pub behavioral_patterns: HashMap<String, f64>,
    #[serde(default)]
    pub device_fingerprints: HashSet<String>,
}

impl UserProfile {
    /// Default profile synthesized by the Profile Cache on a miss (§4.3).
    pub fn default_on_miss() -> Self {
        Self {
            account_age_days: 0,
            risk_score: 0.5,
            kyc_status: "pending".to_string(),
            verified: false,
            preferred_time_start: 0,
            preferred_time_end: 23,
            weekend_activity: 0.0,
            international_transactions: 0.0,
            avg_transaction_amount: 0.0,
            transaction_frequency: 0.0,
            behavioral_patterns: HashMap::new(),
            device_fingerprints: HashSet::new(),
        }
    }
}

/// Merchant risk tier (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MerchantRiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl MerchantRiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MerchantRiskLevel::Low => "low",
            MerchantRiskLevel::Medium => "medium",
            MerchantRiskLevel::High => "high",
            MerchantRiskLevel::Unknown => "unknown",
        }
    }
}

/// Party profile for a merchant (§3). Read-only to the core; updates arrive
/// only via the merchant-update stream, absorbed as joiner risk factors (§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub name: String,
    pub category: String,
    pub risk_level: MerchantRiskLevel,
    pub fraud_rate: f64,
    pub is_blacklisted: bool,
    pub avg_transaction_amount: f64,
    #[serde(default)]
    pub operating_hours: HashSet<u32>,
    pub risk_multiplier: f64,
    pub is_high_risk_category: bool,
}

impl MerchantProfile {
    /// Default profile synthesized by the Profile Cache on a miss (§4.3).
    pub fn default_on_miss() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            risk_level: MerchantRiskLevel::Medium,
            fraud_rate: 0.05,
            is_blacklisted: false,
            avg_transaction_amount: 0.0,
            operating_hours: HashSet::new(),
            risk_multiplier: 2.0,
            is_high_risk_category: false,
        }
    }
}
