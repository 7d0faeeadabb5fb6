//! The feature registry (§4.4, §9 Design Notes "Global mutable state"): an
//! immutable table of every feature name this system ever emits, built once
//! and shared by reference rather than rebuilt per event.

use std::sync::OnceLock;

use fraud_core::FeatureType;

/// One entry in the feature registry.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDef {
    pub name: &'static str,
    pub feature_type: FeatureType,
}

const AMOUNT_GROUP: &[(&str, FeatureType)] = &[
    ("amount", FeatureType::Numerical),
    ("amount_log", FeatureType::Numerical),
    ("amount_sqrt", FeatureType::Numerical),
    ("is_round_amount", FeatureType::Boolean),
    ("is_round_10", FeatureType::Boolean),
    ("is_round_100", FeatureType::Boolean),
    ("amount_to_user_avg_ratio", FeatureType::Numerical),
    ("amount_deviation_zscore", FeatureType::Numerical),
    ("is_large_for_user", FeatureType::Boolean),
    ("amount_to_merchant_avg_ratio", FeatureType::Numerical),
    ("is_large_for_merchant", FeatureType::Boolean),
    ("amount_category", FeatureType::Categorical),
];

const TEMPORAL_GROUP: &[(&str, FeatureType)] = &[
    ("hour_of_day", FeatureType::Numerical),
    ("day_of_week", FeatureType::Numerical),
    ("day_of_month", FeatureType::Numerical),
    ("is_weekend", FeatureType::Boolean),
    ("time_period", FeatureType::Categorical),
    ("is_business_hours", FeatureType::Boolean),
    ("is_night_time", FeatureType::Boolean),
    ("in_user_preferred_time", FeatureType::Boolean),
];

const GEOGRAPHIC_GROUP: &[(&str, FeatureType)] = &[
    ("has_geolocation", FeatureType::Boolean),
    ("has_merchant_location", FeatureType::Boolean),
    ("latitude", FeatureType::Numerical),
    ("longitude", FeatureType::Numerical),
    ("is_high_risk_country", FeatureType::Boolean),
    ("distance_to_merchant_km", FeatureType::Numerical),
    ("user_intl_preference", FeatureType::Numerical),
    ("unexpected_intl_transaction", FeatureType::Boolean),
];

const USER_BEHAVIOR_GROUP: &[(&str, FeatureType)] = &[
    ("account_age_days", FeatureType::Numerical),
    ("is_new_account", FeatureType::Boolean),
    ("is_very_new_account", FeatureType::Boolean),
    ("user_risk_score", FeatureType::Numerical),
    ("is_kyc_verified", FeatureType::Boolean),
    ("kyc_status", FeatureType::Categorical),
    ("weekend_activity_factor", FeatureType::Numerical),
    ("online_preference", FeatureType::Numerical),
    ("user_avg_amount", FeatureType::Numerical),
    ("user_transaction_frequency", FeatureType::Numerical),
];

const MERCHANT_RISK_GROUP: &[(&str, FeatureType)] = &[
    ("merchant_risk_level", FeatureType::Categorical),
    ("merchant_fraud_rate", FeatureType::Numerical),
    ("is_blacklisted_merchant", FeatureType::Boolean),
    ("merchant_category", FeatureType::Categorical),
    ("is_high_risk_category", FeatureType::Boolean),
    ("within_merchant_hours", FeatureType::Boolean),
    ("merchant_risk_multiplier", FeatureType::Numerical),
    ("suspicious_merchant_name", FeatureType::Boolean),
];

const DEVICE_NETWORK_GROUP: &[(&str, FeatureType)] = &[
    ("is_known_device", FeatureType::Boolean),
    ("is_new_device", FeatureType::Boolean),
    ("is_private_ip", FeatureType::Boolean),
    ("ip_risk_score", FeatureType::Numerical),
    ("suspicious_user_agent", FeatureType::Boolean),
];

const VELOCITY_GROUP: &[(&str, FeatureType)] = &[
    ("velocity_5min_count", FeatureType::Numerical),
    ("velocity_5min_amount", FeatureType::Numerical),
    ("velocity_1hour_count", FeatureType::Numerical),
    ("velocity_1hour_amount", FeatureType::Numerical),
    ("velocity_24hour_count", FeatureType::Numerical),
    ("velocity_24hour_amount", FeatureType::Numerical),
    ("high_velocity_5min", FeatureType::Boolean),
    ("high_velocity_1hour", FeatureType::Boolean),
];

const CONTEXTUAL_GROUP: &[(&str, FeatureType)] = &[
    ("payment_method", FeatureType::Categorical),
    ("is_high_risk_payment", FeatureType::Boolean),
    ("transaction_type", FeatureType::Categorical),
    ("is_refund", FeatureType::Boolean),
    ("card_type", FeatureType::Categorical),
];

const ALL_GROUPS: &[&[(&str, FeatureType)]] = &[
    AMOUNT_GROUP,
    TEMPORAL_GROUP,
    GEOGRAPHIC_GROUP,
    USER_BEHAVIOR_GROUP,
    MERCHANT_RISK_GROUP,
    DEVICE_NETWORK_GROUP,
    VELOCITY_GROUP,
    CONTEXTUAL_GROUP,
];

/// The standard, fixed feature registry (§4.4). Built once at first use.
pub struct FeatureRegistry {
    defs: Vec<FeatureDef>,
}

impl FeatureRegistry {
    pub fn standard() -> &'static FeatureRegistry {
        static REGISTRY: OnceLock<FeatureRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let defs = ALL_GROUPS
                .iter()
                .flat_map(|group| group.iter())
                .map(|&(name, feature_type)| FeatureDef { name, feature_type })
                .collect();
            FeatureRegistry { defs }
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.defs.iter().map(|d| d.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.iter().any(|d| d.name == name)
    }

    pub fn defs(&self) -> &[FeatureDef] {
        &self.defs
    }
}
