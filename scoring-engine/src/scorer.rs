//! Rule Scorer (C5, §4.5): a pure function of `(FeatureMap, ScoringConfig) ->
//! ScoredOutcome`. No hidden globals, so every threshold boundary is a unit
//! test away from the weight table it implements.

use fraud_core::{FeatureMap, ScoredOutcome};

/// Sub-score weights and decision thresholds, defaulted to the §4.5 table.
/// Constructed once per pipeline and shared by reference across workers.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub weight_amount: f64,
    pub weight_temporal: f64,
    pub weight_user_behavior: f64,
    pub weight_merchant_risk: f64,
    pub weight_velocity: f64,
    pub weight_device_network: f64,

    pub threshold_decline: f64,
    pub threshold_review_high: f64,
    pub threshold_review_medium: f64,
    pub threshold_approve_low: f64,

    /// Weight of the carried-forward `prior_fraud_score` when present (§4.5: 0.6).
    pub prior_score_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_amount: 0.20,
            weight_temporal: 0.10,
            weight_user_behavior: 0.25,
            weight_merchant_risk: 0.20,
            weight_velocity: 0.15,
            weight_device_network: 0.10,

            threshold_decline: 0.95,
            threshold_review_high: 0.80,
            threshold_review_medium: 0.60,
            threshold_approve_low: 0.30,

            prior_score_weight: 0.6,
        }
    }
}

pub struct RuleScorer;

impl RuleScorer {
    /// Score one feature map, optionally combining with a pre-existing
    /// fraud_score carried on the input transaction (§4.5).
    pub fn score(features: &FeatureMap, prior_fraud_score: Option<f64>, config: &ScoringConfig) -> ScoredOutcome {
        if bool_feature(features, "is_blacklisted_merchant") {
            return ScoredOutcome::blacklisted(1.0);
        }

        let amount = Self::amount_subscore(features) * config.weight_amount;
        let temporal = Self::temporal_subscore(features) * config.weight_temporal;
        let user_behavior = Self::user_behavior_subscore(features) * config.weight_user_behavior;
        let merchant_risk = Self::merchant_risk_subscore(features) * config.weight_merchant_risk;
        let velocity = Self::velocity_subscore(features) * config.weight_velocity;
        let device_network = Self::device_network_subscore(features) * config.weight_device_network;

        let feature_score = (amount + temporal + user_behavior + merchant_risk + velocity + device_network)
            .clamp(0.0, 1.0);

        let combined = match prior_fraud_score {
            Some(prior) => config.prior_score_weight * prior + (1.0 - config.prior_score_weight) * feature_score,
            None => feature_score,
        };

        ScoredOutcome::from_score_with_thresholds(
            combined.clamp(0.0, 1.0),
            config.threshold_decline,
            config.threshold_review_high,
            config.threshold_review_medium,
            config.threshold_approve_low,
        )
    }

    fn amount_subscore(f: &FeatureMap) -> f64 {
        let mut s = 0.0;
        if bool_feature(f, "is_large_for_user") {
            s += 0.3;
        }
        if bool_feature(f, "is_round_100") {
            s += 0.1;
        }
        if str_feature(f, "amount_category") == Some("very_large") {
            s += 0.2;
        }
        if str_feature(f, "amount_category") == Some("micro") {
            s += 0.1;
        }
        s
    }

    fn temporal_subscore(f: &FeatureMap) -> f64 {
        let mut s = 0.0;
        if bool_feature(f, "is_night_time") {
            s += 0.2;
        }
        if !bool_feature(f, "in_user_preferred_time") {
            s += 0.15;
        }
        let weekend_activity_low = num_feature(f, "weekend_activity_factor").unwrap_or(1.0) < 0.3;
        if bool_feature(f, "is_weekend") && weekend_activity_low {
            s += 0.1;
        }
        s
    }

    fn user_behavior_subscore(f: &FeatureMap) -> f64 {
        let mut s = 0.0;
        if bool_feature(f, "is_very_new_account") {
            s += 0.4;
        } else if bool_feature(f, "is_new_account") {
            s += 0.2;
        }
        if !bool_feature(f, "is_kyc_verified") {
            s += 0.3;
        }
        s += 0.5 * num_feature(f, "user_risk_score").unwrap_or(0.0);
        s
    }

    fn merchant_risk_subscore(f: &FeatureMap) -> f64 {
        let mut s = 0.0;
        if bool_feature(f, "is_blacklisted_merchant") {
            s += 0.8;
        }
        if bool_feature(f, "is_high_risk_category") {
            s += 0.3;
        }
        s += 2.0 * num_feature(f, "merchant_fraud_rate").unwrap_or(0.0);
        if bool_feature(f, "suspicious_merchant_name") {
            s += 0.2;
        }
        if !bool_feature(f, "within_merchant_hours") {
            s += 0.15;
        }
        s
    }

    fn velocity_subscore(f: &FeatureMap) -> f64 {
        let mut s = 0.0;
        if bool_feature(f, "high_velocity_5min") {
            s += 0.6;
        }
        if bool_feature(f, "high_velocity_1hour") {
            s += 0.4;
        }
        if num_feature(f, "velocity_5min_count").unwrap_or(0.0) > 3.0 {
            s += 0.2;
        }
        if num_feature(f, "velocity_1hour_count").unwrap_or(0.0) > 10.0 {
            s += 0.15;
        }
        s
    }

    fn device_network_subscore(f: &FeatureMap) -> f64 {
        let mut s = 0.0;
        if bool_feature(f, "is_new_device") {
            s += 0.3;
        }
        s += num_feature(f, "ip_risk_score").unwrap_or(0.0);
        if bool_feature(f, "suspicious_user_agent") {
            s += 0.2;
        }
        s
    }
}

fn bool_feature(f: &FeatureMap, name: &str) -> bool {
    f.get(name).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn num_feature(f: &FeatureMap, name: &str) -> Option<f64> {
    f.get(name).and_then(|v| v.as_f64())
}

fn str_feature<'a>(f: &'a FeatureMap, name: &str) -> Option<&'a str> {
    f.get(name).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_core::{Decision, RiskLevel};

    fn features_with(pairs: &[(&str, fraud_core::FeatureValue)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn clean_transaction_scores_low_and_approves() {
        let f = features_with(&[
            ("is_large_for_user".into(), false.into()),
            ("is_kyc_verified".into(), true.into()),
            ("is_new_account".into(), false.into()),
            ("is_very_new_account".into(), false.into()),
            ("user_risk_score".into(), 0.1.into()),
            ("merchant_fraud_rate".into(), 0.01.into()),
            ("within_merchant_hours".into(), true.into()),
            ("in_user_preferred_time".into(), true.into()),
        ]);
        let outcome = RuleScorer::score(&f, None, &ScoringConfig::default());
        assert_eq!(outcome.decision, Decision::Approve);
        assert_eq!(outcome.risk_level, RiskLevel::VeryLow);
    }

    #[test]
    fn blacklisted_merchant_is_hard_override() {
        let f = features_with(&[("is_blacklisted_merchant".into(), true.into())]);
        let outcome = RuleScorer::score(&f, None, &ScoringConfig::default());
        assert_eq!(outcome.decision, Decision::Decline);
        assert_eq!(outcome.risk_level, RiskLevel::Critical);
        assert_eq!(outcome.fraud_score.value(), 1.0);
    }

    #[test]
    fn high_risk_combination_crosses_review_threshold() {
        let f = features_with(&[
            ("is_very_new_account".into(), true.into()),
            ("is_kyc_verified".into(), false.into()),
            ("user_risk_score".into(), 0.9.into()),
            ("is_high_risk_category".into(), true.into()),
            ("merchant_fraud_rate".into(), 0.2.into()),
            ("high_velocity_5min".into(), true.into()),
            ("high_velocity_1hour".into(), true.into()),
            ("is_new_device".into(), true.into()),
            ("suspicious_user_agent".into(), true.into()),
            ("ip_risk_score".into(), 0.3.into()),
        ]);
        let outcome = RuleScorer::score(&f, None, &ScoringConfig::default());
        assert!(matches!(outcome.decision, Decision::Review | Decision::Decline));
        assert!(outcome.fraud_score.value() > 0.6);
    }

    #[test]
    fn prior_score_blends_with_feature_score() {
        // Empty feature map still contributes a small feature_score (missing
        // in_user_preferred_time/is_kyc_verified/within_merchant_hours each
        // default to false, and each is a positive predicate here), so the
        // blend is 0.6*prior + 0.4*feature_score rather than exactly 0.6*prior.
        let f = features_with(&[]);
        let outcome = RuleScorer::score(&f, Some(0.9), &ScoringConfig::default());
        assert!((outcome.fraud_score.value() - 0.588).abs() < 1e-9);
    }

    #[test]
    fn decision_thresholds_match_spec_boundaries() {
        let config = ScoringConfig::default();
        let at = |s: f64| {
            fraud_core::ScoredOutcome::from_score_with_thresholds(
                s,
                config.threshold_decline,
                config.threshold_review_high,
                config.threshold_review_medium,
                config.threshold_approve_low,
            )
            .decision
        };
        assert_eq!(at(0.95), Decision::Decline);
        assert_eq!(at(0.80), Decision::Review);
        assert_eq!(at(0.29), Decision::Approve);
    }
}
