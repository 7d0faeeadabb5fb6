//! Feature Extractor (C4, §4.4): produces the named feature vector from a
//! transaction plus its attached profiles and velocity snapshot. Deterministic
//! and side-effect free — velocity values are supplied already-resolved by
//! the caller, keeping this crate's extraction path non-suspending (§5).

use chrono::Datelike;
use fraud_core::{FeatureMap, MerchantProfile, MerchantRiskLevel, Transaction, UserProfile, VelocityCounter};

use crate::haversine;
use crate::registry::FeatureRegistry;

/// The three resolved velocity counters a caller must supply per event (§4.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocitySnapshot {
    pub five_min: Option<VelocityCounter>,
    pub one_hour: Option<VelocityCounter>,
    pub twenty_four_hour: Option<VelocityCounter>,
}

const CRYPTO_KEYWORDS: &[&str] = &["crypto", "bitcoin", "btc", "eth", "coin"];
const GIFT_CARD_KEYWORDS: &[&str] = &["gift card", "giftcard", "prepaid"];
const MONEY_TRANSFER_KEYWORDS: &[&str] = &["money transfer", "wire", "remit"];
const GAMBLING_KEYWORDS: &[&str] = &["gambling", "betting", "lottery", "forex"];
const HIGH_RISK_PAYMENT_KEYWORDS: &[&str] = &["prepaid", "gift", "crypto", "wire"];

pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract every registered feature for one transaction (§4.4). Missing
    /// inputs fall back to the typed defaults named throughout §4.4 and §8.
    pub fn extract(
        tx: &Transaction,
        user: Option<&UserProfile>,
        merchant: Option<&MerchantProfile>,
        velocity: &VelocitySnapshot,
    ) -> FeatureMap {
        let mut f = FeatureMap::new();

        Self::extract_amount(&mut f, tx, user, merchant);
        Self::extract_temporal(&mut f, tx, user);
        Self::extract_geographic(&mut f, tx, user);
        Self::extract_user_behavior(&mut f, user);
        Self::extract_merchant_risk(&mut f, tx, merchant);
        Self::extract_device_network(&mut f, tx, user);
        Self::extract_velocity(&mut f, velocity);
        Self::extract_contextual(&mut f, tx);

        debug_assert!(
            f.keys().all(|k| FeatureRegistry::standard().contains(k)),
            "extractor emitted a feature not present in the registry"
        );
        f
    }

    fn extract_amount(
        f: &mut FeatureMap,
        tx: &Transaction,
        user: Option<&UserProfile>,
        merchant: Option<&MerchantProfile>,
    ) {
        let amount = tx.amount;
        f.insert("amount".into(), amount.into());
        f.insert("amount_log".into(), (1.0_f64 + amount).ln().into());
        f.insert("amount_sqrt".into(), amount.max(0.0).sqrt().into());
        f.insert("is_round_amount".into(), (amount % 1.0 == 0.0).into());
        f.insert("is_round_10".into(), (amount % 10.0 == 0.0).into());
        f.insert("is_round_100".into(), (amount % 100.0 == 0.0).into());

        let user_avg = user.map(|u| u.avg_transaction_amount).unwrap_or(0.0);
        let (ratio, zscore, is_large_for_user) = if user_avg > 0.0 {
            let ratio = amount / user_avg;
            let zscore = (amount - user_avg) / user_avg;
            (ratio, zscore, ratio > 3.0)
        } else {
            (0.0, 0.0, false)
        };
        f.insert("amount_to_user_avg_ratio".into(), ratio.into());
        f.insert("amount_deviation_zscore".into(), zscore.into());
        f.insert("is_large_for_user".into(), is_large_for_user.into());

        let merchant_avg = merchant.map(|m| m.avg_transaction_amount).unwrap_or(0.0);
        let merchant_ratio = if merchant_avg > 0.0 { amount / merchant_avg } else { 0.0 };
        f.insert("amount_to_merchant_avg_ratio".into(), merchant_ratio.into());
        f.insert(
            "is_large_for_merchant".into(),
            (merchant_avg > 0.0 && amount > 2.0 * merchant_avg).into(),
        );

        let category = if amount < 10.0 {
            "micro"
        } else if amount < 100.0 {
            "small"
        } else if amount < 1000.0 {
            "medium"
        } else if amount < 10000.0 {
            "large"
        } else {
            "very_large"
        };
        f.insert("amount_category".into(), category.into());
    }

    fn extract_temporal(f: &mut FeatureMap, tx: &Transaction, user: Option<&UserProfile>) {
        let hour = tx.hour_of_day();
        let is_weekend = tx.is_weekend();
        f.insert("hour_of_day".into(), (hour as f64).into());
        f.insert("day_of_week".into(), (tx.timestamp.weekday().number_from_monday() as f64).into());
        f.insert("day_of_month".into(), (tx.timestamp.day() as f64).into());
        f.insert("is_weekend".into(), is_weekend.into());

        let time_period = if (6..12).contains(&hour) {
            "morning"
        } else if (12..18).contains(&hour) {
            "afternoon"
        } else if (18..22).contains(&hour) {
            "evening"
        } else {
            "night"
        };
        f.insert("time_period".into(), time_period.into());
        f.insert("is_business_hours".into(), (9..17).contains(&hour).into());
        f.insert("is_night_time".into(), (hour <= 6 || hour >= 22).into());

        let in_preferred = user
            .map(|u| hour >= u.preferred_time_start && hour <= u.preferred_time_end)
            .unwrap_or(false);
        f.insert("in_user_preferred_time".into(), in_preferred.into());
    }

    fn extract_geographic(f: &mut FeatureMap, tx: &Transaction, user: Option<&UserProfile>) {
        let has_geo = tx.geolocation.is_some();
        let has_merchant_loc = tx.merchant_location.is_some();
        f.insert("has_geolocation".into(), has_geo.into());
        f.insert("has_merchant_location".into(), has_merchant_loc.into());

        if let Some(geo) = tx.geolocation {
            f.insert("latitude".into(), geo.lat.into());
            f.insert("longitude".into(), geo.lon.into());
            let is_high_risk_country =
                geo.lat.abs() > 60.0 || (geo.lat.abs() < 10.0 && geo.lon.abs() < 10.0);
            f.insert("is_high_risk_country".into(), is_high_risk_country.into());
        } else {
            f.insert("latitude".into(), 0.0.into());
            f.insert("longitude".into(), 0.0.into());
            f.insert("is_high_risk_country".into(), false.into());
        }

        if let (Some(geo), Some(merchant_loc)) = (tx.geolocation, tx.merchant_location) {
            let distance = haversine::distance_km(geo.lat, geo.lon, merchant_loc.lat, merchant_loc.lon);
            f.insert("distance_to_merchant_km".into(), distance.into());
        }

        let intl_preference = user.map(|u| u.international_transactions).unwrap_or(0.0);
        f.insert("user_intl_preference".into(), intl_preference.into());
        f.insert(
            "unexpected_intl_transaction".into(),
            (intl_preference < 0.1).into(),
        );
    }

    fn extract_user_behavior(f: &mut FeatureMap, user: Option<&UserProfile>) {
        match user {
            Some(u) => {
                f.insert("account_age_days".into(), (u.account_age_days as f64).into());
                f.insert("is_new_account".into(), (u.account_age_days < 30).into());
                f.insert("is_very_new_account".into(), (u.account_age_days < 7).into());
                f.insert("user_risk_score".into(), u.risk_score.into());
                f.insert("is_kyc_verified".into(), u.verified.into());
                f.insert("kyc_status".into(), u.kyc_status.as_str().into());
                f.insert("weekend_activity_factor".into(), u.weekend_activity.into());
                f.insert(
                    "online_preference".into(),
                    u.behavioral_patterns.get("online_preference").copied().unwrap_or(0.0).into(),
                );
                f.insert("user_avg_amount".into(), u.avg_transaction_amount.into());
                f.insert("user_transaction_frequency".into(), u.transaction_frequency.into());
            }
            None => {
                f.insert("account_age_days".into(), 0.0.into());
                f.insert("is_new_account".into(), true.into());
                f.insert("is_very_new_account".into(), true.into());
                f.insert("user_risk_score".into(), 0.8.into());
                f.insert("is_kyc_verified".into(), false.into());
                f.insert("kyc_status".into(), "pending".into());
                f.insert("weekend_activity_factor".into(), 0.0.into());
                f.insert("online_preference".into(), 0.0.into());
                f.insert("user_avg_amount".into(), 0.0.into());
                f.insert("user_transaction_frequency".into(), 0.0.into());
            }
        }
    }

    fn extract_merchant_risk(f: &mut FeatureMap, tx: &Transaction, merchant: Option<&MerchantProfile>) {
        match merchant {
            Some(m) => {
                f.insert("merchant_risk_level".into(), m.risk_level.as_str().into());
                f.insert("merchant_fraud_rate".into(), m.fraud_rate.into());
                f.insert("is_blacklisted_merchant".into(), m.is_blacklisted.into());
                f.insert("merchant_category".into(), m.category.as_str().into());
                f.insert("is_high_risk_category".into(), m.is_high_risk_category.into());
                let within_hours =
                    m.operating_hours.is_empty() || m.operating_hours.contains(&tx.hour_of_day());
                f.insert("within_merchant_hours".into(), within_hours.into());
                f.insert("merchant_risk_multiplier".into(), m.risk_multiplier.into());
                f.insert(
                    "suspicious_merchant_name".into(),
                    is_suspicious_merchant_name(&m.name).into(),
                );
            }
            None => {
                f.insert("merchant_risk_level".into(), MerchantRiskLevel::Unknown.as_str().into());
                f.insert("merchant_fraud_rate".into(), 0.1.into());
                f.insert("is_blacklisted_merchant".into(), false.into());
                f.insert("merchant_category".into(), "unknown".into());
                f.insert("is_high_risk_category".into(), false.into());
                f.insert("within_merchant_hours".into(), true.into());
                f.insert("merchant_risk_multiplier".into(), 2.0.into());
                f.insert("suspicious_merchant_name".into(), false.into());
            }
        }
    }

    fn extract_device_network(f: &mut FeatureMap, tx: &Transaction, user: Option<&UserProfile>) {
        let is_known_device = user
            .map(|u| u.device_fingerprints.contains(&tx.device_fingerprint))
            .unwrap_or(false);
        f.insert("is_known_device".into(), is_known_device.into());
        f.insert("is_new_device".into(), (!is_known_device).into());

        let is_private_ip = ["192.168.", "10.", "172.16."]
            .iter()
            .any(|prefix| tx.ip_address.starts_with(prefix));
        f.insert("is_private_ip".into(), is_private_ip.into());
        f.insert("ip_risk_score".into(), (if is_private_ip { 0.1 } else { 0.3 }).into());

        let ua_lower = tx.user_agent.to_ascii_lowercase();
        let suspicious_ua = ua_lower.contains("bot") || ua_lower.contains("crawler") || tx.user_agent.len() < 20;
        f.insert("suspicious_user_agent".into(), suspicious_ua.into());
    }

    fn extract_velocity(f: &mut FeatureMap, velocity: &VelocitySnapshot) {
        let five_min = velocity.five_min.unwrap_or(VelocityCounter::zero(chrono::Utc::now()));
        let one_hour = velocity.one_hour.unwrap_or(VelocityCounter::zero(chrono::Utc::now()));
        let day = velocity.twenty_four_hour.unwrap_or(VelocityCounter::zero(chrono::Utc::now()));

        f.insert("velocity_5min_count".into(), (five_min.count as f64).into());
        f.insert("velocity_5min_amount".into(), five_min.amount_sum.into());
        f.insert("velocity_1hour_count".into(), (one_hour.count as f64).into());
        f.insert("velocity_1hour_amount".into(), one_hour.amount_sum.into());
        f.insert("velocity_24hour_count".into(), (day.count as f64).into());
        f.insert("velocity_24hour_amount".into(), day.amount_sum.into());
        f.insert("high_velocity_5min".into(), (five_min.count > 5).into());
        f.insert("high_velocity_1hour".into(), (one_hour.count > 20).into());
    }

    fn extract_contextual(f: &mut FeatureMap, tx: &Transaction) {
        f.insert("payment_method".into(), tx.payment_method.as_str().into());
        let payment_lower = tx.payment_method.to_ascii_lowercase();
        let is_high_risk_payment = HIGH_RISK_PAYMENT_KEYWORDS
            .iter()
            .any(|kw| payment_lower.contains(kw));
        f.insert("is_high_risk_payment".into(), is_high_risk_payment.into());
        f.insert("transaction_type".into(), tx.transaction_type.as_str().into());
        f.insert(
            "is_refund".into(),
            tx.transaction_type.eq_ignore_ascii_case("refund").into(),
        );
        f.insert("card_type".into(), tx.card_type.as_str().into());
    }
}

fn is_suspicious_merchant_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    CRYPTO_KEYWORDS.iter().any(|kw| lower.contains(kw))
        || GIFT_CARD_KEYWORDS.iter().any(|kw| lower.contains(kw))
        || MONEY_TRANSFER_KEYWORDS.iter().any(|kw| lower.contains(kw))
        || GAMBLING_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
