//! Profile Cache (C3, §4.3): decodes user/merchant hashes from the state
//! store. A cache miss is surfaced as `None` rather than papered over here —
//! the Feature Extractor applies its own §4.4 overrides for an unknown
//! entity, which are distinct from this module's §4.3 miss-synthesized
//! profile defaults. Callers that need a concrete profile regardless (e.g.
//! to build an `EnrichedTransaction`) fall back to `default_on_miss()`
//! themselves; that fallback is never written back to the store — a flood
//! of unknown IDs must not poison it with defaults.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fraud_core::{cache, MerchantProfile, MerchantRiskLevel, UserProfile};

use crate::state_store::StateStore;

const PROFILE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ProfileCache<S: StateStore> {
    store: Arc<S>,
}

impl<S: StateStore> ProfileCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// `None` on a genuine cache miss — the caller decides how to treat it
    /// (§4.3's profile default vs. §4.4's feature-level override).
    pub async fn get_user(&self, user_id: &str) -> Option<UserProfile> {
        let hash = self.store.get_hash(&cache::user_key(user_id)).await;
        if hash.is_empty() {
            return None;
        }
        Some(decode_user_profile(&hash))
    }

    /// `None` on a genuine cache miss — see `get_user`.
    pub async fn get_merchant(&self, merchant_id: &str) -> Option<MerchantProfile> {
        let hash = self.store.get_hash(&cache::merchant_key(merchant_id)).await;
        if hash.is_empty() {
            return None;
        }
        Some(decode_merchant_profile(&hash))
    }

    /// Writes a freshly observed profile back to the store, refreshing TTL.
    /// Never called for miss-synthesized defaults (§4.3).
    pub async fn put_user(&self, user_id: &str, profile: &UserProfile) {
        self.store
            .set_hash(&cache::user_key(user_id), encode_user_profile(profile), PROFILE_TTL)
            .await;
    }

    pub async fn put_merchant(&self, merchant_id: &str, profile: &MerchantProfile) {
        self.store
            .set_hash(&cache::merchant_key(merchant_id), encode_merchant_profile(profile), PROFILE_TTL)
            .await;
    }
}

fn field<'a>(hash: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    hash.get(key).map(|s| s.as_str())
}

fn decode_user_profile(hash: &HashMap<String, String>) -> UserProfile {
    let mut profile = UserProfile::default_on_miss();
    if let Some(v) = field(hash, "account_age_days").and_then(|s| s.parse().ok()) {
        profile.account_age_days = v;
    }
    if let Some(v) = field(hash, "risk_score").and_then(|s| s.parse().ok()) {
        profile.risk_score = v;
    }
    if let Some(v) = field(hash, "kyc_status") {
        profile.kyc_status = v.to_string();
    }
    if let Some(v) = field(hash, "verified").and_then(|s| s.parse().ok()) {
        profile.verified = v;
    }
    if let Some(v) = field(hash, "preferred_time_start").and_then(|s| s.parse().ok()) {
        profile.preferred_time_start = v;
    }
    if let Some(v) = field(hash, "preferred_time_end").and_then(|s| s.parse().ok()) {
        profile.preferred_time_end = v;
    }
    if let Some(v) = field(hash, "weekend_activity").and_then(|s| s.parse().ok()) {
        profile.weekend_activity = v;
    }
    if let Some(v) = field(hash, "international_transactions").and_then(|s| s.parse().ok()) {
        profile.international_transactions = v;
    }
    if let Some(v) = field(hash, "avg_transaction_amount").and_then(|s| s.parse().ok()) {
        profile.avg_transaction_amount = v;
    }
    if let Some(v) = field(hash, "transaction_frequency").and_then(|s| s.parse().ok()) {
        profile.transaction_frequency = v;
    }
    if let Some(v) = field(hash, "device_fingerprints") {
        profile.device_fingerprints = v.split(',').filter(|s| !s.is_empty()).map(String::from).collect();
    }
    profile
}

fn encode_user_profile(profile: &UserProfile) -> HashMap<String, String> {
    let mut hash = HashMap::new();
    hash.insert("account_age_days".into(), profile.account_age_days.to_string());
    hash.insert("risk_score".into(), profile.risk_score.to_string());
    hash.insert("kyc_status".into(), profile.kyc_status.clone());
    hash.insert("verified".into(), profile.verified.to_string());
    hash.insert("preferred_time_start".into(), profile.preferred_time_start.to_string());
    hash.insert("preferred_time_end".into(), profile.preferred_time_end.to_string());
    hash.insert("weekend_activity".into(), profile.weekend_activity.to_string());
    hash.insert(
        "international_transactions".into(),
        profile.international_transactions.to_string(),
    );
    hash.insert("avg_transaction_amount".into(), profile.avg_transaction_amount.to_string());
    hash.insert("transaction_frequency".into(), profile.transaction_frequency.to_string());
    hash.insert(
        "device_fingerprints".into(),
        profile.device_fingerprints.iter().cloned().collect::<Vec<_>>().join(","),
    );
    hash
}

fn decode_merchant_profile(hash: &HashMap<String, String>) -> MerchantProfile {
    let mut profile = MerchantProfile::default_on_miss();
    if let Some(v) = field(hash, "name") {
        profile.name = v.to_string();
    }
    if let Some(v) = field(hash, "category") {
        profile.category = v.to_string();
    }
    profile.risk_level = match field(hash, "risk_level") {
        Some("low") => MerchantRiskLevel::Low,
        Some("high") => MerchantRiskLevel::High,
        Some("unknown") => MerchantRiskLevel::Unknown,
        _ => MerchantRiskLevel::Medium,
    };
    if let Some(v) = field(hash, "fraud_rate").and_then(|s| s.parse().ok()) {
        profile.fraud_rate = v;
    }
    if let Some(v) = field(hash, "is_blacklisted").and_then(|s| s.parse().ok()) {
        profile.is_blacklisted = v;
    }
    if let Some(v) = field(hash, "avg_transaction_amount").and_then(|s| s.parse().ok()) {
        profile.avg_transaction_amount = v;
    }
    if let Some(v) = field(hash, "risk_multiplier").and_then(|s| s.parse().ok()) {
        profile.risk_multiplier = v;
    }
    if let Some(v) = field(hash, "is_high_risk_category").and_then(|s| s.parse().ok()) {
        profile.is_high_risk_category = v;
    }
    if let Some(v) = field(hash, "operating_hours") {
        profile.operating_hours = v.split(',').filter_map(|s| s.parse().ok()).collect();
    }
    profile
}

fn encode_merchant_profile(profile: &MerchantProfile) -> HashMap<String, String> {
    let mut hash = HashMap::new();
    hash.insert("name".into(), profile.name.clone());
    hash.insert("category".into(), profile.category.clone());
    hash.insert("risk_level".into(), profile.risk_level.as_str().to_string());
    hash.insert("fraud_rate".into(), profile.fraud_rate.to_string());
    hash.insert("is_blacklisted".into(), profile.is_blacklisted.to_string());
    hash.insert("avg_transaction_amount".into(), profile.avg_transaction_amount.to_string());
    hash.insert("risk_multiplier".into(), profile.risk_multiplier.to_string());
    hash.insert("is_high_risk_category".into(), profile.is_high_risk_category.to_string());
    hash.insert(
        "operating_hours".into(),
        profile.operating_hours.iter().map(|h| h.to_string()).collect::<Vec<_>>().join(","),
    );
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::InMemoryStateStore;

    #[tokio::test]
    async fn unknown_user_is_a_genuine_miss() {
        let cache = ProfileCache::new(Arc::new(InMemoryStateStore::new()));
        assert!(cache.get_user("ghost").await.is_none());
    }

    #[tokio::test]
    async fn unknown_merchant_is_a_genuine_miss() {
        let cache = ProfileCache::new(Arc::new(InMemoryStateStore::new()));
        assert!(cache.get_merchant("ghost").await.is_none());
    }

    #[tokio::test]
    async fn default_on_miss_matches_documented_profile_defaults() {
        let user = UserProfile::default_on_miss();
        assert_eq!(user.risk_score, 0.5);
        assert_eq!(user.kyc_status, "pending");
        assert!(!user.verified);

        let merchant = MerchantProfile::default_on_miss();
        assert_eq!(merchant.risk_level, MerchantRiskLevel::Medium);
        assert_eq!(merchant.fraud_rate, 0.05);
        assert_eq!(merchant.risk_multiplier, 2.0);
    }

    #[tokio::test]
    async fn stored_user_profile_round_trips() {
        let cache = ProfileCache::new(Arc::new(InMemoryStateStore::new()));
        let mut profile = UserProfile::default_on_miss();
        profile.risk_score = 0.1;
        profile.verified = true;
        cache.put_user("u1", &profile).await;

        let fetched = cache.get_user("u1").await.expect("profile was just written");
        assert_eq!(fetched.risk_score, 0.1);
        assert!(fetched.verified);
    }

    #[tokio::test]
    async fn miss_synthesized_profile_is_not_written_back() {
        let store = Arc::new(InMemoryStateStore::new());
        let cache = ProfileCache::new(store.clone());
        let _ = cache.get_user("ghost").await;
        assert!(store.get_hash(&cache::user_key("ghost")).await.is_empty());
    }
}
