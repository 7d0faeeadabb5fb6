//! Feature Store Facade (C9, §4.9). In-process, lock-protected state —
//! `streaming-pipeline` owns the distributed state store (C2); this facade
//! is the scoring engine's own bookkeeping of what it has registered,
//! stored, and observed, kept in the same `Arc<RwLock<HashMap<..>>>` shape
//! the corpus already uses for shared mutable registries.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use fraud_core::{EntityType, FeatureMap, FeatureRecord, FeatureStats, FeatureType, FeatureValue};

use crate::registry::FeatureRegistry;

// Metadata TTL (24h, §4.9) governs the distributed state-store key this
// facade's registrations are mirrored from; in-process registrations here
// live for the life of the facade rather than expiring on their own.
const VALUES_TTL_SECONDS: i64 = 2 * 60 * 60;
const STATISTICS_TTL_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct RegisteredFeatureMeta {
    pub name: String,
    pub feature_type: FeatureType,
    pub description: String,
    pub properties: HashMap<String, String>,
    pub registered_at: DateTime<Utc>,
}

struct StoredRecord {
    record: FeatureRecord,
    stored_at: DateTime<Utc>,
}

/// A feature's lifetime statistics plus a rolling "current window" snapshot
/// used only to compute `drift_score`; the window resets every statistics
/// TTL rather than sliding precisely (§4.9's simplification, same trade-off
/// velocity counters make at §4.6).
struct FeatureStatEntry {
    lifetime: FeatureStats,
    windowed: FeatureStats,
    window_started_at: DateTime<Utc>,
}

impl FeatureStatEntry {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            lifetime: FeatureStats::new(at),
            windowed: FeatureStats::new(at),
            window_started_at: at,
        }
    }

    fn roll_window_if_expired(&mut self, at: DateTime<Utc>) {
        if at.signed_duration_since(self.window_started_at) > Duration::seconds(STATISTICS_TTL_SECONDS) {
            self.windowed = FeatureStats::new(at);
            self.window_started_at = at;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureStatisticsSnapshot {
    pub count: u64,
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub null_rate: f64,
    pub drift_score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthMetrics {
    pub registered_features_count: usize,
    pub stored_entities_count: usize,
    pub tracked_stats_count: usize,
}

/// Thread-safe facade over feature registration, storage, and statistics.
/// Constructed once per scoring engine instance and shared by `Arc`.
pub struct FeatureStoreFacade {
    registered: RwLock<HashMap<String, RegisteredFeatureMeta>>,
    values: RwLock<HashMap<String, StoredRecord>>,
    stats: RwLock<HashMap<String, FeatureStatEntry>>,
}

impl Default for FeatureStoreFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStoreFacade {
    /// Seeds the facade with the full standard registry (§4.4) so
    /// `get_registered_features` reflects the exact enumerated feature set
    /// even before any dynamic registration occurs.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut registered = HashMap::new();
        for def in FeatureRegistry::standard().defs() {
            registered.insert(
                def.name.to_string(),
                RegisteredFeatureMeta {
                    name: def.name.to_string(),
                    feature_type: def.feature_type,
                    description: String::new(),
                    properties: HashMap::new(),
                    registered_at: now,
                },
            );
        }
        Self {
            registered: RwLock::new(registered),
            values: RwLock::new(HashMap::new()),
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_feature(
        &self,
        name: &str,
        feature_type: FeatureType,
        description: &str,
        properties: HashMap<String, String>,
    ) {
        let mut registered = self.registered.write().expect("registered lock poisoned");
        registered.insert(
            name.to_string(),
            RegisteredFeatureMeta {
                name: name.to_string(),
                feature_type,
                description: description.to_string(),
                properties,
                registered_at: Utc::now(),
            },
        );
    }

    /// Store a feature map for one entity and fold every value into its
    /// per-feature running statistics (§4.9).
    pub fn store_feature_values(&self, entity_id: &str, entity_type: EntityType, version: u32, map: FeatureMap) {
        let now = Utc::now();
        {
            let mut stats = self.stats.write().expect("stats lock poisoned");
            for (name, value) in &map {
                let entry = stats.entry(name.clone()).or_insert_with(|| FeatureStatEntry::new(now));
                entry.roll_window_if_expired(now);
                match value {
                    FeatureValue::Number(n) => {
                        entry.lifetime.update_numeric(*n, now);
                        entry.windowed.update_numeric(*n, now);
                    }
                    FeatureValue::Bool(b) => {
                        let s = if *b { "true" } else { "false" };
                        entry.lifetime.update_categorical(s, now);
                        entry.windowed.update_categorical(s, now);
                    }
                    FeatureValue::Text(s) => {
                        entry.lifetime.update_categorical(s, now);
                        entry.windowed.update_categorical(s, now);
                    }
                }
            }
        }

        let key = Self::values_key(entity_type, entity_id);
        let record = FeatureRecord {
            entity_id: entity_id.to_string(),
            entity_type,
            timestamp: now,
            version,
            feature_map: map,
        };
        self.values
            .write()
            .expect("values lock poisoned")
            .insert(key, StoredRecord { record, stored_at: now });
    }

    pub fn get_feature_values(&self, entity_id: &str, entity_type: EntityType) -> Option<FeatureRecord> {
        let key = Self::values_key(entity_type, entity_id);
        let values = self.values.read().expect("values lock poisoned");
        let stored = values.get(&key)?;
        if Self::expired(stored.stored_at, VALUES_TTL_SECONDS) {
            return None;
        }
        Some(stored.record.clone())
    }

    pub fn get_selected_features(
        &self,
        entity_id: &str,
        entity_type: EntityType,
        names: &[String],
    ) -> Option<FeatureMap> {
        let record = self.get_feature_values(entity_id, entity_type)?;
        Some(
            record
                .feature_map
                .into_iter()
                .filter(|(k, _)| names.contains(k))
                .collect(),
        )
    }

    pub fn get_batch_feature_values(
        &self,
        entities: &[(String, EntityType)],
    ) -> HashMap<String, FeatureRecord> {
        entities
            .iter()
            .filter_map(|(id, entity_type)| self.get_feature_values(id, *entity_type).map(|r| (id.clone(), r)))
            .collect()
    }

    pub fn get_feature_statistics(&self, name: &str) -> Option<FeatureStatisticsSnapshot> {
        let stats = self.stats.read().expect("stats lock poisoned");
        let entry = stats.get(name)?;
        if Self::expired(entry.lifetime.last_updated, STATISTICS_TTL_SECONDS) {
            return None;
        }
        Some(FeatureStatisticsSnapshot {
            count: entry.lifetime.count,
            mean: entry.lifetime.mean,
            variance: entry.lifetime.variance(),
            min: entry.lifetime.min,
            max: entry.lifetime.max,
            null_rate: entry.lifetime.null_rate(),
            drift_score: Self::drift_score(entry),
        })
    }

    pub fn get_registered_features(&self) -> Vec<String> {
        let registered = self.registered.read().expect("registered lock poisoned");
        let mut names: Vec<_> = registered.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_healthy(&self) -> bool {
        self.registered.read().is_ok() && self.values.read().is_ok() && self.stats.read().is_ok()
    }

    pub fn get_health_metrics(&self) -> HealthMetrics {
        HealthMetrics {
            registered_features_count: self.registered.read().expect("registered lock poisoned").len(),
            stored_entities_count: self.values.read().expect("values lock poisoned").len(),
            tracked_stats_count: self.stats.read().expect("stats lock poisoned").len(),
        }
    }

    fn values_key(entity_type: EntityType, entity_id: &str) -> String {
        format!("feature_values:{}:{}", entity_type.as_str(), entity_id)
    }

    fn expired(since: DateTime<Utc>, ttl_seconds: i64) -> bool {
        Utc::now().signed_duration_since(since) > Duration::seconds(ttl_seconds)
    }

    /// Normalized absolute z-shift of the current window's mean against the
    /// lifetime mean; 0 when there isn't enough history to judge drift.
    fn drift_score(entry: &FeatureStatEntry) -> f64 {
        if entry.lifetime.count < 2 || entry.windowed.count == 0 {
            return 0.0;
        }
        let stddev = entry.lifetime.stddev();
        if stddev == 0.0 {
            return 0.0;
        }
        ((entry.windowed.mean - entry.lifetime.mean) / stddev).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> FeatureMap {
        let mut m = FeatureMap::new();
        m.insert("amount".to_string(), FeatureValue::Number(42.0));
        m.insert("is_new_account".to_string(), FeatureValue::Bool(true));
        m
    }

    #[test]
    fn new_facade_is_preseeded_with_standard_registry() {
        let facade = FeatureStoreFacade::new();
        let names = facade.get_registered_features();
        assert!(names.contains(&"amount".to_string()));
        assert_eq!(names.len(), FeatureRegistry::standard().defs().len());
    }

    #[test]
    fn store_then_get_round_trips_feature_values() {
        let facade = FeatureStoreFacade::new();
        facade.store_feature_values("tx-1", EntityType::Transaction, 1, sample_map());
        let record = facade.get_feature_values("tx-1", EntityType::Transaction).unwrap();
        assert_eq!(record.entity_id, "tx-1");
        assert_eq!(record.feature_map.len(), 2);
    }

    #[test]
    fn missing_entity_returns_none() {
        let facade = FeatureStoreFacade::new();
        assert!(facade.get_feature_values("ghost", EntityType::User).is_none());
    }

    #[test]
    fn statistics_track_numeric_mean() {
        let facade = FeatureStoreFacade::new();
        facade.store_feature_values("tx-1", EntityType::Transaction, 1, sample_map());
        facade.store_feature_values(
            "tx-2",
            EntityType::Transaction,
            1,
            FeatureMap::from_iter([("amount".to_string(), FeatureValue::Number(58.0))]),
        );
        let stats = facade.get_feature_statistics("amount").unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 50.0).abs() < 1e-9);
    }

    #[test]
    fn register_feature_adds_custom_entry() {
        let facade = FeatureStoreFacade::new();
        facade.register_feature("custom_score", FeatureType::Numerical, "a custom score", HashMap::new());
        assert!(facade.get_registered_features().contains(&"custom_score".to_string()));
    }

    #[test]
    fn health_metrics_reflect_stored_state() {
        let facade = FeatureStoreFacade::new();
        facade.store_feature_values("tx-1", EntityType::Transaction, 1, sample_map());
        let metrics = facade.get_health_metrics();
        assert_eq!(metrics.stored_entities_count, 1);
        assert!(metrics.registered_features_count > 0);
        assert!(facade.is_healthy());
    }
}
