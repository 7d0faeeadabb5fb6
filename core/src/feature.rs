use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single named feature value. Kept as a small tagged union rather than a
/// class hierarchy (§9 Design Notes, "Polymorphism") so the feature map stays
/// one homogeneous collection while round-tripping through the codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FeatureValue::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(b) => Some(*b),
            FeatureValue::Number(n) => Some(*n != 0.0),
            FeatureValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

/// Ordered map of feature name to value. A `BTreeMap` rather than a
/// `HashMap` keeps encode output byte-stable across runs, which the codec
/// round-trip property (§8) relies on modulo documented map-iteration order.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// Declared type of a registered feature (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureType {
    Numerical,
    Categorical,
    Boolean,
    Text,
    Timestamp,
}

/// Which kind of entity a feature record or aggregate describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    User,
    Merchant,
    Transaction,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Merchant => "merchant",
            EntityType::Transaction => "transaction",
        }
    }
}

/// Compact per-transaction feature record emitted on the `features` stream (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
    pub feature_map: FeatureMap,
}

/// Online per-feature statistics maintained by the Feature Store Facade (C9, §4.9).
/// Numerical stats use Welford's algorithm; `running_m2` permits variance
/// without re-reading history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStats {
    pub count: u64,
    pub mean: f64,
    pub running_m2: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub categorical_counts: HashMap<String, u64>,
    pub null_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl FeatureStats {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            mean: 0.0,
            running_m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            categorical_counts: HashMap::new(),
            null_count: 0,
            last_updated: at,
        }
    }

    /// Welford's online update for a numerical observation.
    pub fn update_numeric(&mut self, value: f64, at: DateTime<Utc>) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.running_m2 += delta * delta2;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last_updated = at;
    }

    /// Categorical/boolean/text observations are tallied by their string form.
    pub fn update_categorical(&mut self, value: &str, at: DateTime<Utc>) {
        self.count += 1;
        *self.categorical_counts.entry(value.to_string()).or_insert(0) += 1;
        self.last_updated = at;
    }

    pub fn observe_null(&mut self, at: DateTime<Utc>) {
        self.null_count += 1;
        self.last_updated = at;
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.running_m2 / (self.count as f64 - 1.0)
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Fraction of observations that were null, out of all observations
    /// (numeric + categorical + null) seen so far.
    pub fn null_rate(&self) -> f64 {
        let total = self.count + self.null_count;
        if total == 0 {
            0.0
        } else {
            self.null_count as f64 / total as f64
        }
    }
}
