//! State Store Client (C2, §4.2): namespaced typed accessors over an
//! external key/hash store with TTL, expressed as an async trait so the
//! backend technology stays a plug-in. `InMemoryStateStore` is the
//! `DashMap`-backed implementation that ships for tests, local development,
//! and benchmarks — the same ring-buffer-plus-lazy-expiry shape the
//! reference pack's windowed account store uses, scaled down to plain
//! key/value/hash/list entries instead of per-account windows.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Bound on every state-store call; a call that would exceed this returns
/// the operation's empty/zero value rather than blocking (§4.2 contract).
pub const OPERATION_TIMEOUT: Duration = Duration::from_millis(250);

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_hash(&self, key: &str) -> HashMap<String, String>;
    async fn set_hash(&self, key: &str, map: HashMap<String, String>, ttl: Duration);
    async fn expire(&self, key: &str, ttl: Duration);

    async fn get_json(&self, key: &str) -> Option<Value>;
    async fn set_json(&self, key: &str, value: Value, ttl: Duration);

    async fn list_push_front(&self, key: &str, item: String);
    async fn list_trim(&self, key: &str, len: usize);
    async fn list_range(&self, key: &str, limit: usize) -> Vec<String>;

    /// Atomically increments the counter at `key`; sets `ttl_if_new` only on
    /// the 0→1 transition. Returns the post-increment value.
    async fn incr_counter(&self, key: &str, ttl_if_new: Duration) -> u64;

    async fn ping(&self) -> bool;
}

/// Typed convenience wrappers built on the trait's JSON primitives. Kept as
/// free functions rather than default trait methods so a networked backend
/// can still implement only the primitive operations.
pub async fn get_typed<S, T>(store: &S, key: &str) -> Option<T>
where
    S: StateStore + ?Sized,
    T: DeserializeOwned,
{
    let value = store.get_json(key).await?;
    serde_json::from_value(value).ok()
}

pub async fn set_typed<S, T>(store: &S, key: &str, value: &T, ttl: Duration)
where
    S: StateStore + ?Sized,
    T: Serialize,
{
    if let Ok(json) = serde_json::to_value(value) {
        store.set_json(key, json, ttl).await;
    }
}

struct Expiring<T> {
    value: T,
    expires_at: Option<DateTime<Utc>>,
}

impl<T> Expiring<T> {
    fn fresh(value: T) -> Self {
        Self { value, expires_at: None }
    }

    fn with_ttl(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default()),
        }
    }

    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Utc::now() > at)
    }
}

/// In-process `StateStore` over sharded `DashMap`s. Expiry is checked lazily
/// on read; `sweep_expired` additionally reclaims memory for keys nobody
/// reads again, intended to run on a background `tokio::spawn` tick.
pub struct InMemoryStateStore {
    hashes: DashMap<String, Expiring<HashMap<String, String>>>,
    values: DashMap<String, Expiring<Value>>,
    lists: DashMap<String, Expiring<Vec<String>>>,
    counters: DashMap<String, Expiring<u64>>,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            hashes: DashMap::new(),
            values: DashMap::new(),
            lists: DashMap::new(),
            counters: DashMap::new(),
        }
    }

    /// Drop every entry whose TTL has elapsed. Intended to be driven by a
    /// periodic background task rather than called per-request.
    pub fn sweep_expired(&self) {
        self.hashes.retain(|_, v| !v.is_expired());
        self.values.retain(|_, v| !v.is_expired());
        self.lists.retain(|_, v| !v.is_expired());
        self.counters.retain(|_, v| !v.is_expired());
    }

    pub fn len_hashes(&self) -> usize {
        self.hashes.len()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_hash(&self, key: &str) -> HashMap<String, String> {
        match self.hashes.get(key) {
            Some(entry) if !entry.is_expired() => entry.value.clone(),
            _ => HashMap::new(),
        }
    }

    async fn set_hash(&self, key: &str, map: HashMap<String, String>, ttl: Duration) {
        self.hashes.insert(key.to_string(), Expiring::with_ttl(map, ttl));
    }

    async fn expire(&self, key: &str, ttl: Duration) {
        if let Some(mut entry) = self.hashes.get_mut(key) {
            entry.expires_at = Some(Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default());
        }
    }

    async fn get_json(&self, key: &str) -> Option<Value> {
        let entry = self.values.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set_json(&self, key: &str, value: Value, ttl: Duration) {
        self.values.insert(key.to_string(), Expiring::with_ttl(value, ttl));
    }

    async fn list_push_front(&self, key: &str, item: String) {
        let mut entry = self
            .lists
            .entry(key.to_string())
            .or_insert_with(|| Expiring::fresh(Vec::new()));
        entry.value.insert(0, item);
    }

    async fn list_trim(&self, key: &str, len: usize) {
        if let Some(mut entry) = self.lists.get_mut(key) {
            entry.value.truncate(len);
        }
    }

    async fn list_range(&self, key: &str, limit: usize) -> Vec<String> {
        match self.lists.get(key) {
            Some(entry) if !entry.is_expired() => entry.value.iter().take(limit).cloned().collect(),
            _ => Vec::new(),
        }
    }

    async fn incr_counter(&self, key: &str, ttl_if_new: Duration) -> u64 {
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| Expiring::with_ttl(0, ttl_if_new));
        entry.value += 1;
        entry.value
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_round_trips_within_ttl() {
        let store = InMemoryStateStore::new();
        let mut map = HashMap::new();
        map.insert("risk_score".to_string(), "0.5".to_string());
        store.set_hash("user:u1", map.clone(), Duration::from_secs(60)).await;
        assert_eq!(store.get_hash("user:u1").await, map);
    }

    #[tokio::test]
    async fn missing_key_returns_empty_not_error() {
        let store = InMemoryStateStore::new();
        assert!(store.get_hash("user:ghost").await.is_empty());
        assert!(store.get_json("feature:ghost").await.is_none());
        assert!(store.list_range("user_transactions:ghost", 10).await.is_empty());
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let store = InMemoryStateStore::new();
        store.set_json("k", serde_json::json!({"a": 1}), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get_json("k").await.is_none());
    }

    #[tokio::test]
    async fn incr_counter_increments_atomically() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.incr_counter("velocity:u1:5min", Duration::from_secs(300)).await, 1);
        assert_eq!(store.incr_counter("velocity:u1:5min", Duration::from_secs(300)).await, 2);
    }

    #[tokio::test]
    async fn list_push_front_and_trim_behave_like_a_bounded_deque() {
        let store = InMemoryStateStore::new();
        for i in 0..5 {
            store.list_push_front("user_transactions:u1", format!("tx-{i}")).await;
        }
        store.list_trim("user_transactions:u1", 3).await;
        let range = store.list_range("user_transactions:u1", 10).await;
        assert_eq!(range, vec!["tx-4", "tx-3", "tx-2"]);
    }

    #[tokio::test]
    async fn sweep_expired_clears_stale_entries() {
        let store = InMemoryStateStore::new();
        store.set_json("k", serde_json::json!(1), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.sweep_expired();
        assert_eq!(store.values.len(), 0);
    }

    #[tokio::test]
    async fn ping_reports_healthy() {
        let store = InMemoryStateStore::new();
        assert!(store.ping().await);
    }
}
