//! Velocity Updater (C6, §4.6): for every scored transaction, atomically
//! bumps the `{count, amount}` counter at `velocity:{user}:{window}` for
//! each of the three windows, and refreshes the bounded recent-activity
//! lists used by the Feature Extractor's velocity snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fraud_core::{
    cache, RecentTransactionEntry, VelocityCounter, VelocityWindow, MERCHANT_RECENT_CAPACITY,
    USER_RECENT_CAPACITY,
};

use crate::state_store::StateStore;

pub struct VelocityUpdater<S: StateStore> {
    store: Arc<S>,
}

impl<S: StateStore> VelocityUpdater<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Bump all three windows for `user_id` and refresh the recent-activity
    /// lists for both the user and the merchant (§4.6). Returns the
    /// post-update counters so the caller can fold them straight into a
    /// `VelocitySnapshot` without a second round-trip to the store.
    pub async fn record(
        &self,
        transaction_id: &str,
        user_id: &str,
        merchant_id: &str,
        amount: f64,
    ) -> [VelocityCounter; 3] {
        let now = Utc::now();
        let mut counters = [VelocityCounter::zero(now); 3];
        for (i, window) in VelocityWindow::ALL.iter().enumerate() {
            counters[i] = self.bump_window(user_id, *window, amount, now).await;
        }

        self.push_recent(
            &cache::user_transactions_key(user_id),
            transaction_id,
            amount,
            now,
            USER_RECENT_CAPACITY,
        )
        .await;
        self.push_recent(
            &cache::merchant_transactions_key(merchant_id),
            transaction_id,
            amount,
            now,
            MERCHANT_RECENT_CAPACITY,
        )
        .await;

        counters
    }

    async fn bump_window(
        &self,
        user_id: &str,
        window: VelocityWindow,
        amount: f64,
        now: chrono::DateTime<Utc>,
    ) -> VelocityCounter {
        let key = cache::velocity_key(user_id, window.key_suffix());
        let ttl = Duration::from_secs(window.duration_seconds() as u64);

        let mut counter = match self.store.get_json(&key).await {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|_| VelocityCounter::zero(now)),
            None => VelocityCounter::zero(now),
        };
        counter.add(amount, now);
        if let Ok(json) = serde_json::to_value(counter) {
            self.store.set_json(&key, json, ttl).await;
        }
        counter
    }

    async fn push_recent(
        &self,
        key: &str,
        transaction_id: &str,
        amount: f64,
        now: chrono::DateTime<Utc>,
        capacity: usize,
    ) {
        let entry = RecentTransactionEntry {
            transaction_id: transaction_id.to_string(),
            amount,
            timestamp: now,
        };
        if let Ok(encoded) = serde_json::to_string(&entry) {
            self.store.list_push_front(key, encoded).await;
            self.store.list_trim(key, capacity).await;
        }
    }

    /// Recent activity for `user_id`, newest first, bounded by `limit`.
    pub async fn recent_user_transactions(&self, user_id: &str, limit: usize) -> Vec<RecentTransactionEntry> {
        self.store
            .list_range(&cache::user_transactions_key(user_id), limit)
            .await
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }
}
