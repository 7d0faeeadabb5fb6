use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three per-user rolling windows maintained by the Velocity Updater (C6, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VelocityWindow {
    FiveMin,
    OneHour,
    TwentyFourHour,
}

impl VelocityWindow {
    pub const ALL: [VelocityWindow; 3] = [
        VelocityWindow::FiveMin,
        VelocityWindow::OneHour,
        VelocityWindow::TwentyFourHour,
    ];

    /// Window length, also the TTL applied to its counter (§4.6).
    pub fn duration_seconds(&self) -> i64 {
        match self {
            VelocityWindow::FiveMin => 5 * 60,
            VelocityWindow::OneHour => 60 * 60,
            VelocityWindow::TwentyFourHour => 24 * 60 * 60,
        }
    }

    /// Key suffix used in the `velocity:{user}:{window}` namespace (§4.2).
    pub fn key_suffix(&self) -> &'static str {
        match self {
            VelocityWindow::FiveMin => "5min",
            VelocityWindow::OneHour => "1hour",
            VelocityWindow::TwentyFourHour => "24hour",
        }
    }
}

/// Per-`(user_id, window)` rolling count and amount sum (§3). TTL-based;
/// coarse rather than precisely sliding (§4.6, §9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCounter {
    pub count: u64,
    pub amount_sum: f64,
    pub last_update_timestamp: DateTime<Utc>,
}

impl VelocityCounter {
    pub fn zero(at: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            amount_sum: 0.0,
            last_update_timestamp: at,
        }
    }

    /// Fold one more event into the counter; never produces a negative count
    /// or amount (§3 invariant).
    pub fn add(&mut self, amount: f64, at: DateTime<Utc>) {
        self.count += 1;
        self.amount_sum += amount.max(0.0);
        self.last_update_timestamp = at;
    }
}

/// A bounded recent-activity entry stored in the transaction cache lists (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTransactionEntry {
    pub transaction_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

pub const USER_RECENT_CAPACITY: usize = 100;
pub const MERCHANT_RECENT_CAPACITY: usize = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_counter_never_negative() {
        let mut c = VelocityCounter::zero(Utc::now());
        c.add(-50.0, Utc::now());
        assert_eq!(c.count, 1);
        assert_eq!(c.amount_sum, 0.0);
    }

    #[test]
    fn window_durations_match_spec() {
        assert_eq!(VelocityWindow::FiveMin.duration_seconds(), 300);
        assert_eq!(VelocityWindow::OneHour.duration_seconds(), 3600);
        assert_eq!(VelocityWindow::TwentyFourHour.duration_seconds(), 86400);
    }
}
