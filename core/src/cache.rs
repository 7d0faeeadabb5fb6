/// Namespace key helpers for the transaction cache (§3, §4.2). These are
/// plain formatting helpers — the state store behind them lives in
/// `streaming-pipeline`; this crate only owns the data shapes and key scheme.
pub fn transaction_key(transaction_id: &str) -> String {
    format!("transaction:{}", transaction_id)
}

pub fn user_transactions_key(user_id: &str) -> String {
    format!("user_transactions:{}", user_id)
}

pub fn merchant_transactions_key(merchant_id: &str) -> String {
    format!("merchant_transactions:{}", merchant_id)
}

pub fn velocity_key(user_id: &str, window_suffix: &str) -> String {
    format!("velocity:{}:{}", user_id, window_suffix)
}

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn merchant_key(merchant_id: &str) -> String {
    format!("merchant:{}", merchant_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_namespaces_match_spec_prefixes() {
        assert_eq!(transaction_key("t1"), "transaction:t1");
        assert_eq!(user_transactions_key("u1"), "user_transactions:u1");
        assert_eq!(velocity_key("u1", "5min"), "velocity:u1:5min");
    }
}
