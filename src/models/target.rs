use serde::{Deserialize, Serialize};

/// One pending alert condition: notify `user_id` once `symbol` trades at or
/// above `target_price` (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub user_id: i64,
    pub symbol: String,
    pub target_price: f64,
}
