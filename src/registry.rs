use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::Target;

/// In-memory store of every user's pending price targets.
///
/// The registry is the only shared mutable state in the process: the command
/// handlers write into it and the monitor loop reads and deletes from it.
/// Every operation takes the lock once, mutates, and releases — the lock is
/// never held across an await point or a network call.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    // user id -> (symbol -> target price)
    inner: Mutex<HashMap<i64, HashMap<String, f64>>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the target price for `(user_id, symbol)`.
    ///
    /// Symbols are normalized to uppercase. Price positivity is the caller's
    /// responsibility (the command surface validates before calling in).
    pub fn set_target(&self, user_id: i64, symbol: &str, price: f64) {
        let sym = symbol.to_uppercase();
        let mut map = self.inner.lock().expect("registry lock poisoned");
        map.entry(user_id).or_default().insert(sym, price);
    }

    /// Deletes the target for `(user_id, symbol)` if present; no-op otherwise.
    pub fn remove_target(&self, user_id: i64, symbol: &str) {
        let sym = symbol.to_uppercase();
        let mut map = self.inner.lock().expect("registry lock poisoned");
        if let Some(targets) = map.get_mut(&user_id) {
            targets.remove(&sym);
            // A user with no targets left is indistinguishable from no user.
            if targets.is_empty() {
                map.remove(&user_id);
            }
        }
    }

    /// Returns a point-in-time copy of every active target.
    pub fn snapshot_all(&self) -> Vec<Target> {
        let map = self.inner.lock().expect("registry lock poisoned");
        map.iter()
            .flat_map(|(&user_id, targets)| {
                targets.iter().map(move |(symbol, &target_price)| Target {
                    user_id,
                    symbol: symbol.clone(),
                    target_price,
                })
            })
            .collect()
    }

    pub fn target_count(&self) -> usize {
        let map = self.inner.lock().expect("registry lock poisoned");
        map.values().map(|targets| targets.len()).sum()
    }
}
