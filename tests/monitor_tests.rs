use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use coinalert::monitor::{run_pass, Notifier, QuoteProvider};
use coinalert::registry::TargetRegistry;

#[derive(Default)]
struct FakeProvider {
    prices: Mutex<HashMap<String, Result<f64, String>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn with_price(self, symbol: &str, price: f64) -> Self {
        self.set_price(symbol, price);
        self
    }

    fn with_failure(self, symbol: &str) -> Self {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Err("connection reset".to_string()));
        self
    }

    fn set_price(&self, symbol: &str, price: f64) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Ok(price));
    }

    fn calls_for(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == symbol)
            .count()
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    async fn price_usd(&self, symbol: &str) -> Result<f64, String> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(format!("no quote for {symbol}")))
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing: AtomicBool,
}

impl FakeNotifier {
    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, user_id: i64, text: &str) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("delivery failed".to_string());
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn target_below_price_stays_active() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default().with_price("BTC", 29500.0);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    assert!(notifier.sent().is_empty());
    assert_eq!(registry.target_count(), 1);
}

#[tokio::test]
async fn met_target_notifies_with_two_decimals_and_is_removed() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default().with_price("BTC", 30500.0);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 1);
    assert!(sent[0].1.contains("BTC"));
    assert!(sent[0].1.contains("30500.00"));
    assert!(registry.snapshot_all().is_empty());
}

#[tokio::test]
async fn price_equal_to_target_counts_as_met() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default().with_price("BTC", 30000.0);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    assert_eq!(notifier.sent().len(), 1);
    assert!(registry.snapshot_all().is_empty());
}

#[tokio::test]
async fn failing_symbol_does_not_block_others() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "XRP", 1.0);
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default()
        .with_failure("XRP")
        .with_price("BTC", 30500.0);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    // BTC fired despite the XRP failure; the XRP target survives the pass.
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("BTC"));

    let snapshot = registry.snapshot_all();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].symbol, "XRP");
}

#[tokio::test]
async fn bogus_quote_is_skipped() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default().with_price("BTC", f64::NAN);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    assert!(notifier.sent().is_empty());
    assert_eq!(registry.target_count(), 1);
}

#[tokio::test]
async fn shared_symbol_is_quoted_once_and_users_resolve_independently() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "ETH", 2000.0);
    registry.set_target(2, "ETH", 2500.0);

    let provider = FakeProvider::default().with_price("ETH", 2200.0);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    assert_eq!(provider.calls_for("ETH"), 1);

    // Only the first user met the condition; the second stays active.
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 1);

    let snapshot = registry.snapshot_all();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].user_id, 2);
    assert_eq!(snapshot[0].target_price, 2500.0);
}

#[tokio::test]
async fn notifier_failure_keeps_the_target_for_a_retry() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default().with_price("BTC", 30500.0);
    let notifier = FakeNotifier::default();
    notifier.set_failing(true);

    run_pass(&registry, &provider, &notifier).await.unwrap();

    // Delivery failed, so the alert is not lost.
    assert!(notifier.sent().is_empty());
    assert_eq!(registry.target_count(), 1);

    // Next pass retries and succeeds.
    notifier.set_failing(false);
    run_pass(&registry, &provider, &notifier).await.unwrap();

    assert_eq!(notifier.sent().len(), 1);
    assert!(registry.snapshot_all().is_empty());
}

#[tokio::test]
async fn target_fires_once_across_passes() {
    let registry = TargetRegistry::new();
    registry.set_target(1, "BTC", 30000.0);

    let provider = FakeProvider::default().with_price("BTC", 29500.0);
    let notifier = FakeNotifier::default();

    // Pass 1: below target, nothing happens.
    run_pass(&registry, &provider, &notifier).await.unwrap();
    assert!(notifier.sent().is_empty());
    assert_eq!(registry.target_count(), 1);

    // Pass 2: target met, notification fires and the target is removed.
    provider.set_price("BTC", 30500.0);
    run_pass(&registry, &provider, &notifier).await.unwrap();

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("30500.00"));
    assert!(registry.snapshot_all().is_empty());

    // Pass 3: nothing left to evaluate, no second notification.
    run_pass(&registry, &provider, &notifier).await.unwrap();
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn empty_registry_makes_no_provider_calls() {
    let registry = TargetRegistry::new();
    let provider = FakeProvider::default().with_price("BTC", 30500.0);
    let notifier = FakeNotifier::default();

    run_pass(&registry, &provider, &notifier).await.unwrap();

    assert_eq!(provider.calls_for("BTC"), 0);
    assert!(notifier.sent().is_empty());
}
