use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::registry::TargetRegistry;

/// Current USD price for a symbol.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn price_usd(&self, symbol: &str) -> Result<f64, String>;
}

/// Delivers a message to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, text: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub first_delay: Duration,
}

impl MonitorConfig {
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            interval: Duration::from_secs(settings.monitor_interval_secs),
            first_delay: Duration::from_secs(settings.monitor_first_delay_secs),
        }
    }
}

/// Handle to a running monitor task. Dropping it leaves the task running;
/// `stop` asks it to shut down and waits for any in-flight pass to finish.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

pub fn spawn_price_monitor(
    registry: Arc<TargetRegistry>,
    provider: Arc<dyn QuoteProvider>,
    notifier: Arc<dyn Notifier>,
    cfg: MonitorConfig,
) -> MonitorHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        // Let the rest of the process finish starting up before the first pass.
        tokio::select! {
            _ = time::sleep(cfg.first_delay) => {}
            _ = shutdown_rx.changed() => return,
        }

        let mut interval = time::interval(cfg.interval);
        // Passes must never overlap; a late pass delays the next tick
        // instead of bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.changed() => break,
            }

            if let Err(e) = run_pass(&registry, provider.as_ref(), notifier.as_ref()).await {
                tracing::error!("[price-monitor] pass error: {e}");
            }
        }
    });

    MonitorHandle { shutdown, task }
}

/// One monitoring pass: snapshot the registry, quote each distinct symbol
/// once, notify met targets, and remove them once delivery is confirmed.
pub async fn run_pass(
    registry: &TargetRegistry,
    provider: &dyn QuoteProvider,
    notifier: &dyn Notifier,
) -> Result<(), String> {
    // 1) Snapshot outside the lock; everything below works on the copy.
    let snapshot = registry.snapshot_all();
    if snapshot.is_empty() {
        return Ok(());
    }

    // 2) Group by symbol => only 1 quote request per symbol per pass
    let mut by_symbol: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
    for t in snapshot {
        by_symbol
            .entry(t.symbol)
            .or_default()
            .push((t.user_id, t.target_price));
    }

    // 3) Check each symbol once, collecting met targets. Removals are
    //    applied after evaluation, never while iterating.
    let mut met: Vec<(i64, String, f64)> = Vec::new();

    for (symbol, targets) in by_symbol {
        let price = match provider.price_usd(&symbol).await {
            Ok(p) => p,
            Err(e) => {
                // Skip this symbol for this pass; the others still run.
                tracing::warn!("[price-monitor] quote for {symbol} failed: {e}");
                continue;
            }
        };

        if !price.is_finite() || price <= 0.0 {
            tracing::warn!("[price-monitor] ignoring bogus {symbol} quote: {price}");
            continue;
        }

        for (user_id, target_price) in targets {
            if price >= target_price {
                met.push((user_id, symbol.clone(), price));
            }
        }
    }

    // 4) Notify and remove. A target is only removed once the notifier
    //    confirms delivery; on failure it stays for the next pass.
    for (user_id, symbol, price) in met {
        let text = format!("🚨 {symbol} has reached ${price:.2}");
        match notifier.notify(user_id, &text).await {
            Ok(()) => registry.remove_target(user_id, &symbol),
            Err(e) => {
                tracing::warn!(
                    "[price-monitor] notify user {user_id} about {symbol} failed: {e}; keeping target"
                );
            }
        }
    }

    Ok(())
}
