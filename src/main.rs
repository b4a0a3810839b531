use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use coinalert::monitor::{self, MonitorConfig, Notifier, QuoteProvider};
use coinalert::registry::TargetRegistry;
use coinalert::services::coinmarketcap::CmcClient;
use coinalert::services::telegram::TelegramClient;
use coinalert::{commands, config, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let registry = Arc::new(TargetRegistry::new());
    let cmc = CmcClient::new(settings.cmc_api_key.clone(), settings.top_tokens_limit);
    let telegram = TelegramClient::new(settings.telegram_api_key.clone());

    let state = AppState {
        settings: settings.clone(),
        registry: registry.clone(),
        cmc: cmc.clone(),
        telegram: telegram.clone(),
        selections: Arc::new(Mutex::new(HashMap::new())),
    };

    let monitor = monitor::spawn_price_monitor(
        registry,
        Arc::new(cmc) as Arc<dyn QuoteProvider>,
        Arc::new(telegram) as Arc<dyn Notifier>,
        MonitorConfig::from_settings(&settings),
    );
    tracing::info!(
        "price monitor scheduled: first pass in {}s, then every {}s",
        settings.monitor_first_delay_secs,
        settings.monitor_interval_secs
    );

    tokio::select! {
        _ = commands::run_polling(&state) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    // Let an in-flight monitoring pass finish before exiting.
    monitor.stop().await;
}
