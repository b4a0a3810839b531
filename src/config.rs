use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_api_key: String,
    pub cmc_api_key: String,

    pub monitor_interval_secs: u64,
    pub monitor_first_delay_secs: u64,

    pub top_tokens_limit: u32,
    pub poll_timeout_secs: u64,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let telegram_api_key = env::var("TELEGRAM_API_KEY").unwrap_or_default();
    let cmc_api_key = env::var("COINMARKETCAP_API_KEY").unwrap_or_default();

    let monitor_interval_secs = env::var("MONITOR_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(60);

    let monitor_first_delay_secs = env::var("MONITOR_FIRST_DELAY_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);

    let top_tokens_limit = env::var("TOP_TOKENS_LIMIT")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(20);

    let poll_timeout_secs = env::var("POLL_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(50);

    Settings {
        telegram_api_key,
        cmc_api_key,
        monitor_interval_secs,
        monitor_first_delay_secs,
        top_tokens_limit,
        poll_timeout_secs,
    }
}
