//! Library entrypoint for coinalert.
//!
//! This file exists mainly to make integration tests easy (tests under
//! `tests/` can import the registry, monitor, and service clients).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub mod commands;
pub mod config;
pub mod models;
pub mod monitor;
pub mod registry;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub registry: Arc<registry::TargetRegistry>,
    pub cmc: services::coinmarketcap::CmcClient,
    pub telegram: services::telegram::TelegramClient,
    // Per-user token selection made via /start, consumed by /settarget.
    pub selections: Arc<Mutex<HashMap<i64, String>>>,
}
