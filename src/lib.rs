pub mod ai;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod market;
pub mod metrics;
pub mod models;
pub mod services;
pub mod staging;
pub mod vision;

use std::sync::Arc;

use crate::ai::client::AiClient;
use crate::ai::router::PreferenceStore;
use crate::config::AppConfig;
use crate::market::MarketQuotes;
use crate::services::notifier::MessageSink;
use crate::staging::DraftStore;
use crate::vision::DraftExtractor;

/// Shared application state. Collaborators are trait objects so tests can
/// inject scripted implementations.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: AppConfig,
    pub prefs: Arc<PreferenceStore>,
    pub drafts: Arc<DraftStore>,
    pub ai: Arc<dyn AiClient>,
    pub market: Arc<dyn MarketQuotes>,
    pub extractor: Arc<dyn DraftExtractor>,
    pub sink: Arc<dyn MessageSink>,
}
