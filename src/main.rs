use std::sync::Arc;
use std::time::Duration;

use wheelbot::ai::client::HttpAiClient;
use wheelbot::ai::router::PreferenceStore;
use wheelbot::config::AppConfig;
use wheelbot::db;
use wheelbot::market::YahooMarketData;
use wheelbot::services::notifier::{LogSink, MessageSink, Notifier};
use wheelbot::services::scheduler;
use wheelbot::staging::DraftStore;
use wheelbot::vision::GeminiVision;
use wheelbot::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    if let Some(port) = config.metrics_port {
        wheelbot::metrics::init_metrics(port)?;
        tracing::info!(port, "Metrics exporter listening");
    }

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url).await?;
    tracing::info!("Database ready");

    let http = reqwest::Client::new();

    let ai = Arc::new(HttpAiClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.openai_api_key.clone(),
        config.xai_api_key.clone(),
    ));
    let market = Arc::new(YahooMarketData::new(http.clone()));
    let extractor = Arc::new(GeminiVision::new(http.clone(), config.gemini_api_key.clone()));

    let sink: Arc<dyn MessageSink> = match &config.telegram_bot_token {
        Some(token) => Arc::new(Notifier::new(http, token.clone())),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set — review messages will be logged, not delivered");
            Arc::new(LogSink)
        }
    };

    let state = AppState {
        db,
        config: config.clone(),
        prefs: Arc::new(PreferenceStore::new()),
        drafts: Arc::new(DraftStore::new()),
        ai,
        market,
        extractor,
        sink,
    };

    let pacer = scheduler::review_pacer(Duration::from_secs(config.review_pace_secs))?;
    tracing::info!(
        times = ?config.review_times,
        pace_secs = config.review_pace_secs,
        "Review scheduler starting (weekdays, US/Eastern)"
    );

    scheduler::run_review_schedule(state, pacer).await;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
