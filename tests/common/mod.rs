use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use wheelbot::ai::client::{AiClient, AiReply, TaskMode};
use wheelbot::ai::router::{PreferenceStore, Provider};
use wheelbot::config::AppConfig;
use wheelbot::db::position_repo;
use wheelbot::errors::AppError;
use wheelbot::market::{MarketQuotes, MarketSnapshot};
use wheelbot::models::{DraftSource, NewPosition, OwnerId, Position, StagedDraft, Strategy};
use wheelbot::services::notifier::MessageSink;
use wheelbot::staging::DraftStore;
use wheelbot::vision::DraftExtractor;
use wheelbot::AppState;

/// In-memory database with all migrations applied. One connection so every
/// query sees the same memory store.
#[allow(dead_code)]
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        telegram_bot_token: None,
        gemini_api_key: None,
        openai_api_key: None,
        xai_api_key: None,
        review_times: Vec::new(),
        review_pace_secs: 2,
        metrics_port: None,
    }
}

/// A cash-secured put shaped like the examples in the command help.
#[allow(dead_code)]
pub fn csp(owner: OwnerId, ticker: &str) -> NewPosition {
    NewPosition {
        owner,
        ticker: ticker.into(),
        strategy: Strategy::CashSecuredPut,
        short_strike: Decimal::new(8, 0),
        long_strike: None,
        entry_credit: Decimal::new(67, 2),
        open_date: Some(date(2025, 7, 1)),
        expiry_date: date(2025, 8, 15),
    }
}

#[allow(dead_code)]
pub async fn seed_position(pool: &SqlitePool, owner: OwnerId, ticker: &str) -> Position {
    position_repo::create(pool, csp(owner, ticker))
        .await
        .expect("Failed to seed position")
}

#[allow(dead_code)]
pub fn sample_draft(ticker: &str) -> StagedDraft {
    StagedDraft {
        ticker: ticker.into(),
        strategy: Strategy::CashSecuredPut,
        short_strike: Decimal::new(150, 0),
        long_strike: None,
        entry_credit: Decimal::new(235, 2),
        open_date: Some(date(2025, 7, 1)),
        expiry_date: date(2025, 8, 15),
        source: DraftSource::Screenshot,
    }
}

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// AI stub: pops scripted results first, then falls back to a fixed reply.
/// Every prompt is recorded.
pub struct ScriptedAi {
    default_text: String,
    scripted: Mutex<VecDeque<Result<AiReply, AppError>>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedAi {
    pub fn new(default_text: &str) -> Self {
        Self {
            default_text: default_text.into(),
            scripted: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, result: Result<AiReply, AppError>) {
        self.scripted.lock().await.push_back(result);
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl AiClient for ScriptedAi {
    async fn generate(
        &self,
        _provider: Provider,
        prompt: &str,
        _system_context: &str,
        _mode: TaskMode,
    ) -> Result<AiReply, AppError> {
        self.calls.lock().await.push(prompt.to_string());
        match self.scripted.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(AiReply {
                text: self.default_text.clone(),
                citations: Vec::new(),
            }),
        }
    }
}

/// Fixed market snapshot — no network.
pub struct StaticMarket;

#[async_trait]
impl MarketQuotes for StaticMarket {
    async fn snapshot(&self, _ticker: &str) -> MarketSnapshot {
        MarketSnapshot {
            price: "8.50".into(),
            next_earnings: "2025-10-01".into(),
            sector: "Financial Services".into(),
        }
    }
}

/// Extraction stub: yields whatever draft was loaded, or None.
#[derive(Default)]
pub struct StubExtractor {
    draft: Mutex<Option<StagedDraft>>,
}

#[allow(dead_code)]
impl StubExtractor {
    pub async fn load(&self, draft: StagedDraft) {
        *self.draft.lock().await = Some(draft);
    }
}

#[async_trait]
impl DraftExtractor for StubExtractor {
    async fn extract(&self, _image: &[u8]) -> Result<Option<StagedDraft>, AppError> {
        Ok(self.draft.lock().await.clone())
    }
}

/// Captures every delivered message.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(OwnerId, String)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub async fn messages(&self) -> Vec<(OwnerId, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, owner: OwnerId, text: &str) {
        self.sent.lock().await.push((owner, text.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub state: AppState,
    pub ai: Arc<ScriptedAi>,
    pub sink: Arc<RecordingSink>,
    pub extractor: Arc<StubExtractor>,
}

#[allow(dead_code)]
pub async fn harness() -> TestHarness {
    let pool = setup_test_db().await;
    let ai = Arc::new(ScriptedAi::new("Hold — theta is doing the work."));
    let sink = Arc::new(RecordingSink::default());
    let extractor = Arc::new(StubExtractor::default());

    let state = AppState {
        db: pool,
        config: test_config(),
        prefs: Arc::new(PreferenceStore::new()),
        drafts: Arc::new(DraftStore::new()),
        ai: ai.clone(),
        market: Arc::new(StaticMarket),
        extractor: extractor.clone(),
        sink: sink.clone(),
    };

    TestHarness { state, ai, sink, extractor }
}
