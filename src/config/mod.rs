use std::env;

use chrono::NaiveTime;

const DEFAULT_DATABASE_URL: &str = "sqlite://wheelbot.db";
const DEFAULT_REVIEW_TIMES: &str = "09:45,15:30";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,

    // Collaborator credentials (optional — a missing key degrades that
    // collaborator instead of failing startup)
    pub telegram_bot_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub xai_api_key: Option<String>,

    // Scheduler
    pub review_times: Vec<NaiveTime>,
    pub review_pace_secs: u64,

    pub metrics_port: Option<u16>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let times_raw = env::var("REVIEW_TIMES").unwrap_or_else(|_| DEFAULT_REVIEW_TIMES.into());
        let review_times = times_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                NaiveTime::parse_from_str(s, "%H:%M")
                    .map_err(|e| anyhow::anyhow!("bad REVIEW_TIMES entry {s:?}: {e}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            xai_api_key: env::var("XAI_API_KEY")
                .ok()
                .or_else(|| env::var("GROK_API_KEY").ok()),

            review_times,
            review_pace_secs: env::var("REVIEW_PACE_SECS")
                .unwrap_or_else(|_| "2".into())
                .parse()
                .unwrap_or(2),

            metrics_port: env::var("METRICS_PORT").ok().and_then(|p| p.parse().ok()),
        })
    }
}
