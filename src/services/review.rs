use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::ai::client::{AiReply, TaskMode};
use crate::ai::prompt::{build_manage_prompt, FRAMEWORK_CONTEXT};
use crate::ai::router::{resolve_provider, Intent, Provider};
use crate::db::position_repo;
use crate::errors::AppError;
use crate::market;
use crate::models::{OwnerId, Position, PositionStatus};
use crate::services::notifier::MessageSink;
use crate::AppState;

const EMPTY_REPLY_DIAGNOSTIC: &str = "⚠️ The model returned no text. Try again shortly.";
const TYPING_REFRESH: Duration = Duration::from_secs(4);

// ---------------------------------------------------------------------------
// Typing indicator guard
// ---------------------------------------------------------------------------

/// Background "still working" indicator for one in-flight AI request. The
/// task is aborted on drop, so every exit path of the parent request cancels
/// it.
pub struct TypingGuard {
    handle: JoinHandle<()>,
}

impl TypingGuard {
    pub fn start(sink: Arc<dyn MessageSink>, owner: OwnerId) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                sink.send_typing(owner).await;
                tokio::time::sleep(TYPING_REFRESH).await;
            }
        });
        Self { handle }
    }
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// AI request plumbing
// ---------------------------------------------------------------------------

/// Run one AI request with the typing indicator up. Provider failures become
/// a user-visible diagnostic instead of an error; anything else propagates.
pub async fn run_ai_request(
    state: &AppState,
    owner: OwnerId,
    provider: Provider,
    prompt: &str,
    mode: TaskMode,
) -> Result<String, AppError> {
    let _typing = TypingGuard::start(state.sink.clone(), owner);

    let reply = match state.ai.generate(provider, prompt, FRAMEWORK_CONTEXT, mode).await {
        Ok(reply) => reply,
        Err(AppError::External(msg)) => {
            tracing::error!(owner, %provider, error = %msg, "AI request failed");
            AiReply {
                text: format!("⚠️ AI Error: {msg}"),
                citations: Vec::new(),
            }
        }
        Err(e) => return Err(e),
    };

    Ok(render_reply(reply))
}

/// Final message text: diagnostic fallback for empty replies, plus a
/// deduplicated source list when citations came back.
pub fn render_reply(reply: AiReply) -> String {
    let mut text = if reply.text.trim().is_empty() {
        EMPTY_REPLY_DIAGNOSTIC.to_string()
    } else {
        reply.text
    };

    let mut deduped: Vec<&str> = Vec::new();
    for url in &reply.citations {
        if !url.is_empty() && !deduped.contains(&url.as_str()) {
            deduped.push(url);
        }
    }
    if !deduped.is_empty() {
        let sources: Vec<String> = deduped.iter().map(|url| format!("- {url}")).collect();
        text.push_str("\n\nSources:\n");
        text.push_str(&sources.join("\n"));
    }

    text
}

// ---------------------------------------------------------------------------
// Review orchestration
// ---------------------------------------------------------------------------

/// Management review for one position. Always Reasoning mode — management
/// decisions are higher-stakes than scans.
pub async fn review_position(state: &AppState, position: &Position) -> Result<String, AppError> {
    let provider = resolve_provider(&state.prefs, position.owner, Intent::Manage).await;
    let snapshot = state.market.snapshot(&position.ticker).await;
    let prompt = build_manage_prompt(position, &snapshot, market::today_market_date());

    run_ai_request(state, position.owner, provider, &prompt, TaskMode::Reasoning).await
}

/// Ticker-addressed review. With more than one open position on the ticker
/// we never guess — the caller gets the candidate list and must re-issue by
/// id.
pub async fn manage_ticker(state: &AppState, owner: OwnerId, ticker: &str) -> Result<String, AppError> {
    let ticker = ticker.trim().to_uppercase();
    let positions = position_repo::get_open_positions(&state.db, owner, Some(&ticker)).await?;

    match positions.as_slice() {
        [] => Err(AppError::NotFound(format!("No open positions for {ticker}."))),
        [position] => review_position(state, position).await,
        _ => Ok(disambiguation_message(&ticker, &positions)),
    }
}

pub async fn manage_by_id(state: &AppState, owner: OwnerId, id: i64) -> Result<String, AppError> {
    let position = position_repo::get_position_by_id(&state.db, id, owner).await?;
    if position.status != PositionStatus::Open {
        return Err(AppError::NotFound(format!("Position {id} is already closed.")));
    }
    review_position(state, &position).await
}

fn disambiguation_message(ticker: &str, positions: &[Position]) -> String {
    let lines: Vec<String> = positions.iter().map(Position::summary_line).collect();
    format!(
        "⚠️ Multiple open positions found for {ticker}.\n\
         Please select one using /manageid <id>:\n\n{}",
        lines.join("\n")
    )
}
