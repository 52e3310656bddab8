use metrics::counter;

use crate::ai::client::TaskMode;
use crate::ai::prompt;
use crate::ai::router::{resolve_provider, Intent, Provider};
use crate::db::position_repo;
use crate::errors::AppError;
use crate::market;
use crate::models::{position::parse_positive_decimal, parse_user_date, NewPosition, OwnerId, PositionField, Strategy};
use crate::services::review;
use crate::staging::{self, StageOutcome, CONFIRM_PROMPT};
use crate::AppState;

pub const HELP_TEXT: &str = "\
📈 *Wheelbot command reference*

/setmodel [grok|openai|gemini] — choose the default model for ad-hoc questions.
/scan [ticker] — scan a ticker for CSP, CC, BPS and CCS candidates.
/sentiment [sector or TICKERS] — live sentiment read for a sector or ticker list.
/manage [ticker] — management review of your open position in a ticker.
/manageid [id] — management review of a specific position.
/positions [ticker] — list open positions, optionally filtered.
/open [ticker] [type] [strike] [premium] [expiry] [long_strike] — log a trade \
(expiry MM/DD/YYYY; long strike required for spreads).
/edit [id] [field] [value] — fix a field (short, long, premium, opened, expiry, ticker, type).
/close [id] — mark a position closed as of today.

Send a screenshot of a fill to log it automatically — you'll be asked to confirm.

*Remember: the gold is in managing the position.*";

pub fn help() -> &'static str {
    HELP_TEXT
}

fn usage(msg: &str) -> AppError {
    AppError::Validation(msg.into())
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| usage("Position id must be a number."))
}

// ---------------------------------------------------------------------------
// Position lifecycle
// ---------------------------------------------------------------------------

/// `/open TICKER TYPE STRIKE PREMIUM EXPIRY [LONG_STRIKE]`
pub async fn open(state: &AppState, owner: OwnerId, args: &[&str]) -> Result<String, AppError> {
    if args.len() < 5 || args.len() > 6 {
        return Err(usage(
            "Usage: /open [TICKER] [TYPE] [STRIKE] [PREMIUM] [MM/DD/YYYY] [LONG_STRIKE for spreads]",
        ));
    }

    let strategy = Strategy::from_code(args[1])
        .ok_or_else(|| usage("Type must be one of CSP, CC, BPS, CCS."))?;
    let short_strike = parse_positive_decimal(args[2], "strike")?;
    let entry_credit = parse_positive_decimal(args[3], "premium")?;
    let expiry_date = parse_user_date(args[4])?;
    let long_strike = args
        .get(5)
        .map(|raw| parse_positive_decimal(raw, "long strike"))
        .transpose()?;

    let position = position_repo::create(
        &state.db,
        NewPosition {
            owner,
            ticker: args[0].to_string(),
            strategy,
            short_strike,
            long_strike,
            entry_credit,
            open_date: None,
            expiry_date,
        },
    )
    .await?;

    counter!("positions_opened_total").increment(1);
    Ok(format!(
        "✅ Business is open! Logged {} {} as position ID {} expiring {}.",
        position.ticker, position.strategy, position.id, position.expiry_date
    ))
}

/// `/positions [TICKER]`
pub async fn positions(state: &AppState, owner: OwnerId, ticker: Option<&str>) -> Result<String, AppError> {
    let list = position_repo::get_open_positions(&state.db, owner, ticker).await?;

    let suffix = ticker
        .map(|t| format!(" for {}", t.trim().to_uppercase()))
        .unwrap_or_default();

    if list.is_empty() {
        return Ok(format!("No open positions{suffix}."));
    }

    let lines: Vec<String> = list.iter().map(|p| p.summary_line()).collect();
    Ok(format!("Open positions{suffix}:\n{}", lines.join("\n")))
}

/// `/edit ID FIELD VALUE`
pub async fn edit(state: &AppState, owner: OwnerId, args: &[&str]) -> Result<String, AppError> {
    if args.len() != 3 {
        return Err(usage("Usage: /edit [id] [field] [value]"));
    }

    let id = parse_id(args[0])?;
    let field = PositionField::from_alias(args[1]).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown field {:?}. Editable fields: ticker, type, short, long, premium, opened, expiry.",
            args[1]
        ))
    })?;

    let change = position_repo::update_field(&state.db, id, owner, field, args[2]).await?;
    Ok(format!(
        "✏️ Position {id}: {} {} → {}",
        change.field.label(),
        change.old,
        change.new
    ))
}

/// `/close ID` — closes as of today in the market timezone.
pub async fn close(state: &AppState, owner: OwnerId, id_arg: &str) -> Result<String, AppError> {
    let id = parse_id(id_arg)?;
    let position =
        position_repo::close_position(&state.db, id, owner, market::today_market_date()).await?;

    counter!("positions_closed_total").increment(1);
    Ok(format!(
        "✅ Closed {} {} (ID {}) on {}.",
        position.ticker,
        position.strategy,
        position.id,
        position.closed_date.map(|d| d.to_string()).unwrap_or_default()
    ))
}

// ---------------------------------------------------------------------------
// Provider preference
// ---------------------------------------------------------------------------

/// `/setmodel NAME`
pub async fn set_provider(state: &AppState, owner: OwnerId, name: &str) -> Result<String, AppError> {
    let provider =
        Provider::from_name(name).ok_or_else(|| usage("Usage: /setmodel [grok|openai|gemini]"))?;
    state.prefs.set(owner, provider).await;
    Ok(format!(
        "✅ Model set to {provider}. Note: /sentiment always uses Grok; /scan and /manage use Gemini."
    ))
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

/// `/manage TICKER`
pub async fn manage(state: &AppState, owner: OwnerId, ticker: Option<&str>) -> Result<String, AppError> {
    let ticker = ticker.ok_or_else(|| usage("Usage: /manage [ticker]"))?;
    review::manage_ticker(state, owner, ticker).await
}

/// `/manageid ID`
pub async fn manage_id(state: &AppState, owner: OwnerId, id_arg: &str) -> Result<String, AppError> {
    let id = parse_id(id_arg)?;
    review::manage_by_id(state, owner, id).await
}

/// `/scan [TICKER]`
pub async fn scan(state: &AppState, owner: OwnerId, ticker: Option<&str>) -> Result<String, AppError> {
    let provider = resolve_provider(&state.prefs, owner, Intent::Scan).await;
    let ticker = ticker.unwrap_or("SOFI").trim().to_uppercase();

    let snapshot = state.market.snapshot(&ticker).await;
    let prompt = prompt::build_scan_prompt(&ticker, &snapshot);

    review::run_ai_request(state, owner, provider, &prompt, TaskMode::Speed).await
}

/// `/sentiment [--tickers LIST | TICKERS | sector text]`
pub async fn sentiment(state: &AppState, owner: OwnerId, args: &[&str]) -> Result<String, AppError> {
    let provider = resolve_provider(&state.prefs, owner, Intent::Sentiment).await;

    let tickers = if args.first().is_some_and(|a| a.eq_ignore_ascii_case("--tickers")) {
        let tickers = market::normalize_tickers(&args[1..]);
        if tickers.is_empty() {
            return Err(usage("Usage: /sentiment --tickers AAPL,MSFT"));
        }
        tickers
    } else {
        let candidates = market::normalize_tickers(args);
        if !candidates.is_empty() && candidates.iter().all(|t| market::is_ticker_like(t)) {
            candidates
        } else {
            Vec::new()
        }
    };

    let prompt = if tickers.is_empty() {
        let sector = if args.is_empty() { "tech stocks".to_string() } else { args.join(" ") };
        prompt::build_sector_sentiment_prompt(&sector)
    } else {
        let sectors = market::derive_sectors(state.market.as_ref(), &tickers).await;
        let context = prompt::build_ticker_sentiment_context(&tickers, &sectors);
        prompt::build_ticker_sentiment_prompt(&tickers, &context)
    };

    review::run_ai_request(state, owner, provider, &prompt, TaskMode::Speed).await
}

// ---------------------------------------------------------------------------
// Extraction → staged confirmation
// ---------------------------------------------------------------------------

/// Photo submission: extract a draft and stage it for confirmation.
pub async fn photo(state: &AppState, owner: OwnerId, image: &[u8]) -> Result<String, AppError> {
    let draft = match state.extractor.extract(image).await {
        Ok(Some(draft)) => draft,
        Ok(None) => {
            return Ok("⚠️ Could not read a trade from that image. Log it manually with /open.".into());
        }
        Err(e) => {
            tracing::error!(owner, error = %e, "Screenshot extraction failed");
            return Ok(format!("⚠️ Image analysis failed: {e}"));
        }
    };

    let summary = draft.summary();
    let outcome = state.drafts.stage(owner, draft).await;
    counter!("drafts_staged_total").increment(1);

    let replaced_note = match outcome {
        StageOutcome::Replaced => "This replaces your earlier pending draft.\n",
        StageOutcome::Fresh => "",
    };

    Ok(format!(
        "{replaced_note}📋 Extracted trade:\n{summary}\n\n{CONFIRM_PROMPT}"
    ))
}

/// Plain-text message: drives a pending draft's confirm/discard, otherwise
/// `None` (nothing for us to answer).
pub async fn text_reply(
    state: &AppState,
    owner: OwnerId,
    text: &str,
) -> Result<Option<String>, AppError> {
    staging::handle_reply(&state.db, &state.drafts, owner, text).await
}
