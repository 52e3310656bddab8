use std::collections::HashMap;

use chrono::NaiveDate;

use crate::market::MarketSnapshot;
use crate::models::Position;

/// System persona shared by every request.
pub const FRAMEWORK_CONTEXT: &str = "\
You are a premium-selling trading assistant. Core philosophy: 'Be the Casino, Not the Gambler.'
- Mindset: sellers collect premium upfront for an obligation with a statistical edge.
- Analogy: a credit spread is a 'fence' for a 'dog' (the stock). We only care that the boundary isn't crossed.

The Four Core Trades:
1. Cash-Secured Puts (CSP): getting paid to agree to buy the dip.
2. Covered Calls (CC): collecting 'rent' on 100+ owned shares.
3. Bull Put Spreads: selling a higher-strike put, buying a lower-strike put.
4. Call Credit Spreads: selling a lower-strike call, buying a higher-strike call.

Criteria:
- IV Rank: favor IV > 50th percentile.
- Timeframe: target 30-45 DTE for optimal theta decay.
- Management: close at 50-60% profit. Roll only for a net credit.";

/// Deterministic management prompt: position fields, market snapshot, and
/// the current date. Spreads get the width/max-risk form, single legs the
/// simple form.
pub fn build_manage_prompt(position: &Position, market: &MarketSnapshot, today: NaiveDate) -> String {
    let entry_info = match position.long_strike {
        Some(long) => {
            // Width and max risk are both well-defined here.
            let width = position.spread_width().unwrap_or_default();
            let max_risk = position.max_risk().unwrap_or_default();
            format!(
                "Position: {} Credit Spread @ Short Strike: ${} / Long Strike: ${long} (Width: ${width}). \
                 Net Premium Collected: ${}. Max Risk: ${max_risk} per spread. \
                 Expiry: {} (Opened: {})",
                position.strategy, position.short_strike, position.entry_credit,
                position.expiry_date, position.open_date,
            )
        }
        None => format!(
            "Position: {} @ Strike: ${}. Premium Collected: ${}. Expiry: {} (Opened: {})",
            position.strategy, position.short_strike, position.entry_credit,
            position.expiry_date, position.open_date,
        ),
    };

    format!(
        "Manage {}. {entry_info}. Current Market Price: ${}. Next Earnings: {}. Today: {today}. \
         Calculate current profit/loss based on decay. \
         Evaluate 50% profit target and provide Net Credit Roll advice.",
        position.ticker, market.price, market.next_earnings,
    )
}

pub fn build_scan_prompt(ticker: &str, market: &MarketSnapshot) -> String {
    format!(
        "Analyze {ticker} at ${}. Next Earnings: {}. \
         Identify best candidate from: CSP, CC, Bull Put Spread, or Call Credit Spread.",
        market.price, market.next_earnings,
    )
}

/// Ticker/sector context block for the ticker-list sentiment form.
pub fn build_ticker_sentiment_context(tickers: &[String], sectors: &HashMap<String, String>) -> String {
    let sector_lines: Vec<String> = tickers
        .iter()
        .map(|t| format!("- {t}: {}", sectors.get(t).map(String::as_str).unwrap_or("Unknown")))
        .collect();

    // Unique sectors in first-seen order.
    let mut unique: Vec<&str> = Vec::new();
    for ticker in tickers {
        let sector = sectors.get(ticker).map(String::as_str).unwrap_or("Unknown");
        if !unique.contains(&sector) {
            unique.push(sector);
        }
    }
    let aggregate = if unique.is_empty() { "Unknown".to_string() } else { unique.join(", ") };

    format!(
        "Tickers analyzed: {}\n\nDerived sectors:\n{}\n\nAggregate sector exposure: {aggregate}\n\n\
         Consider both ticker-specific sentiment and broader sector-level tailwinds/headwinds. \
         Describe how the tone differs by ticker/sector and note any contrarian or risk signals shaping psychology.",
        tickers.join(", "),
        sector_lines.join("\n"),
    )
}

pub fn build_ticker_sentiment_prompt(tickers: &[String], context: &str) -> String {
    format!(
        "STEP 1: USE THE 'x_search' TOOL to find real-time posts and retail sentiment for: {}. \
         STEP 2: USE THE 'web_search' TOOL to find breaking news or catalyst events. \
         STEP 3: Synthesize a 'Sentiment Verdict'. Summarize the dominant market mood \
         (Bullish/Bearish/Neutral) and provide specific COUNTER-ARGUMENTS or risks to the consensus \
         view. Focus on market psychology. DO NOT recommend trades. \
         IGNORE your internal training data; respond ONLY with LIVE DATA from the tools.\
         \n\nContext:\n{context}",
        tickers.join(", "),
    )
}

pub fn build_sector_sentiment_prompt(sector: &str) -> String {
    format!(
        "STEP 1: USE THE 'x_search' TOOL to find the current 'vibe' and retail sentiment for {sector}. \
         STEP 2: USE THE 'web_search' TOOL to identify any sector-wide headwinds/tailwinds. \
         STEP 3: Synthesize a 'Sentiment Verdict'. Summarize the dominant market mood \
         (Bullish/Bearish/Neutral) and provide specific COUNTER-ARGUMENTS or risks to the consensus \
         view. Focus on the psychological state of the market. DO NOT recommend specific trades. \
         IGNORE your internal training data; rely ONLY on the search results."
    )
}
