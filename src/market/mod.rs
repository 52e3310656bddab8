use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::US::Eastern;

const YAHOO_CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const YAHOO_SUMMARY_BASE: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";

/// Today's date in the market's local timezone, independent of the host
/// timezone.
pub fn today_market_date() -> NaiveDate {
    Utc::now().with_timezone(&Eastern).date_naive()
}

/// Point-in-time market context for a ticker. Fields degrade to sentinel
/// strings when the upstream fetch fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub price: String,
    pub next_earnings: String,
    pub sector: String,
}

impl Default for MarketSnapshot {
    fn default() -> Self {
        Self {
            price: "N/A".into(),
            next_earnings: "Unknown".into(),
            sector: "Unknown".into(),
        }
    }
}

/// Market-data collaborator. Never errors — a failed fetch yields sentinel
/// values.
#[async_trait]
pub trait MarketQuotes: Send + Sync {
    async fn snapshot(&self, ticker: &str) -> MarketSnapshot;
}

/// Yahoo Finance quote client.
#[derive(Debug, Clone)]
pub struct YahooMarketData {
    http: reqwest::Client,
}

impl YahooMarketData {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch_price(&self, ticker: &str) -> Option<String> {
        let url = format!("{YAHOO_CHART_BASE}/{ticker}?range=1d&interval=1d");
        let payload: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .json()
            .await
            .ok()?;

        let price = payload
            .pointer("/chart/result/0/meta/regularMarketPrice")?
            .as_f64()?;
        Some(format!("{price:.2}"))
    }

    async fn fetch_profile(&self, ticker: &str) -> (Option<String>, Option<String>) {
        let url = format!("{YAHOO_SUMMARY_BASE}/{ticker}?modules=assetProfile,calendarEvents");
        let payload: serde_json::Value = match self.http.get(&url).send().await {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => match resp.json().await {
                    Ok(json) => json,
                    Err(_) => return (None, None),
                },
                Err(_) => return (None, None),
            },
            Err(_) => return (None, None),
        };

        let result = payload.pointer("/quoteSummary/result/0");
        let sector = result
            .and_then(|r| r.pointer("/assetProfile/sector"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let earnings = result
            .and_then(|r| r.pointer("/calendarEvents/earnings/earningsDate/0/fmt"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        (sector, earnings)
    }
}

#[async_trait]
impl MarketQuotes for YahooMarketData {
    async fn snapshot(&self, ticker: &str) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::default();

        match self.fetch_price(ticker).await {
            Some(price) => snapshot.price = price,
            None => tracing::warn!(ticker, "Price fetch failed — using sentinel"),
        }

        let (sector, earnings) = self.fetch_profile(ticker).await;
        match sector {
            Some(sector) => snapshot.sector = sector,
            None => tracing::warn!(ticker, "Sector fetch failed — using sentinel"),
        }
        match earnings {
            Some(earnings) => snapshot.next_earnings = earnings,
            None => tracing::warn!(ticker, "Earnings date fetch failed — using sentinel"),
        }

        snapshot
    }
}

// ---------------------------------------------------------------------------
// Ticker helpers
// ---------------------------------------------------------------------------

/// Split comma/space separated tokens into cleaned uppercase symbols.
pub fn normalize_tickers(tokens: &[&str]) -> Vec<String> {
    let mut normalized = Vec::new();
    for token in tokens {
        for part in token.split(',') {
            let cleaned = part.trim().to_uppercase();
            if !cleaned.is_empty() {
                normalized.push(cleaned);
            }
        }
    }
    normalized
}

/// Loose shape check for symbols: short, alphanumeric with optional dots and
/// hyphens.
pub fn is_ticker_like(token: &str) -> bool {
    let token = token.trim().trim_matches(',').to_uppercase();
    if token.is_empty() {
        return false;
    }
    let cleaned: String = token.chars().filter(|c| *c != '.' && *c != '-').collect();
    !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_alphanumeric()) && cleaned.len() <= 6
}

/// Sector per ticker, for sentiment context. Unknown sectors are recorded as
/// "Unknown" rather than dropped.
pub async fn derive_sectors(market: &dyn MarketQuotes, tickers: &[String]) -> HashMap<String, String> {
    let mut sectors = HashMap::new();
    for ticker in tickers {
        let snapshot = market.snapshot(ticker).await;
        if snapshot.sector == "Unknown" {
            tracing::info!(ticker, "Sector not found for ticker");
        }
        sectors.insert(ticker.clone(), snapshot.sector);
    }
    sectors
}
