use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ai::client::extract_candidate_text;
use crate::errors::AppError;
use crate::models::{parse_user_date, DraftSource, StagedDraft, Strategy};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const VISION_MODEL: &str = "gemini-2.5-flash";

const EXTRACTION_PROMPT: &str = "\
Analyze this trade screenshot. Return JSON with these keys:
* ticker: Symbol (e.g. AMD)
* type: CSP, CC, BPS, or CCS.
* short_strike: The strike price of the option SOLD (Credit).
* long_strike: The strike price of the option BOUGHT (if any). Null if single leg.
* price: The Net Credit/Premium received.
* expiry: Expiry Date (MM/DD/YYYY).
* open_date: The date the trade was opened/filled (MM/DD/YYYY). Infer year if missing.";

/// Image-to-draft collaborator. `Ok(None)` means "could not extract" — a
/// user-visible failure, not an error.
#[async_trait]
pub trait DraftExtractor: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<Option<StagedDraft>, AppError>;
}

/// Gemini vision extraction over the raw screenshot bytes.
#[derive(Debug, Clone)]
pub struct GeminiVision {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiVision {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl DraftExtractor for GeminiVision {
    async fn extract(&self, image: &[u8]) -> Result<Option<StagedDraft>, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::External("GEMINI_API_KEY is not set".into()))?;

        let url = format!("{GEMINI_API_BASE}/models/{VISION_MODEL}:generateContent");
        let body = json!({
            "contents": [{ "role": "user", "parts": [
                { "text": EXTRACTION_PROMPT },
                { "inline_data": { "mime_type": "image/jpeg", "data": BASE64.encode(image) } },
            ]}],
        });

        let resp = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Gemini vision request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::External(format!("Gemini vision returned {status}")));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| AppError::External(format!("Gemini vision sent an unreadable response: {e}")))?;

        Ok(parse_extracted_draft(&extract_candidate_text(&payload)))
    }
}

#[derive(Debug, Deserialize)]
struct ExtractedTrade {
    ticker: Option<String>,
    #[serde(rename = "type")]
    strategy: Option<String>,
    short_strike: Option<Value>,
    long_strike: Option<Value>,
    price: Option<Value>,
    expiry: Option<String>,
    open_date: Option<String>,
}

/// Parse the model's JSON reply into a draft. Anything short of a usable
/// trade is `None`.
pub fn parse_extracted_draft(text: &str) -> Option<StagedDraft> {
    let cleaned = strip_code_fences(text);
    let extracted: ExtractedTrade = match serde_json::from_str(cleaned) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "Extraction reply was not valid JSON");
            return None;
        }
    };

    let ticker = extracted.ticker?.trim().to_uppercase();
    if !crate::market::is_ticker_like(&ticker) {
        tracing::warn!(ticker, "Extracted ticker failed the shape check");
        return None;
    }

    let strategy = Strategy::from_code(extracted.strategy?.as_str())?;
    let short_strike = value_to_decimal(extracted.short_strike.as_ref())?;
    let entry_credit = value_to_decimal(extracted.price.as_ref())?;
    let long_strike = value_to_decimal(extracted.long_strike.as_ref());
    let expiry_date = parse_user_date(&extracted.expiry?).ok()?;
    let open_date = extracted.open_date.and_then(|d| parse_user_date(&d).ok());

    Some(StagedDraft {
        ticker,
        strategy,
        short_strike,
        long_strike,
        entry_credit,
        open_date,
        expiry_date,
        source: DraftSource::Screenshot,
    })
}

fn strip_code_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn value_to_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value {
        Some(Value::Number(n)) => n.to_string().parse().ok(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_fenced_json_single_leg() {
        let text = "```json\n{\"ticker\": \"amd\", \"type\": \"CSP\", \"short_strike\": 150, \
                    \"long_strike\": null, \"price\": \"2.35\", \"expiry\": \"08/15/2025\", \
                    \"open_date\": \"07/01/2025\"}\n```";
        let draft = parse_extracted_draft(text).unwrap();
        assert_eq!(draft.ticker, "AMD");
        assert_eq!(draft.strategy, Strategy::CashSecuredPut);
        assert_eq!(draft.short_strike, Decimal::new(150, 0));
        assert_eq!(draft.long_strike, None);
        assert_eq!(draft.entry_credit, Decimal::new(235, 2));
        assert_eq!(draft.expiry_date, NaiveDate::from_ymd_opt(2025, 8, 15).unwrap());
        assert_eq!(draft.source, DraftSource::Screenshot);
    }

    #[test]
    fn spread_long_strike_is_kept() {
        let text = "{\"ticker\": \"HOOD\", \"type\": \"BPS\", \"short_strike\": 30, \
                    \"long_strike\": 25, \"price\": 1.2, \"expiry\": \"08/15/2025\"}";
        let draft = parse_extracted_draft(text).unwrap();
        assert_eq!(draft.strategy, Strategy::BullPutSpread);
        assert_eq!(draft.long_strike, Some(Decimal::new(25, 0)));
        assert_eq!(draft.open_date, None);
    }

    #[test]
    fn unusable_replies_are_none() {
        assert!(parse_extracted_draft("sorry, I can't read that").is_none());
        assert!(parse_extracted_draft("{\"ticker\": \"AMD\"}").is_none());
        assert!(parse_extracted_draft("{\"ticker\": \"AMD\", \"type\": \"straddle\", \
                \"short_strike\": 1, \"price\": 1, \"expiry\": \"08/15/2025\"}").is_none());
    }
}
