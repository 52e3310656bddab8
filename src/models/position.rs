use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{parse_user_date, OwnerId};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// The four option-selling strategies the tracker supports. Stored by short
/// code (CSP/CC/BPS/CCS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    CashSecuredPut,
    CoveredCall,
    BullPutSpread,
    CallCreditSpread,
}

impl Strategy {
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CSP" => Some(Strategy::CashSecuredPut),
            "CC" => Some(Strategy::CoveredCall),
            "BPS" => Some(Strategy::BullPutSpread),
            "CCS" => Some(Strategy::CallCreditSpread),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Strategy::CashSecuredPut => "CSP",
            Strategy::CoveredCall => "CC",
            Strategy::BullPutSpread => "BPS",
            Strategy::CallCreditSpread => "CCS",
        }
    }

    /// Spreads carry a bought long leg alongside the sold short leg.
    pub fn is_spread(&self) -> bool {
        matches!(self, Strategy::BullPutSpread | Strategy::CallCreditSpread)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// PositionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(PositionStatus::Open),
            "CLOSED" => Some(PositionStatus::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "OPEN",
            PositionStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Database row for the positions table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub owner: OwnerId,
    pub ticker: String,
    pub strategy: Strategy,
    pub short_strike: Decimal,
    pub long_strike: Option<Decimal>,
    pub entry_credit: Decimal,
    pub open_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: PositionStatus,
    pub closed_date: Option<NaiveDate>,
}

impl Position {
    /// One-line listing form used by /positions and disambiguation replies.
    pub fn summary_line(&self) -> String {
        match self.long_strike {
            Some(long) => format!(
                "• ID {} — {} {} {}/{} exp {} entry {}",
                self.id, self.ticker, self.strategy, self.short_strike, long, self.expiry_date, self.entry_credit,
            ),
            None => format!(
                "• ID {} — {} {} {} exp {} entry {}",
                self.id, self.ticker, self.strategy, self.short_strike, self.expiry_date, self.entry_credit,
            ),
        }
    }

    /// Distance between the legs of a spread.
    pub fn spread_width(&self) -> Option<Decimal> {
        self.long_strike.map(|long| (self.short_strike - long).abs())
    }

    /// Width minus credit received, per spread.
    pub fn max_risk(&self) -> Option<Decimal> {
        self.spread_width().map(|width| width - self.entry_credit)
    }
}

// ---------------------------------------------------------------------------
// NewPosition
// ---------------------------------------------------------------------------

/// Input to `position_repo::create`. `open_date` defaults to today in the
/// market timezone when omitted.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub owner: OwnerId,
    pub ticker: String,
    pub strategy: Strategy,
    pub short_strike: Decimal,
    pub long_strike: Option<Decimal>,
    pub entry_credit: Decimal,
    pub open_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
}

impl NewPosition {
    pub fn validate(&self) -> Result<(), AppError> {
        let ticker = self.ticker.trim();
        if !crate::market::is_ticker_like(ticker) {
            return Err(AppError::Validation(format!(
                "{ticker:?} does not look like a ticker symbol."
            )));
        }
        if self.short_strike <= Decimal::ZERO {
            return Err(AppError::Validation("Short strike must be positive.".into()));
        }
        if self.entry_credit <= Decimal::ZERO {
            return Err(AppError::Validation("Entry credit must be positive.".into()));
        }
        match (self.strategy.is_spread(), self.long_strike) {
            (true, None) => {
                return Err(AppError::Validation(format!(
                    "{} is a spread and requires a long strike.",
                    self.strategy
                )));
            }
            (false, Some(_)) => {
                return Err(AppError::Validation(format!(
                    "{} is a single-leg strategy; a long strike does not apply.",
                    self.strategy
                )));
            }
            _ => {}
        }
        if let Some(long) = self.long_strike {
            if long <= Decimal::ZERO {
                return Err(AppError::Validation("Long strike must be positive.".into()));
            }
        }
        if let Some(open) = self.open_date {
            if self.expiry_date < open {
                return Err(AppError::Validation(format!(
                    "Expiry {} cannot be before the open date {}.",
                    self.expiry_date, open
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PositionField — edit workflow field descriptor
// ---------------------------------------------------------------------------

/// Editable position fields, resolved from a closed alias table. `id`,
/// `owner` and `status` are deliberately not editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionField {
    Ticker,
    Strategy,
    ShortStrike,
    LongStrike,
    EntryCredit,
    OpenDate,
    ExpiryDate,
}

impl PositionField {
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_lowercase().as_str() {
            "ticker" | "symbol" => Some(PositionField::Ticker),
            "type" | "strategy" => Some(PositionField::Strategy),
            "short" | "strike" => Some(PositionField::ShortStrike),
            "long" => Some(PositionField::LongStrike),
            "premium" | "price" | "credit" => Some(PositionField::EntryCredit),
            "opened" | "open" => Some(PositionField::OpenDate),
            "expiry" | "exp" | "expiration" => Some(PositionField::ExpiryDate),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            PositionField::Ticker => "ticker",
            PositionField::Strategy => "strategy",
            PositionField::ShortStrike => "short_strike",
            PositionField::LongStrike => "long_strike",
            PositionField::EntryCredit => "entry_credit",
            PositionField::OpenDate => "open_date",
            PositionField::ExpiryDate => "expiry_date",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionField::Ticker => "ticker",
            PositionField::Strategy => "type",
            PositionField::ShortStrike => "short strike",
            PositionField::LongStrike => "long strike",
            PositionField::EntryCredit => "premium",
            PositionField::OpenDate => "opened",
            PositionField::ExpiryDate => "expiry",
        }
    }

    /// Validate and canonicalize a raw value for this field. Returns the TEXT
    /// to store; `None` clears the column (only the long strike accepts
    /// "none").
    pub fn parse_value(&self, raw: &str) -> Result<Option<String>, AppError> {
        let raw = raw.trim();
        match self {
            PositionField::Ticker => {
                let upper = raw.to_uppercase();
                if !crate::market::is_ticker_like(&upper) {
                    return Err(AppError::Validation(format!(
                        "{raw:?} does not look like a ticker symbol."
                    )));
                }
                Ok(Some(upper))
            }
            PositionField::Strategy => {
                let strategy = Strategy::from_code(raw).ok_or_else(|| {
                    AppError::Validation("Type must be one of CSP, CC, BPS, CCS.".into())
                })?;
                Ok(Some(strategy.code().to_string()))
            }
            PositionField::ShortStrike | PositionField::EntryCredit => {
                let value = parse_positive_decimal(raw, self.label())?;
                Ok(Some(value.to_string()))
            }
            PositionField::LongStrike => {
                if raw.eq_ignore_ascii_case("none") {
                    return Ok(None);
                }
                let value = parse_positive_decimal(raw, self.label())?;
                Ok(Some(value.to_string()))
            }
            PositionField::OpenDate | PositionField::ExpiryDate => {
                Ok(Some(parse_user_date(raw)?.to_string()))
            }
        }
    }

    /// Current value of this field on a position, for the before/after report.
    pub fn display_from(&self, position: &Position) -> String {
        match self {
            PositionField::Ticker => position.ticker.clone(),
            PositionField::Strategy => position.strategy.code().to_string(),
            PositionField::ShortStrike => position.short_strike.to_string(),
            PositionField::LongStrike => position
                .long_strike
                .map(|l| l.to_string())
                .unwrap_or_else(|| "none".into()),
            PositionField::EntryCredit => position.entry_credit.to_string(),
            PositionField::OpenDate => position.open_date.to_string(),
            PositionField::ExpiryDate => position.expiry_date.to_string(),
        }
    }
}

/// Shared decimal parsing for strike and premium inputs.
pub fn parse_positive_decimal(raw: &str, what: &str) -> Result<Decimal, AppError> {
    let value: Decimal = raw
        .trim()
        .trim_start_matches('$')
        .parse()
        .map_err(|_| AppError::Validation(format!("{what} must be a number (got {raw:?}).")))?;
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{what} must be positive.")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_new_position() -> NewPosition {
        NewPosition {
            owner: 1,
            ticker: "SOFI".into(),
            strategy: Strategy::CashSecuredPut,
            short_strike: Decimal::new(8, 0),
            long_strike: None,
            entry_credit: Decimal::new(67, 2),
            open_date: Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
            expiry_date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
        }
    }

    #[test]
    fn strategy_codes_round_trip() {
        for code in ["CSP", "CC", "BPS", "CCS"] {
            assert_eq!(Strategy::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Strategy::from_code("csp"), Some(Strategy::CashSecuredPut));
        assert_eq!(Strategy::from_code("IRON CONDOR"), None);
    }

    #[test]
    fn only_spreads_are_spreads() {
        assert!(!Strategy::CashSecuredPut.is_spread());
        assert!(!Strategy::CoveredCall.is_spread());
        assert!(Strategy::BullPutSpread.is_spread());
        assert!(Strategy::CallCreditSpread.is_spread());
    }

    #[test]
    fn spread_requires_long_strike() {
        let mut new = base_new_position();
        new.strategy = Strategy::BullPutSpread;
        assert!(new.validate().is_err());

        new.long_strike = Some(Decimal::new(7, 0));
        assert!(new.validate().is_ok());
    }

    #[test]
    fn single_leg_rejects_long_strike() {
        let mut new = base_new_position();
        new.long_strike = Some(Decimal::new(7, 0));
        assert!(new.validate().is_err());
    }

    #[test]
    fn expiry_cannot_precede_open_date() {
        let mut new = base_new_position();
        new.open_date = Some(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert!(new.validate().is_err());
    }

    #[test]
    fn field_aliases_resolve() {
        assert_eq!(PositionField::from_alias("short"), Some(PositionField::ShortStrike));
        assert_eq!(PositionField::from_alias("strike"), Some(PositionField::ShortStrike));
        assert_eq!(PositionField::from_alias("premium"), Some(PositionField::EntryCredit));
        assert_eq!(PositionField::from_alias("Opened"), Some(PositionField::OpenDate));
        assert_eq!(PositionField::from_alias("delta"), None);
    }

    #[test]
    fn parse_value_validates_by_field_type() {
        assert!(PositionField::ShortStrike.parse_value("abc").is_err());
        assert!(PositionField::ShortStrike.parse_value("-3").is_err());
        assert_eq!(
            PositionField::EntryCredit.parse_value("0.67").unwrap(),
            Some("0.67".to_string())
        );
        assert_eq!(
            PositionField::ExpiryDate.parse_value("08/15/2025").unwrap(),
            Some("2025-08-15".to_string())
        );
        assert_eq!(PositionField::LongStrike.parse_value("none").unwrap(), None);
    }
}
