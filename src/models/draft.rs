use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{NewPosition, OwnerId, Strategy};

/// Where an unconfirmed draft came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftSource {
    Screenshot,
}

/// An extraction-derived candidate position awaiting explicit
/// confirm/discard. Same shape as a position minus id/status.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedDraft {
    pub ticker: String,
    pub strategy: Strategy,
    pub short_strike: Decimal,
    pub long_strike: Option<Decimal>,
    pub entry_credit: Decimal,
    pub open_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub source: DraftSource,
}

impl StagedDraft {
    pub fn into_new_position(self, owner: OwnerId) -> NewPosition {
        NewPosition {
            owner,
            ticker: self.ticker,
            strategy: self.strategy,
            short_strike: self.short_strike,
            long_strike: self.long_strike,
            entry_credit: self.entry_credit,
            open_date: self.open_date,
            expiry_date: self.expiry_date,
        }
    }

    /// Body of the confirmation prompt shown after extraction.
    pub fn summary(&self) -> String {
        let mut line = format!("{} {} short ${}", self.ticker, self.strategy, self.short_strike);
        if let Some(long) = self.long_strike {
            line.push_str(&format!(" / long ${long}"));
        }
        line.push_str(&format!(", credit ${}, expires {}", self.entry_credit, self.expiry_date));
        if let Some(open) = self.open_date {
            line.push_str(&format!(", opened {open}"));
        }
        line
    }
}
