pub mod draft;
pub mod position;

pub use draft::{DraftSource, StagedDraft};
pub use position::{NewPosition, Position, PositionField, PositionStatus, Strategy};

use chrono::NaiveDate;

use crate::errors::AppError;

/// Chat identity that owns positions and drafts. All store lookups are
/// scoped by this.
pub type OwnerId = i64;

/// Parse a user-supplied calendar date. Accepts the broker-style MM/DD/YYYY
/// form and ISO YYYY-MM-DD.
pub fn parse_user_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| AppError::Validation(format!("Date must be MM/DD/YYYY (got {raw:?}).")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        assert_eq!(parse_user_date("08/15/2025").unwrap(), expected);
        assert_eq!(parse_user_date("2025-08-15").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_user_date("15/08/2025").is_err());
        assert!(parse_user_date("friday").is_err());
    }
}
