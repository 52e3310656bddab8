use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{NewPosition, OwnerId, Position, PositionField, PositionStatus, Strategy};

const POSITION_COLUMNS: &str = "id, owner, ticker, strategy, short_strike, long_strike, \
     entry_credit, open_date, expiry_date, status, closed_date";

fn parse_stored_decimal(raw: &str, column: &str) -> Result<Decimal, AppError> {
    raw.parse()
        .map_err(|_| AppError::Persistence(format!("column {column} holds a non-decimal value: {raw:?}")))
}

fn parse_stored_date(raw: &str, column: &str) -> Result<NaiveDate, AppError> {
    raw.parse()
        .map_err(|_| AppError::Persistence(format!("column {column} holds a non-date value: {raw:?}")))
}

/// Decimals and dates are persisted as TEXT; map them back by hand.
fn row_to_position(row: &SqliteRow) -> Result<Position, AppError> {
    let strategy_raw: String = row.try_get("strategy")?;
    let short_raw: String = row.try_get("short_strike")?;
    let long_raw: Option<String> = row.try_get("long_strike")?;
    let credit_raw: String = row.try_get("entry_credit")?;
    let open_raw: String = row.try_get("open_date")?;
    let expiry_raw: String = row.try_get("expiry_date")?;
    let status_raw: String = row.try_get("status")?;
    let closed_raw: Option<String> = row.try_get("closed_date")?;

    Ok(Position {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        ticker: row.try_get("ticker")?,
        strategy: Strategy::from_code(&strategy_raw)
            .ok_or_else(|| AppError::Persistence(format!("unknown stored strategy: {strategy_raw:?}")))?,
        short_strike: parse_stored_decimal(&short_raw, "short_strike")?,
        long_strike: long_raw
            .as_deref()
            .map(|raw| parse_stored_decimal(raw, "long_strike"))
            .transpose()?,
        entry_credit: parse_stored_decimal(&credit_raw, "entry_credit")?,
        open_date: parse_stored_date(&open_raw, "open_date")?,
        expiry_date: parse_stored_date(&expiry_raw, "expiry_date")?,
        status: PositionStatus::from_db(&status_raw)
            .ok_or_else(|| AppError::Persistence(format!("unknown stored status: {status_raw:?}")))?,
        closed_date: closed_raw
            .as_deref()
            .map(|raw| parse_stored_date(raw, "closed_date"))
            .transpose()?,
    })
}

/// Insert a new OPEN position and return the stored row. `open_date`
/// defaults to today in the market timezone.
pub async fn create(pool: &SqlitePool, new: NewPosition) -> Result<Position, AppError> {
    let mut new = new;
    let open_date = new.open_date.unwrap_or_else(crate::market::today_market_date);
    new.open_date = Some(open_date);
    new.ticker = new.ticker.trim().to_uppercase();
    new.validate()?;

    let sql = format!(
        "INSERT INTO positions \
             (owner, ticker, strategy, short_strike, long_strike, entry_credit, \
              open_date, expiry_date, status, closed_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'OPEN', NULL) \
         RETURNING {POSITION_COLUMNS}"
    );

    let row = sqlx::query(&sql)
        .bind(new.owner)
        .bind(&new.ticker)
        .bind(new.strategy.code())
        .bind(new.short_strike.to_string())
        .bind(new.long_strike.map(|l| l.to_string()))
        .bind(new.entry_credit.to_string())
        .bind(open_date.to_string())
        .bind(new.expiry_date.to_string())
        .fetch_one(pool)
        .await?;

    row_to_position(&row)
}

/// Open positions for one owner, newest first, optionally narrowed to a
/// ticker.
pub async fn get_open_positions(
    pool: &SqlitePool,
    owner: OwnerId,
    ticker: Option<&str>,
) -> Result<Vec<Position>, AppError> {
    let rows = match ticker {
        Some(ticker) => {
            let sql = format!(
                "SELECT {POSITION_COLUMNS} FROM positions \
                 WHERE owner = ? AND ticker = ? AND status = 'OPEN' ORDER BY id DESC"
            );
            sqlx::query(&sql)
                .bind(owner)
                .bind(ticker.trim().to_uppercase())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {POSITION_COLUMNS} FROM positions \
                 WHERE owner = ? AND status = 'OPEN' ORDER BY id DESC"
            );
            sqlx::query(&sql).bind(owner).fetch_all(pool).await?
        }
    };

    rows.iter().map(row_to_position).collect()
}

/// Owner-scoped lookup. An id that exists under a different owner is
/// NotFound, never leaked.
pub async fn get_position_by_id(
    pool: &SqlitePool,
    id: i64,
    owner: OwnerId,
) -> Result<Position, AppError> {
    let sql = format!("SELECT {POSITION_COLUMNS} FROM positions WHERE id = ? AND owner = ? LIMIT 1");
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => row_to_position(&row),
        None => Err(AppError::NotFound(format!("No position with ID {id} for this chat."))),
    }
}

/// Every OPEN position across all owners. Scheduler use only.
pub async fn get_all_open_positions(pool: &SqlitePool) -> Result<Vec<Position>, AppError> {
    let sql = format!("SELECT {POSITION_COLUMNS} FROM positions WHERE status = 'OPEN' ORDER BY id");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(row_to_position).collect()
}

/// Result of a field edit, for the before/after report.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: PositionField,
    pub old: String,
    pub new: String,
}

/// Validate and write a single field. Returns the previous value; storage is
/// untouched when validation fails.
pub async fn update_field(
    pool: &SqlitePool,
    id: i64,
    owner: OwnerId,
    field: PositionField,
    raw: &str,
) -> Result<FieldChange, AppError> {
    let position = get_position_by_id(pool, id, owner).await?;
    let stored = field.parse_value(raw)?;

    enforce_edit_invariants(&position, field, stored.as_deref())?;

    let old = field.display_from(&position);
    let new = stored.clone().unwrap_or_else(|| "none".into());

    let sql = format!("UPDATE positions SET {} = ? WHERE id = ? AND owner = ?", field.column());
    sqlx::query(&sql)
        .bind(stored)
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

    Ok(FieldChange { field, old, new })
}

/// Cross-field rules an edit must not break: the long strike exists exactly
/// for spreads, and the expiry never precedes the open date.
fn enforce_edit_invariants(
    position: &Position,
    field: PositionField,
    stored: Option<&str>,
) -> Result<(), AppError> {
    match field {
        PositionField::LongStrike => {
            if stored.is_some() && !position.strategy.is_spread() {
                return Err(AppError::Validation(format!(
                    "{} is a single-leg strategy; a long strike does not apply.",
                    position.strategy
                )));
            }
            if stored.is_none() && position.strategy.is_spread() {
                return Err(AppError::Validation(format!(
                    "{} is a spread and requires a long strike.",
                    position.strategy
                )));
            }
        }
        PositionField::Strategy => {
            let new_strategy = stored
                .and_then(Strategy::from_code)
                .ok_or_else(|| AppError::Validation("Type must be one of CSP, CC, BPS, CCS.".into()))?;
            if new_strategy.is_spread() && position.long_strike.is_none() {
                return Err(AppError::Validation(format!(
                    "{new_strategy} is a spread — set the long strike first (edit {} long <value>).",
                    position.id
                )));
            }
            if !new_strategy.is_spread() && position.long_strike.is_some() {
                return Err(AppError::Validation(format!(
                    "{new_strategy} is single-leg — clear the long strike first (edit {} long none).",
                    position.id
                )));
            }
        }
        PositionField::OpenDate => {
            if let Some(raw) = stored {
                let open = parse_stored_date(raw, "open_date")?;
                if open > position.expiry_date {
                    return Err(AppError::Validation(format!(
                        "Open date {open} cannot be after the expiry {}.",
                        position.expiry_date
                    )));
                }
            }
        }
        PositionField::ExpiryDate => {
            if let Some(raw) = stored {
                let expiry = parse_stored_date(raw, "expiry_date")?;
                if expiry < position.open_date {
                    return Err(AppError::Validation(format!(
                        "Expiry {expiry} cannot be before the open date {}.",
                        position.open_date
                    )));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// OPEN → CLOSED, exactly once. Closing an unknown or already-closed
/// position is NotFound.
pub async fn close_position(
    pool: &SqlitePool,
    id: i64,
    owner: OwnerId,
    closed_date: NaiveDate,
) -> Result<Position, AppError> {
    let sql = format!(
        "UPDATE positions SET status = 'CLOSED', closed_date = ? \
         WHERE id = ? AND owner = ? AND status = 'OPEN' \
         RETURNING {POSITION_COLUMNS}"
    );

    let row = sqlx::query(&sql)
        .bind(closed_date.to_string())
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => row_to_position(&row),
        None => Err(AppError::NotFound(format!("No open position with ID {id} for this chat."))),
    }
}
