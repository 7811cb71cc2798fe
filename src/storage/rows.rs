use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::domain::{Account, Entry, Transfer};

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, owner, balance, currency, created_at, updated_at, user_id";
pub(crate) const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
pub(crate) const TRANSFER_COLUMNS: &str =
    "id, from_account_id, to_account_id, amount, created_at, idempotency_key";

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_error(column, e))
}

fn decode_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| decode_error(column, e))
}

fn decode_error(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

pub(crate) fn account(row: &SqliteRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: decode_uuid(row, "id")?,
        user_id: decode_uuid(row, "user_id")?,
        owner: row.try_get("owner")?,
        currency: row.try_get("currency")?,
        balance: row.try_get("balance")?,
        created_at: decode_timestamp(row, "created_at")?,
        updated_at: decode_timestamp(row, "updated_at")?,
    })
}

pub(crate) fn entry(row: &SqliteRow) -> Result<Entry, sqlx::Error> {
    Ok(Entry {
        id: decode_uuid(row, "id")?,
        account_id: decode_uuid(row, "account_id")?,
        amount: row.try_get("amount")?,
        created_at: decode_timestamp(row, "created_at")?,
    })
}

pub(crate) fn transfer(row: &SqliteRow) -> Result<Transfer, sqlx::Error> {
    Ok(Transfer {
        id: decode_uuid(row, "id")?,
        from_account_id: decode_uuid(row, "from_account_id")?,
        to_account_id: decode_uuid(row, "to_account_id")?,
        amount: row.try_get("amount")?,
        created_at: decode_timestamp(row, "created_at")?,
        idempotency_key: row.try_get("idempotency_key")?,
    })
}
