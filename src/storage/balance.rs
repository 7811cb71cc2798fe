use chrono::Utc;
use sqlx::SqliteConnection;

use crate::domain::{Account, AccountId, Amount};

use super::rows::{self, ACCOUNT_COLUMNS, encode_timestamp};

/// Atomically add `delta` to an account's balance and return the updated row.
///
/// The addition is a single `balance = balance + ?` statement evaluated by the
/// database, so concurrent deltas against one account always net to their sum.
/// Run it on a transaction's connection; the returned row is the state inside
/// that transaction. Returns `None` if the account does not exist.
pub async fn add_account_balance(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    delta: Amount,
) -> Result<Option<Account>, sqlx::Error> {
    let sql = format!(
        "UPDATE accounts SET balance = balance + ?, updated_at = ? WHERE id = ? RETURNING {}",
        ACCOUNT_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(delta)
        .bind(encode_timestamp(Utc::now()))
        .bind(account_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(rows::account).transpose()
}
