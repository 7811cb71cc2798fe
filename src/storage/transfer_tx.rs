use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Account, AccountId, Amount, Entry, Transfer, lock_order};

use super::Repository;
use super::balance::add_account_balance;
use super::rows::{self, TRANSFER_COLUMNS, encode_timestamp};

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl TransferError {
    /// Nothing from a failed attempt is ever persisted, so storage failures can be retried.
    /// Retrying without an idempotency key may post a second transfer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Storage(_))
    }
}

/// Input to a transfer, with identifiers as supplied by the caller.
#[derive(Debug, Clone)]
pub struct TransferParams {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Amount,
    pub idempotency_key: Option<String>,
}

impl TransferParams {
    pub fn new(
        from_account_id: impl Into<String>,
        to_account_id: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            from_account_id: from_account_id.into(),
            to_account_id: to_account_id.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Parse identifiers and check the amount. Nothing touches the store before this passes.
    pub fn validate(&self) -> Result<(AccountId, AccountId), TransferError> {
        let from = Uuid::parse_str(&self.from_account_id)
            .map_err(|_| TransferError::InvalidArgument("invalid from_account_id".to_string()))?;
        let to = Uuid::parse_str(&self.to_account_id)
            .map_err(|_| TransferError::InvalidArgument("invalid to_account_id".to_string()))?;

        check_posting(from, to, self.amount)?;
        if let Some(key) = &self.idempotency_key {
            if key.trim().is_empty() {
                return Err(TransferError::InvalidArgument(
                    "idempotency key must not be blank".to_string(),
                ));
            }
        }

        Ok((from, to))
    }
}

fn check_posting(from: AccountId, to: AccountId, amount: Amount) -> Result<(), TransferError> {
    if amount <= 0 {
        return Err(TransferError::InvalidArgument(
            "amount must be positive".to_string(),
        ));
    }
    if from == to {
        return Err(TransferError::InvalidArgument(
            "source and destination accounts must differ".to_string(),
        ));
    }
    Ok(())
}

/// Everything one committed transfer produced.
#[derive(Debug, Clone)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    /// Source account as of the end of the unit
    pub from_account: Account,
    /// Destination account as of the end of the unit
    pub to_account: Account,
}

#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// The transfer was posted by this call.
    Created(TransferTxResult),
    /// A transfer with the same idempotency key already existed; nothing was written.
    Replayed(Transfer),
}

impl TransferOutcome {
    pub fn transfer(&self) -> &Transfer {
        match self {
            TransferOutcome::Created(result) => &result.transfer,
            TransferOutcome::Replayed(transfer) => transfer,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, TransferOutcome::Replayed(_))
    }
}

impl Repository {
    /// Move `amount` from one account to another as a single atomic unit.
    ///
    /// Inside one database transaction this writes the transfer record, a debit
    /// entry, a credit entry and both balance deltas. Any failure rolls the
    /// whole unit back, and so does dropping the returned future before it
    /// completes.
    pub async fn execute_transfer(
        &self,
        params: &TransferParams,
    ) -> Result<TransferOutcome, TransferError> {
        let (from, to) = params.validate()?;

        let mut tx = self.pool().begin().await?;

        let outcome = match post_transfer(
            &mut tx,
            from,
            to,
            params.amount,
            params.idempotency_key.as_deref(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Failed to roll back transfer");
                }
                debug!(from = %from, to = %to, error = %e, "Transfer aborted");
                return Err(e);
            }
        };

        tx.commit().await?;

        match &outcome {
            TransferOutcome::Created(result) => info!(
                transfer_id = %result.transfer.id,
                from = %from,
                to = %to,
                amount = params.amount,
                "Transfer committed"
            ),
            TransferOutcome::Replayed(existing) => info!(
                transfer_id = %existing.id,
                "Transfer replayed from idempotency key"
            ),
        }

        Ok(outcome)
    }
}

/// Post a transfer on a connection that is already inside a transaction.
///
/// The first statement is a write, so on SQLite the writer lock is taken
/// through the busy handler rather than by upgrading a read snapshot. The
/// caller owns the transaction and decides whether to commit.
pub async fn post_transfer(
    conn: &mut SqliteConnection,
    from: AccountId,
    to: AccountId,
    amount: Amount,
    idempotency_key: Option<&str>,
) -> Result<TransferOutcome, TransferError> {
    check_posting(from, to, amount)?;

    let mut transfer = Transfer::new(from, to, amount);
    if let Some(key) = idempotency_key {
        transfer = transfer.with_idempotency_key(key);
    }

    if !insert_transfer(conn, &transfer).await? {
        // Only reachable with a key: the unique constraint matched an earlier transfer.
        let key = idempotency_key.unwrap_or_default();
        let existing = find_transfer_by_key(conn, key).await?;
        if !existing.matches(from, to, amount) {
            return Err(TransferError::InvalidArgument(format!(
                "idempotency key '{}' was already used for a different transfer",
                key
            )));
        }
        return Ok(TransferOutcome::Replayed(existing));
    }

    let (from_entry, to_entry) = transfer.entries();
    insert_entry(conn, &from_entry).await?;
    insert_entry(conn, &to_entry).await?;

    let mut from_account = None;
    let mut to_account = None;
    let (first, second) = lock_order(from, to);
    for account_id in [first, second] {
        let delta = if account_id == from { -amount } else { amount };
        let account = add_account_balance(conn, account_id, delta)
            .await?
            .ok_or(TransferError::AccountNotFound(account_id))?;
        if account_id == from {
            from_account = Some(account);
        } else {
            to_account = Some(account);
        }
    }

    match (from_account, to_account) {
        (Some(from_account), Some(to_account)) => Ok(TransferOutcome::Created(TransferTxResult {
            transfer,
            from_entry,
            to_entry,
            from_account,
            to_account,
        })),
        (None, _) => Err(TransferError::AccountNotFound(from)),
        (_, None) => Err(TransferError::AccountNotFound(to)),
    }
}

/// Returns false when the idempotency key already exists and nothing was inserted.
async fn insert_transfer(
    conn: &mut SqliteConnection,
    transfer: &Transfer,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO transfers (id, from_account_id, to_account_id, amount, created_at, idempotency_key)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(idempotency_key) DO NOTHING
        "#,
    )
    .bind(transfer.id.to_string())
    .bind(transfer.from_account_id.to_string())
    .bind(transfer.to_account_id.to_string())
    .bind(transfer.amount)
    .bind(encode_timestamp(transfer.created_at))
    .bind(&transfer.idempotency_key)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn insert_entry(conn: &mut SqliteConnection, entry: &Entry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO entries (id, account_id, amount, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.account_id.to_string())
    .bind(entry.amount)
    .bind(encode_timestamp(entry.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn find_transfer_by_key(
    conn: &mut SqliteConnection,
    key: &str,
) -> Result<Transfer, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM transfers WHERE idempotency_key = ?",
        TRANSFER_COLUMNS
    );
    let row = sqlx::query(&sql).bind(key).fetch_one(&mut *conn).await?;
    rows::transfer(&row)
}
