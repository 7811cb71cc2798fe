use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::{
    Account, AccountId, Amount, Entry, IntegrityStats, PageRequest, Transfer, TransferDirection,
    TransferId, UserId,
};

use super::MIGRATION_001_INITIAL;
use super::rows::{self, ACCOUNT_COLUMNS, ENTRY_COLUMNS, TRANSFER_COLUMNS, encode_timestamp};

/// Repository for persisting and querying accounts, entries and transfers.
///
/// Balance mutations never go through here; see `execute_transfer`.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a connection pool using the given store configuration.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options()?)
            .await
            .context("Failed to connect to database")?;
        tracing::debug!(url = %config.database_url, "Connected to ledger store");
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account, including its opening balance.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, owner, balance, currency, created_at, updated_at, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.owner)
        .bind(account.balance)
        .bind(&account.currency)
        .bind(encode_timestamp(account.created_at))
        .bind(encode_timestamp(account.updated_at))
        .bind(account.user_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        row.as_ref()
            .map(rows::account)
            .transpose()
            .context("Invalid account row")
    }

    /// Look up the user owning an account.
    pub async fn owner_of(&self, id: AccountId) -> Result<Option<UserId>> {
        let row = sqlx::query("SELECT user_id FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account owner")?;

        match row {
            Some(row) => {
                let user_id: String = row.try_get("user_id").context("Invalid account row")?;
                Ok(Some(
                    Uuid::parse_str(&user_id).context("Invalid user ID")?,
                ))
            }
            None => Ok(None),
        }
    }

    /// List all accounts belonging to a user.
    pub async fn list_accounts_for_user(&self, user_id: UserId) -> Result<Vec<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY created_at, rowid",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter()
            .map(|row| rows::account(row).context("Invalid account row"))
            .collect()
    }

    // ========================
    // Entry operations
    // ========================

    /// List ledger entries posted against an account, oldest first.
    pub async fn list_entries_for_account(&self, account_id: AccountId) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE account_id = ? ORDER BY created_at, rowid",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entries")?;

        rows.iter()
            .map(|row| rows::entry(row).context("Invalid entry row"))
            .collect()
    }

    /// Net movement posted against an account, computed in SQL.
    pub async fn entry_sum_for_account(&self, account_id: AccountId) -> Result<Amount> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0) AS total FROM entries WHERE account_id = ?",
        )
        .bind(account_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum entries")?;

        Ok(row.get("total"))
    }

    // ========================
    // Transfer operations
    // ========================

    /// Get a transfer by ID.
    pub async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>> {
        let sql = format!("SELECT {} FROM transfers WHERE id = ?", TRANSFER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch transfer")?;

        row.as_ref()
            .map(rows::transfer)
            .transpose()
            .context("Invalid transfer row")
    }

    /// List one page of the transfers touching an account, newest first.
    pub async fn list_transfers_for_account(
        &self,
        account_id: AccountId,
        direction: TransferDirection,
        page: PageRequest,
    ) -> Result<Vec<Transfer>> {
        let sql = format!(
            "SELECT {} FROM transfers WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            TRANSFER_COLUMNS,
            direction_filter(direction)
        );

        let rows = sqlx::query(&sql)
            .bind(account_id.to_string())
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transfers for account")?;

        rows.iter()
            .map(|row| rows::transfer(row).context("Invalid transfer row"))
            .collect()
    }

    /// Count the transfers touching an account.
    pub async fn count_transfers_for_account(
        &self,
        account_id: AccountId,
        direction: TransferDirection,
    ) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM transfers WHERE {}",
            direction_filter(direction)
        );
        let row = sqlx::query(&sql)
            .bind(account_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transfers for account")?;

        Ok(row.get("count"))
    }

    // ========================
    // Integrity
    // ========================

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let account_count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let transfer_count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM transfers")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let entries = sqlx::query(
            "SELECT COUNT(*) AS count, COALESCE(SUM(amount), 0) AS total FROM entries",
        )
        .fetch_one(&self.pool)
        .await?;

        let invalid_amounts: i64 =
            sqlx::query("SELECT COUNT(*) AS count FROM transfers WHERE amount <= 0")
                .fetch_one(&self.pool)
                .await?
                .get("count");

        let dangling_refs: i64 = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM transfers t
                 WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = t.from_account_id)
                    OR NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = t.to_account_id))
              + (SELECT COUNT(*) FROM entries e
                 WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = e.account_id))
              AS count
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(IntegrityStats {
            account_count,
            transfer_count,
            entry_count: entries.get("count"),
            entry_sum: entries.get("total"),
            invalid_amounts,
            dangling_refs,
        })
    }
}

fn direction_filter(direction: TransferDirection) -> &'static str {
    match direction {
        TransferDirection::All => "(from_account_id = ?1 OR to_account_id = ?1)",
        TransferDirection::Incoming => "to_account_id = ?1",
        TransferDirection::Outgoing => "from_account_id = ?1",
    }
}
