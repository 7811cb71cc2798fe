// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use ledgerline::StoreConfig;
use ledgerline::application::TransferService;
use ledgerline::domain::{Account, Amount, IntegrityStats};
use tempfile::TempDir;
use uuid::Uuid;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(TransferService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let config = StoreConfig::for_path(db_path.to_str().unwrap()).with_max_connections(8);
    let service = TransferService::init(&config).await?;
    Ok((service, temp_dir))
}

/// Test fixture: one user owning an account
pub struct Holder {
    pub user_id: Uuid,
    pub account: Account,
}

impl Holder {
    pub fn caller(&self) -> String {
        self.user_id.to_string()
    }

    pub fn account_id(&self) -> String {
        self.account.id.to_string()
    }
}

/// Open an account for a fresh user
pub async fn open_account(
    service: &TransferService,
    owner: &str,
    balance: Amount,
    currency: &str,
) -> Result<Holder> {
    let user_id = Uuid::new_v4();
    let account = service
        .create_account(user_id, owner.into(), currency.into(), Some(balance))
        .await?;
    Ok(Holder { user_id, account })
}

/// Current stored balance of an account
pub async fn balance_of(service: &TransferService, holder: &Holder) -> Result<Amount> {
    Ok(service
        .account_balance(&holder.caller(), &holder.account_id())
        .await?
        .balance)
}

pub async fn stats(service: &TransferService) -> Result<IntegrityStats> {
    service.repository().get_integrity_stats().await
}
