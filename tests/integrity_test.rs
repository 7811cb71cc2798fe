mod common;

use anyhow::Result;
use common::{open_account, stats, test_service};
use ledgerline::application::CreateTransferRequest;
use ledgerline::domain::{IntegrityIssue, replay_entries};

#[tokio::test]
async fn test_fresh_ledger_is_healthy() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy());
    assert_eq!(report.account_count, 0);
    assert_eq!(report.transfer_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_entries_replay_to_balance_changes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let x = open_account(&service, "alice", 1000, "GBP").await?;
    let y = open_account(&service, "bob", 250, "GBP").await?;

    for amount in [100, 40, 5] {
        service
            .transfer(&x.caller(), CreateTransferRequest::new(x.account_id(), y.account_id(), amount))
            .await?;
    }
    service
        .transfer(&y.caller(), CreateTransferRequest::new(y.account_id(), x.account_id(), 30))
        .await?;

    let x_entries = service.list_entries(&x.caller(), &x.account_id()).await?;
    assert_eq!(
        x_entries.iter().map(|e| e.amount).collect::<Vec<_>>(),
        vec![-100, -40, -5, 30]
    );

    let x_now = service.get_account(&x.caller(), &x.account_id()).await?;
    let y_now = service.get_account(&y.caller(), &y.account_id()).await?;
    assert_eq!(x_now.balance, 1000 + replay_entries(x.account.id, &x_entries));
    assert_eq!(
        y_now.balance,
        250 + service.repository().entry_sum_for_account(y.account.id).await?
    );

    let report = service.check_integrity().await?;
    assert!(report.is_healthy());
    assert_eq!(report.account_count, 2);
    assert_eq!(report.transfer_count, 4);
    assert_eq!(report.entry_count, 8);

    Ok(())
}

#[tokio::test]
async fn test_stray_entry_is_reported() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let x = open_account(&service, "alice", 1000, "USD").await?;

    // Bypass the coordinator to simulate a one-sided posting
    sqlx::query(
        "INSERT INTO entries (id, account_id, amount, created_at) VALUES (?, ?, ?, '2024-01-01T00:00:00.000000Z')",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(x.account_id())
    .bind(-75_i64)
    .execute(service.repository().pool())
    .await?;

    let report = service.check_integrity().await?;
    assert!(!report.is_healthy());
    assert!(report.issues.contains(&IntegrityIssue::UnbalancedEntries { sum: -75 }));
    assert!(report.issues.contains(&IntegrityIssue::EntryCountMismatch {
        transfers: 0,
        entries: 1
    }));

    Ok(())
}

#[tokio::test]
async fn test_owner_lookup_errors_on_corrupt_owner_column() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let x = open_account(&service, "alice", 1000, "USD").await?;

    sqlx::query("UPDATE accounts SET user_id = X'00FF' WHERE id = ?")
        .bind(x.account_id())
        .execute(service.repository().pool())
        .await?;

    assert!(service.repository().owner_of(x.account.id).await.is_err());

    let y = open_account(&service, "bob", 0, "USD").await?;
    let err = service
        .transfer(&x.caller(), CreateTransferRequest::new(x.account_id(), y.account_id(), 10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_error");
    assert_eq!(stats(&service).await?.transfer_count, 0);

    Ok(())
}
