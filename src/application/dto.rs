use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, Amount, PageRequest, Transfer};
use crate::storage::TransferOutcome;

/// Payload for executing a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub from_account_id: String,
    pub to_account_id: String,
    /// Minor units, must be positive
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl CreateTransferRequest {
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub id: String,
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Amount,
    pub created_at: String,
    /// Set when an earlier transfer with the same idempotency key was returned
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
}

impl From<&Transfer> for TransferResponse {
    fn from(t: &Transfer) -> Self {
        Self {
            id: t.id.to_string(),
            from_account_id: t.from_account_id.to_string(),
            to_account_id: t.to_account_id.to_string(),
            amount: t.amount,
            created_at: format_timestamp(t.created_at),
            replayed: false,
        }
    }
}

impl From<&TransferOutcome> for TransferResponse {
    fn from(outcome: &TransferOutcome) -> Self {
        Self {
            replayed: outcome.is_replay(),
            ..Self::from(outcome.transfer())
        }
    }
}

/// One page of an account's transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPageResponse {
    pub data: Vec<TransferResponse>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl TransferPageResponse {
    pub fn new(transfers: &[Transfer], page: PageRequest, total: i64) -> Self {
        Self {
            data: transfers.iter().map(TransferResponse::from).collect(),
            page: page.page,
            limit: page.limit,
            total,
            total_pages: page.total_pages(total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalanceResponse {
    pub id: String,
    pub balance: Amount,
    pub currency: String,
}

impl From<&Account> for AccountBalanceResponse {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.to_string(),
            balance: a.balance,
            currency: a.currency.clone(),
        }
    }
}

/// ISO-8601 with second precision and a `Z` suffix, e.g. `2024-01-15T10:00:00Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
