use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Amount, Entry};

pub type TransferId = Uuid;

/// A transfer represents one logical movement of money from one account to another.
/// Transfers are immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    /// Source account (balance decreases)
    pub from_account_id: AccountId,
    /// Destination account (balance increases)
    pub to_account_id: AccountId,
    /// Amount in minor units (always positive)
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    /// Caller-supplied key used to deduplicate retried requests
    pub idempotency_key: Option<String>,
}

impl Transfer {
    /// Create a new transfer record. Callers validate the amount beforehand.
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Amount) -> Self {
        assert!(amount > 0, "Transfer amount must be positive");
        Self {
            id: Uuid::new_v4(),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// The matched debit and credit entries this transfer posts.
    pub fn entries(&self) -> (Entry, Entry) {
        (
            Entry::debit(self.from_account_id, self.amount, self.created_at),
            Entry::credit(self.to_account_id, self.amount, self.created_at),
        )
    }

    /// Returns true if `self` was created from the same source, destination and amount.
    pub fn matches(&self, from: AccountId, to: AccountId, amount: Amount) -> bool {
        self.from_account_id == from && self.to_account_id == to && self.amount == amount
    }
}

/// Which side of an account's transfers to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    #[default]
    All,
    /// Transfers into the account
    Incoming,
    /// Transfers out of the account
    Outgoing,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::All => "all",
            TransferDirection::Incoming => "incoming",
            TransferDirection::Outgoing => "outgoing",
        }
    }

    /// Unknown values fall back to `All`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "incoming" => TransferDirection::Incoming,
            "outgoing" => TransferDirection::Outgoing,
            _ => TransferDirection::All,
        }
    }
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A page of a listing. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn is_valid(&self) -> bool {
        self.page >= 1 && (1..=MAX_PAGE_SIZE).contains(&self.limit)
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit.max(1));
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account_ids() -> (AccountId, AccountId) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_create_transfer() {
        let (from, to) = sample_account_ids();
        let transfer = Transfer::new(from, to, 5000).with_idempotency_key("req-1");

        assert_eq!(transfer.amount, 5000);
        assert_eq!(transfer.from_account_id, from);
        assert_eq!(transfer.to_account_id, to);
        assert_eq!(transfer.idempotency_key.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_entries_are_balanced() {
        let (from, to) = sample_account_ids();
        let transfer = Transfer::new(from, to, 200);

        let (debit, credit) = transfer.entries();

        assert_eq!(debit.account_id, from);
        assert_eq!(debit.amount, -200);
        assert_eq!(credit.account_id, to);
        assert_eq!(credit.amount, 200);
        assert_eq!(debit.amount + credit.amount, 0);
        assert_eq!(debit.created_at, transfer.created_at);
    }

    #[test]
    fn test_matches() {
        let (from, to) = sample_account_ids();
        let transfer = Transfer::new(from, to, 200);

        assert!(transfer.matches(from, to, 200));
        assert!(!transfer.matches(to, from, 200));
        assert!(!transfer.matches(from, to, 201));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(TransferDirection::parse("incoming"), TransferDirection::Incoming);
        assert_eq!(TransferDirection::parse("OUTGOING"), TransferDirection::Outgoing);
        assert_eq!(TransferDirection::parse("all"), TransferDirection::All);
        assert_eq!(TransferDirection::parse("sideways"), TransferDirection::All);
    }

    #[test]
    fn test_page_request_bounds() {
        let page = PageRequest::default();
        assert_eq!(page, PageRequest::new(1, DEFAULT_PAGE_SIZE));
        assert_eq!(page.offset(), 0);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);

        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(20), 1);
        assert_eq!(page.total_pages(21), 2);

        assert!(page.is_valid());
        assert!(!PageRequest::new(0, 20).is_valid());
        assert!(!PageRequest::new(1, 0).is_valid());
        assert!(!PageRequest::new(1, MAX_PAGE_SIZE + 1).is_valid());
    }

    #[test]
    #[should_panic(expected = "Transfer amount must be positive")]
    fn test_transfer_requires_positive_amount() {
        let (from, to) = sample_account_ids();
        Transfer::new(from, to, 0);
    }
}
