use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Amount;

pub type AccountId = Uuid;
pub type UserId = Uuid;

/// Currency codes an account may be opened in.
pub const SUPPORTED_CURRENCIES: [&str; 7] = ["USD", "EUR", "GBP", "JPY", "EGP", "CAD", "AUD"];

pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// A bank account. `balance` is a cache over the account's ledger entries and is
/// only ever changed by the storage layer's atomic add-delta update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    /// Display name of the owning user
    pub owner: String,
    pub currency: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: UserId, owner: impl Into<String>, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            owner: owner.into(),
            currency: currency.into(),
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_opening_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}
