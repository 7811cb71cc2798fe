use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Amount};

pub type EntryId = Uuid;

/// One signed movement against one account. Negative amounts are debits,
/// positive amounts are credits. Entries are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(account_id: AccountId, amount: Amount, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount,
            created_at,
        }
    }

    pub fn debit(account_id: AccountId, amount: Amount, created_at: DateTime<Utc>) -> Self {
        Self::new(account_id, -amount, created_at)
    }

    pub fn credit(account_id: AccountId, amount: Amount, created_at: DateTime<Utc>) -> Self {
        Self::new(account_id, amount, created_at)
    }

    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_and_credit_signs() {
        let account = Uuid::new_v4();
        let now = Utc::now();

        let debit = Entry::debit(account, 200, now);
        let credit = Entry::credit(account, 200, now);

        assert_eq!(debit.amount, -200);
        assert!(debit.is_debit());
        assert_eq!(credit.amount, 200);
        assert!(!credit.is_debit());
        assert_ne!(debit.id, credit.id);
    }
}
