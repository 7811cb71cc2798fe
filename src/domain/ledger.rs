use serde::Serialize;

use super::{AccountId, Amount, Entry};

/// Order two account ids for lock acquisition.
///
/// Every code path that mutates two accounts in one unit must apply the
/// mutations in the returned order. The order is lexicographic on the canonical
/// hyphenated lowercase string form, so two transfers A->B and B->A always
/// contend for the same account first and can never wait on each other in a cycle.
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a.hyphenated().to_string() <= b.hyphenated().to_string() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Replay a slice of entries to get the net movement for one account.
pub fn replay_entries(account_id: AccountId, entries: &[Entry]) -> Amount {
    entries
        .iter()
        .filter(|e| e.account_id == account_id)
        .map(|e| e.amount)
        .sum()
}

/// Raw counters gathered from the store for an integrity check.
#[derive(Debug, Clone, Default)]
pub struct IntegrityStats {
    pub account_count: i64,
    pub transfer_count: i64,
    pub entry_count: i64,
    pub entry_sum: Amount,
    pub invalid_amounts: i64,
    pub dangling_refs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// All entries together must cancel out
    UnbalancedEntries { sum: Amount },
    /// Each transfer posts exactly two entries
    EntryCountMismatch { transfers: i64, entries: i64 },
    NonPositiveTransfers { count: i64 },
    DanglingAccountRefs { count: i64 },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::UnbalancedEntries { sum } => {
                write!(f, "ledger entries sum to {} instead of 0", sum)
            }
            IntegrityIssue::EntryCountMismatch { transfers, entries } => write!(
                f,
                "{} entries recorded for {} transfers (expected {})",
                entries,
                transfers,
                transfers * 2
            ),
            IntegrityIssue::NonPositiveTransfers { count } => {
                write!(f, "{} transfers with non-positive amount", count)
            }
            IntegrityIssue::DanglingAccountRefs { count } => {
                write!(f, "{} rows reference missing accounts", count)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub account_count: i64,
    pub transfer_count: i64,
    pub entry_count: i64,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(stats: &IntegrityStats) -> IntegrityReport {
    let mut issues = Vec::new();

    if stats.entry_sum != 0 {
        issues.push(IntegrityIssue::UnbalancedEntries {
            sum: stats.entry_sum,
        });
    }
    if stats.entry_count != stats.transfer_count * 2 {
        issues.push(IntegrityIssue::EntryCountMismatch {
            transfers: stats.transfer_count,
            entries: stats.entry_count,
        });
    }
    if stats.invalid_amounts > 0 {
        issues.push(IntegrityIssue::NonPositiveTransfers {
            count: stats.invalid_amounts,
        });
    }
    if stats.dangling_refs > 0 {
        issues.push(IntegrityIssue::DanglingAccountRefs {
            count: stats.dangling_refs,
        });
    }

    IntegrityReport {
        account_count: stats.account_count,
        transfer_count: stats.transfer_count,
        entry_count: stats.entry_count,
        issues,
    }
}
