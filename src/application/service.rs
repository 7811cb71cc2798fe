use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::domain::{
    Account, AccountId, Amount, Entry, IntegrityReport, MAX_PAGE_SIZE, PageRequest,
    TransferDirection, UserId, build_integrity_report, is_supported_currency,
};
use crate::storage::{Repository, TransferParams};

use super::{
    AccountBalanceResponse, AppError, CreateTransferRequest, TransferPageResponse, TransferResponse,
};

/// Application service in front of the transfer core.
/// This is the primary interface for any client (CLI, API, etc.).
///
/// `caller` arguments carry the authenticated user identity supplied by the
/// request pipeline.
#[derive(Clone)]
pub struct TransferService {
    repo: Repository,
}

impl TransferService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Connect and apply migrations, creating the database if needed.
    pub async fn init(config: &StoreConfig) -> Result<Self, AppError> {
        let config = config.clone().with_create_if_missing(true);
        let repo = Repository::init(&config).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::connect(config).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Account operations
    // ========================

    /// Open an account for a user with an optional opening balance.
    pub async fn create_account(
        &self,
        user_id: UserId,
        owner: String,
        currency: String,
        opening_balance: Option<Amount>,
    ) -> Result<Account, AppError> {
        if !is_supported_currency(&currency) {
            return Err(AppError::InvalidArgument(format!(
                "unsupported currency: {}",
                currency
            )));
        }
        let opening_balance = opening_balance.unwrap_or(0);
        if opening_balance < 0 {
            return Err(AppError::InvalidArgument(
                "opening balance must not be negative".to_string(),
            ));
        }

        let account = Account::new(user_id, owner, currency).with_opening_balance(opening_balance);
        self.repo.save_account(&account).await?;
        debug!(account_id = %account.id, user_id = %user_id, "Account created");
        Ok(account)
    }

    /// Get an account owned by the caller.
    pub async fn get_account(&self, caller: &str, account_id: &str) -> Result<Account, AppError> {
        let id = parse_id(account_id, "account_id")?;
        let account = self
            .repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        ensure_owner(caller, &account)?;
        Ok(account)
    }

    /// Accounts owned by the caller, oldest first.
    pub async fn list_accounts(&self, caller: &str) -> Result<Vec<Account>, AppError> {
        let user_id = parse_id(caller, "user_id")?;
        Ok(self.repo.list_accounts_for_user(user_id).await?)
    }

    pub async fn account_balance(
        &self,
        caller: &str,
        account_id: &str,
    ) -> Result<AccountBalanceResponse, AppError> {
        let account = self.get_account(caller, account_id).await?;
        Ok(AccountBalanceResponse::from(&account))
    }

    /// Ledger entries of an account owned by the caller, oldest first.
    pub async fn list_entries(&self, caller: &str, account_id: &str) -> Result<Vec<Entry>, AppError> {
        let account = self.get_account(caller, account_id).await?;
        Ok(self.repo.list_entries_for_account(account.id).await?)
    }

    // ========================
    // Transfer operations
    // ========================

    /// Execute a transfer out of one of the caller's accounts.
    pub async fn transfer(
        &self,
        caller: &str,
        req: CreateTransferRequest,
    ) -> Result<TransferResponse, AppError> {
        let from_id = parse_id(&req.from_account_id, "from_account_id")?;
        let to_id = parse_id(&req.to_account_id, "to_account_id")?;
        if req.amount <= 0 {
            return Err(AppError::InvalidArgument(
                "amount must be positive".to_string(),
            ));
        }

        self.ensure_caller_owns(caller, from_id).await?;
        let from_account = self.require_account(from_id).await?;
        let to_account = self.require_account(to_id).await?;

        if from_account.currency != to_account.currency {
            return Err(AppError::CurrencyMismatch {
                from_currency: from_account.currency,
                to_currency: to_account.currency,
            });
        }

        let mut params = TransferParams::new(req.from_account_id, req.to_account_id, req.amount);
        if let Some(key) = req.idempotency_key {
            params = params.with_idempotency_key(key);
        }

        let outcome = self.repo.execute_transfer(&params).await?;
        Ok(TransferResponse::from(&outcome))
    }

    /// Get a single transfer.
    pub async fn get_transfer(&self, transfer_id: &str) -> Result<TransferResponse, AppError> {
        let id = parse_id(transfer_id, "transfer_id")?;
        let transfer = self
            .repo
            .get_transfer(id)
            .await?
            .ok_or_else(|| AppError::TransferNotFound(transfer_id.to_string()))?;
        Ok(TransferResponse::from(&transfer))
    }

    /// List one page of transfers for one of the caller's accounts, newest first.
    pub async fn list_transfers(
        &self,
        caller: &str,
        account_id: &str,
        direction: TransferDirection,
        page: PageRequest,
    ) -> Result<TransferPageResponse, AppError> {
        if !page.is_valid() {
            return Err(AppError::InvalidArgument(format!(
                "page must be at least 1 and limit between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let account = self.get_account(caller, account_id).await?;
        let total = self
            .repo
            .count_transfers_for_account(account.id, direction)
            .await?;
        let transfers = self
            .repo
            .list_transfers_for_account(account.id, direction, page)
            .await?;
        debug!(
            account_id = %account.id,
            direction = %direction,
            page = page.page,
            total,
            "Listed transfers"
        );
        Ok(TransferPageResponse::new(&transfers, page, total))
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        Ok(build_integrity_report(&stats))
    }

    async fn ensure_caller_owns(&self, caller: &str, account_id: AccountId) -> Result<(), AppError> {
        let owner = self
            .repo
            .owner_of(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        if Uuid::parse_str(caller).ok() != Some(owner) {
            warn!(account_id = %account_id, caller = %caller, "Account access by non-owner rejected");
            return Err(AppError::Forbidden {
                account_id: account_id.to_string(),
            });
        }
        Ok(())
    }

    async fn require_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidArgument(format!("invalid {}", field)))
}

fn ensure_owner(caller: &str, account: &Account) -> Result<(), AppError> {
    match Uuid::parse_str(caller) {
        Ok(user_id) if account.is_owned_by(user_id) => Ok(()),
        _ => Err(AppError::Forbidden {
            account_id: account.id.to_string(),
        }),
    }
}
