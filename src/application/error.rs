use thiserror::Error;

use crate::storage::TransferError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Account {account_id} does not belong to the caller")]
    Forbidden { account_id: String },

    #[error("Currency mismatch between accounts: {from_currency} vs {to_currency}")]
    CurrencyMismatch {
        from_currency: String,
        to_currency: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::AccountNotFound(_) => "account_not_found",
            AppError::TransferNotFound(_) => "transfer_not_found",
            AppError::Forbidden { .. } => "forbidden",
            AppError::CurrencyMismatch { .. } => "currency_mismatch",
            AppError::Storage(_) => "storage_error",
        }
    }

    /// Nothing was written, so the caller may retry. Without an idempotency key
    /// a retry can post a second transfer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            TransferError::AccountNotFound(id) => AppError::AccountNotFound(id.to_string()),
            TransferError::Storage(e) => AppError::Storage(anyhow::Error::new(e)),
        }
    }
}
