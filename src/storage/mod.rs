mod balance;
mod repository;
mod rows;
mod transfer_tx;

pub use balance::*;
pub use repository::*;
pub use transfer_tx::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
