// Application layer - validation, ownership checks and response mapping
// around the storage-level transfer core.

pub mod dto;
pub mod error;
pub mod service;

pub use dto::*;
pub use error::*;
pub use service::*;
