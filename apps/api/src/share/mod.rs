// Sharing Service: unguessable links over export artifacts, guarded by
// password, expiry and access-count limits. Access checks and counter updates
// happen in one atomic step per link (row lock in Postgres, mutex in memory).

pub mod handlers;
pub mod models;
pub mod password;
pub mod policy;
pub mod service;
pub mod store;

use thiserror::Error;

pub use service::ShareService;
pub use store::{MemoryShareStore, PgShareStore};

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share link {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("owner token missing or wrong")]
    Forbidden,

    #[error("share store error: {0}")]
    Store(String),

    #[error("share database error: {0}")]
    Database(#[from] sqlx::Error),
}
