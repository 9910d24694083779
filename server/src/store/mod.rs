//! Persistence boundary for documents and user accounts.
//!
//! Handlers depend on the [`DocumentStore`] and [`UserStore`] traits only; the
//! in-memory implementations in [`memory`] optionally mirror their contents to
//! JSON snapshot files.

mod memory;

use async_trait::async_trait;
use shared::{Document, DocumentSummary};
use thiserror::Error;

use crate::account::Account;

pub use memory::{MemoryDocumentStore, MemoryUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} `{value}` is already in use")]
    Conflict { field: &'static str, value: String },
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Summaries ordered by most recent update first.
    async fn list(&self) -> StoreResult<Vec<DocumentSummary>>;

    async fn get(&self, identifier: &str) -> StoreResult<Option<Document>>;

    /// Fails with [`StoreError::Conflict`] if the identifier is taken.
    async fn insert(&self, doc: Document) -> StoreResult<Document>;

    /// Overwrites the stored document with the same identifier. Returns `None`
    /// if it no longer exists.
    async fn replace(&self, doc: Document) -> StoreResult<Option<Document>>;

    async fn delete(&self, identifier: &str) -> StoreResult<Option<Document>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Account>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Fails with [`StoreError::Conflict`] if the email is taken.
    async fn insert(&self, account: Account) -> StoreResult<Account>;

    /// Overwrites the account with the same id, enforcing email uniqueness.
    async fn update(&self, account: Account) -> StoreResult<Option<Account>>;

    async fn delete(&self, id: &str) -> StoreResult<Option<Account>>;
}
