//! Record Store Module
//!
//! Durable keyed storage for account records; the sole source of truth.

mod memory;

pub use memory::InMemoryRecordStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{AccountId, AccountRecord};

/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage capability consumed by the record service.
///
/// Implementations must back `insert` with unique indexes on identity and
/// username and report violations as [`StoreError::Conflict`]; the service
/// relies on that rather than on its own prior reads. Each call is treated
/// as atomic.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_by_id(&self, id: AccountId) -> StoreResult<Option<AccountRecord>>;

    async fn get_by_username(&self, username: &str) -> StoreResult<Option<AccountRecord>>;

    /// Inserts a new record, failing with a conflict if its identity or
    /// username is taken.
    async fn insert(&self, record: &AccountRecord) -> StoreResult<()>;

    /// Replaces the record with the same identity.
    ///
    /// Returns `false` when no such record exists.
    async fn replace_by_id(&self, record: &AccountRecord) -> StoreResult<bool>;

    /// Returns `false` when no such record exists.
    async fn delete_by_id(&self, id: AccountId) -> StoreResult<bool>;

    async fn list_all(&self) -> StoreResult<Vec<AccountRecord>>;
}
