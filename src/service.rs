//! Record Service
//!
//! Orchestrates validation, identity allocation, the record store and the
//! cache into the public account operations.
//!
//! Reads go through the cache first and fall back to the store. Create
//! caches the new record; update and delete commit to the store and then
//! invalidate the cache entry, so the next read fills it from the store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheLayer, CachePolicy};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, ServiceError, StoreError, UniqueField};
use crate::identity::IdentityAllocator;
use crate::models::{AccountId, AccountRecord, AccountUpdate, NewAccount};
use crate::store::RecordStore;
use crate::validation::{self, ValidatedUpdate};

/// Account operations over a record store `S`.
///
/// Same-identity operations are not serialized here; ordering between them
/// is whatever the store provides.
pub struct RecordService<S: RecordStore> {
    store: Arc<S>,
    cache: Arc<CacheLayer>,
    allocator: IdentityAllocator,
    clock: Arc<dyn Clock>,
}

impl<S: RecordStore> RecordService<S> {
    /// Creates a service over `store` with its own cache.
    ///
    /// The cache reads time from the same `clock` as creation timestamps.
    pub fn new(store: Arc<S>, policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(CacheLayer::new(policy, clock.clone()));
        Self {
            store,
            cache,
            allocator: IdentityAllocator::new(),
            clock,
        }
    }

    /// Creates a service from configuration, using the system clock.
    pub fn from_config(store: Arc<S>, config: &Config) -> Self {
        Self::new(store, CachePolicy::from_config(config), Arc::new(SystemClock))
    }

    /// Replaces the identity allocator.
    pub fn with_allocator(mut self, allocator: IdentityAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Shared handle to the cache, e.g. for the cleanup task.
    pub fn cache(&self) -> &Arc<CacheLayer> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // == Create ==
    /// Validates `input`, allocates an identity and stores the new record.
    ///
    /// A username taken between validation and insert is reported as
    /// `DuplicateUsername`; an identity taken in that window is replaced by
    /// a fresh allocation. The input is never given a different username.
    pub async fn create(&self, input: Option<NewAccount>) -> Result<AccountRecord> {
        let input = validation::validate_for_create(&*self.store, input).await?;

        let id = self.allocator.allocate(&*self.store).await?;
        let mut record = input.into_record(id, self.clock.now());

        loop {
            match self.store.insert(&record).await {
                Ok(()) => break,
                Err(StoreError::Conflict {
                    field: UniqueField::Id,
                    ..
                }) => {
                    warn!(id = %record.id, "identity taken before insert, allocating again");
                    record.id = self.allocator.allocate(&*self.store).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.cache.put(record.id, record.clone());
        info!(id = %record.id, username = %record.username, "account created");
        Ok(record)
    }

    // == Get By Id ==
    /// Returns the record with `id`, from the cache when possible.
    pub async fn get_by_id(&self, id: AccountId) -> Result<AccountRecord> {
        if let Some(record) = self.cache.get(id) {
            return Ok(record);
        }

        match self.store.get_by_id(id).await? {
            Some(record) => {
                self.cache.put(id, record.clone());
                debug!(%id, "account added to cache");
                Ok(record)
            }
            None => Err(ServiceError::NotFound(format!("account {}", id))),
        }
    }

    // == Get By Username ==
    /// Returns the record with `username`, always read from the store.
    ///
    /// The cache is keyed by identity, so it is neither consulted nor filled.
    pub async fn get_by_username(&self, username: &str) -> Result<AccountRecord> {
        self.store
            .get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("username '{}'", username)))
    }

    // == Update ==
    /// Replaces a record wholesale, keeping its identity, username and
    /// creation timestamp.
    pub async fn update(&self, input: Option<AccountUpdate>) -> Result<AccountRecord> {
        let ValidatedUpdate {
            id,
            update,
            existing,
        } = validation::validate_for_update(&*self.store, input).await?;

        let record = update.apply_to(&existing);
        self.replace(&record).await?;

        info!(%id, "account updated");
        Ok(record)
    }

    // == Update Password ==
    /// Sets a new credential secret, leaving every other field unchanged.
    pub async fn update_password(&self, id: AccountId, password: &str) -> Result<()> {
        if password.trim().is_empty() {
            return Err(ServiceError::InvalidInput("password cannot be empty".to_string()));
        }

        let mut record = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {}", id)))?;

        record.password = Some(password.to_string());
        self.replace(&record).await?;

        info!(%id, "account password updated");
        Ok(())
    }

    // == Delete ==
    /// Deletes the record with `id` and drops it from the cache.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        let deleted = self.store.delete_by_id(id).await?;
        self.cache.invalidate(id);

        if !deleted {
            return Err(ServiceError::NotFound(format!("account {}", id)));
        }

        info!(%id, "account deleted");
        Ok(())
    }

    // == List All ==
    /// Returns every stored record; empty when there are none.
    pub async fn list_all(&self) -> Result<Vec<AccountRecord>> {
        Ok(self.store.list_all().await?)
    }

    /// Commits `record` over the stored one, then drops the cached entry.
    ///
    /// The cache is never filled from a write. A record removed since it was read is reported as `NotFound`.
    async fn replace(&self, record: &AccountRecord) -> Result<()> {
        let id = record.id;
        let replaced = self.store.replace_by_id(record).await?;
        self.cache.invalidate(id);

        if !replaced {
            return Err(ServiceError::NotFound(format!("account {}", id)));
        }
        Ok(())
    }
}

impl<S: RecordStore> std::fmt::Debug for RecordService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordService")
            .field("cache", &self.cache)
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}
