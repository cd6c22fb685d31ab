//! In-memory record store
//!
//! Reference `RecordStore` with unique indexes on identity and username.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordStore, StoreResult};
use crate::error::{StoreError, UniqueField};
use crate::models::{AccountId, AccountRecord};

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<AccountId, AccountRecord>,
    /// Username index over `records`
    usernames: HashMap<String, AccountId>,
    /// Identities of deleted records, rejected on insert
    retired: HashSet<AccountId>,
}

/// Store that keeps every record in process memory.
///
/// Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of current records.
    pub async fn len(&self) -> usize {
        self.tables.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_by_id(&self, id: AccountId) -> StoreResult<Option<AccountRecord>> {
        Ok(self.tables.read().await.records.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> StoreResult<Option<AccountRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.records.get(id))
            .cloned())
    }

    async fn insert(&self, record: &AccountRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if tables.records.contains_key(&record.id) || tables.retired.contains(&record.id) {
            return Err(StoreError::Conflict {
                field: UniqueField::Id,
                value: record.id.to_string(),
            });
        }
        if tables.usernames.contains_key(&record.username) {
            return Err(StoreError::Conflict {
                field: UniqueField::Username,
                value: record.username.clone(),
            });
        }

        tables.usernames.insert(record.username.clone(), record.id);
        tables.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn replace_by_id(&self, record: &AccountRecord) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Tables {
            records, usernames, ..
        } = &mut *tables;

        let Some(current) = records.get_mut(&record.id) else {
            return Ok(false);
        };

        if current.username != record.username {
            if usernames.contains_key(&record.username) {
                return Err(StoreError::Conflict {
                    field: UniqueField::Username,
                    value: record.username.clone(),
                });
            }
            usernames.remove(&current.username);
            usernames.insert(record.username.clone(), record.id);
        }

        *current = record.clone();
        Ok(true)
    }

    async fn delete_by_id(&self, id: AccountId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.records.remove(&id) {
            Some(removed) => {
                tables.usernames.remove(&removed.username);
                tables.retired.insert(id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_all(&self) -> StoreResult<Vec<AccountRecord>> {
        let mut records: Vec<AccountRecord> =
            self.tables.read().await.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}
