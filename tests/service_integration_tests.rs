//! Integration Tests for the Record Service
//!
//! Drives every operation end to end against the in-memory store, plus
//! store doubles that fail or race.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use account_service::identity::IdentityAllocator;
use account_service::store::StoreResult;
use account_service::{
    telemetry, AccountId, AccountRecord, AccountUpdate, CachePolicy, Clock, ErrorKind,
    InMemoryRecordStore, ManualClock, NewAccount, RecordService, RecordStore, ServiceError,
    StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta};

// == Helper Functions ==

fn manual_clock() -> Arc<ManualClock> {
    let _ = telemetry::init_tracing();
    Arc::new(ManualClock::new(
        DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ))
}

fn create_service_on<S: RecordStore>(store: S) -> (Arc<ManualClock>, RecordService<S>) {
    let clock = manual_clock();
    let service = RecordService::new(Arc::new(store), CachePolicy::default(), clock.clone());
    (clock, service)
}

fn create_test_service() -> (Arc<ManualClock>, RecordService<InMemoryRecordStore>) {
    create_service_on(InMemoryRecordStore::new())
}

fn jane() -> NewAccount {
    NewAccount {
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        password: Some("hunter2".to_string()),
        ..NewAccount::new("jane", "jane@x.com")
    }
}

/// Allocator replaying a fixed sequence of identities.
fn scripted_allocator(ids: Vec<AccountId>) -> IdentityAllocator {
    let queue = Mutex::new(VecDeque::from(ids));
    IdentityAllocator::with_generator(move || {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(AccountId::random)
    })
}

// == Store Doubles ==

/// Store whose backend is always down.
struct FailingStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn get_by_id(&self, _id: AccountId) -> StoreResult<Option<AccountRecord>> {
        Err(offline())
    }

    async fn get_by_username(&self, _username: &str) -> StoreResult<Option<AccountRecord>> {
        Err(offline())
    }

    async fn insert(&self, _record: &AccountRecord) -> StoreResult<()> {
        Err(offline())
    }

    async fn replace_by_id(&self, _record: &AccountRecord) -> StoreResult<bool> {
        Err(offline())
    }

    async fn delete_by_id(&self, _id: AccountId) -> StoreResult<bool> {
        Err(offline())
    }

    async fn list_all(&self) -> StoreResult<Vec<AccountRecord>> {
        Err(offline())
    }
}

/// In-memory store that counts identity lookups and can hide usernames
/// from reads, as if another writer raced the validator.
#[derive(Default)]
struct InstrumentedStore {
    inner: InMemoryRecordStore,
    id_reads: AtomicUsize,
    hide_usernames: bool,
}

#[async_trait]
impl RecordStore for InstrumentedStore {
    async fn get_by_id(&self, id: AccountId) -> StoreResult<Option<AccountRecord>> {
        self.id_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn get_by_username(&self, username: &str) -> StoreResult<Option<AccountRecord>> {
        if self.hide_usernames {
            return Ok(None);
        }
        self.inner.get_by_username(username).await
    }

    async fn insert(&self, record: &AccountRecord) -> StoreResult<()> {
        self.inner.insert(record).await
    }

    async fn replace_by_id(&self, record: &AccountRecord) -> StoreResult<bool> {
        self.inner.replace_by_id(record).await
    }

    async fn delete_by_id(&self, id: AccountId) -> StoreResult<bool> {
        self.inner.delete_by_id(id).await
    }

    async fn list_all(&self) -> StoreResult<Vec<AccountRecord>> {
        self.inner.list_all().await
    }
}

/// In-memory store where another writer's replace lands right after each
/// caller's replace commits.
struct OverwrittenStore {
    inner: InMemoryRecordStore,
    competing_email: String,
}

#[async_trait]
impl RecordStore for OverwrittenStore {
    async fn get_by_id(&self, id: AccountId) -> StoreResult<Option<AccountRecord>> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_username(&self, username: &str) -> StoreResult<Option<AccountRecord>> {
        self.inner.get_by_username(username).await
    }

    async fn insert(&self, record: &AccountRecord) -> StoreResult<()> {
        self.inner.insert(record).await
    }

    async fn replace_by_id(&self, record: &AccountRecord) -> StoreResult<bool> {
        if !self.inner.replace_by_id(record).await? {
            return Ok(false);
        }
        let competing = AccountRecord {
            email: self.competing_email.clone(),
            ..record.clone()
        };
        self.inner.replace_by_id(&competing).await
    }

    async fn delete_by_id(&self, id: AccountId) -> StoreResult<bool> {
        self.inner.delete_by_id(id).await
    }

    async fn list_all(&self) -> StoreResult<Vec<AccountRecord>> {
        self.inner.list_all().await
    }
}

// == Walkthrough ==

#[tokio::test]
async fn test_jane_walkthrough() {
    let (_, service) = create_test_service();

    let created = service.create(Some(jane())).await.unwrap();
    assert_eq!(created.username, "jane");

    let duplicate = service
        .create(Some(NewAccount::new("jane", "other@x.com")))
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::DuplicateUsername);

    let bad_email = service
        .update(Some(AccountUpdate::new(created.id, "not-an-email")))
        .await
        .unwrap_err();
    assert_eq!(bad_email.kind(), ErrorKind::InvalidEmail);
    assert_eq!(
        service.get_by_id(created.id).await.unwrap().email,
        "jane@x.com"
    );

    service.delete(created.id).await.unwrap();
    let missing = service.get_by_username("jane").await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

// == Create ==

#[tokio::test]
async fn test_duplicate_username_performs_no_mutation() {
    let (_, service) = create_test_service();
    service.create(Some(jane())).await.unwrap();
    let before = service.list_all().await.unwrap();

    let result = service.create(Some(NewAccount::new("jane", "jane2@x.com"))).await;

    assert_eq!(
        result.unwrap_err(),
        ServiceError::DuplicateUsername("jane".to_string())
    );
    assert_eq!(service.list_all().await.unwrap(), before);
}

#[tokio::test]
async fn test_create_validation_order() {
    let (_, service) = create_test_service();
    service.create(Some(jane())).await.unwrap();

    assert_eq!(
        service.create(None).await.unwrap_err().kind(),
        ErrorKind::MissingData
    );
    // Bad email is reported even though the username is also taken
    assert_eq!(
        service
            .create(Some(NewAccount::new("jane", "Doe.com")))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidEmail
    );
}

#[tokio::test]
async fn test_blank_username_is_accepted_once() {
    let (_, service) = create_test_service();
    let input = NewAccount {
        first_name: Some("Jane".to_string()),
        ..NewAccount::new("", "Doe@jd.com")
    };

    let created = service.create(Some(input)).await.unwrap();
    assert_eq!(created.username, "");
    assert_eq!(created.first_name.as_deref(), Some("Jane"));

    let err = service
        .create(Some(NewAccount::new("  ", "other@jd.com")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateUsername);
    assert_eq!(service.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_padded_username_and_email_are_trimmed() {
    let (_, service) = create_test_service();
    service.create(Some(jane())).await.unwrap();

    let err = service
        .create(Some(NewAccount::new(" jane ", "jane2@x.com")))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::DuplicateUsername("jane".to_string()));

    let john = service
        .create(Some(NewAccount::new(" john ", "  john@x.com  ")))
        .await
        .unwrap();
    assert_eq!(john.username, "john");
    assert_eq!(john.email, "john@x.com");
    assert_eq!(service.get_by_username("john").await.unwrap(), john);

    let updated = service
        .update(Some(AccountUpdate::new(john.id, " john@y.org ")))
        .await
        .unwrap();
    assert_eq!(updated.email, "john@y.org");
    assert_eq!(service.list_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_deleted_username_can_be_reused_with_new_identity() {
    let (_, service) = create_test_service();
    let first = service.create(Some(jane())).await.unwrap();
    service.delete(first.id).await.unwrap();

    let second = service.create(Some(jane())).await.unwrap();
    assert_ne!(second.id, first.id);
}

#[tokio::test]
async fn test_deleted_identity_is_never_reassigned() {
    let store = InMemoryRecordStore::new();
    let clock = manual_clock();
    let retired = AccountId::random();
    let fresh = AccountId::random();

    // The allocator sees the retired id as free; the store refuses it.
    let service = RecordService::new(Arc::new(store), CachePolicy::default(), clock)
        .with_allocator(scripted_allocator(vec![retired, retired, fresh]));

    let first = service.create(Some(jane())).await.unwrap();
    assert_eq!(first.id, retired);
    service.delete(first.id).await.unwrap();

    let second = service
        .create(Some(NewAccount::new("john", "john@x.com")))
        .await
        .unwrap();
    assert_eq!(second.id, fresh);
}

#[tokio::test]
async fn test_allocator_skips_identities_in_use() {
    let (_, service) = create_test_service();
    let taken = service.create(Some(jane())).await.unwrap().id;
    let fresh = AccountId::random();

    let store = service.store().clone();
    let service = RecordService::new(store, CachePolicy::default(), manual_clock())
        .with_allocator(scripted_allocator(vec![taken, taken, fresh]));

    let created = service
        .create(Some(NewAccount::new("john", "john@x.com")))
        .await
        .unwrap();
    assert_eq!(created.id, fresh);
}

#[tokio::test]
async fn test_store_level_username_conflict_is_duplicate() {
    let store = InstrumentedStore {
        hide_usernames: true,
        ..InstrumentedStore::default()
    };
    let (_, service) = create_service_on(store);
    service.create(Some(jane())).await.unwrap();

    // Validator sees no "jane"; the unique index still rejects the insert.
    let err = service
        .create(Some(NewAccount::new("jane", "imposter@x.com")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateUsername);
    assert_eq!(service.store().inner.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_creates_share_no_username() {
    let (_, service) = create_test_service();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create(Some(NewAccount::new("jane", format!("jane{}@x.com", i))))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::DuplicateUsername),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(service.list_all().await.unwrap().len(), 1);
}

// == Read ==

#[tokio::test]
async fn test_get_by_id_serves_from_cache() {
    let (_, service) = create_service_on(InstrumentedStore::default());
    let created = service.create(Some(jane())).await.unwrap();
    let reads_after_create = service.store().id_reads.load(Ordering::SeqCst);

    for _ in 0..3 {
        assert_eq!(service.get_by_id(created.id).await.unwrap(), created);
    }

    assert_eq!(
        service.store().id_reads.load(Ordering::SeqCst),
        reads_after_create
    );
    assert_eq!(service.cache().stats().hits, 3);
}

#[tokio::test]
async fn test_get_by_id_unknown() {
    let (_, service) = create_test_service();
    let err = service.get_by_id(AccountId::random()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_absolute_expiry_refetches_from_store() {
    let (clock, service) = create_service_on(InstrumentedStore::default());
    let created = service.create(Some(jane())).await.unwrap();

    // Change the store behind the cache's back.
    let mut changed = created.clone();
    changed.phone = Some("12345678".to_string());
    service.store().inner.replace_by_id(&changed).await.unwrap();

    // Keep the sliding deadline alive for the whole hour.
    for _ in 0..6 {
        clock.advance(TimeDelta::minutes(9));
        assert_eq!(service.get_by_id(created.id).await.unwrap(), created);
    }

    // T+61min: past the absolute deadline.
    clock.advance(TimeDelta::minutes(7));
    let reads_before = service.store().id_reads.load(Ordering::SeqCst);
    assert_eq!(service.get_by_id(created.id).await.unwrap(), changed);
    assert_eq!(
        service.store().id_reads.load(Ordering::SeqCst),
        reads_before + 1
    );
}

#[tokio::test]
async fn test_list_all() {
    let (clock, service) = create_test_service();
    assert!(service.list_all().await.unwrap().is_empty());

    let first = service.create(Some(jane())).await.unwrap();
    clock.advance(TimeDelta::seconds(1));
    let second = service
        .create(Some(NewAccount::new("john", "john@x.com")))
        .await
        .unwrap();

    assert_eq!(service.list_all().await.unwrap(), vec![first, second]);
}

// == Update ==

#[tokio::test]
async fn test_update_keeps_identity_username_and_timestamp() {
    let (clock, service) = create_test_service();
    let created = service.create(Some(jane())).await.unwrap();
    clock.advance(TimeDelta::minutes(5));

    let mut update = AccountUpdate::new(created.id, "jane@y.org");
    update.address = Some("Main Street 1".to_string());
    let updated = service.update(Some(update)).await.unwrap();

    let fetched = service.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched, updated);
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.username, created.username);
    assert_eq!(fetched.created_at, created.created_at);
    assert_eq!(fetched.email, "jane@y.org");
    assert_eq!(fetched.address.as_deref(), Some("Main Street 1"));
    assert!(fetched.first_name.is_none(), "update replaces wholesale");
    assert_ne!(clock.now(), fetched.created_at);
}

#[tokio::test]
async fn test_update_is_visible_through_warm_cache() {
    let (_, service) = create_test_service();
    let created = service.create(Some(jane())).await.unwrap();
    service.get_by_id(created.id).await.unwrap();

    service
        .update(Some(AccountUpdate::new(created.id, "jane@y.org")))
        .await
        .unwrap();

    assert_eq!(
        service.get_by_id(created.id).await.unwrap().email,
        "jane@y.org"
    );
}

#[tokio::test]
async fn test_update_never_caches_a_value_overwritten_in_the_store() {
    let store = OverwrittenStore {
        inner: InMemoryRecordStore::new(),
        competing_email: "winner@x.com".to_string(),
    };
    let (_, service) = create_service_on(store);
    let created = service.create(Some(jane())).await.unwrap();

    service
        .update(Some(AccountUpdate::new(created.id, "loser@x.com")))
        .await
        .unwrap();
    assert!(service.cache().is_empty());
    assert_eq!(
        service.get_by_id(created.id).await.unwrap().email,
        "winner@x.com"
    );

    service.update_password(created.id, "n3w-secret").await.unwrap();
    assert!(service.cache().is_empty());
    assert_eq!(
        service.get_by_id(created.id).await.unwrap().email,
        "winner@x.com"
    );
}

#[tokio::test]
async fn test_update_errors() {
    let (_, service) = create_test_service();

    assert_eq!(
        service.update(None).await.unwrap_err().kind(),
        ErrorKind::MissingData
    );

    let without_id = AccountUpdate {
        email: "jane@x.com".to_string(),
        ..AccountUpdate::default()
    };
    assert_eq!(
        service.update(Some(without_id)).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );

    let unknown = AccountUpdate::new(AccountId::random(), "jane@x.com");
    assert_eq!(
        service.update(Some(unknown)).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

// == Delete ==

#[tokio::test]
async fn test_delete_then_lookup_and_delete_again() {
    let (_, service) = create_test_service();
    let created = service.create(Some(jane())).await.unwrap();
    // Warm the cache so the delete has something to invalidate
    service.get_by_id(created.id).await.unwrap();

    service.delete(created.id).await.unwrap();

    assert_eq!(
        service.get_by_id(created.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        service.delete(created.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(service.cache().is_empty());
}

// == Store Failures ==

#[tokio::test]
async fn test_store_unavailable_is_propagated() {
    let (_, service) = create_service_on(FailingStore);
    let expected = ServiceError::StoreUnavailable("database offline".to_string());
    let id = AccountId::random();

    assert_eq!(service.create(Some(jane())).await.unwrap_err(), expected);
    assert_eq!(service.get_by_id(id).await.unwrap_err(), expected);
    assert_eq!(service.get_by_username("jane").await.unwrap_err(), expected);
    assert_eq!(
        service
            .update(Some(AccountUpdate::new(id, "jane@x.com")))
            .await
            .unwrap_err(),
        expected
    );
    assert_eq!(service.delete(id).await.unwrap_err(), expected);
    assert_eq!(service.list_all().await.unwrap_err(), expected);
    assert_eq!(
        service.update_password(id, "secret").await.unwrap_err(),
        expected
    );
}

#[tokio::test]
async fn test_validation_failure_never_reaches_failing_store() {
    let (_, service) = create_service_on(FailingStore);

    // Structural checks run before the store is consulted.
    assert_eq!(
        service
            .create(Some(NewAccount::new("jane", "Doe.com")))
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidEmail
    );
}
