//! Account Service - account records behind a cache-aside layer
//!
//! Provides create/read/update/delete over an abstract record store, with
//! collision-free identity allocation, validation before every mutation and
//! an in-process cache using absolute and sliding expiry.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod service;
pub mod store;
pub mod tasks;
pub mod telemetry;
pub mod validation;

pub use cache::{CacheLayer, CachePolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ErrorKind, Result, ServiceError, StoreError};
pub use models::{AccountId, AccountRecord, AccountUpdate, NewAccount};
pub use service::RecordService;
pub use store::{InMemoryRecordStore, RecordStore};
pub use tasks::spawn_cleanup_task;
