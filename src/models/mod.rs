//! Data models for the account service
//!
//! The stored account record and the payloads callers hand to the service.

pub mod account;
pub mod requests;

// Re-export commonly used types
pub use account::{AccountId, AccountRecord};
pub use requests::{AccountUpdate, NewAccount};
