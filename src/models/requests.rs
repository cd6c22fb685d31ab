//! Input models for the record service
//!
//! Create and update payloads as handed over by the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::account::{redacted, AccountId, AccountRecord};

/// Input for creating an account.
///
/// Carries no identity: identities are always allocated by the service.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewAccount {
    /// Creates an input with only the required fields set.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Trims surrounding whitespace from the username and email.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }

    /// Builds the stored record once identity and creation time are known.
    pub fn into_record(self, id: AccountId, created_at: DateTime<Utc>) -> AccountRecord {
        AccountRecord {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password: self.password,
            phone: self.phone,
            address: self.address,
            created_at,
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &redacted(&self.password))
            .field("phone", &self.phone)
            .field("address", &self.address)
            .finish()
    }
}

/// Input for replacing an existing account.
///
/// Username and creation time are not part of the payload; the stored
/// values are kept.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub id: Option<AccountId>,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl AccountUpdate {
    pub fn new(id: AccountId, email: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Trims surrounding whitespace from the email.
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self
    }

    /// Produces the replacement record for `existing`.
    ///
    /// Identity, username and creation timestamp come from `existing`;
    /// every other field comes from the update, absent values included.
    pub fn apply_to(self, existing: &AccountRecord) -> AccountRecord {
        AccountRecord {
            id: existing.id,
            username: existing.username.clone(),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password: self.password,
            phone: self.phone,
            address: self.address,
            created_at: existing.created_at,
        }
    }
}

impl fmt::Debug for AccountUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountUpdate")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &redacted(&self.password))
            .field("phone", &self.phone)
            .field("address", &self.address)
            .finish()
    }
}
