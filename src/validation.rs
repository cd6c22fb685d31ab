//! Input validation
//!
//! Structural and uniqueness checks run before any mutation. Every check
//! returns a tagged error; the first failing check wins.

use crate::error::{Result, ServiceError};
use crate::models::{AccountId, AccountRecord, AccountUpdate, NewAccount};
use crate::store::RecordStore;

/// Checks that `email` has exactly one `@` with non-empty text on both sides.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ServiceError::InvalidEmail("email cannot be empty".to_string()));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ServiceError::InvalidEmail(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

/// Validates a create request.
///
/// Order: presence, email format, then username uniqueness against the
/// store. The returned input is normalized and is what gets stored.
pub async fn validate_for_create<S>(store: &S, input: Option<NewAccount>) -> Result<NewAccount>
where
    S: RecordStore + ?Sized,
{
    let input = input
        .ok_or_else(|| ServiceError::MissingData("account data is required".to_string()))?
        .normalized();

    validate_email(&input.email)?;

    if store.get_by_username(&input.username).await?.is_some() {
        return Err(ServiceError::DuplicateUsername(input.username));
    }

    Ok(input)
}

/// An update that passed validation, with the record it replaces.
#[derive(Debug)]
pub struct ValidatedUpdate {
    pub id: AccountId,
    pub update: AccountUpdate,
    pub existing: AccountRecord,
}

/// Validates an update request.
///
/// Order: presence, identity set, email format, then existence of the
/// target record. Username uniqueness is not re-checked since updates keep
/// the stored username.
pub async fn validate_for_update<S>(store: &S, input: Option<AccountUpdate>) -> Result<ValidatedUpdate>
where
    S: RecordStore + ?Sized,
{
    let update = input
        .ok_or_else(|| ServiceError::MissingData("account data is required".to_string()))?
        .normalized();
    let id = update
        .id
        .ok_or_else(|| ServiceError::InvalidInput("account id is required for update".to_string()))?;

    validate_email(&update.email)?;

    let existing = store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("account {}", id)))?;

    Ok(ValidatedUpdate {
        id,
        update,
        existing,
    })
}
