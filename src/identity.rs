//! Identity allocation
//!
//! Draws random account identities until one is free in the store.

use std::fmt;

use tracing::debug;

use crate::error::StoreError;
use crate::models::AccountId;
use crate::store::RecordStore;

type Generator = Box<dyn Fn() -> AccountId + Send + Sync>;

/// Allocates identities that no current record uses.
///
/// The check is not atomic with the later insert; callers rely on the
/// store's identity index to reject the rare identity that was taken in
/// between and ask for another one.
pub struct IdentityAllocator {
    generate: Generator,
}

impl IdentityAllocator {
    /// Allocator drawing random v4 UUIDs.
    pub fn new() -> Self {
        Self::with_generator(AccountId::random)
    }

    /// Allocator drawing candidates from `generate`.
    pub fn with_generator(generate: impl Fn() -> AccountId + Send + Sync + 'static) -> Self {
        Self {
            generate: Box::new(generate),
        }
    }

    /// Returns an identity not present in `store` at the time of the check.
    ///
    /// Keeps drawing on collision with no attempt cap; the random space makes
    /// a second draw already vanishingly rare. Store failures are returned
    /// unchanged.
    pub async fn allocate<S>(&self, store: &S) -> Result<AccountId, StoreError>
    where
        S: RecordStore + ?Sized,
    {
        let mut attempts: u64 = 0;
        loop {
            let candidate = (self.generate)();
            attempts += 1;

            if store.get_by_id(candidate).await?.is_none() {
                if attempts > 1 {
                    debug!(%candidate, attempts, "identity allocated after collisions");
                }
                return Ok(candidate);
            }

            debug!(%candidate, "identity collision, drawing again");
        }
    }
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdentityAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAllocator").finish_non_exhaustive()
    }
}
