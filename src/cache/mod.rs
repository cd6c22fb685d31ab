//! Cache Module
//!
//! Provides the in-process account cache with absolute and sliding expiry.

mod entry;
mod layer;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use layer::{CacheLayer, CachePolicy};
pub use stats::CacheStats;
