//! Logging setup
//!
//! Installs the global tracing subscriber for embedders of the service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "account_service=info";

/// Initializes a tracing subscriber with env filter and fmt output.
///
/// Defaults to [`DEFAULT_FILTER`], overridable with the `RUST_LOG` env var.
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
