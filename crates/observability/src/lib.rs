//! Process-wide tracing setup.

pub mod tracing;

pub use crate::tracing::{LOG_FORMAT_ENV, LogFormat, ObservabilityConfig};

/// Initialize tracing from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init_with(&ObservabilityConfig::from_env());
}
