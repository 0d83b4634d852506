//! Emission failure reporting.

use thiserror::Error;

use crate::handler::HandlerError;

/// Why a single handler invocation failed.
#[derive(Debug, Error)]
pub enum HandlerFailure {
    /// The handler returned `Err`.
    #[error("handler returned an error: {0:#}")]
    Error(HandlerError),

    /// The handler panicked; the panic was caught at the bus boundary.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerFailure {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(msg)
    }
}

/// Aggregate outcome of one emission in which at least one handler failed.
///
/// Sibling handlers are never cancelled by a failure, so by the time this is
/// returned every dispatched handler has finished. Failures are collected in no
/// particular order and are not attributed to individual handlers; handler names
/// appear in the `error!` log emitted for each failure.
#[derive(Debug, Error)]
#[error("{} of {dispatched} handler(s) failed for event `{event}`", .failures.len())]
pub struct EmitError {
    event: &'static str,
    dispatched: usize,
    failures: Vec<HandlerFailure>,
}

impl EmitError {
    pub(crate) fn new(
        event: &'static str,
        dispatched: usize,
        failures: Vec<HandlerFailure>,
    ) -> Self {
        Self {
            event,
            dispatched,
            failures,
        }
    }

    /// Name of the emitted event.
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Number of handlers the emission dispatched to.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Number of handlers that failed (always at least one).
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<HandlerFailure> {
        self.failures
    }
}

/// Returned by [`emit_batch`](crate::emit_batch) when one or more emissions failed.
#[derive(Debug, Error)]
#[error("{} of {total} batched emission(s) failed", .errors.len())]
pub struct BatchEmitError {
    total: usize,
    errors: Vec<EmitError>,
}

impl BatchEmitError {
    pub(crate) fn new(total: usize, errors: Vec<EmitError>) -> Self {
        Self { total, errors }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn errors(&self) -> &[EmitError] {
        &self.errors
    }
}
