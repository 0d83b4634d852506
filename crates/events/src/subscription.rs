//! Subscription handles returned by the bus.

use std::sync::{Mutex, Weak};

use crate::registry::{self, Registry};

/// Identifier of one registration inside a bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Whether a registration survives its first dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionMode {
    /// Stays registered until unsubscribed.
    Persistent,
    /// Removed as soon as an emission of its event starts dispatching.
    Once,
}

/// Cancellation handle for one registration.
///
/// Dropping the handle does **not** unsubscribe; registrations live until
/// [`unsubscribe`](Self::unsubscribe), until a one-shot fires, or until
/// `remove_all_listeners`. The handle only refers to the registration it was
/// created for: if the same handler is registered again after this one ended,
/// the old handle leaves the new registration alone.
pub struct Subscription<E: Send + Sync + 'static> {
    id: SubscriptionId,
    event: String,
    mode: SubscriptionMode,
    registry: Weak<Mutex<Registry<E>>>,
}

impl<E: Send + Sync + 'static> Subscription<E> {
    pub(crate) fn new(
        id: SubscriptionId,
        event: String,
        mode: SubscriptionMode,
        registry: Weak<Mutex<Registry<E>>>,
    ) -> Self {
        Self {
            id,
            event,
            mode,
            registry,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    /// Whether the registration is still in the bus.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|reg| registry::lock(&reg).contains(&self.event, self.mode, self.id))
    }

    /// Remove the registration. Idempotent; a no-op once a one-shot has fired
    /// or the bus has been dropped.
    pub fn unsubscribe(&self) {
        let Some(reg) = self.registry.upgrade() else {
            return;
        };
        let removed = registry::lock(&reg).remove_id(&self.event, self.mode, self.id);
        if !removed.is_empty() {
            tracing::debug!(
                event = %self.event,
                subscription = %self.id,
                mode = ?self.mode,
                "unsubscribed"
            );
        }
    }
}

impl<E: Send + Sync + 'static> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            event: self.event.clone(),
            mode: self.mode,
            registry: self.registry.clone(),
        }
    }
}

impl<E: Send + Sync + 'static> core::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("mode", &self.mode)
            .finish()
    }
}
