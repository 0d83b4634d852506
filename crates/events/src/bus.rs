//! In-process publish/subscribe event bus.
//!
//! Domain modules (quizzes, achievements, audit, gamification) emit events when
//! an action completes; side-effect modules (notifications, analytics, streaks)
//! subscribe to the names they care about.
//!
//! ## Semantics
//!
//! - **Persistent** subscriptions stay until unsubscribed; **one-shot**
//!   subscriptions are removed the moment an emission of their event starts
//!   dispatching, whether the handler then succeeds or fails.
//! - Registering the same handler `Arc` twice for the same name and mode is a
//!   no-op.
//! - [`EventBus::emit`] snapshots the handlers **when it is called**, before the
//!   returned future is polled. One-shot handlers subscribed while an emission is
//!   in flight are left for the next emission, and successive `emit` calls from
//!   one caller dispatch in call order.
//! - All handlers of one emission are driven concurrently on the emitting task.
//!   A failing (or panicking) handler never cancels its siblings; the emission
//!   reports an aggregate [`EmitError`] once every handler has finished.
//! - There is no ordering contract between handlers and no timeout. Wrap the
//!   future in `tokio::time::timeout` if a deadline is needed.
//!
//! ## Lifetime
//!
//! Build one bus at process start and hand clones to the modules that need it.
//! Clones share the registry. Handlers that emit follow-up events should hold a
//! [`WeakEventBus`] so the registry does not keep itself alive.

use std::borrow::Cow;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, Weak};

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use rand::seq::SliceRandom;
use tracing::{debug, error, trace, warn};

use crate::config::{DispatchOrder, EventBusConfig};
use crate::emitter::TypedEmitter;
use crate::error::{EmitError, HandlerFailure};
use crate::event::{Event, EventKind};
use crate::handler::{HandlerError, HandlerRef, TypedHandler, handler_key};
use crate::registry::{self, Registry};
use crate::subscription::{Subscription, SubscriptionMode};

/// Completion of one emission.
pub type EmitFuture = BoxFuture<'static, Result<(), EmitError>>;

struct Inner<E: Event> {
    name: Arc<str>,
    dispatch_order: DispatchOrder,
    registry: Arc<Mutex<Registry<E>>>,
}

/// Named-channel publish/subscribe bus over the event type `E`.
pub struct EventBus<E: Event> {
    inner: Arc<Inner<E>>,
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: Arc::from(config.name),
                dispatch_order: config.dispatch_order,
                registry: Arc::new(Mutex::new(Registry::default())),
            }),
        }
    }

    /// Bus name used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn dispatch_order(&self) -> DispatchOrder {
        self.inner.dispatch_order
    }

    /// Non-owning reference, for handlers that emit on the bus they belong to.
    pub fn downgrade(&self) -> WeakEventBus<E> {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn register(
        &self,
        event: &str,
        mode: SubscriptionMode,
        handler: HandlerRef<E>,
    ) -> Subscription<E> {
        let handler_name = handler.name().to_string();
        let (id, added) = registry::lock(&self.inner.registry).insert(event, mode, handler);
        if added {
            debug!(
                bus = %self.inner.name,
                event,
                handler = %handler_name,
                subscription = %id,
                ?mode,
                "subscribed"
            );
        } else {
            trace!(
                bus = %self.inner.name,
                event,
                handler = %handler_name,
                "handler already subscribed"
            );
        }
        Subscription::new(id, event.to_string(), mode, Arc::downgrade(&self.inner.registry))
    }

    /// Register `handler` for every emission of `event` until unsubscribed.
    pub fn subscribe(&self, event: &str, handler: HandlerRef<E>) -> Subscription<E> {
        self.register(event, SubscriptionMode::Persistent, handler)
    }

    /// Register `handler` for the next emission of `event` only.
    pub fn subscribe_once(&self, event: &str, handler: HandlerRef<E>) -> Subscription<E> {
        self.register(event, SubscriptionMode::Once, handler)
    }

    /// Remove `handler` from the persistent subscriptions of `event`.
    ///
    /// One-shot registrations of the same handler are left alone. No-op when
    /// the handler is not subscribed.
    pub fn unsubscribe<H: ?Sized>(&self, event: &str, handler: &Arc<H>) {
        let removed = registry::lock(&self.inner.registry).remove_handler(
            event,
            SubscriptionMode::Persistent,
            handler_key(handler),
        );
        if !removed.is_empty() {
            debug!(bus = %self.inner.name, event, "handler unsubscribed");
        }
    }

    /// Subscribe a closure to catalog member `P`.
    ///
    /// Every call registers a new handler, so calling this twice subscribes
    /// twice.
    pub fn on<P, F, Fut>(
        &self,
        handler_name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Subscription<E>
    where
        P: EventKind<E>,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.subscribe(P::NAME, TypedHandler::<P, F>::arc(handler_name, f))
    }

    /// One-shot counterpart of [`on`](Self::on).
    pub fn once<P, F, Fut>(
        &self,
        handler_name: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Subscription<E>
    where
        P: EventKind<E>,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.subscribe_once(P::NAME, TypedHandler::<P, F>::arc(handler_name, f))
    }

    /// Emitter bound to catalog member `P`.
    pub fn emitter<P: EventKind<E>>(&self) -> TypedEmitter<E, P> {
        TypedEmitter::new(self.clone())
    }

    /// Dispatch `event` to every handler subscribed to its name.
    ///
    /// The handler snapshot is taken (and the one-shot list cleared) before
    /// this returns; the future only drives the handlers.
    pub fn emit(&self, event: E) -> EmitFuture {
        let name = event.event_type();
        let mut handlers = registry::lock(&self.inner.registry).snapshot(name);

        if handlers.is_empty() {
            trace!(bus = %self.inner.name, event = name, "no handlers");
            return future::ready(Ok(())).boxed();
        }
        if self.inner.dispatch_order == DispatchOrder::Shuffled {
            handlers.shuffle(&mut rand::thread_rng());
        }

        debug!(bus = %self.inner.name, event = name, handlers = handlers.len(), "emitting");
        dispatch(self.inner.name.clone(), name, Arc::new(event), handlers).boxed()
    }

    /// Fire-and-forget [`emit`](Self::emit) on the current tokio runtime.
    ///
    /// Aggregate failures are logged instead of returned. Outside a runtime the
    /// event is dropped with a warning and no one-shot handler is consumed.
    pub fn emit_detached(&self, event: E) {
        let name = event.event_type();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                bus = %self.inner.name,
                event = name,
                "no tokio runtime, dropping detached emission"
            );
            return;
        };

        let emission = self.emit(event);
        let bus = self.inner.name.clone();
        runtime.spawn(async move {
            if let Err(e) = emission.await {
                error!(bus = %bus, event = name, error = %e, "detached emission failed");
            }
        });
    }

    /// Clear both maps for `event`, or the whole registry when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let removed = registry::lock(&self.inner.registry).clear(event);
        debug!(
            bus = %self.inner.name,
            event = event.unwrap_or("*"),
            removed = removed.len(),
            "removed all listeners"
        );
    }

    /// Persistent plus one-shot registrations for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        registry::lock(&self.inner.registry).count(event)
    }

    /// Names with at least one registration, in no particular order.
    pub fn event_names(&self) -> Vec<String> {
        registry::lock(&self.inner.registry).names()
    }
}

async fn dispatch<E: Event>(
    bus: Arc<str>,
    event_name: &'static str,
    event: Arc<E>,
    handlers: Vec<HandlerRef<E>>,
) -> Result<(), EmitError> {
    let runs: Vec<_> = handlers
        .iter()
        .map(|handler| {
            let handler = Arc::clone(handler);
            let event = Arc::clone(&event);
            AssertUnwindSafe(async move { handler.handle(event).await }).catch_unwind()
        })
        .collect();
    let outcomes = future::join_all(runs).await;

    let mut failures = Vec::new();
    for (handler, outcome) in handlers.iter().zip(outcomes) {
        let failure = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => HandlerFailure::Error(e),
            Err(panic) => HandlerFailure::from_panic(panic),
        };
        error!(
            bus = %bus,
            event = event_name,
            handler = handler.name(),
            error = %failure,
            "event handler failed"
        );
        failures.push(failure);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(EmitError::new(event_name, handlers.len(), failures))
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Event> core::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.inner.name)
            .field("dispatch_order", &self.inner.dispatch_order)
            .field("events", &self.event_names().len())
            .finish()
    }
}

/// Weak counterpart of [`EventBus`].
pub struct WeakEventBus<E: Event> {
    inner: Weak<Inner<E>>,
}

impl<E: Event> WeakEventBus<E> {
    /// `None` once every strong `EventBus` clone has been dropped.
    pub fn upgrade(&self) -> Option<EventBus<E>> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}

impl<E: Event> Clone for WeakEventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E: Event> core::fmt::Debug for WeakEventBus<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeakEventBus")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
