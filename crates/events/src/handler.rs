//! Event handlers.
//!
//! A handler is any `Send + Sync` value implementing [`Handler`]. Handlers are
//! registered as `Arc`s; **the allocation is the handler's identity**, so the
//! same `Arc` (or a clone of it) registered twice is one registration.

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::{Event, EventKind};

/// Error type returned by handlers.
///
/// Handlers are application code with heterogeneous failure sources, so this is
/// an `anyhow::Error` rather than a closed enum.
pub type HandlerError = anyhow::Error;

/// Shared, type-erased handler reference as stored by the bus.
pub type HandlerRef<E> = Arc<dyn Handler<E>>;

/// Reacts to events of type `E`.
#[async_trait]
pub trait Handler<E: Send + Sync + 'static>: Send + Sync + 'static {
    /// Name used in logs when this handler fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle one emitted event. The payload is shared by every handler of the
    /// same emission.
    async fn handle(&self, event: Arc<E>) -> Result<(), HandlerError>;
}

/// Thin-pointer identity of a handler allocation.
pub(crate) fn handler_key<H: ?Sized>(handler: &Arc<H>) -> *const () {
    Arc::as_ptr(handler) as *const ()
}

/// Closure-backed handler.
///
/// Wraps `F: Fn(Arc<E>) -> Fut`, producing a fresh future per invocation.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates the handler and returns it as a shared handle ready for
    /// [`EventBus::subscribe`](crate::EventBus::subscribe).
    ///
    /// ```ignore
    /// let h = HandlerFn::arc("notify", |ev: Arc<DomainEvent>| async move {
    ///     tracing::info!(event = ev.event_type(), "notify");
    ///     Ok(())
    /// });
    /// bus.subscribe("quiz.completed", h.clone());
    /// ```
    pub fn arc<E, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            f,
        })
    }
}

impl<F> core::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<E, F, Fut> Handler<E> for HandlerFn<F>
where
    E: Send + Sync + 'static,
    F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<E>) -> Result<(), HandlerError> {
        (self.f)(event).await
    }
}

/// Handler bound to a single catalog member `P`.
///
/// Produced by [`EventBus::on`](crate::EventBus::on) and
/// [`EventBus::once`](crate::EventBus::once); the closure receives an owned
/// payload instead of the whole union.
pub struct TypedHandler<P, F> {
    name: Cow<'static, str>,
    f: F,
    _payload: PhantomData<fn(P)>,
}

impl<P, F> TypedHandler<P, F> {
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            f,
            _payload: PhantomData,
        })
    }
}

#[async_trait]
impl<E, P, F, Fut> Handler<E> for TypedHandler<P, F>
where
    E: Event,
    P: EventKind<E>,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<E>) -> Result<(), HandlerError> {
        let Some(payload) = P::project(&event) else {
            anyhow::bail!(
                "payload mismatch: handler for `{}` received `{}`",
                P::NAME,
                event.event_type()
            );
        };
        (self.f)(payload.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_fn_reports_its_name_and_runs_closure() {
        let h = HandlerFn::arc("doubler", |n: Arc<u32>| async move {
            anyhow::ensure!(*n % 2 == 0, "odd input {n}");
            Ok(())
        });

        assert_eq!(Handler::<u32>::name(h.as_ref()), "doubler");
        assert!(h.handle(Arc::new(4u32)).await.is_ok());
        assert!(h.handle(Arc::new(3u32)).await.is_err());
    }

    #[test]
    fn handler_key_is_stable_across_clones_and_coercion() {
        let h = HandlerFn::arc("x", |_: Arc<u32>| async { Ok(()) });
        let erased: HandlerRef<u32> = h.clone();
        assert_eq!(handler_key(&h), handler_key(&erased));

        let other = HandlerFn::arc("x", |_: Arc<u32>| async { Ok(()) });
        assert_ne!(handler_key(&h), handler_key(&other));
    }
}
