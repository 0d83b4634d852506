//! Emission helpers layered on top of [`EventBus`].

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::bus::{EmitFuture, EventBus};
use crate::error::{BatchEmitError, EmitError};
use crate::event::{Event, EventKind};
use crate::handler::HandlerFn;
use crate::subscription::Subscription;

/// Emitter bound to one catalog member `P`.
pub struct TypedEmitter<E: Event, P> {
    bus: EventBus<E>,
    _payload: PhantomData<fn(P)>,
}

impl<E: Event, P: EventKind<E>> TypedEmitter<E, P> {
    pub(crate) fn new(bus: EventBus<E>) -> Self {
        Self {
            bus,
            _payload: PhantomData,
        }
    }

    pub fn event_name(&self) -> &'static str {
        P::NAME
    }

    pub fn emit(&self, payload: P) -> EmitFuture {
        self.bus.emit(payload.into_event())
    }

    pub fn emit_detached(&self, payload: P) {
        self.bus.emit_detached(payload.into_event());
    }
}

impl<E: Event, P> Clone for TypedEmitter<E, P> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            _payload: PhantomData,
        }
    }
}

/// Emit several events concurrently and wait for all of them.
///
/// Snapshots are taken in iteration order before this returns. Unlike a
/// fail-fast join, every emission runs to completion; all failures are
/// reported together.
pub fn emit_batch<E: Event>(
    bus: &EventBus<E>,
    events: impl IntoIterator<Item = E>,
) -> BoxFuture<'static, Result<(), BatchEmitError>> {
    let emissions: Vec<EmitFuture> = events.into_iter().map(|event| bus.emit(event)).collect();
    let total = emissions.len();

    async move {
        let errors: Vec<EmitError> = future::join_all(emissions)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BatchEmitError::new(total, errors))
        }
    }
    .boxed()
}

/// Log every emission of `event` at `info`, with the payload as JSON.
pub fn log_events<E: Event + Serialize>(bus: &EventBus<E>, event: &str) -> Subscription<E> {
    let handler = HandlerFn::arc(format!("event-logger:{event}"), |ev: Arc<E>| async move {
        match serde_json::to_string(ev.as_ref()) {
            Ok(payload) => info!(event = ev.event_type(), %payload, "event"),
            Err(e) => warn!(event = ev.event_type(), error = %e, "event payload not serializable"),
        }
        Ok(())
    });
    bus.subscribe(event, handler)
}

/// Window used by [`RateLimitedEmitter::new`].
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// What a [`RateLimitedEmitter`] did with an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Throttle {
    Emitted,
    /// Over the limit for the current window; the event was discarded.
    Dropped,
}

#[derive(Debug)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Emitter that lets through at most `max_per_window` events of each name
/// per window.
///
/// Every event name has its own budget. Windows are fixed, not sliding: a
/// name's counter resets the first time it is emitted after its window has
/// elapsed.
#[derive(Debug)]
pub struct RateLimitedEmitter<E: Event> {
    bus: EventBus<E>,
    max_per_window: u32,
    window: Duration,
    windows: Mutex<HashMap<&'static str, Window>>,
}

impl<E: Event> RateLimitedEmitter<E> {
    pub fn new(bus: EventBus<E>, max_per_window: u32) -> Self {
        Self::with_window(bus, max_per_window, DEFAULT_RATE_WINDOW)
    }

    pub fn with_window(bus: EventBus<E>, max_per_window: u32, window: Duration) -> Self {
        Self {
            bus,
            max_per_window,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn admit(&self, event: &'static str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let state = windows.entry(event).or_insert(Window {
            count: 0,
            resets_at: now + self.window,
        });
        if now >= state.resets_at {
            state.count = 0;
            state.resets_at = now + self.window;
        }
        if state.count >= self.max_per_window {
            return false;
        }
        state.count += 1;
        true
    }

    pub fn emit(&self, event: E) -> BoxFuture<'static, Result<Throttle, EmitError>> {
        if !self.admit(event.event_type()) {
            warn!(
                bus = self.bus.name(),
                event = event.event_type(),
                limit = self.max_per_window,
                "rate limit exceeded, dropping event"
            );
            return future::ready(Ok(Throttle::Dropped)).boxed();
        }
        self.bus
            .emit(event)
            .map(|outcome| outcome.map(|()| Throttle::Emitted))
            .boxed()
    }
}
