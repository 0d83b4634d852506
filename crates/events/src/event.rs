use chrono::{DateTime, Utc};

/// An event that can travel over an [`EventBus`](crate::EventBus).
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **self-routing**: the event name is derived from the payload, so a
///   payload can never be published under the wrong name
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name used as the routing key (e.g. "quiz.completed").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// One member of an event union `E`, with its own strongly-typed payload.
///
/// Lets consumers subscribe to a single payload type (`bus.on::<P>(..)`) and
/// producers emit it without naming the union variant.
pub trait EventKind<E: Event>: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Routing name of this member; always equal to `into_event().event_type()`.
    const NAME: &'static str;

    /// Borrow the payload if `event` is this member.
    fn project(event: &E) -> Option<&Self>;

    /// Wrap the payload into the union.
    fn into_event(self) -> E;
}
