//! `medwaster-events`: in-process event bus and the MedWaster event catalog.
//!
//! Domain modules publish facts ("quiz.completed", "achievement.unlocked", ...)
//! through an [`EventBus`]; side-effect modules subscribe to them. The bus is
//! generic over the event type; [`DomainEvent`] is the catalog used by the
//! application.

pub mod bus;
pub mod catalog;
pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod handler;
mod registry;
pub mod subscription;

pub use bus::{EmitFuture, EventBus, WeakEventBus};
pub use catalog::DomainEvent;
pub use config::{DispatchOrder, EventBusConfig};
pub use emitter::{RateLimitedEmitter, Throttle, TypedEmitter, emit_batch, log_events};
pub use error::{BatchEmitError, EmitError, HandlerFailure};
pub use event::{Event, EventKind};
pub use handler::{Handler, HandlerError, HandlerFn, HandlerRef, TypedHandler};
pub use subscription::{Subscription, SubscriptionId, SubscriptionMode};
