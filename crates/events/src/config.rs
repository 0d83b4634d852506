//! Event bus configuration.

use std::str::FromStr;

/// Environment variable selecting the dispatch order.
pub const DISPATCH_ORDER_ENV: &str = "MEDWASTER_EVENT_DISPATCH_ORDER";

/// Order in which the handlers of one emission are started.
///
/// Handlers of one emission never have an ordering contract; this only picks
/// how the snapshot is laid out before it is driven concurrently.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum DispatchOrder {
    /// Persistent handlers in registration order, then one-shot handlers.
    #[default]
    Registration,
    /// Snapshot shuffled on every emission.
    Shuffled,
}

impl FromStr for DispatchOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "registration" => Ok(Self::Registration),
            "shuffled" | "shuffle" => Ok(Self::Shuffled),
            other => Err(format!("unknown dispatch order `{other}`")),
        }
    }
}

/// Event bus configuration.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Name for logging
    pub name: String,
    pub dispatch_order: DispatchOrder,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            name: "event-bus".to_string(),
            dispatch_order: DispatchOrder::default(),
        }
    }
}

impl EventBusConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_dispatch_order(mut self, order: DispatchOrder) -> Self {
        self.dispatch_order = order;
        self
    }

    /// Defaults overridden by `MEDWASTER_EVENT_DISPATCH_ORDER`.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(DISPATCH_ORDER_ENV) {
            Ok(raw) => match raw.parse() {
                Ok(order) => config.with_dispatch_order(order),
                Err(e) => {
                    tracing::warn!(
                        env = DISPATCH_ORDER_ENV,
                        error = %e,
                        "ignoring invalid dispatch order"
                    );
                    config
                }
            },
            Err(_) => config,
        }
    }
}
