//! Handler registry backing the event bus.
//!
//! Two independent maps from event name to handler list: persistent and
//! one-shot. A handler allocation appears at most once per name per map, and
//! lists that become empty are dropped so `names()` only reports live events.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::handler::{HandlerRef, handler_key};
use crate::subscription::{SubscriptionId, SubscriptionMode};

struct Entry<E: Send + Sync + 'static> {
    id: SubscriptionId,
    handler: HandlerRef<E>,
}

pub(crate) struct Registry<E: Send + Sync + 'static> {
    next_id: u64,
    persistent: HashMap<String, Vec<Entry<E>>>,
    once: HashMap<String, Vec<Entry<E>>>,
}

impl<E: Send + Sync + 'static> Default for Registry<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            persistent: HashMap::new(),
            once: HashMap::new(),
        }
    }
}

/// No user code runs under this lock: removals hand the removed handlers back
/// so they are dropped after the guard. A poisoned guard therefore still holds
/// a consistent registry.
pub(crate) fn lock<E: Send + Sync + 'static>(
    registry: &Mutex<Registry<E>>,
) -> MutexGuard<'_, Registry<E>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E: Send + Sync + 'static> Registry<E> {
    fn map(&self, mode: SubscriptionMode) -> &HashMap<String, Vec<Entry<E>>> {
        match mode {
            SubscriptionMode::Persistent => &self.persistent,
            SubscriptionMode::Once => &self.once,
        }
    }

    fn map_mut(&mut self, mode: SubscriptionMode) -> &mut HashMap<String, Vec<Entry<E>>> {
        match mode {
            SubscriptionMode::Persistent => &mut self.persistent,
            SubscriptionMode::Once => &mut self.once,
        }
    }

    /// Register `handler`, or return the id of its existing registration.
    pub(crate) fn insert(
        &mut self,
        event: &str,
        mode: SubscriptionMode,
        handler: HandlerRef<E>,
    ) -> (SubscriptionId, bool) {
        let key = handler_key(&handler);
        if let Some(existing) = self
            .map(mode)
            .get(event)
            .and_then(|entries| entries.iter().find(|e| handler_key(&e.handler) == key))
        {
            return (existing.id, false);
        }

        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.map_mut(mode)
            .entry(event.to_string())
            .or_default()
            .push(Entry { id, handler });
        (id, true)
    }

    /// Take out the entries matching `pred`. The caller drops them once the
    /// lock is released.
    fn remove_where(
        &mut self,
        event: &str,
        mode: SubscriptionMode,
        pred: impl Fn(&Entry<E>) -> bool,
    ) -> Vec<HandlerRef<E>> {
        let map = self.map_mut(mode);
        let Some(entries) = map.get_mut(event) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) = entries.drain(..).partition(|e| pred(e));
        *entries = kept;
        if entries.is_empty() {
            map.remove(event);
        }
        removed.into_iter().map(|e| e.handler).collect()
    }

    pub(crate) fn remove_id(
        &mut self,
        event: &str,
        mode: SubscriptionMode,
        id: SubscriptionId,
    ) -> Vec<HandlerRef<E>> {
        self.remove_where(event, mode, |e| e.id == id)
    }

    pub(crate) fn remove_handler(
        &mut self,
        event: &str,
        mode: SubscriptionMode,
        key: *const (),
    ) -> Vec<HandlerRef<E>> {
        self.remove_where(event, mode, |e| handler_key(&e.handler) == key)
    }

    pub(crate) fn contains(&self, event: &str, mode: SubscriptionMode, id: SubscriptionId) -> bool {
        self.map(mode)
            .get(event)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }

    /// Empty both maps for `event`, or entirely when `None`, returning the
    /// removed handlers.
    pub(crate) fn clear(&mut self, event: Option<&str>) -> Vec<HandlerRef<E>> {
        let lists: Vec<Vec<Entry<E>>> = match event {
            Some(name) => [self.persistent.remove(name), self.once.remove(name)]
                .into_iter()
                .flatten()
                .collect(),
            None => self
                .persistent
                .drain()
                .chain(self.once.drain())
                .map(|(_, entries)| entries)
                .collect(),
        };
        lists.into_iter().flatten().map(|e| e.handler).collect()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        let persistent = self.persistent.get(event).map_or(0, Vec::len);
        let once = self.once.get(event).map_or(0, Vec::len);
        persistent + once
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let names: HashSet<&String> = self.persistent.keys().chain(self.once.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// Handlers for one emission: persistent handlers are copied, the one-shot
    /// list for `event` is taken out whole.
    pub(crate) fn snapshot(&mut self, event: &str) -> Vec<HandlerRef<E>> {
        let mut handlers: Vec<HandlerRef<E>> = self
            .persistent
            .get(event)
            .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
            .unwrap_or_default();
        if let Some(once) = self.once.remove(event) {
            handlers.extend(once.into_iter().map(|e| e.handler));
        }
        handlers
    }
}
