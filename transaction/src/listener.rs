//! Listener registry.
//!
//! Listeners are scoped globally or to one type name. Lookups are served
//! from a cache map that is rebuilt and swapped in whole on every add or
//! remove, so a warm read only takes the read lock long enough to clone an
//! `Arc`.

use crate::{TransactionError, TransactionResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::RecordId;
use tracing::trace;

/// The fixed catalog of listener kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Deployment,
    Transaction,
    PrePersist,
    PostPersist,
    PreMerge,
    PostMerge,
    PreDelete,
    PostDelete,
}

impl ListenerKind {
    /// Pre-listeners may veto the operation by returning an error.
    pub fn is_pre(&self) -> bool {
        matches!(
            self,
            ListenerKind::PrePersist | ListenerKind::PreMerge | ListenerKind::PreDelete
        )
    }
}

/// What a listener is told.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerEvent<'a> {
    pub kind: ListenerKind,
    pub type_name: Option<&'a str>,
    pub id: Option<RecordId>,
    /// Set for `Transaction` events fired after a rollback.
    pub rolled_back: bool,
}

impl<'a> ListenerEvent<'a> {
    pub fn record(kind: ListenerKind, type_name: &'a str, id: Option<RecordId>) -> Self {
        Self {
            kind,
            type_name: Some(type_name),
            id,
            rolled_back: false,
        }
    }

    pub fn global(kind: ListenerKind) -> Self {
        Self {
            kind,
            type_name: None,
            id: None,
            rolled_back: false,
        }
    }
}

pub trait Listener: Send + Sync {
    fn on_event(&self, event: &ListenerEvent<'_>) -> Result<(), String>;
}

impl<F> Listener for F
where
    F: Fn(&ListenerEvent<'_>) -> Result<(), String> + Send + Sync,
{
    fn on_event(&self, event: &ListenerEvent<'_>) -> Result<(), String> {
        self(event)
    }
}

/// Handle returned on registration, used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Key = (ListenerKind, Option<String>);
type Resolved = Arc<[Arc<dyn Listener>]>;

#[derive(Default)]
struct State {
    listeners: HashMap<Key, Vec<(ListenerId, Arc<dyn Listener>)>>,
    cache: Arc<HashMap<Key, Resolved>>,
}

impl State {
    /// Global listeners first, then type-specific ones, each in
    /// registration order.
    fn resolve(&self, kind: ListenerKind, type_name: Option<&str>) -> Resolved {
        let global = self.listeners.get(&(kind, None)).into_iter().flatten();
        let specific = type_name
            .and_then(|t| self.listeners.get(&(kind, Some(t.to_string()))))
            .into_iter()
            .flatten();
        global.chain(specific).map(|(_, l)| l.clone()).collect()
    }

    /// Rebuild every cached entry for `kind` that `changed` can affect.
    fn republish(&mut self, kind: ListenerKind, changed: &Option<String>) {
        let mut next = HashMap::with_capacity(self.cache.len());
        for (key, resolved) in self.cache.iter() {
            let affected = key.0 == kind && (changed.is_none() || key.1 == *changed);
            let value = if affected {
                self.resolve(key.0, key.1.as_deref())
            } else {
                resolved.clone()
            };
            next.insert(key.clone(), value);
        }
        self.cache = Arc::new(next);
    }
}

/// Registry of listeners by kind and optional type name.
#[derive(Default)]
pub struct ListenerRegistry {
    state: RwLock<State>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. `type_name == None` makes it global.
    pub fn add(
        &self,
        kind: ListenerKind,
        type_name: Option<&str>,
        listener: Arc<dyn Listener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let key = (kind, type_name.map(str::to_string));
        let mut state = self.state.write();
        state
            .listeners
            .entry(key.clone())
            .or_default()
            .push((id, listener));
        state.republish(kind, &key.1);
        id
    }

    pub fn add_global(&self, kind: ListenerKind, listener: Arc<dyn Listener>) -> ListenerId {
        self.add(kind, None, listener)
    }

    pub fn add_for_type(
        &self,
        kind: ListenerKind,
        type_name: &str,
        listener: Arc<dyn Listener>,
    ) -> ListenerId {
        self.add(kind, Some(type_name), listener)
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut state = self.state.write();
        let found = state.listeners.iter_mut().find_map(|(key, list)| {
            let pos = list.iter().position(|(lid, _)| *lid == id)?;
            list.remove(pos);
            Some(key.clone())
        });
        match found {
            Some((kind, type_name)) => {
                state.republish(kind, &type_name);
                true
            }
            None => false,
        }
    }

    /// Listeners for `kind` as seen by a record of `type_name`.
    pub fn listeners(&self, kind: ListenerKind, type_name: Option<&str>) -> Resolved {
        let key = (kind, type_name.map(str::to_string));
        if let Some(hit) = self.state.read().cache.get(&key) {
            return hit.clone();
        }

        let mut state = self.state.write();
        if let Some(hit) = state.cache.get(&key) {
            return hit.clone();
        }
        let resolved = state.resolve(kind, type_name);
        let mut next = (*state.cache).clone();
        next.insert(key, resolved.clone());
        state.cache = Arc::new(next);
        resolved
    }

    /// Dispatch `event` to every matching listener, stopping at the first
    /// failure.
    pub fn fire(&self, event: &ListenerEvent<'_>) -> TransactionResult<()> {
        let listeners = self.listeners(event.kind, event.type_name);
        trace!(kind = ?event.kind, type_name = ?event.type_name, count = listeners.len(), "fire");
        for listener in listeners.iter() {
            listener
                .on_event(event)
                .map_err(TransactionError::Listener)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ListenerRegistry")
            .field("keys", &state.listeners.len())
            .field("cached", &state.cache.len())
            .finish()
    }
}
