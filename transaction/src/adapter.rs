//! Virtual-attribute adapter registry.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::Value;

/// Computes the value of a virtual attribute from a loaded record's
/// persistent values, keyed by attribute name.
pub trait VirtualAttributeAdapter: Send + Sync {
    fn compute(&self, values: &HashMap<String, Value>) -> Result<Value, String>;
}

impl<F> VirtualAttributeAdapter for F
where
    F: Fn(&HashMap<String, Value>) -> Result<Value, String> + Send + Sync,
{
    fn compute(&self, values: &HashMap<String, Value>) -> Result<Value, String> {
        self(values)
    }
}

type Key = (String, String);
type Slot = Option<Arc<dyn VirtualAttributeAdapter>>;

#[derive(Default)]
struct State {
    adapters: HashMap<Key, Arc<dyn VirtualAttributeAdapter>>,
    /// Misses are cached too.
    cache: Arc<HashMap<Key, Slot>>,
}

/// Adapters by (type name, attribute name), with the same read-mostly cache
/// discipline as the listener registry.
#[derive(Default)]
pub struct VirtualAttributeAdapterRegistry {
    state: RwLock<State>,
}

impl VirtualAttributeAdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        type_name: &str,
        attribute: &str,
        adapter: Arc<dyn VirtualAttributeAdapter>,
    ) {
        let key = (type_name.to_string(), attribute.to_string());
        let mut state = self.state.write();
        state.adapters.insert(key.clone(), adapter);
        Self::invalidate(&mut state, &key);
    }

    pub fn remove(&self, type_name: &str, attribute: &str) -> bool {
        let key = (type_name.to_string(), attribute.to_string());
        let mut state = self.state.write();
        let removed = state.adapters.remove(&key).is_some();
        Self::invalidate(&mut state, &key);
        removed
    }

    pub fn get(&self, type_name: &str, attribute: &str) -> Slot {
        let key = (type_name.to_string(), attribute.to_string());
        if let Some(hit) = self.state.read().cache.get(&key) {
            return hit.clone();
        }

        let mut state = self.state.write();
        let slot = state.adapters.get(&key).cloned();
        let mut next = (*state.cache).clone();
        next.insert(key, slot.clone());
        state.cache = Arc::new(next);
        slot
    }

    fn invalidate(state: &mut State, key: &Key) {
        if state.cache.contains_key(key) {
            let mut next = (*state.cache).clone();
            next.remove(key);
            state.cache = Arc::new(next);
        }
    }
}

impl std::fmt::Debug for VirtualAttributeAdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualAttributeAdapterRegistry")
            .field("adapters", &self.state.read().adapters.len())
            .finish()
    }
}
