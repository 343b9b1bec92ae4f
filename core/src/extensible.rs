//! Typed per-entity extension storage
//!
//! Modules attach their own state to users and channels under a module-scoped
//! key. The value lives exactly as long as the entity that owns it.

use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt;

/// Extension storage owned by a user or channel
#[derive(Default)]
pub struct Extensible {
    items: FxHashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Extensible {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an extension value if present and of type `T`
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.items.get(key).and_then(|item| item.downcast_ref::<T>())
    }

    /// Get a mutable extension value if present and of type `T`
    pub fn get_mut<T: Any + Send + Sync>(&mut self, key: &str) -> Option<&mut T> {
        self.items.get_mut(key).and_then(|item| item.downcast_mut::<T>())
    }

    /// Get the value for `key`, inserting one built by `init` when absent.
    ///
    /// A stale value of a different type under the same key is replaced.
    pub fn get_or_insert_with<T, F>(&mut self, key: &str, init: F) -> &mut T
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let present = self.items.get(key).is_some_and(|item| item.is::<T>());
        if !present {
            self.items.insert(key.to_string(), Box::new(init()));
        }
        self.items
            .get_mut(key)
            .and_then(|item| item.downcast_mut::<T>())
            .unwrap_or_else(|| unreachable!("extension {} was just set to the requested type", key))
    }

    /// Set an extension value, replacing any previous one
    pub fn set<T: Any + Send + Sync>(&mut self, key: &str, value: T) {
        self.items.insert(key.to_string(), Box::new(value));
    }

    /// Remove an extension value; returns true if one was present
    pub fn unset(&mut self, key: &str) -> bool {
        self.items.remove(key).is_some()
    }

    /// Whether any value is stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }
}

impl fmt::Debug for Extensible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.items.keys().collect();
        keys.sort();
        f.debug_struct("Extensible").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut ext = Extensible::new();
        ext.set("limit", 25usize);
        assert_eq!(ext.get::<usize>("limit"), Some(&25));
        assert!(ext.get::<String>("limit").is_none());

        *ext.get_mut::<usize>("limit").unwrap() = 30;
        assert_eq!(ext.get::<usize>("limit"), Some(&30));

        assert!(ext.unset("limit"));
        assert!(!ext.unset("limit"));
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut ext = Extensible::new();
        ext.get_or_insert_with("list", Vec::<String>::new)
            .push("*!*@host".to_string());
        ext.get_or_insert_with("list", Vec::<String>::new)
            .push("*!*@other".to_string());
        assert_eq!(ext.get::<Vec<String>>("list").map(Vec::len), Some(2));
    }
}
