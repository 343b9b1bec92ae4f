//! Observers attached to modes by name

use super::{Change, ModeContext, ModeType};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Observes (and may veto) changes to a mode identified by name and type.
///
/// Watchers are keyed by name rather than by handler so they can be
/// registered before the mode they watch, and survive it being reloaded.
pub trait ModeWatcher: Send + Sync {
    fn mode_name(&self) -> &str;

    fn mode_type(&self) -> ModeType;

    /// Module that registered the watcher
    fn creator(&self) -> &str;

    /// Return false to drop the change. May rewrite the parameter;
    /// clearing a required parameter also drops the change.
    fn before_mode(&self, _ctx: &mut ModeContext<'_>, _change: &mut Change) -> bool {
        true
    }

    /// Called after the change was applied
    fn after_mode(&self, _ctx: &mut ModeContext<'_>, _change: &Change) {}
}

fn same_watcher(a: &Arc<dyn ModeWatcher>, b: &Arc<dyn ModeWatcher>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Watchers by mode name, in registration order
#[derive(Default)]
pub struct WatcherMap {
    by_name: FxHashMap<String, Vec<Arc<dyn ModeWatcher>>>,
}

impl WatcherMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, watcher: Arc<dyn ModeWatcher>) {
        self.by_name
            .entry(watcher.mode_name().to_string())
            .or_default()
            .push(watcher);
    }

    /// Remove one watcher; false if it was not registered
    pub fn remove(&mut self, watcher: &Arc<dyn ModeWatcher>) -> bool {
        let Some(list) = self.by_name.get_mut(watcher.mode_name()) else {
            return false;
        };
        let Some(pos) = list.iter().position(|w| same_watcher(w, watcher)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.by_name.remove(watcher.mode_name());
        }
        true
    }

    /// Remove every watcher registered by a module, returning how many went
    pub fn remove_by_creator(&mut self, creator: &str) -> usize {
        let mut removed = 0;
        self.by_name.retain(|_, list| {
            let before = list.len();
            list.retain(|w| w.creator() != creator);
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// Watchers for a mode, in registration order
    pub fn for_mode<'a>(
        &'a self,
        name: &str,
        mode_type: ModeType,
    ) -> impl Iterator<Item = &'a Arc<dyn ModeWatcher>> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter(move |w| w.mode_type() == mode_type)
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, &'static str);

    impl ModeWatcher for Named {
        fn mode_name(&self) -> &str {
            self.0
        }

        fn mode_type(&self) -> ModeType {
            ModeType::Channel
        }

        fn creator(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn test_add_remove_by_identity() {
        let mut map = WatcherMap::new();
        let a: Arc<dyn ModeWatcher> = Arc::new(Named("ban", "one"));
        let b: Arc<dyn ModeWatcher> = Arc::new(Named("ban", "two"));
        map.add(Arc::clone(&a));
        map.add(Arc::clone(&b));
        assert_eq!(map.for_mode("ban", ModeType::Channel).count(), 2);
        assert_eq!(map.for_mode("ban", ModeType::User).count(), 0);

        assert!(map.remove(&a));
        assert!(!map.remove(&a));
        let left: Vec<_> = map.for_mode("ban", ModeType::Channel).collect();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].creator(), "two");
    }

    #[test]
    fn test_remove_by_creator() {
        let mut map = WatcherMap::new();
        map.add(Arc::new(Named("ban", "one")));
        map.add(Arc::new(Named("key", "one")));
        map.add(Arc::new(Named("key", "two")));
        assert_eq!(map.remove_by_creator("one"), 2);
        assert_eq!(map.len(), 1);
        assert!(map.for_mode("ban", ModeType::Channel).next().is_none());
    }
}
