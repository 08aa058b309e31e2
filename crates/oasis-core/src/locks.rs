//! Per-profile mutual exclusion
//!
//! Each profile id maps to its own mutex, so actions on one profile are
//! serialized while different profiles proceed in parallel.

use crate::identity::ProfileId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ProfileLocks {
    locks: Mutex<HashMap<ProfileId, Arc<Mutex<()>>>>,
}

impl ProfileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `id`, created on first use
    pub fn handle(&self, id: &ProfileId) -> Arc<Mutex<()>> {
        let mut locks = self.registry();
        locks.entry(id.clone()).or_default().clone()
    }

    /// Run `f` while holding the lock for `id`
    pub fn with<T>(&self, id: &ProfileId, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(id);
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = handle.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }

    /// Drop entries no caller currently holds
    pub fn prune(&self) -> usize {
        let mut locks = self.registry();
        let before = locks.len();
        locks.retain(|_, handle| Arc::strong_count(handle) > 1);
        before - locks.len()
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<ProfileId, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }
}
