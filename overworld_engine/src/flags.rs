//! Global event flag store.
//!
//! One store exists per game session and is handed to every component by
//! reference (never reached as ambient state). All map instances of a
//! shared-world session serialize their flag access through the interior
//! mutex; operations are O(1) and never block on anything else.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Persistent set of named boolean flags, default false.
///
/// Scripts may probe flags that were never declared, so unknown names read
/// as false rather than erroring. `set` and `reset` are idempotent.
#[derive(Debug, Default)]
pub struct EventFlagStore {
    flags: Mutex<HashSet<String>>,
}

/// Serializable snapshot of the flag set, for the persistence collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSnapshot(pub BTreeSet<String>);

impl EventFlagStore {
    pub fn new() -> EventFlagStore {
        EventFlagStore::default()
    }

    // A poisoned lock only means another session panicked mid-operation;
    // flag ops are single insert/remove calls, so the set is still coherent.
    fn guard(&self) -> MutexGuard<'_, HashSet<String>> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check(&self, name: &str) -> bool {
        self.guard().contains(name)
    }

    pub fn set(&self, name: &str) {
        self.guard().insert(name.to_string());
    }

    pub fn reset(&self, name: &str) {
        self.guard().remove(name);
    }

    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot(self.guard().iter().cloned().collect())
    }

    pub fn restore(&self, snapshot: &FlagSnapshot) {
        let mut flags = self.guard();
        flags.clear();
        flags.extend(snapshot.0.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}
