//! Transition guards.
//!
//! Guards are the predicates on state-machine edges: checks against the
//! session's event-flag set, or against the identity of the coordinate
//! trigger / sight detection event that fired this tick.

use serde::{Deserialize, Serialize};

use overworld_data::GuardDef;

use crate::flags::EventFlagStore;
use crate::script::ScriptEvent;

/// One predicate on a transition edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    FlagSet(String),
    FlagUnset(String),
    TriggerFired(String),
    TrainerSighted(u8),
}

impl Guard {
    pub fn from_def(def: &GuardDef) -> Guard {
        match def {
            GuardDef::FlagSet { flag } => Guard::FlagSet(flag.clone()),
            GuardDef::FlagUnset { flag } => Guard::FlagUnset(flag.clone()),
            GuardDef::TriggerFired { label } => Guard::TriggerFired(label.clone()),
            GuardDef::TrainerSighted { object_id } => Guard::TrainerSighted(*object_id),
        }
    }

    /// Evaluate against the flag store and this tick's event, if any.
    pub fn satisfied(&self, flags: &EventFlagStore, event: Option<&ScriptEvent>) -> bool {
        match self {
            Guard::FlagSet(flag) => flags.check(flag),
            Guard::FlagUnset(flag) => !flags.check(flag),
            Guard::TriggerFired(label) => {
                matches!(event, Some(ScriptEvent::TriggerFired(fired)) if fired == label)
            },
            Guard::TrainerSighted(object_id) => {
                matches!(event, Some(ScriptEvent::TrainerSighted(sighted)) if sighted == object_id)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_guards_reflect_store_state() {
        let flags = EventFlagStore::new();
        assert!(!Guard::FlagSet("EVENT_X".into()).satisfied(&flags, None));
        assert!(Guard::FlagUnset("EVENT_X".into()).satisfied(&flags, None));
        flags.set("EVENT_X");
        assert!(Guard::FlagSet("EVENT_X".into()).satisfied(&flags, None));
        assert!(!Guard::FlagUnset("EVENT_X".into()).satisfied(&flags, None));
    }

    #[test]
    fn trigger_guard_matches_only_its_label() {
        let flags = EventFlagStore::new();
        let guard = Guard::TriggerFired("MuseumEntrance".into());
        assert!(guard.satisfied(&flags, Some(&ScriptEvent::TriggerFired("MuseumEntrance".into()))));
        assert!(!guard.satisfied(&flags, Some(&ScriptEvent::TriggerFired("GymDoor".into()))));
        assert!(!guard.satisfied(&flags, Some(&ScriptEvent::DialogueDismissed)));
        assert!(!guard.satisfied(&flags, None));
    }

    #[test]
    fn sight_guard_matches_only_its_object() {
        let flags = EventFlagStore::new();
        let guard = Guard::TrainerSighted(2);
        assert!(guard.satisfied(&flags, Some(&ScriptEvent::TrainerSighted(2))));
        assert!(!guard.satisfied(&flags, Some(&ScriptEvent::TrainerSighted(3))));
    }
}
