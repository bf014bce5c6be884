//! Per-map script state machine.
//!
//! Every scripted map owns an ordered set of script states; index 0 is the
//! idle state entered on map load and the natural resting point after any
//! cutscene. Transitions are directed edges guarded by predicates over the
//! event-flag set and the event that fired this tick; guards are evaluated
//! in declared order and the first satisfied transition is taken. There is
//! no terminal state: cutscene sequences are cycles that return to 0.

pub mod effect;
pub mod guard;

pub use effect::*;
pub use guard::*;

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use overworld_data::{MapScriptDef, ScriptStateDef, TransitionDef};

use crate::error::IntegrityError;
use crate::map::MapId;

/// Jump-chain ceiling; a script that transitions more times than this in one
/// step is cut off as an authoring error.
const MAX_CHAINED_TRANSITIONS: usize = 8;

/// A map's full state machine, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapScript {
    pub states: Vec<ScriptState>,
}

/// One node of the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptState {
    pub index: u32,
    pub label: String,
    pub transitions: Vec<Transition>,
    pub effects: Vec<ScriptEffect>,
}

/// A guarded directed edge. All guards must hold for the edge to be taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub to: u32,
    pub guards: Vec<Guard>,
}

impl MapScript {
    pub fn from_def(def: &MapScriptDef) -> MapScript {
        MapScript {
            states: def.states.iter().map(ScriptState::from_def).collect(),
        }
    }

    pub fn state(&self, index: u32) -> Option<&ScriptState> {
        self.states.iter().find(|s| s.index == index)
    }
}

impl ScriptState {
    fn from_def(def: &ScriptStateDef) -> ScriptState {
        ScriptState {
            index: def.index,
            label: def.label.clone(),
            transitions: def.transitions.iter().map(Transition::from_def).collect(),
            effects: def.effects.iter().map(ScriptEffect::from_def).collect(),
        }
    }
}

impl Transition {
    fn from_def(def: &TransitionDef) -> Transition {
        Transition {
            to: def.to,
            guards: def.guards.iter().map(Guard::from_def).collect(),
        }
    }
}

/// Events a state machine can react to within one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    TriggerFired(String),
    TrainerSighted(u8),
    DialogueDismissed,
    /// The named object's movement playback ran out of steps.
    MovementFinished(u8),
    BattleResolved,
}

/// What the engine is suspended on, if anything. Suspension is cooperative:
/// the state machine parks until the matching acknowledgment event arrives.
/// A movement wait is bound to the object it played, so another NPC's
/// playback finishing cannot unpark it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Dialogue,
    Movement(u8),
    Battle,
}

impl WaitKind {
    fn resolved_by(self, event: &ScriptEvent) -> bool {
        match (self, event) {
            (WaitKind::Dialogue, ScriptEvent::DialogueDismissed)
            | (WaitKind::Battle, ScriptEvent::BattleResolved) => true,
            (WaitKind::Movement(object_id), ScriptEvent::MovementFinished(finished)) => object_id == *finished,
            _ => false,
        }
    }
}

/// Runtime driver for one active map instance.
///
/// Each map instance owns its own current index; instances never share it,
/// though they all consult the single session-wide flag store. The engine is
/// re-entrant per instance and holds no references into the static data.
#[derive(Debug, Clone)]
pub struct MapScriptEngine {
    map: MapId,
    current: u32,
    waiting: Option<WaitKind>,
    resume: VecDeque<ScriptEffect>,
}

impl MapScriptEngine {
    /// Engine for `map`, idling at state 0.
    pub fn new(map: MapId) -> MapScriptEngine {
        MapScriptEngine::at_state(map, 0)
    }

    /// Engine restored at a specific state index (save/load path).
    pub fn at_state(map: MapId, index: u32) -> MapScriptEngine {
        MapScriptEngine {
            map,
            current: index,
            waiting: None,
            resume: VecDeque::new(),
        }
    }

    pub fn current_index(&self) -> u32 {
        self.current
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.is_some()
    }

    /// Drop any suspension and pending effects (session teardown). Flag
    /// mutations already applied are deliberately not rolled back.
    pub fn abandon(&mut self) {
        self.waiting = None;
        self.resume.clear();
    }

    /// Advance the state machine by one synchronous step.
    ///
    /// While suspended, only the matching acknowledgment event makes
    /// progress; anything else is ignored for this tick. Otherwise the
    /// current state's transitions are evaluated first-match and the target
    /// state's effects run to completion or to the next suspension point.
    pub fn step(&mut self, ctx: &mut EffectContext<'_>, event: Option<&ScriptEvent>) {
        if let Some(wait) = self.waiting {
            let acked = event.is_some_and(|e| wait.resolved_by(e));
            if !acked {
                return;
            }
            self.waiting = None;
            let queue = std::mem::take(&mut self.resume);
            self.run_effects(ctx, queue);
            return;
        }

        let Some(script) = ctx.world.script(&self.map) else {
            return;
        };
        let Some(state) = script.state(self.current) else {
            warn!(
                "{}",
                IntegrityError::UnknownScriptState {
                    map: self.map.clone(),
                    index: self.current,
                }
            );
            return;
        };

        let satisfied: Vec<&Transition> = state
            .transitions
            .iter()
            .filter(|t| t.guards.iter().all(|g| g.satisfied(ctx.flags, event)))
            .collect();
        if satisfied.len() > 1 {
            // data-authoring defect; first-match order keeps this deterministic
            warn!(
                "state conflict on '{}' state {}: {} transition guards matched, taking the first",
                self.map,
                self.current,
                satisfied.len()
            );
        }
        let Some(transition) = satisfied.first() else {
            return;
        };

        self.enter_state(ctx, transition.to);
    }

    fn enter_state(&mut self, ctx: &mut EffectContext<'_>, index: u32) {
        self.current = index;
        let Some(effects) = ctx
            .world
            .script(&self.map)
            .and_then(|script| script.state(index))
            .map(|state| state.effects.iter().cloned().collect::<VecDeque<_>>())
        else {
            warn!(
                "{}",
                IntegrityError::UnknownScriptState {
                    map: self.map.clone(),
                    index,
                }
            );
            return;
        };
        self.run_effects(ctx, effects);
    }

    fn run_effects(&mut self, ctx: &mut EffectContext<'_>, mut queue: VecDeque<ScriptEffect>) {
        let mut jumps = 0;
        while let Some(effect) = queue.pop_front() {
            match dispatch_effect(&self.map, &effect, ctx) {
                EffectFlow::Continue => {},
                EffectFlow::Stop => return,
                EffectFlow::Wait(kind) => {
                    self.waiting = Some(kind);
                    self.resume = queue;
                    return;
                },
                EffectFlow::Jump(to) => {
                    jumps += 1;
                    if jumps > MAX_CHAINED_TRANSITIONS {
                        warn!(
                            "script on '{}' chained more than {MAX_CHAINED_TRANSITIONS} transitions, stopping",
                            self.map
                        );
                        return;
                    }
                    self.current = to;
                    let Some(state) = ctx.world.script(&self.map).and_then(|s| s.state(to)) else {
                        warn!(
                            "{}",
                            IntegrityError::UnknownScriptState {
                                map: self.map.clone(),
                                index: to,
                            }
                        );
                        return;
                    };
                    queue = state.effects.iter().cloned().collect();
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::EventFlagStore;
    use crate::session::EngineRequest;
    use crate::world::test_support::scripted_world;

    // scripted_world: PalletTown script with idle state 0, a cutscene state 1
    // entered on the "PalletExitNorth" trigger when EVENT_GOT_STARTER is
    // unset (dialogue + movement + set flag + return to 0), and a state 2
    // guarded on EVENT_GOT_STARTER that is never reachable from 0.

    fn harness() -> (crate::world::StaticWorld, EventFlagStore) {
        (scripted_world(), EventFlagStore::new())
    }

    #[test]
    fn idle_state_ignores_unrelated_events() {
        let (world, flags) = harness();
        let mut requests = VecDeque::new();
        let mut movements = Vec::new();
        let mut battle = None;
        let mut ctx = EffectContext {
            world: &world,
            flags: &flags,
            requests: &mut requests,
            movements: &mut movements,
            active_battle: &mut battle,
        };
        let mut engine = MapScriptEngine::new(MapId::from_raw("PalletTown"));

        engine.step(&mut ctx, None);
        assert_eq!(engine.current_index(), 0);
        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("SomeOtherGroup".into())));
        assert_eq!(engine.current_index(), 0);
        assert!(requests.is_empty());
    }

    #[test]
    fn trigger_event_enters_cutscene_and_suspends_on_dialogue() {
        let (world, flags) = harness();
        let mut requests = VecDeque::new();
        let mut movements = Vec::new();
        let mut battle = None;
        let mut ctx = EffectContext {
            world: &world,
            flags: &flags,
            requests: &mut requests,
            movements: &mut movements,
            active_battle: &mut battle,
        };
        let mut engine = MapScriptEngine::new(MapId::from_raw("PalletTown"));

        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("PalletExitNorth".into())));
        assert_eq!(engine.current_index(), 1);
        assert!(engine.is_waiting());
        assert!(matches!(requests.front(), Some(EngineRequest::Dialogue { .. })));
    }

    #[test]
    fn acknowledgment_resumes_and_cutscene_returns_to_idle() {
        let (world, flags) = harness();
        let mut requests = VecDeque::new();
        let mut movements = Vec::new();
        let mut battle = None;
        let mut ctx = EffectContext {
            world: &world,
            flags: &flags,
            requests: &mut requests,
            movements: &mut movements,
            active_battle: &mut battle,
        };
        let mut engine = MapScriptEngine::new(MapId::from_raw("PalletTown"));

        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("PalletExitNorth".into())));
        // parked on dialogue; a stray trigger event must not unpark it
        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("PalletExitNorth".into())));
        assert!(engine.is_waiting());

        engine.step(&mut ctx, Some(&ScriptEvent::DialogueDismissed));
        // now parked on the movement playback
        assert!(engine.is_waiting());
        assert_eq!(ctx.movements.len(), 1);

        engine.step(&mut ctx, Some(&ScriptEvent::MovementFinished(2)));
        assert!(!engine.is_waiting());
        assert_eq!(engine.current_index(), 0);
        assert!(ctx.flags.check("EVENT_GOT_STARTER"));
    }

    #[test]
    fn movement_wait_ignores_other_objects_finishing() {
        let (world, flags) = harness();
        let mut requests = VecDeque::new();
        let mut movements = Vec::new();
        let mut battle = None;
        let mut ctx = EffectContext {
            world: &world,
            flags: &flags,
            requests: &mut requests,
            movements: &mut movements,
            active_battle: &mut battle,
        };
        let mut engine = MapScriptEngine::new(MapId::from_raw("PalletTown"));

        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("PalletExitNorth".into())));
        engine.step(&mut ctx, Some(&ScriptEvent::DialogueDismissed));
        // parked on object 2's playback; another NPC finishing must not unpark
        assert!(engine.is_waiting());
        engine.step(&mut ctx, Some(&ScriptEvent::MovementFinished(7)));
        assert!(engine.is_waiting());
        assert_eq!(engine.current_index(), 1);

        engine.step(&mut ctx, Some(&ScriptEvent::MovementFinished(2)));
        assert!(!engine.is_waiting());
        assert_eq!(engine.current_index(), 0);
    }

    #[test]
    fn flag_guard_suppresses_replay() {
        let (world, flags) = harness();
        flags.set("EVENT_GOT_STARTER");
        let mut requests = VecDeque::new();
        let mut movements = Vec::new();
        let mut battle = None;
        let mut ctx = EffectContext {
            world: &world,
            flags: &flags,
            requests: &mut requests,
            movements: &mut movements,
            active_battle: &mut battle,
        };
        let mut engine = MapScriptEngine::new(MapId::from_raw("PalletTown"));

        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("PalletExitNorth".into())));
        assert_eq!(engine.current_index(), 0, "guarded transition must not fire again");
        assert!(requests.is_empty());
    }

    #[test]
    fn abandon_clears_suspension_without_rolling_back_flags() {
        let (world, flags) = harness();
        let mut requests = VecDeque::new();
        let mut movements = Vec::new();
        let mut battle = None;
        let mut ctx = EffectContext {
            world: &world,
            flags: &flags,
            requests: &mut requests,
            movements: &mut movements,
            active_battle: &mut battle,
        };
        let mut engine = MapScriptEngine::new(MapId::from_raw("PalletTown"));
        engine.step(&mut ctx, Some(&ScriptEvent::TriggerFired("PalletExitNorth".into())));
        assert!(engine.is_waiting());

        engine.abandon();
        assert!(!engine.is_waiting());
        // the session may later re-enter state machinery normally
        engine.step(&mut ctx, Some(&ScriptEvent::DialogueDismissed));
        assert_eq!(engine.current_index(), 1);
    }
}
