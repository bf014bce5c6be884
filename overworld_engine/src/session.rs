//! A playable session over one loaded world.
//!
//! The [`Session`] owns every piece of mutable state: player map/position,
//! the event-flag store, per-map script engines, running NPC movements, the
//! pending request queue, and the seeded RNG. The static world is shared
//! behind an `Arc` so many sessions can run over one loaded dataset.
//!
//! The engine pushes [`EngineRequest`]s outward and the embedding client
//! acknowledges them back ([`Session::acknowledge_dialogue`],
//! [`Session::resolve_battle`]); rendering, input, and battle simulation all
//! live on the client side of that boundary.

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use variantly::Variantly;

use crate::dialogue::DialogueResolver;
use crate::encounter::{EncounterGenerator, EncounterKind, GameVersion};
use crate::error::IntegrityError;
use crate::flags::{EventFlagStore, FlagSnapshot};
use crate::map::{Direction, MapId};
use crate::movement::NpcMovementPlayer;
use crate::script::{EffectContext, MapScriptEngine, ScriptEvent, build_battle_request};
use crate::trainer::{PartyMember, TrainerSightDetector};
use crate::trigger::CoordinateTriggerEvaluator;
use crate::warp::{WarpKind, WarpResolver, WarpTransit};
use crate::world::{HiddenContent, MapObject, ObjectKind, StaticWorld};

/// What the player is standing on, supplied by the client per step. Tile
/// terrain lives in the map renderer's data, not in the extracted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Plain,
    Grass,
    Water,
}

/// Outcome of one attempted player step.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum StepOutcome {
    /// Moved within the current map.
    Moved,
    /// Facing turned but the tile ahead was blocked or out of bounds.
    Blocked,
    /// A warp fired; the player is now on the destination map.
    Warped(MapId),
    /// Walked off an overworld edge onto the connected neighbor.
    CrossedEdge(MapId),
}

/// Work the engine needs the embedding client to perform.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum EngineRequest {
    Dialogue {
        text: String,
    },
    TrainerBattle {
        class: String,
        base_money: u32,
        party: Vec<PartyMember>,
        object_id: u8,
    },
    WildBattle {
        species: String,
        level: u32,
    },
    ItemReceived {
        item: String,
    },
    CoinsReceived {
        amount: u32,
    },
}

/// The trainer whose battle is outstanding; resolved by
/// [`Session::resolve_battle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerRef {
    pub object_id: u8,
    pub header_index: u32,
}

/// One map object with its session overlays applied, for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectView {
    pub object_id: u8,
    pub x: u32,
    pub y: u32,
    /// Trainer whose beaten-flag is set.
    pub defeated: bool,
    /// Item pickup already collected this session.
    pub collected: bool,
}

/// Per-tick client snapshot: where the player is and what the renderer
/// should draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub map: MapId,
    pub position: (u32, u32),
    pub facing: Direction,
    pub objects: Vec<ObjectView>,
    pub pending_requests: usize,
}

/// Client-reported result of a requested battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

/// Serializable saved-game state. Suspended cutscenes and outstanding
/// requests are deliberately not captured: a session abandons them at the
/// save boundary and replays cleanly from the persistent state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub map: MapId,
    pub position: (u32, u32),
    pub facing: Direction,
    pub previous_map: Option<MapId>,
    pub flags: FlagSnapshot,
    pub script_states: BTreeMap<MapId, u32>,
    pub hidden_collected: BTreeSet<(MapId, u32, u32)>,
    pub version: GameVersion,
    pub seed: u64,
    pub lead_level: u32,
    pub repel_steps: u32,
}

/// One live playthrough.
#[derive(Debug)]
pub struct Session {
    world: Arc<StaticWorld>,
    flags: EventFlagStore,
    map: MapId,
    position: (u32, u32),
    facing: Direction,
    previous_map: Option<MapId>,
    engines: BTreeMap<MapId, MapScriptEngine>,
    movements: Vec<NpcMovementPlayer>,
    active_battle: Option<TrainerRef>,
    /// Trainer walking toward the player; engages once the approach ends.
    approaching: Option<TrainerRef>,
    requests: VecDeque<EngineRequest>,
    hidden_collected: BTreeSet<(MapId, u32, u32)>,
    rng: StdRng,
    seed: u64,
    version: GameVersion,
    lead_level: u32,
    repel_steps: u32,
}

impl Session {
    /// Start a fresh session at a spawn tile.
    ///
    /// # Errors
    /// Returns [`IntegrityError::UnknownMap`] when the spawn map does not
    /// exist in the loaded world.
    pub fn new(
        world: Arc<StaticWorld>,
        start: &MapId,
        position: (u32, u32),
        version: GameVersion,
        seed: u64,
    ) -> Result<Session, IntegrityError> {
        if world.map(start).is_none() {
            return Err(IntegrityError::UnknownMap(start.to_string()));
        }
        info!("session started on '{start}' at {position:?} (seed {seed})");
        Ok(Session {
            world,
            flags: EventFlagStore::new(),
            map: start.clone(),
            position,
            facing: Direction::Down,
            previous_map: None,
            engines: BTreeMap::new(),
            movements: Vec::new(),
            active_battle: None,
            approaching: None,
            requests: VecDeque::new(),
            hidden_collected: BTreeSet::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            version,
            lead_level: 1,
            repel_steps: 0,
        })
    }

    pub fn map(&self) -> &MapId {
        &self.map
    }

    pub fn position(&self) -> (u32, u32) {
        self.position
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn flags(&self) -> &EventFlagStore {
        &self.flags
    }

    /// Level of the lead party member, used by the Repel suppression rule.
    pub fn set_lead_level(&mut self, level: u32) {
        self.lead_level = level;
    }

    /// Activate a Repel for `steps` player steps.
    pub fn apply_repel(&mut self, steps: u32) {
        self.repel_steps = steps;
    }

    pub fn repel_active(&self) -> bool {
        self.repel_steps > 0
    }

    /// Drain the outward-facing request queue.
    pub fn drain_requests(&mut self) -> Vec<EngineRequest> {
        self.requests.drain(..).collect()
    }

    /// Current state index of the active map's script, 0 when unscripted.
    pub fn script_state(&self) -> u32 {
        self.engines.get(&self.map).map_or(0, MapScriptEngine::current_index)
    }

    /// Advance one frame with no player input: run NPC movement playback and
    /// give the active map's script a chance to take flag-guarded
    /// transitions.
    pub fn tick(&mut self) {
        let mut finished = Vec::new();
        for movement in &mut self.movements {
            movement.tick();
            if movement.is_finished() {
                finished.push(movement.object_id());
            }
        }
        if finished.is_empty() {
            self.drive_script(None);
            return;
        }
        self.movements.retain(|m| !m.is_finished());
        for object_id in finished {
            self.drive_script(Some(&ScriptEvent::MovementFinished(object_id)));
            if let Some(trainer) = self.approaching.take_if(|t| t.object_id == object_id) {
                // the approach walk is over; the trainer engages
                self.engage_trainer(trainer.object_id, trainer.header_index);
            }
        }
    }

    /// Attempt one player step.
    ///
    /// Order of evaluation after a successful move: warp, coordinate
    /// trigger, trainer sight, wild encounter. A warp consumes the step
    /// entirely; a step that starts a battle never also rolls an encounter.
    pub fn step_player(&mut self, direction: Direction, terrain: Terrain) -> StepOutcome {
        self.facing = direction;
        // the player is held in place during a battle or an approach walk
        if self.active_battle.is_some() || self.approaching.is_some() {
            return StepOutcome::Blocked;
        }

        let Some(map) = self.world.map(&self.map) else {
            warn!("{}", IntegrityError::UnknownMap(self.map.to_string()));
            return StepOutcome::Blocked;
        };
        let (dx, dy) = direction.delta();
        let (x, y) = self.position;
        let tx = i64::from(x) + dx;
        let ty = i64::from(y) + dy;

        let in_bounds = match (u32::try_from(tx), u32::try_from(ty)) {
            (Ok(tx), Ok(ty)) => map.contains(tx, ty).then_some((tx, ty)),
            _ => None,
        };
        let Some((tx, ty)) = in_bounds else {
            let outcome = self.leave_bounds(direction);
            if outcome != StepOutcome::Blocked {
                self.repel_steps = self.repel_steps.saturating_sub(1);
            }
            return outcome;
        };
        if self.world.object_blocks(&self.map, tx, ty, 0) {
            return StepOutcome::Blocked;
        }
        self.position = (tx, ty);
        // repel burns down only on steps actually taken
        self.repel_steps = self.repel_steps.saturating_sub(1);

        if let Some(transit) =
            WarpResolver::new(&self.world).resolve(&self.map, tx, ty, direction, self.previous_map.as_ref())
        {
            self.previous_map = Some(self.map.clone());
            self.map = transit.dest.clone();
            self.position = transit.arrival;
            return StepOutcome::Warped(transit.dest);
        }

        let trigger = CoordinateTriggerEvaluator::new(&self.world)
            .evaluate(&self.map, tx, ty)
            .map(str::to_string);
        let event = trigger.map(ScriptEvent::TriggerFired);
        self.drive_script(event.as_ref());

        self.check_trainer_sight();
        if self.active_battle.is_none() && self.approaching.is_none() && self.requests.is_empty() {
            self.roll_encounter(terrain);
        }
        StepOutcome::Moved
    }

    /// Examine the tile the player faces: signs, NPCs, trainers, and item
    /// pickups. Returns false when nothing was there to interact with.
    pub fn interact(&mut self) -> bool {
        let (dx, dy) = self.facing.delta();
        let tx = i64::from(self.position.0) + dx;
        let ty = i64::from(self.position.1) + dy;
        let (Ok(tx), Ok(ty)) = (u32::try_from(tx), u32::try_from(ty)) else {
            return false;
        };
        let Some(object) = self.world.object_at(&self.map, tx, ty).cloned() else {
            return false;
        };
        self.interact_with(&object)
    }

    fn interact_with(&mut self, object: &MapObject) -> bool {
        match &object.kind {
            ObjectKind::Sign { text_constant } | ObjectKind::Npc { text_constant, .. } => {
                self.push_dialogue_for_constant(text_constant);
                true
            },
            ObjectKind::Trainer { header_index, .. } => {
                self.engage_trainer(object.object_id, *header_index);
                true
            },
            ObjectKind::ItemPickup { item, event_flag } => {
                if self.flags.check(event_flag) {
                    return false;
                }
                self.flags.set(event_flag);
                self.requests.push_back(EngineRequest::ItemReceived { item: item.clone() });
                true
            },
        }
    }

    /// Search the player's own tile for a hidden object. Each hidden object
    /// yields exactly once per session.
    pub fn search(&mut self) -> bool {
        let (x, y) = self.position;
        let key = (self.map.clone(), x, y);
        if self.hidden_collected.contains(&key) {
            return false;
        }
        let Some(content) = self.world.hidden_at(&self.map, x, y) else {
            return false;
        };
        let request = match content {
            HiddenContent::Item(item) => EngineRequest::ItemReceived { item: item.clone() },
            HiddenContent::Coins(amount) => EngineRequest::CoinsReceived { amount: *amount },
        };
        self.hidden_collected.insert(key);
        self.requests.push_back(request);
        true
    }

    /// Client acknowledgment that dialogue was dismissed; resumes any
    /// script suspended on it.
    pub fn acknowledge_dialogue(&mut self) {
        self.drive_script(Some(&ScriptEvent::DialogueDismissed));
    }

    /// Client-reported battle result.
    ///
    /// A trainer victory permanently sets the trainer's event flag and
    /// surfaces the post-battle dialogue. Defeat leaves the flag unset, so
    /// the trainer re-engages on the next sighting or interaction.
    pub fn resolve_battle(&mut self, outcome: BattleOutcome) {
        if let Some(trainer) = self.active_battle.take()
            && outcome == BattleOutcome::Victory
        {
            match self.world.trainer_header(&self.map, trainer.header_index) {
                Some(header) => {
                    self.flags.set(&header.event_flag);
                    self.push_dialogue_for_label(&header.end_text.clone());
                },
                None => warn!(
                    "{}",
                    IntegrityError::DanglingTrainerHeader {
                        map: self.map.clone(),
                        index: trainer.header_index,
                    }
                ),
            }
        }
        self.drive_script(Some(&ScriptEvent::BattleResolved));
    }

    /// Drop suspended cutscenes, running movements, and queued requests.
    /// Called at the save boundary; persistent state is untouched.
    pub fn abandon_pending(&mut self) {
        for engine in self.engines.values_mut() {
            engine.abandon();
        }
        self.movements.clear();
        self.active_battle = None;
        self.approaching = None;
        self.requests.clear();
    }

    /// Build the per-tick client snapshot with overlays applied.
    pub fn view(&self) -> ViewSnapshot {
        let objects = self
            .world
            .objects_on(&self.map)
            .iter()
            .map(|object| {
                let defeated = match &object.kind {
                    ObjectKind::Trainer { header_index, .. } => self
                        .world
                        .trainer_header(&self.map, *header_index)
                        .is_some_and(|h| self.flags.check(&h.event_flag)),
                    _ => false,
                };
                let collected = match &object.kind {
                    ObjectKind::ItemPickup { event_flag, .. } => self.flags.check(event_flag),
                    _ => false,
                };
                ObjectView {
                    object_id: object.object_id,
                    x: object.x,
                    y: object.y,
                    defeated,
                    collected,
                }
            })
            .collect();
        ViewSnapshot {
            map: self.map.clone(),
            position: self.position,
            facing: self.facing,
            objects,
            pending_requests: self.requests.len(),
        }
    }

    /// Capture the persistent session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            map: self.map.clone(),
            position: self.position,
            facing: self.facing,
            previous_map: self.previous_map.clone(),
            flags: self.flags.snapshot(),
            script_states: self
                .engines
                .iter()
                .map(|(map, engine)| (map.clone(), engine.current_index()))
                .collect(),
            hidden_collected: self.hidden_collected.clone(),
            version: self.version,
            seed: self.seed,
            lead_level: self.lead_level,
            repel_steps: self.repel_steps,
        }
    }

    /// Rebuild a session from a snapshot over the same (or an equivalent)
    /// loaded world.
    ///
    /// # Errors
    /// Returns [`IntegrityError::UnknownMap`] when the saved map is missing
    /// from the loaded world.
    pub fn restore(world: Arc<StaticWorld>, snapshot: &SessionSnapshot) -> Result<Session, IntegrityError> {
        let mut session = Session::new(world, &snapshot.map, snapshot.position, snapshot.version, snapshot.seed)?;
        session.facing = snapshot.facing;
        session.previous_map = snapshot.previous_map.clone();
        session.flags.restore(&snapshot.flags);
        session.engines = snapshot
            .script_states
            .iter()
            .map(|(map, index)| (map.clone(), MapScriptEngine::at_state(map.clone(), *index)))
            .collect();
        session.hidden_collected = snapshot.hidden_collected.clone();
        session.lead_level = snapshot.lead_level;
        session.repel_steps = snapshot.repel_steps;
        Ok(session)
    }

    /// Stepping off the map boundary: an edge carpet warp under the player
    /// fires first (exit mats sit on the boundary row), then an overworld
    /// edge connection, otherwise the step is blocked.
    fn leave_bounds(&mut self, direction: Direction) -> StepOutcome {
        if let Some(transit) = self.exit_warp(direction) {
            self.previous_map = Some(self.map.clone());
            self.map = transit.dest.clone();
            self.position = transit.arrival;
            return StepOutcome::Warped(transit.dest);
        }
        self.cross_edge(direction)
    }

    fn exit_warp(&self, direction: Direction) -> Option<WarpTransit> {
        let (x, y) = self.position;
        let warp = self.world.warp_at(&self.map, x, y)?;
        if !matches!(warp.kind, WarpKind::Carpet(required) if required == direction) {
            return None;
        }
        WarpResolver::new(&self.world).resolve(&self.map, x, y, direction, self.previous_map.as_ref())
    }

    fn cross_edge(&mut self, direction: Direction) -> StepOutcome {
        let Some(neighbor) = self.world.map(&self.map).and_then(|m| m.neighbor(direction)).cloned() else {
            return StepOutcome::Blocked;
        };
        let Some(dest) = self.world.map(&neighbor) else {
            warn!("{}", IntegrityError::UnknownMap(neighbor.to_string()));
            return StepOutcome::Blocked;
        };
        let (x, y) = self.position;
        self.position = match direction {
            Direction::Up => (x.min(dest.width.saturating_sub(1)), dest.height.saturating_sub(1)),
            Direction::Down => (x.min(dest.width.saturating_sub(1)), 0),
            Direction::Left => (dest.width.saturating_sub(1), y.min(dest.height.saturating_sub(1))),
            Direction::Right => (0, y.min(dest.height.saturating_sub(1))),
        };
        self.previous_map = Some(self.map.clone());
        self.map = neighbor.clone();
        StepOutcome::CrossedEdge(neighbor)
    }

    /// First undefeated trainer whose sight line reaches the player engages
    /// exclusively; further trainers wait for a later step. A distant
    /// trainer first walks the sight line toward the player; engagement
    /// happens once that approach movement completes (see [`Session::tick`]).
    fn check_trainer_sight(&mut self) {
        if self.active_battle.is_some() || self.approaching.is_some() {
            return;
        }
        let Some(sight) = TrainerSightDetector::new(&self.world).scan(&self.map, self.position, &self.flags) else {
            return;
        };
        self.drive_script(Some(&ScriptEvent::TrainerSighted(sight.object_id)));
        if self.active_battle.is_some() {
            return;
        }
        if sight.distance <= 1 {
            self.engage_trainer(sight.object_id, sight.header_index);
            return;
        }
        let Some(step) = Self::direction_toward(sight.trainer_at, self.position) else {
            return;
        };
        let approach = vec![step; usize::try_from(sight.distance - 1).unwrap_or(0)];
        self.movements.push(NpcMovementPlayer::new(sight.object_id, &approach));
        self.approaching = Some(TrainerRef {
            object_id: sight.object_id,
            header_index: sight.header_index,
        });
    }

    /// Queue the trainer's challenge dialogue and battle request, or the
    /// after-battle line when the trainer is already beaten.
    fn engage_trainer(&mut self, object_id: u8, header_index: u32) {
        let Some(header) = self.world.trainer_header(&self.map, header_index).cloned() else {
            warn!(
                "{}",
                IntegrityError::DanglingTrainerHeader {
                    map: self.map.clone(),
                    index: header_index,
                }
            );
            return;
        };
        if self.flags.check(&header.event_flag) {
            self.push_dialogue_for_label(&header.after_text);
            return;
        }
        self.push_dialogue_for_label(&header.battle_text);

        let map = self.map.clone();
        let ctx = EffectContext {
            world: &self.world,
            flags: &self.flags,
            requests: &mut self.requests,
            movements: &mut self.movements,
            active_battle: &mut self.active_battle,
        };
        if let Some((request, trainer)) = build_battle_request(&map, object_id, &ctx) {
            self.requests.push_back(request);
            self.active_battle = Some(trainer);
        }
    }

    fn roll_encounter(&mut self, terrain: Terrain) {
        let kind = match terrain {
            Terrain::Plain => return,
            Terrain::Grass => EncounterKind::Grass,
            Terrain::Water => EncounterKind::Water,
        };
        let generator = EncounterGenerator::new(&self.world, self.version);
        if let Some(found) = generator.roll(&self.map, kind, self.lead_level, self.repel_active(), &mut self.rng) {
            self.requests.push_back(EngineRequest::WildBattle {
                species: found.species,
                level: found.level,
            });
        }
    }

    fn push_dialogue_for_constant(&mut self, text_constant: &str) {
        match DialogueResolver::new(&self.world).resolve(&self.map, text_constant) {
            Ok(text) => self.requests.push_back(EngineRequest::Dialogue { text: text.to_string() }),
            Err(err) => warn!("interaction dialogue on '{}' degraded to no-op: {err}", self.map),
        }
    }

    fn push_dialogue_for_label(&mut self, label: &str) {
        match DialogueResolver::new(&self.world).by_label(label) {
            Ok(text) => self.requests.push_back(EngineRequest::Dialogue { text: text.to_string() }),
            Err(err) => warn!("dialogue label on '{}' degraded to no-op: {err}", self.map),
        }
    }

    /// Axis direction from one tile toward a colinear other, if distinct.
    fn direction_toward(from: (u32, u32), to: (u32, u32)) -> Option<Direction> {
        match (to.0.cmp(&from.0), to.1.cmp(&from.1)) {
            (std::cmp::Ordering::Greater, _) => Some(Direction::Right),
            (std::cmp::Ordering::Less, _) => Some(Direction::Left),
            (_, std::cmp::Ordering::Greater) => Some(Direction::Down),
            (_, std::cmp::Ordering::Less) => Some(Direction::Up),
            _ => None,
        }
    }

    fn drive_script(&mut self, event: Option<&ScriptEvent>) {
        let engine = self
            .engines
            .entry(self.map.clone())
            .or_insert_with(|| MapScriptEngine::new(self.map.clone()));
        let mut ctx = EffectContext {
            world: &self.world,
            flags: &self.flags,
            requests: &mut self.requests,
            movements: &mut self.movements,
            active_battle: &mut self.active_battle,
        };
        engine.step(&mut ctx, event);
    }
}
