//! Trainer data and line-of-sight battle detection.
//!
//! A trainer is an NPC object augmented with a class, a party, a sight
//! range, an "already beaten" event flag, and three dialogue states. Once
//! the flag is set the trainer is permanently defeated: sight detection
//! skips it and interaction surfaces the after-battle dialogue instead.

use log::warn;
use serde::{Deserialize, Serialize};

use overworld_data::{PartyMemberDef, TrainerClassDef, TrainerHeaderDef};

use crate::error::IntegrityError;
use crate::flags::EventFlagStore;
use crate::map::{Direction, MapId};
use crate::world::{ObjectKind, StaticWorld};

/// Trainer class metadata (display name, prize money).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerClass {
    pub constant: String,
    pub display_name: String,
    pub base_money: u32,
}

impl TrainerClass {
    pub fn from_def(def: &TrainerClassDef) -> TrainerClass {
        TrainerClass {
            constant: def.constant.clone(),
            display_name: def.display_name.clone(),
            base_money: def.base_money,
        }
    }
}

/// One party member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    pub species: String,
    pub level: u32,
}

impl PartyMember {
    pub fn from_def(def: &PartyMemberDef) -> PartyMember {
        PartyMember {
            species: def.species.clone(),
            level: def.level,
        }
    }
}

/// Battle metadata attached to one trainer object on a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerHeader {
    pub header_index: u32,
    pub class_constant: String,
    pub party_index: u32,
    pub event_flag: String,
    pub sight_range: u32,
    pub battle_text: String,
    pub end_text: String,
    pub after_text: String,
}

impl TrainerHeader {
    pub fn from_def(def: &TrainerHeaderDef) -> TrainerHeader {
        TrainerHeader {
            header_index: def.header_index,
            class_constant: def.class_constant.clone(),
            party_index: def.party_index,
            event_flag: def.event_flag.clone(),
            sight_range: def.sight_range,
            battle_text: def.battle_text.clone(),
            end_text: def.end_text.clone(),
            after_text: def.after_text.clone(),
        }
    }
}

/// An undefeated trainer has spotted the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightEvent {
    pub object_id: u8,
    pub header_index: u32,
    /// Trainer's tile, for the approach walk.
    pub trainer_at: (u32, u32),
    /// Tiles between trainer and player (1 = already adjacent).
    pub distance: u32,
}

/// Line-of-sight evaluation, run once per player tile-step.
#[derive(Debug, Clone, Copy)]
pub struct TrainerSightDetector<'a> {
    world: &'a StaticWorld,
}

impl<'a> TrainerSightDetector<'a> {
    pub fn new(world: &'a StaticWorld) -> TrainerSightDetector<'a> {
        TrainerSightDetector { world }
    }

    /// Scan the active map for a trainer that sees the player.
    ///
    /// Battle requests are exclusive: the first trainer (in object order)
    /// whose line of sight reaches the player wins, and no further trainers
    /// are considered for this step.
    pub fn scan(&self, map: &MapId, player: (u32, u32), flags: &EventFlagStore) -> Option<SightEvent> {
        for object in self.world.objects_on(map) {
            let ObjectKind::Trainer { facing, header_index, .. } = &object.kind else {
                continue;
            };
            let Some(header) = self.world.trainer_header(map, *header_index) else {
                warn!(
                    "{}",
                    IntegrityError::DanglingTrainerHeader {
                        map: map.clone(),
                        index: *header_index,
                    }
                );
                continue;
            };
            if header.sight_range == 0 || flags.check(&header.event_flag) {
                continue;
            }
            let Some(distance) = in_sight((object.x, object.y), *facing, player, header.sight_range) else {
                continue;
            };
            if self.line_is_blocked(map, (object.x, object.y), *facing, distance, object.object_id) {
                continue;
            }
            return Some(SightEvent {
                object_id: object.object_id,
                header_index: *header_index,
                trainer_at: (object.x, object.y),
                distance,
            });
        }
        None
    }

    /// True when another object stands strictly between trainer and player.
    fn line_is_blocked(&self, map: &MapId, from: (u32, u32), facing: Direction, distance: u32, skip_id: u8) -> bool {
        let (dx, dy) = facing.delta();
        for step in 1..i64::from(distance) {
            let x = i64::from(from.0) + dx * step;
            let y = i64::from(from.1) + dy * step;
            let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };
            if self.world.object_blocks(map, x, y, skip_id) {
                return true;
            }
        }
        false
    }
}

/// Distance from trainer to player when the player stands within
/// `sight_range` tiles directly along `facing`; `None` otherwise.
fn in_sight(trainer: (u32, u32), facing: Direction, player: (u32, u32), sight_range: u32) -> Option<u32> {
    let (dx, dy) = facing.delta();
    let span_x = i64::from(player.0) - i64::from(trainer.0);
    let span_y = i64::from(player.1) - i64::from(trainer.1);
    let distance = match (dx, dy) {
        (0, _) if span_x == 0 && span_y.signum() == dy.signum() => span_y.unsigned_abs(),
        (_, 0) if span_y == 0 && span_x.signum() == dx.signum() => span_x.unsigned_abs(),
        _ => return None,
    };
    if distance == 0 || distance > u64::from(sight_range) {
        return None;
    }
    u32::try_from(distance).ok()
}
