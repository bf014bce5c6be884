//! Coordinate triggers.
//!
//! A coordinate trigger fires when the player's position exactly matches a
//! registered tile; this is distinct from trainer sight, which is
//! line-of-sight based. One trigger group may cover several tiles, but each
//! tile belongs to at most one group (enforced at validation).

use crate::map::MapId;
use crate::world::StaticWorld;

/// Exact-tile trigger lookup for the active map.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateTriggerEvaluator<'a> {
    world: &'a StaticWorld,
}

impl<'a> CoordinateTriggerEvaluator<'a> {
    pub fn new(world: &'a StaticWorld) -> CoordinateTriggerEvaluator<'a> {
        CoordinateTriggerEvaluator { world }
    }

    /// Trigger group label for (x, y) on `map`, if one is registered.
    ///
    /// Whether the group actually runs is decided by the map's script state
    /// machine; any flag-based suppression lives in its transition guards.
    pub fn evaluate(&self, map: &MapId, x: u32, y: u32) -> Option<&'a str> {
        self.world.trigger_at(map, x, y)
    }
}
