//! Warp resolution.
//!
//! Warps are point-to-point teleports between maps (doors, stairs, cave
//! mouths). A warp record is declared one-directional, but the destination
//! map's own warp list carries the return entry, so travel behaves
//! bidirectionally. The `LastMap` sentinel ("return to previous map") is
//! resolved against the session's one-slot previous-map memory; Gen-1
//! semantics never nest deeper than one level.

use log::warn;
use serde::{Deserialize, Serialize};

use overworld_data::{WarpDef, WarpKindDef, WarpTargetDef};

use crate::error::IntegrityError;
use crate::map::{Direction, MapId};
use crate::world::StaticWorld;

/// How a warp tile activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarpKind {
    /// Fires as soon as the player steps on the tile.
    Door,
    /// Fires only when the player steps while facing the given edge.
    Carpet(Direction),
}

/// Warp destination as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarpTarget {
    Map(MapId),
    LastMap,
}

/// One warp record, keyed by (map, x, y) and by (map, warp index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warp {
    pub index: u32,
    pub x: u32,
    pub y: u32,
    pub target: WarpTarget,
    pub dest_warp_index: u32,
    pub kind: WarpKind,
}

impl Warp {
    pub fn from_def(def: &WarpDef) -> Warp {
        Warp {
            index: def.warp_index,
            x: def.x,
            y: def.y,
            target: match &def.dest {
                WarpTargetDef::Map(name) => WarpTarget::Map(MapId::from_raw(name)),
                WarpTargetDef::LastMap => WarpTarget::LastMap,
            },
            dest_warp_index: def.dest_warp_index,
            kind: match def.kind {
                WarpKindDef::Door => WarpKind::Door,
                WarpKindDef::Carpet { facing } => WarpKind::Carpet(facing.into()),
            },
        }
    }
}

/// A resolved warp transit: where the player ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpTransit {
    pub dest: MapId,
    pub dest_warp_index: u32,
    pub arrival: (u32, u32),
}

/// Pure lookup over the static warp tables. Resolution never does positional
/// arithmetic: multiple physically distinct tiles may share one destination.
#[derive(Debug, Clone, Copy)]
pub struct WarpResolver<'a> {
    world: &'a StaticWorld,
}

impl<'a> WarpResolver<'a> {
    pub fn new(world: &'a StaticWorld) -> WarpResolver<'a> {
        WarpResolver { world }
    }

    /// Resolve stepping onto (x, y) on `map` while facing `facing`.
    ///
    /// `previous_map` is the session's remembered previous map, consulted
    /// only for the `LastMap` sentinel. Returns `None` for a plain tile, a
    /// carpet warp activated without matching facing, or any data-integrity
    /// failure (logged; the player simply does not move).
    pub fn resolve(
        &self,
        map: &MapId,
        x: u32,
        y: u32,
        facing: Direction,
        previous_map: Option<&MapId>,
    ) -> Option<WarpTransit> {
        let warp = self.world.warp_at(map, x, y)?;
        if let WarpKind::Carpet(required) = warp.kind
            && facing != required
        {
            return None;
        }

        let dest = match &warp.target {
            WarpTarget::Map(id) => id.clone(),
            WarpTarget::LastMap => match previous_map {
                Some(id) => id.clone(),
                None => {
                    warn!("{}", IntegrityError::NoPreviousMap { map: map.clone() });
                    return None;
                },
            },
        };

        match self.locate(&dest, warp.dest_warp_index) {
            Some(arrival) => Some(WarpTransit {
                dest,
                dest_warp_index: warp.dest_warp_index,
                arrival,
            }),
            None => {
                warn!(
                    "{}",
                    IntegrityError::DanglingWarpEntry {
                        map: dest,
                        index: warp.dest_warp_index,
                    }
                );
                None
            },
        }
    }

    /// Tile of warp `index` on `map`, used to place the player on arrival.
    pub fn locate(&self, map: &MapId, index: u32) -> Option<(u32, u32)> {
        self.world.warp_entry(map, index).map(|warp| (warp.x, warp.y))
    }
}
