//! Map identity and geometry.
//!
//! The extracted tables refer to maps in two coexisting conventions: a
//! CamelCase label ("PalletTown") and an UPPER_SNAKE constant
//! ("PALLET_TOWN"). [`MapId`] normalizes both to one internal key at load
//! time; the textual forms are retained on [`Map`] as display aliases only.

use serde::{Deserialize, Serialize};
use std::fmt;

use overworld_data::{ConnectionsDef, FacingDef, MapDef, normalize_map_key};

/// Normalized internal map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(String);

impl MapId {
    /// Build an id from either naming convention.
    pub fn from_raw(raw: &str) -> MapId {
        MapId(normalize_map_key(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player/NPC facing and step direction. Also indexes edge connections
/// (Up = north side, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Tile delta of one step in this direction. Y grows downward, as in the
    /// source map data.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl From<FacingDef> for Direction {
    fn from(def: FacingDef) -> Direction {
        match def {
            FacingDef::Up => Direction::Up,
            FacingDef::Down => Direction::Down,
            FacingDef::Left => Direction::Left,
            FacingDef::Right => Direction::Right,
        }
    }
}

/// Edge-to-edge adjacency between overworld maps. Distinct from warps: no
/// warp records are consulted and the previous-map sentinel never applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connections {
    pub north: Option<MapId>,
    pub south: Option<MapId>,
    pub east: Option<MapId>,
    pub west: Option<MapId>,
}

impl Connections {
    pub fn from_def(def: &ConnectionsDef) -> Connections {
        let id = |name: &Option<String>| name.as_deref().map(MapId::from_raw);
        Connections {
            north: id(&def.north),
            south: id(&def.south),
            east: id(&def.east),
            west: id(&def.west),
        }
    }

    pub fn toward(&self, direction: Direction) -> Option<&MapId> {
        match direction {
            Direction::Up => self.north.as_ref(),
            Direction::Down => self.south.as_ref(),
            Direction::Left => self.west.as_ref(),
            Direction::Right => self.east.as_ref(),
        }
    }
}

/// One immutable map record, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Map {
    pub id: MapId,
    /// CamelCase display alias.
    pub name: String,
    /// UPPER_SNAKE display alias.
    pub constant: String,
    pub width: u32,
    pub height: u32,
    pub is_overworld: bool,
    pub connections: Connections,
}

impl Map {
    pub fn from_def(def: &MapDef) -> Map {
        Map {
            id: MapId::from_raw(&def.name),
            name: def.name.clone(),
            constant: def.constant.clone(),
            width: def.width,
            height: def.height,
            is_overworld: def.is_overworld,
            connections: Connections::from_def(&def.connections),
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Map reached by walking off the boundary in `direction`, if any.
    /// Only overworld maps connect edge-to-edge.
    pub fn neighbor(&self, direction: Direction) -> Option<&MapId> {
        if self.is_overworld {
            self.connections.toward(direction)
        } else {
            None
        }
    }
}
