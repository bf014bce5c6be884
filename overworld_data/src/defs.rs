use serde::{Deserialize, Serialize};

/// Raw map name as it appears in the extracted tables. Maps are referenced
/// by either their CamelCase label ("PalletTown") or their UPPER_SNAKE
/// constant ("PALLET_TOWN"); the engine normalizes both to one key at load.
pub type MapName = String;

/// Top-level extracted world data loaded by the engine.
///
/// One instance of this holds every normalized record emitted by the
/// extraction pipeline that the overworld engine consumes. It is immutable
/// once deserialized; all mutable session state lives in the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldDef {
    #[serde(default)]
    pub maps: Vec<MapDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
    #[serde(default)]
    pub warps: Vec<WarpDef>,
    #[serde(default)]
    pub coordinate_triggers: Vec<CoordTriggerDef>,
    #[serde(default)]
    pub map_scripts: Vec<MapScriptDef>,
    #[serde(default)]
    pub movements: Vec<MovementDef>,
    #[serde(default)]
    pub trainer_classes: Vec<TrainerClassDef>,
    #[serde(default)]
    pub trainer_parties: Vec<TrainerPartyDef>,
    #[serde(default)]
    pub trainer_headers: Vec<TrainerHeaderDef>,
    #[serde(default)]
    pub encounter_tables: Vec<EncounterTableDef>,
    #[serde(default)]
    pub dialogue: Vec<DialogueDef>,
    #[serde(default)]
    pub text_pointers: Vec<TextPointerDef>,
    #[serde(default)]
    pub hidden_objects: Vec<HiddenObjectDef>,
}

/// One overworld map: identity in both naming conventions, dimensions, and
/// optional edge-to-edge connections to adjacent maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDef {
    /// CamelCase label, e.g. "PalletTown".
    pub name: MapName,
    /// UPPER_SNAKE constant, e.g. "PALLET_TOWN".
    pub constant: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub is_overworld: bool,
    #[serde(default)]
    pub connections: ConnectionsDef,
}

/// Edge-to-edge adjacency (walk off one side, arrive on the neighbor).
/// Distinct from warps; only meaningful on overworld maps.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConnectionsDef {
    pub north: Option<MapName>,
    pub south: Option<MapName>,
    pub east: Option<MapName>,
    pub west: Option<MapName>,
}

/// Facing / step direction for NPCs and movement sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacingDef {
    Up,
    Down,
    Left,
    Right,
}

/// A static map object. Runtime visibility/defeated/collected state is kept
/// by the engine as an overlay; these records are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub map: MapName,
    /// Object index within the map (order of declaration in the source data).
    pub object_id: u8,
    pub x: u32,
    pub y: u32,
    pub kind: ObjectKindDef,
}

/// The three object variants plus trainers (NPCs augmented with battle data).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKindDef {
    Npc {
        text_constant: String,
        #[serde(default)]
        facing: Option<FacingDef>,
        /// Label of a scripted movement sequence, when one exists for this NPC.
        #[serde(default)]
        movement: Option<String>,
    },
    Trainer {
        text_constant: String,
        facing: FacingDef,
        /// Index into this map's trainer headers.
        header_index: u32,
    },
    Sign {
        text_constant: String,
    },
    ItemPickup {
        item: String,
        /// Flag set when the item has been collected (pickups are missable).
        event_flag: String,
    },
}

/// Warp activation style, classified from the original tile data: door warps
/// fire as soon as the player steps on the tile, carpet warps additionally
/// require directional input toward the given edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarpKindDef {
    Door,
    Carpet { facing: FacingDef },
}

/// Destination of a warp. `LastMap` is the "return to previous map" sentinel
/// used by interiors that can be entered from more than one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarpTargetDef {
    Map(MapName),
    LastMap,
}

/// One warp event: (map, x, y) -> (destination map, destination warp index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpDef {
    pub map: MapName,
    /// Index of this warp within its own map's warp list.
    pub warp_index: u32,
    pub x: u32,
    pub y: u32,
    pub dest: WarpTargetDef,
    pub dest_warp_index: u32,
    #[serde(default = "default_warp_kind")]
    pub kind: WarpKindDef,
}

fn default_warp_kind() -> WarpKindDef {
    WarpKindDef::Door
}

/// Coordinate trigger: stepping on (x, y) fires the named trigger group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordTriggerDef {
    pub map: MapName,
    pub label: String,
    pub x: u32,
    pub y: u32,
}

/// Per-map script state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapScriptDef {
    pub map: MapName,
    pub states: Vec<ScriptStateDef>,
}

/// One node of a map's state machine. Index 0 is the idle/default state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStateDef {
    pub index: u32,
    pub label: String,
    /// Guarded transitions, evaluated in declared order; first match wins.
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
    /// Effects run when the state is entered.
    #[serde(default)]
    pub effects: Vec<ScriptEffectDef>,
}

/// A directed edge of the state machine. All guards must hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDef {
    pub to: u32,
    #[serde(default)]
    pub guards: Vec<GuardDef>,
}

/// Predicates over the event-flag set and the event that fired this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardDef {
    FlagSet { flag: String },
    FlagUnset { flag: String },
    TriggerFired { label: String },
    TrainerSighted { object_id: u8 },
}

/// Closed instruction set for script state bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptEffectDef {
    SetFlag { flag: String },
    ResetFlag { flag: String },
    /// Abort the remaining effects unless the flag matches the expectation.
    FlagGuard { flag: String, expect_set: bool },
    ShowDialogue { text_constant: String },
    PlayMovement { object_id: u8, label: String },
    RequestBattle { object_id: u8 },
    Transition { to: u32 },
}

/// A scripted NPC movement sequence used during cutscenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementDef {
    pub map: MapName,
    pub label: String,
    pub steps: Vec<FacingDef>,
}

/// Trainer class (Youngster, Bug Catcher, ...) with display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerClassDef {
    pub constant: String,
    pub display_name: String,
    #[serde(default)]
    pub base_money: u32,
}

/// One trainer party: ordered (species, level) members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerPartyDef {
    pub class_constant: String,
    /// 1-based index into the class's party list, as in the source data.
    pub party_index: u32,
    pub members: Vec<PartyMemberDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMemberDef {
    pub species: String,
    pub level: u32,
}

/// Trainer header: battle metadata attached to a trainer object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerHeaderDef {
    pub map: MapName,
    pub header_index: u32,
    pub class_constant: String,
    pub party_index: u32,
    /// Flag set once this trainer has been beaten; never reset.
    pub event_flag: String,
    /// Tiles of line-of-sight; 0 disables sight battles entirely.
    pub sight_range: u32,
    pub battle_text: String,
    pub end_text: String,
    pub after_text: String,
}

/// Encounter category a table applies to. The Old Rod is absent on purpose:
/// its outcome is a fixed rule, not table data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncounterKindDef {
    Grass,
    Water,
    GoodRod,
    SuperRod,
}

/// Version tag on an encounter row (Red/Blue differ on some maps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionTagDef {
    Red,
    Blue,
    Both,
}

impl Default for VersionTagDef {
    fn default() -> Self {
        VersionTagDef::Both
    }
}

/// Per-(map, kind) wild encounter table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterTableDef {
    pub map: MapName,
    pub kind: EncounterKindDef,
    /// Compared against a uniform [0, 255] draw; 0 means no encounters.
    pub rate: u8,
    pub slots: Vec<EncounterSlotDef>,
}

/// One weighted slot of an encounter table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterSlotDef {
    /// 1-based slot position in the shared cumulative-probability table.
    pub slot_index: u8,
    pub species: String,
    pub level: u32,
    #[serde(default)]
    pub version: VersionTagDef,
}

/// A dialogue string keyed by its source label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueDef {
    pub label: String,
    pub text: String,
}

/// Maps a per-map TEXT_ constant to a dialogue label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPointerDef {
    pub map: MapName,
    pub text_constant: String,
    pub dialogue_label: String,
}

/// Hidden pickup content (found by searching a specific tile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HiddenContentDef {
    Item { item: String },
    Coins { amount: u32 },
}

/// A hidden item or coin stash at an exact tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenObjectDef {
    pub map: MapName,
    pub x: u32,
    pub y: u32,
    pub content: HiddenContentDef,
}

/// Normalize either map naming convention to one lowercase snake_case key.
///
/// "RedsHouse1F" and "REDS_HOUSE_1F" both normalize to "reds_house_1f".
/// Used by validation here and by the engine's `MapId` at load time, so that
/// convention conversion lives in exactly one place.
pub fn normalize_map_key(raw: &str) -> String {
    if raw.contains('_') || !raw.chars().any(char::is_lowercase) {
        return raw.to_ascii_lowercase();
    }
    let mut key = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;
    for ch in raw.chars() {
        let boundary = match prev {
            Some(p) => {
                (ch.is_ascii_uppercase() && p.is_ascii_lowercase())
                    || (ch.is_ascii_digit() && p.is_ascii_alphabetic())
            },
            None => false,
        };
        if boundary {
            key.push('_');
        }
        key.push(ch.to_ascii_lowercase());
        prev = Some(ch);
    }
    key
}
