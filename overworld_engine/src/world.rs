//! Read-only typed access to the extracted tables.
//!
//! [`StaticWorld`] is built once by the loader and never mutated afterward;
//! it needs no synchronization and can be shared freely across sessions and
//! map instances. All runtime state (flags, overlays, script indices) lives
//! in the session, never here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use overworld_data::{HiddenContentDef, ObjectDef, ObjectKindDef};

use crate::encounter::{EncounterKind, EncounterTable};
use crate::map::{Direction, Map, MapId};
use crate::script::MapScript;
use crate::trainer::{PartyMember, TrainerClass, TrainerHeader};
use crate::warp::Warp;

/// A static map object: NPC, trainer, sign, or item pickup. Per-session
/// defeated/collected state overlays these records without mutating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapObject {
    pub object_id: u8,
    pub x: u32,
    pub y: u32,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Npc {
        text_constant: String,
        facing: Option<Direction>,
        movement: Option<String>,
    },
    Trainer {
        text_constant: String,
        facing: Direction,
        header_index: u32,
    },
    Sign {
        text_constant: String,
    },
    ItemPickup {
        item: String,
        event_flag: String,
    },
}

impl MapObject {
    pub fn from_def(def: &ObjectDef) -> MapObject {
        let kind = match &def.kind {
            ObjectKindDef::Npc {
                text_constant,
                facing,
                movement,
            } => ObjectKind::Npc {
                text_constant: text_constant.clone(),
                facing: facing.map(Into::into),
                movement: movement.clone(),
            },
            ObjectKindDef::Trainer {
                text_constant,
                facing,
                header_index,
            } => ObjectKind::Trainer {
                text_constant: text_constant.clone(),
                facing: (*facing).into(),
                header_index: *header_index,
            },
            ObjectKindDef::Sign { text_constant } => ObjectKind::Sign {
                text_constant: text_constant.clone(),
            },
            ObjectKindDef::ItemPickup { item, event_flag } => ObjectKind::ItemPickup {
                item: item.clone(),
                event_flag: event_flag.clone(),
            },
        };
        MapObject {
            object_id: def.object_id,
            x: def.x,
            y: def.y,
            kind,
        }
    }
}

/// Hidden pickup content at a searched tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiddenContent {
    Item(String),
    Coins(u32),
}

impl HiddenContent {
    pub fn from_def(def: &HiddenContentDef) -> HiddenContent {
        match def {
            HiddenContentDef::Item { item } => HiddenContent::Item(item.clone()),
            HiddenContentDef::Coins { amount } => HiddenContent::Coins(*amount),
        }
    }
}

/// Immutable world data, loaded once at session-factory startup.
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    pub(crate) maps: HashMap<MapId, Map>,
    pub(crate) objects: HashMap<MapId, Vec<MapObject>>,
    pub(crate) warps_by_tile: HashMap<(MapId, u32, u32), Warp>,
    pub(crate) warps_by_index: HashMap<(MapId, u32), Warp>,
    pub(crate) triggers: HashMap<(MapId, u32, u32), String>,
    pub(crate) scripts: HashMap<MapId, MapScript>,
    pub(crate) movements: HashMap<(MapId, String), Vec<Direction>>,
    pub(crate) trainer_classes: HashMap<String, TrainerClass>,
    pub(crate) trainer_parties: HashMap<(String, u32), Vec<PartyMember>>,
    pub(crate) trainer_headers: HashMap<(MapId, u32), TrainerHeader>,
    pub(crate) encounters: HashMap<(MapId, EncounterKind), EncounterTable>,
    pub(crate) dialogue: HashMap<String, String>,
    pub(crate) text_pointers: HashMap<(MapId, String), String>,
    pub(crate) hidden: HashMap<(MapId, u32, u32), HiddenContent>,
}

impl StaticWorld {
    pub fn map(&self, id: &MapId) -> Option<&Map> {
        self.maps.get(id)
    }

    /// Lookup by either textual naming convention.
    pub fn map_by_raw(&self, raw: &str) -> Option<&Map> {
        self.maps.get(&MapId::from_raw(raw))
    }

    pub fn maps(&self) -> impl Iterator<Item = &Map> {
        self.maps.values()
    }

    pub fn objects_on(&self, map: &MapId) -> &[MapObject] {
        self.objects.get(map).map_or(&[], Vec::as_slice)
    }

    pub fn object(&self, map: &MapId, object_id: u8) -> Option<&MapObject> {
        self.objects_on(map).iter().find(|o| o.object_id == object_id)
    }

    pub fn object_at(&self, map: &MapId, x: u32, y: u32) -> Option<&MapObject> {
        self.objects_on(map).iter().find(|o| o.x == x && o.y == y)
    }

    /// True when a tile is occupied by an object other than `skip_id`.
    pub fn object_blocks(&self, map: &MapId, x: u32, y: u32, skip_id: u8) -> bool {
        self.objects_on(map)
            .iter()
            .any(|o| o.object_id != skip_id && o.x == x && o.y == y)
    }

    pub fn warp_at(&self, map: &MapId, x: u32, y: u32) -> Option<&Warp> {
        self.warps_by_tile.get(&(map.clone(), x, y))
    }

    pub fn warp_entry(&self, map: &MapId, index: u32) -> Option<&Warp> {
        self.warps_by_index.get(&(map.clone(), index))
    }

    pub fn trigger_at(&self, map: &MapId, x: u32, y: u32) -> Option<&str> {
        self.triggers.get(&(map.clone(), x, y)).map(String::as_str)
    }

    pub fn script(&self, map: &MapId) -> Option<&MapScript> {
        self.scripts.get(map)
    }

    pub fn movement(&self, map: &MapId, label: &str) -> Option<&[Direction]> {
        self.movements
            .get(&(map.clone(), label.to_string()))
            .map(Vec::as_slice)
    }

    pub fn trainer_class(&self, constant: &str) -> Option<&TrainerClass> {
        self.trainer_classes.get(constant)
    }

    pub fn trainer_party(&self, class_constant: &str, party_index: u32) -> Option<&[PartyMember]> {
        self.trainer_parties
            .get(&(class_constant.to_string(), party_index))
            .map(Vec::as_slice)
    }

    pub fn trainer_header(&self, map: &MapId, header_index: u32) -> Option<&TrainerHeader> {
        self.trainer_headers.get(&(map.clone(), header_index))
    }

    pub fn encounter_table(&self, map: &MapId, kind: EncounterKind) -> Option<&EncounterTable> {
        self.encounters.get(&(map.clone(), kind))
    }

    pub fn dialogue(&self, label: &str) -> Option<&str> {
        self.dialogue.get(label).map(String::as_str)
    }

    pub fn text_pointer(&self, map: &MapId, text_constant: &str) -> Option<&str> {
        self.text_pointers
            .get(&(map.clone(), text_constant.to_string()))
            .map(String::as_str)
    }

    pub fn hidden_at(&self, map: &MapId, x: u32, y: u32) -> Option<&HiddenContent> {
        self.hidden.get(&(map.clone(), x, y))
    }
}

/// Fixture worlds shared by the unit tests across modules. Built through the
/// public loader path so the fixtures double as loader coverage.
#[cfg(test)]
pub mod test_support {
    use overworld_data::{
        ConnectionsDef, CoordTriggerDef, DialogueDef, EncounterKindDef, EncounterSlotDef, EncounterTableDef,
        FacingDef, GuardDef, MapDef, MapScriptDef, MovementDef, ObjectDef, ObjectKindDef, PartyMemberDef,
        ScriptEffectDef, ScriptStateDef, TextPointerDef, TrainerClassDef, TrainerHeaderDef, TrainerPartyDef,
        TransitionDef, WarpDef, WarpKindDef, WarpTargetDef, WorldDef,
    };

    use crate::loader::build_world;
    use crate::world::StaticWorld;

    pub fn map_def(name: &str, constant: &str, width: u32, height: u32, is_overworld: bool) -> MapDef {
        MapDef {
            name: name.into(),
            constant: constant.into(),
            width,
            height,
            is_overworld,
            connections: ConnectionsDef::default(),
        }
    }

    /// PalletTown plus RedsHouse1F, wired with a door/carpet warp pair, a
    /// two-tile coordinate trigger group, a sign, and dialogue tables.
    pub fn two_house_world() -> StaticWorld {
        let mut def = WorldDef::default();
        let mut pallet = map_def("PalletTown", "PALLET_TOWN", 20, 18, true);
        pallet.connections = ConnectionsDef {
            north: Some("Route1".into()),
            ..ConnectionsDef::default()
        };
        def.maps.push(pallet);
        def.maps.push(map_def("RedsHouse1F", "REDS_HOUSE_1F", 8, 8, false));
        def.maps.push(map_def("Route1", "ROUTE_1", 20, 36, true));

        def.warps.push(WarpDef {
            map: "PalletTown".into(),
            warp_index: 0,
            x: 5,
            y: 5,
            dest: WarpTargetDef::Map("RedsHouse1F".into()),
            dest_warp_index: 1,
            kind: WarpKindDef::Door,
        });
        def.warps.push(WarpDef {
            map: "RedsHouse1F".into(),
            warp_index: 1,
            x: 2,
            y: 7,
            dest: WarpTargetDef::LastMap,
            dest_warp_index: 0,
            kind: WarpKindDef::Carpet { facing: FacingDef::Down },
        });

        for x in [10, 11] {
            def.coordinate_triggers.push(CoordTriggerDef {
                map: "PalletTown".into(),
                label: "PalletExitNorth".into(),
                x,
                y: 1,
            });
        }

        def.objects.push(ObjectDef {
            map: "PalletTown".into(),
            object_id: 1,
            x: 13,
            y: 9,
            kind: ObjectKindDef::Sign {
                text_constant: "TEXT_PALLETTOWN_SIGN".into(),
            },
        });

        def.dialogue.push(DialogueDef {
            label: "PalletTownSignText".into(),
            text: "PALLET TOWN\nShades of your journey await!".into(),
        });
        def.text_pointers.push(TextPointerDef {
            map: "PalletTown".into(),
            text_constant: "TEXT_PALLETTOWN_SIGN".into(),
            dialogue_label: "PalletTownSignText".into(),
        });
        // deliberately broken link for degradation tests
        def.text_pointers.push(TextPointerDef {
            map: "PalletTown".into(),
            text_constant: "TEXT_PALLETTOWN_DANGLING".into(),
            dialogue_label: "NoSuchLabel".into(),
        });

        build_world_unchecked(def)
    }

    /// Route 1 / Route 22 encounter fixture. Route 1 carries the documented
    /// grass table (slot 1 = level-3 PIDGEY); Route 22 has red/blue slot
    /// collisions for version-policy tests; PalletTown has a zero-rate table.
    pub fn route_1_world() -> StaticWorld {
        let mut def = WorldDef::default();
        def.maps.push(map_def("PalletTown", "PALLET_TOWN", 20, 18, true));
        def.maps.push(map_def("Route1", "ROUTE_1", 20, 36, true));
        def.maps.push(map_def("Route22", "ROUTE_22", 40, 18, true));

        let route_1_slots = [
            (1, "PIDGEY", 3),
            (2, "RATTATA", 3),
            (3, "RATTATA", 3),
            (4, "RATTATA", 2),
            (5, "PIDGEY", 2),
            (6, "PIDGEY", 3),
            (7, "PIDGEY", 3),
            (8, "RATTATA", 4),
            (9, "RATTATA", 4),
            (10, "PIDGEY", 5),
        ];
        def.encounter_tables.push(EncounterTableDef {
            map: "Route1".into(),
            kind: EncounterKindDef::Grass,
            rate: 25,
            slots: route_1_slots
                .iter()
                .map(|(slot_index, species, level)| EncounterSlotDef {
                    slot_index: *slot_index,
                    species: (*species).into(),
                    level: *level,
                    version: overworld_data::VersionTagDef::Both,
                })
                .collect(),
        });

        let mut route_22_slots: Vec<EncounterSlotDef> = (1..=10)
            .map(|slot_index| EncounterSlotDef {
                slot_index,
                species: "RATTATA".into(),
                level: 3,
                version: overworld_data::VersionTagDef::Both,
            })
            .collect();
        route_22_slots[0] = EncounterSlotDef {
            slot_index: 1,
            species: "EKANS".into(),
            level: 6,
            version: overworld_data::VersionTagDef::Red,
        };
        route_22_slots.push(EncounterSlotDef {
            slot_index: 1,
            species: "SANDSHREW".into(),
            level: 6,
            version: overworld_data::VersionTagDef::Blue,
        });
        def.encounter_tables.push(EncounterTableDef {
            map: "Route22".into(),
            kind: EncounterKindDef::Grass,
            rate: 255,
            slots: route_22_slots,
        });

        def.encounter_tables.push(EncounterTableDef {
            map: "PalletTown".into(),
            kind: EncounterKindDef::Grass,
            rate: 0,
            slots: vec![],
        });

        build_world_unchecked(def)
    }

    /// CeruleanGym with Misty (object 1, sight range 3, facing Down), a
    /// statue NPC (object 2) inside her sight line at (4, 4), and a Swimmer
    /// (object 3) with sight range 0.
    pub fn gym_world() -> StaticWorld {
        let mut def = WorldDef::default();
        def.maps.push(map_def("CeruleanGym", "CERULEAN_GYM", 10, 14, false));

        def.trainer_classes.push(TrainerClassDef {
            constant: "OPP_LEADER".into(),
            display_name: "Leader".into(),
            base_money: 99,
        });
        def.trainer_classes.push(TrainerClassDef {
            constant: "OPP_SWIMMER".into(),
            display_name: "Swimmer".into(),
            base_money: 5,
        });
        def.trainer_parties.push(TrainerPartyDef {
            class_constant: "OPP_LEADER".into(),
            party_index: 1,
            members: vec![
                PartyMemberDef {
                    species: "STARYU".into(),
                    level: 18,
                },
                PartyMemberDef {
                    species: "STARMIE".into(),
                    level: 21,
                },
            ],
        });
        def.trainer_parties.push(TrainerPartyDef {
            class_constant: "OPP_SWIMMER".into(),
            party_index: 1,
            members: vec![PartyMemberDef {
                species: "HORSEA".into(),
                level: 16,
            }],
        });

        def.trainer_headers.push(TrainerHeaderDef {
            map: "CeruleanGym".into(),
            header_index: 0,
            class_constant: "OPP_LEADER".into(),
            party_index: 1,
            event_flag: "EVENT_BEAT_MISTY".into(),
            sight_range: 3,
            battle_text: "MistyBattleText".into(),
            end_text: "MistyEndText".into(),
            after_text: "MistyAfterText".into(),
        });
        def.trainer_headers.push(TrainerHeaderDef {
            map: "CeruleanGym".into(),
            header_index: 1,
            class_constant: "OPP_SWIMMER".into(),
            party_index: 1,
            event_flag: "EVENT_BEAT_CERULEAN_SWIMMER".into(),
            sight_range: 0,
            battle_text: "SwimmerBattleText".into(),
            end_text: "SwimmerEndText".into(),
            after_text: "SwimmerAfterText".into(),
        });

        def.objects.push(ObjectDef {
            map: "CeruleanGym".into(),
            object_id: 1,
            x: 4,
            y: 2,
            kind: ObjectKindDef::Trainer {
                text_constant: "TEXT_MISTY".into(),
                facing: FacingDef::Down,
                header_index: 0,
            },
        });
        def.objects.push(ObjectDef {
            map: "CeruleanGym".into(),
            object_id: 2,
            x: 4,
            y: 4,
            kind: ObjectKindDef::Npc {
                text_constant: "TEXT_GYM_STATUE".into(),
                facing: None,
                movement: None,
            },
        });
        def.objects.push(ObjectDef {
            map: "CeruleanGym".into(),
            object_id: 3,
            x: 1,
            y: 2,
            kind: ObjectKindDef::Trainer {
                text_constant: "TEXT_SWIMMER".into(),
                facing: FacingDef::Right,
                header_index: 1,
            },
        });

        for (label, text) in [
            ("MistyBattleText", "I'm Misty! My policy is an all-out offensive!"),
            ("MistyEndText", "TOO BAD! You're just too much!"),
            ("MistyAfterText", "The CASCADEBADGE makes all POKeMON up to L30 obey!"),
            ("SwimmerBattleText", "Splash!"),
            ("SwimmerEndText", "Glub..."),
            ("SwimmerAfterText", "Swimming is great exercise."),
        ] {
            def.dialogue.push(DialogueDef {
                label: label.into(),
                text: text.into(),
            });
        }

        build_world_unchecked(def)
    }

    /// Route 9 with a Hiker (object 1, sight range 3, facing Down) standing
    /// over tall grass with a maxed encounter rate, for battle-exclusivity
    /// tests where sight and wild rolls compete on the same step.
    pub fn ambush_world() -> StaticWorld {
        let mut def = WorldDef::default();
        def.maps.push(map_def("Route9", "ROUTE_9", 20, 18, true));

        def.trainer_classes.push(TrainerClassDef {
            constant: "OPP_HIKER".into(),
            display_name: "Hiker".into(),
            base_money: 35,
        });
        def.trainer_parties.push(TrainerPartyDef {
            class_constant: "OPP_HIKER".into(),
            party_index: 1,
            members: vec![PartyMemberDef {
                species: "GEODUDE".into(),
                level: 17,
            }],
        });
        def.trainer_headers.push(TrainerHeaderDef {
            map: "Route9".into(),
            header_index: 0,
            class_constant: "OPP_HIKER".into(),
            party_index: 1,
            event_flag: "EVENT_BEAT_ROUTE_9_HIKER".into(),
            sight_range: 3,
            battle_text: "HikerBattleText".into(),
            end_text: "HikerEndText".into(),
            after_text: "HikerAfterText".into(),
        });
        def.objects.push(ObjectDef {
            map: "Route9".into(),
            object_id: 1,
            x: 4,
            y: 2,
            kind: ObjectKindDef::Trainer {
                text_constant: "TEXT_HIKER".into(),
                facing: FacingDef::Down,
                header_index: 0,
            },
        });
        for (label, text) in [
            ("HikerBattleText", "I like shorts! They're comfy and easy to wear!"),
            ("HikerEndText", "Ow!"),
            ("HikerAfterText", "Shorts are all-season wear."),
        ] {
            def.dialogue.push(DialogueDef {
                label: label.into(),
                text: text.into(),
            });
        }

        def.encounter_tables.push(EncounterTableDef {
            map: "Route9".into(),
            kind: EncounterKindDef::Grass,
            rate: 255,
            slots: (1..=10)
                .map(|slot_index| EncounterSlotDef {
                    slot_index,
                    species: "SPEAROW".into(),
                    level: 13,
                    version: overworld_data::VersionTagDef::Both,
                })
                .collect(),
        });

        build_world_unchecked(def)
    }

    /// PalletTown with a scripted cutscene: state 0 idles; the north-exit
    /// trigger (while EVENT_GOT_STARTER is unset) enters state 1, which
    /// shows Oak's dialogue, plays a movement for object 2, sets the flag,
    /// and cycles back to 0. State 2 exists only as a guard target.
    pub fn scripted_world() -> StaticWorld {
        let mut def = WorldDef::default();
        def.maps.push(map_def("PalletTown", "PALLET_TOWN", 20, 18, true));

        for x in [10, 11] {
            def.coordinate_triggers.push(CoordTriggerDef {
                map: "PalletTown".into(),
                label: "PalletExitNorth".into(),
                x,
                y: 1,
            });
        }

        def.objects.push(ObjectDef {
            map: "PalletTown".into(),
            object_id: 2,
            x: 11,
            y: 5,
            kind: ObjectKindDef::Npc {
                text_constant: "TEXT_PALLETTOWN_OAK".into(),
                facing: Some(FacingDef::Up),
                movement: None,
            },
        });

        def.dialogue.push(DialogueDef {
            label: "OakWarningText".into(),
            text: "OAK: Hey! Wait!\nDon't go out!".into(),
        });
        def.text_pointers.push(TextPointerDef {
            map: "PalletTown".into(),
            text_constant: "TEXT_PALLETTOWN_OAK".into(),
            dialogue_label: "OakWarningText".into(),
        });

        def.movements.push(MovementDef {
            map: "PalletTown".into(),
            label: "OakApproachMovement".into(),
            steps: vec![FacingDef::Down, FacingDef::Down, FacingDef::Right],
        });

        def.map_scripts.push(MapScriptDef {
            map: "PalletTown".into(),
            states: vec![
                ScriptStateDef {
                    index: 0,
                    label: "PalletTownScript0".into(),
                    transitions: vec![TransitionDef {
                        to: 1,
                        guards: vec![
                            GuardDef::TriggerFired {
                                label: "PalletExitNorth".into(),
                            },
                            GuardDef::FlagUnset {
                                flag: "EVENT_GOT_STARTER".into(),
                            },
                        ],
                    }],
                    effects: vec![],
                },
                ScriptStateDef {
                    index: 1,
                    label: "PalletTownScript1".into(),
                    transitions: vec![],
                    effects: vec![
                        ScriptEffectDef::ShowDialogue {
                            text_constant: "TEXT_PALLETTOWN_OAK".into(),
                        },
                        ScriptEffectDef::PlayMovement {
                            object_id: 2,
                            label: "OakApproachMovement".into(),
                        },
                        ScriptEffectDef::SetFlag {
                            flag: "EVENT_GOT_STARTER".into(),
                        },
                        ScriptEffectDef::Transition { to: 0 },
                    ],
                },
                ScriptStateDef {
                    index: 2,
                    label: "PalletTownScript2".into(),
                    transitions: vec![],
                    effects: vec![],
                },
            ],
        });

        build_world_unchecked(def)
    }

    fn build_world_unchecked(def: WorldDef) -> StaticWorld {
        build_world(&def).expect("fixture world should build")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::two_house_world;

    #[test]
    fn map_lookup_accepts_both_conventions() {
        let world = two_house_world();
        let by_name = world.map_by_raw("PalletTown").unwrap();
        let by_constant = world.map_by_raw("PALLET_TOWN").unwrap();
        assert_eq!(by_name.id, by_constant.id);
        assert_eq!(by_name.name, "PalletTown");
        assert_eq!(by_name.constant, "PALLET_TOWN");
    }

    #[test]
    fn objects_on_unknown_map_is_empty() {
        let world = two_house_world();
        assert!(world.objects_on(&MapId::from_raw("CinnabarIsland")).is_empty());
    }

    #[test]
    fn object_blocks_skips_the_named_object() {
        let world = two_house_world();
        let pallet = MapId::from_raw("PalletTown");
        assert!(world.object_blocks(&pallet, 13, 9, 0));
        assert!(!world.object_blocks(&pallet, 13, 9, 1));
        assert!(!world.object_blocks(&pallet, 0, 0, 0));
    }
}
