use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::*;

/// Validation error for malformed or missing references in a [`WorldDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingReference { kind: &'static str, id: String, context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate cross-references and basic invariants in a [`WorldDef`].
///
/// Returns every problem found rather than stopping at the first, so the
/// extraction pipeline gets a complete report per run. An empty result means
/// the world is safe to load.
pub fn validate_world(world: &WorldDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let map_keys: HashSet<String> = world.maps.iter().map(|m| normalize_map_key(&m.name)).collect();
    let mut seen_maps = HashSet::new();
    for map in &world.maps {
        let key = normalize_map_key(&map.name);
        if normalize_map_key(&map.constant) != key {
            errors.push(ValidationError::InvalidValue {
                context: format!(
                    "map '{}' constant '{}' normalizes to a different key",
                    map.name, map.constant
                ),
            });
        }
        if !seen_maps.insert(key.clone()) {
            errors.push(ValidationError::DuplicateId { kind: "map", id: key });
        }
        if map.width == 0 || map.height == 0 {
            errors.push(ValidationError::InvalidValue {
                context: format!("map '{}' has zero dimension", map.name),
            });
        }
        for (side, neighbor) in [
            ("north", &map.connections.north),
            ("south", &map.connections.south),
            ("east", &map.connections.east),
            ("west", &map.connections.west),
        ] {
            if let Some(name) = neighbor {
                require_map(&map_keys, name, &format!("{side} connection of '{}'", map.name), &mut errors);
            }
        }
    }
    validate_warps(world, &map_keys, &mut errors);
    validate_triggers(world, &map_keys, &mut errors);
    validate_objects_and_trainers(world, &map_keys, &mut errors);
    validate_scripts(world, &map_keys, &mut errors);
    validate_encounters(world, &map_keys, &mut errors);
    validate_text(world, &map_keys, &mut errors);
    validate_hidden(world, &map_keys, &mut errors);

    errors
}

fn require_map(maps: &HashSet<String>, name: &str, context: &str, errors: &mut Vec<ValidationError>) {
    if !maps.contains(&normalize_map_key(name)) {
        errors.push(ValidationError::MissingReference {
            kind: "map",
            id: name.to_string(),
            context: context.to_string(),
        });
    }
}

fn validate_warps(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    // every map's warp list, keyed by index, for destination checks
    let mut by_map: HashMap<String, HashSet<u32>> = HashMap::new();
    for warp in &world.warps {
        require_map(maps, &warp.map, "warp source", errors);
        let indices = by_map.entry(normalize_map_key(&warp.map)).or_default();
        if !indices.insert(warp.warp_index) {
            errors.push(ValidationError::DuplicateId {
                kind: "warp index",
                id: format!("{}#{}", warp.map, warp.warp_index),
            });
        }
    }
    for warp in &world.warps {
        if let WarpTargetDef::Map(dest) = &warp.dest {
            require_map(maps, dest, &format!("warp destination from '{}'", warp.map), errors);
            let has_entry = by_map
                .get(&normalize_map_key(dest))
                .is_some_and(|indices| indices.contains(&warp.dest_warp_index));
            if !has_entry {
                errors.push(ValidationError::MissingReference {
                    kind: "warp destination index",
                    id: format!("{}#{}", dest, warp.dest_warp_index),
                    context: format!("warp from '{}' ({}, {})", warp.map, warp.x, warp.y),
                });
            }
        }
    }
}

fn validate_triggers(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    // at most one trigger group per tile
    let mut tiles = HashSet::new();
    for trigger in &world.coordinate_triggers {
        require_map(maps, &trigger.map, "coordinate trigger", errors);
        let tile = (normalize_map_key(&trigger.map), trigger.x, trigger.y);
        if !tiles.insert(tile) {
            errors.push(ValidationError::InvalidValue {
                context: format!(
                    "overlapping coordinate triggers at '{}' ({}, {})",
                    trigger.map, trigger.x, trigger.y
                ),
            });
        }
    }
}

fn validate_objects_and_trainers(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    let classes: HashSet<&str> = world.trainer_classes.iter().map(|c| c.constant.as_str()).collect();
    let parties: HashSet<(&str, u32)> = world
        .trainer_parties
        .iter()
        .map(|p| (p.class_constant.as_str(), p.party_index))
        .collect();
    let headers: HashSet<(String, u32)> = world
        .trainer_headers
        .iter()
        .map(|h| (normalize_map_key(&h.map), h.header_index))
        .collect();

    for header in &world.trainer_headers {
        require_map(maps, &header.map, "trainer header", errors);
        if !classes.contains(header.class_constant.as_str()) {
            errors.push(ValidationError::MissingReference {
                kind: "trainer class",
                id: header.class_constant.clone(),
                context: format!("trainer header {}#{}", header.map, header.header_index),
            });
        }
        if !parties.contains(&(header.class_constant.as_str(), header.party_index)) {
            errors.push(ValidationError::MissingReference {
                kind: "trainer party",
                id: format!("{}#{}", header.class_constant, header.party_index),
                context: format!("trainer header {}#{}", header.map, header.header_index),
            });
        }
    }

    for party in &world.trainer_parties {
        if !classes.contains(party.class_constant.as_str()) {
            errors.push(ValidationError::MissingReference {
                kind: "trainer class",
                id: party.class_constant.clone(),
                context: format!("trainer party #{}", party.party_index),
            });
        }
        if party.members.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("empty party {}#{}", party.class_constant, party.party_index),
            });
        }
    }

    let mut object_ids = HashSet::new();
    for object in &world.objects {
        require_map(maps, &object.map, "map object", errors);
        if !object_ids.insert((normalize_map_key(&object.map), object.object_id)) {
            errors.push(ValidationError::DuplicateId {
                kind: "object",
                id: format!("{}#{}", object.map, object.object_id),
            });
        }
        if let ObjectKindDef::Trainer { header_index, .. } = &object.kind
            && !headers.contains(&(normalize_map_key(&object.map), *header_index))
        {
            errors.push(ValidationError::MissingReference {
                kind: "trainer header",
                id: format!("{}#{}", object.map, header_index),
                context: format!("trainer object #{}", object.object_id),
            });
        }
    }
}

fn validate_scripts(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    let movements: HashSet<(String, &str)> = world
        .movements
        .iter()
        .map(|m| (normalize_map_key(&m.map), m.label.as_str()))
        .collect();
    let trainer_objects: HashSet<(String, u8)> = world
        .objects
        .iter()
        .filter(|o| matches!(o.kind, ObjectKindDef::Trainer { .. }))
        .map(|o| (normalize_map_key(&o.map), o.object_id))
        .collect();

    for movement in &world.movements {
        require_map(maps, &movement.map, "movement data", errors);
        if movement.steps.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("empty movement sequence '{}' on '{}'", movement.label, movement.map),
            });
        }
    }

    let mut scripted_maps = HashSet::new();
    for script in &world.map_scripts {
        require_map(maps, &script.map, "map script", errors);
        let key = normalize_map_key(&script.map);
        if !scripted_maps.insert(key.clone()) {
            errors.push(ValidationError::DuplicateId { kind: "map script", id: key.clone() });
        }

        let mut indices = HashSet::new();
        for state in &script.states {
            if !indices.insert(state.index) {
                errors.push(ValidationError::DuplicateId {
                    kind: "script state",
                    id: format!("{}#{}", script.map, state.index),
                });
            }
        }
        if !indices.contains(&0) {
            errors.push(ValidationError::InvalidValue {
                context: format!("map script '{}' has no idle state 0", script.map),
            });
        }

        for state in &script.states {
            for transition in &state.transitions {
                if !indices.contains(&transition.to) {
                    errors.push(ValidationError::MissingReference {
                        kind: "script state",
                        id: format!("{}#{}", script.map, transition.to),
                        context: format!("transition from state {}", state.index),
                    });
                }
            }
            for effect in &state.effects {
                match effect {
                    ScriptEffectDef::Transition { to } if !indices.contains(to) => {
                        errors.push(ValidationError::MissingReference {
                            kind: "script state",
                            id: format!("{}#{}", script.map, to),
                            context: format!("transition effect in state {}", state.index),
                        });
                    },
                    ScriptEffectDef::PlayMovement { label, .. }
                        if !movements.contains(&(key.clone(), label.as_str())) =>
                    {
                        errors.push(ValidationError::MissingReference {
                            kind: "movement",
                            id: label.clone(),
                            context: format!("state {} on '{}'", state.index, script.map),
                        });
                    },
                    ScriptEffectDef::RequestBattle { object_id }
                        if !trainer_objects.contains(&(key.clone(), *object_id)) =>
                    {
                        errors.push(ValidationError::MissingReference {
                            kind: "trainer object",
                            id: format!("{}#{}", script.map, object_id),
                            context: format!("battle request in state {}", state.index),
                        });
                    },
                    _ => {},
                }
            }
        }
    }
}

fn validate_encounters(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    let mut tables = HashSet::new();
    for table in &world.encounter_tables {
        require_map(maps, &table.map, "encounter table", errors);
        if !tables.insert((normalize_map_key(&table.map), table.kind)) {
            errors.push(ValidationError::DuplicateId {
                kind: "encounter table",
                id: format!("{}/{:?}", table.map, table.kind),
            });
        }
        let mut seen = HashSet::new();
        for slot in &table.slots {
            if slot.slot_index == 0 || slot.slot_index > 10 {
                errors.push(ValidationError::InvalidValue {
                    context: format!(
                        "slot index {} out of range on '{}' {:?} table",
                        slot.slot_index, table.map, table.kind
                    ),
                });
            }
            if !seen.insert((slot.slot_index, slot.version)) {
                errors.push(ValidationError::DuplicateId {
                    kind: "encounter slot",
                    id: format!("{}/{:?}#{}", table.map, table.kind, slot.slot_index),
                });
            }
        }
    }
}

fn validate_text(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    let labels: HashSet<&str> = world.dialogue.iter().map(|d| d.label.as_str()).collect();
    let mut pointers = HashSet::new();
    for pointer in &world.text_pointers {
        require_map(maps, &pointer.map, "text pointer", errors);
        if !pointers.insert((normalize_map_key(&pointer.map), pointer.text_constant.clone())) {
            errors.push(ValidationError::DuplicateId {
                kind: "text pointer",
                id: format!("{}/{}", pointer.map, pointer.text_constant),
            });
        }
        if !labels.contains(pointer.dialogue_label.as_str()) {
            errors.push(ValidationError::MissingReference {
                kind: "dialogue label",
                id: pointer.dialogue_label.clone(),
                context: format!("text pointer {} on '{}'", pointer.text_constant, pointer.map),
            });
        }
    }
}

fn validate_hidden(world: &WorldDef, maps: &HashSet<String>, errors: &mut Vec<ValidationError>) {
    let mut tiles = HashSet::new();
    for hidden in &world.hidden_objects {
        require_map(maps, &hidden.map, "hidden object", errors);
        if !tiles.insert((normalize_map_key(&hidden.map), hidden.x, hidden.y)) {
            errors.push(ValidationError::DuplicateId {
                kind: "hidden object",
                id: format!("{} ({}, {})", hidden.map, hidden.x, hidden.y),
            });
        }
    }
}
