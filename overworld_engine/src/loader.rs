//! Loader for building a [`StaticWorld`] from the serialized `WorldDef`.
//!
//! World content is deserialized from RON, validated, then converted into the
//! indexed runtime structures the engine queries every tick.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;

use overworld_data::WorldDef;

use crate::encounter::{EncounterKind, EncounterTable};
use crate::map::{Direction, Map, MapId};
use crate::script::MapScript;
use crate::trainer::{PartyMember, TrainerClass, TrainerHeader};
use crate::warp::Warp;
use crate::world::{HiddenContent, MapObject, StaticWorld};

/// Load and validate a `WorldDef` from a RON file, then build the runtime
/// world from it.
///
/// # Errors
/// Errors bubble up from file IO, deserialization, validation, or conversion.
pub fn load_world(path: &Path) -> Result<StaticWorld> {
    let worlddef = load_worlddef(path).context("while loading worlddef from file")?;
    validate_worlddef(&worlddef)?;
    let world = build_world(&worlddef).context("while building world from worlddef")?;
    info!("{} maps added to StaticWorld", world.maps.len());
    info!("{} warps added to StaticWorld", world.warps_by_index.len());
    info!("{} coordinate trigger tiles added to StaticWorld", world.triggers.len());
    info!("{} map scripts added to StaticWorld", world.scripts.len());
    info!("{} trainer headers added to StaticWorld", world.trainer_headers.len());
    info!("{} encounter tables added to StaticWorld", world.encounters.len());
    info!("{} dialogue entries added to StaticWorld", world.dialogue.len());
    Ok(world)
}

/// Load a `WorldDef` from a RON file.
pub fn load_worlddef(path: &Path) -> Result<WorldDef> {
    let text = fs::read_to_string(path).with_context(|| format!("reading worlddef from '{}'", path.display()))?;
    ron::from_str(&text).with_context(|| format!("parsing worlddef RON from '{}'", path.display()))
}

/// Validate the compiled `WorldDef` and return a single aggregated error.
fn validate_worlddef(def: &WorldDef) -> Result<()> {
    let errors = overworld_data::validate_world(def);
    if errors.is_empty() {
        return Ok(());
    }
    let details = errors
        .into_iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("worlddef validation failed:\n{details}");
}

/// Convert a `WorldDef` into an indexed [`StaticWorld`].
///
/// Conversion is purely structural; referential integrity is the validator's
/// job, so an unvalidated def with dangling references still builds and the
/// engine degrades at lookup time instead.
pub fn build_world(def: &WorldDef) -> Result<StaticWorld> {
    let mut world = StaticWorld::default();

    for map_def in &def.maps {
        let map = Map::from_def(map_def);
        world.maps.insert(map.id.clone(), map);
    }

    for object_def in &def.objects {
        let map_id = MapId::from_raw(&object_def.map);
        world
            .objects
            .entry(map_id)
            .or_default()
            .push(MapObject::from_def(object_def));
    }

    for warp_def in &def.warps {
        let map_id = MapId::from_raw(&warp_def.map);
        let warp = Warp::from_def(warp_def);
        world
            .warps_by_tile
            .insert((map_id.clone(), warp.x, warp.y), warp.clone());
        world.warps_by_index.insert((map_id, warp.index), warp);
    }

    for trigger_def in &def.coordinate_triggers {
        let map_id = MapId::from_raw(&trigger_def.map);
        world
            .triggers
            .insert((map_id, trigger_def.x, trigger_def.y), trigger_def.label.clone());
    }

    for script_def in &def.map_scripts {
        let map_id = MapId::from_raw(&script_def.map);
        world.scripts.insert(map_id, MapScript::from_def(script_def));
    }

    for movement_def in &def.movements {
        let map_id = MapId::from_raw(&movement_def.map);
        let steps: Vec<Direction> = movement_def.steps.iter().map(|s| (*s).into()).collect();
        world.movements.insert((map_id, movement_def.label.clone()), steps);
    }

    for class_def in &def.trainer_classes {
        let class = TrainerClass::from_def(class_def);
        world.trainer_classes.insert(class.constant.clone(), class);
    }

    for party_def in &def.trainer_parties {
        let members: Vec<PartyMember> = party_def.members.iter().map(PartyMember::from_def).collect();
        world
            .trainer_parties
            .insert((party_def.class_constant.clone(), party_def.party_index), members);
    }

    for header_def in &def.trainer_headers {
        let map_id = MapId::from_raw(&header_def.map);
        let header = TrainerHeader::from_def(header_def);
        world.trainer_headers.insert((map_id, header.header_index), header);
    }

    for table_def in &def.encounter_tables {
        let map_id = MapId::from_raw(&table_def.map);
        let kind = EncounterKind::from(table_def.kind);
        world
            .encounters
            .insert((map_id, kind), EncounterTable::from_def(table_def));
    }

    for dialogue_def in &def.dialogue {
        world
            .dialogue
            .insert(dialogue_def.label.clone(), dialogue_def.text.clone());
    }

    for pointer_def in &def.text_pointers {
        let map_id = MapId::from_raw(&pointer_def.map);
        world.text_pointers.insert(
            (map_id, pointer_def.text_constant.clone()),
            pointer_def.dialogue_label.clone(),
        );
    }

    for hidden_def in &def.hidden_objects {
        let map_id = MapId::from_raw(&hidden_def.map);
        world.hidden.insert(
            (map_id, hidden_def.x, hidden_def.y),
            HiddenContent::from_def(&hidden_def.content),
        );
    }

    Ok(world)
}
