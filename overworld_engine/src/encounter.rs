//! Wild encounter generation.
//!
//! Grass and water tables share one fixed 10-slot cumulative probability
//! distribution; each map supplies only the slot-indexed (species, level)
//! entries and an encounter rate. Fishing rods use narrower per-rod tables,
//! and the Old Rod is a fixed rule rather than table data.

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use overworld_data::{EncounterKindDef, EncounterSlotDef, EncounterTableDef, VersionTagDef};

use crate::error::IntegrityError;
use crate::map::MapId;
use crate::world::StaticWorld;

/// Shared cumulative slot boundaries, percent. Not present in any extracted
/// table; hard-coded from the probability data in the disassembly.
pub const SLOT_CUMULATIVE: [f64; 10] = [19.9, 39.8, 55.0, 64.8, 74.6, 84.4, 89.5, 94.6, 98.9, 100.0];

/// The Old Rod always hooks a level-5 MAGIKARP.
pub const OLD_ROD_SPECIES: &str = "MAGIKARP";
pub const OLD_ROD_LEVEL: u32 = 5;

/// Encounter category being rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterKind {
    Grass,
    Water,
    OldRod,
    GoodRod,
    SuperRod,
}

impl From<EncounterKindDef> for EncounterKind {
    fn from(def: EncounterKindDef) -> EncounterKind {
        match def {
            EncounterKindDef::Grass => EncounterKind::Grass,
            EncounterKindDef::Water => EncounterKind::Water,
            EncounterKindDef::GoodRod => EncounterKind::GoodRod,
            EncounterKindDef::SuperRod => EncounterKind::SuperRod,
        }
    }
}

/// Which game version's encounter rows participate.
///
/// `Merged` keeps rows from both versions; when red and blue rows collide on
/// the same slot, one of the two is picked uniformly at roll time, so each
/// colliding row gets half the slot's probability mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameVersion {
    Red,
    Blue,
    Merged,
}

/// Version tag on a single encounter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionTag {
    Red,
    Blue,
    Both,
}

impl From<VersionTagDef> for VersionTag {
    fn from(def: VersionTagDef) -> VersionTag {
        match def {
            VersionTagDef::Red => VersionTag::Red,
            VersionTagDef::Blue => VersionTag::Blue,
            VersionTagDef::Both => VersionTag::Both,
        }
    }
}

impl VersionTag {
    fn participates(self, version: GameVersion) -> bool {
        match (self, version) {
            (VersionTag::Both, _) | (_, GameVersion::Merged) => true,
            (VersionTag::Red, GameVersion::Red) | (VersionTag::Blue, GameVersion::Blue) => true,
            _ => false,
        }
    }
}

/// One weighted table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSlot {
    pub slot_index: u8,
    pub species: String,
    pub level: u32,
    pub version: VersionTag,
}

/// Per-(map, kind) encounter table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterTable {
    pub rate: u8,
    pub slots: Vec<EncounterSlot>,
}

impl EncounterTable {
    pub fn from_def(def: &EncounterTableDef) -> EncounterTable {
        EncounterTable {
            rate: def.rate,
            slots: def.slots.iter().map(EncounterSlot::from_def).collect(),
        }
    }
}

impl EncounterSlot {
    fn from_def(def: &EncounterSlotDef) -> EncounterSlot {
        EncounterSlot {
            slot_index: def.slot_index,
            species: def.species.clone(),
            level: def.level,
            version: def.version.into(),
        }
    }
}

/// A generated wild battle opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildEncounter {
    pub species: String,
    pub level: u32,
}

/// Probabilistic wild encounter selection over the static tables.
#[derive(Debug, Clone, Copy)]
pub struct EncounterGenerator<'a> {
    world: &'a StaticWorld,
    version: GameVersion,
}

impl<'a> EncounterGenerator<'a> {
    pub fn new(world: &'a StaticWorld, version: GameVersion) -> EncounterGenerator<'a> {
        EncounterGenerator { world, version }
    }

    /// Roll for a wild encounter on `map`.
    ///
    /// Returns `None` when the rate check fails, when the map has no table
    /// for `kind`, or when an active Repel suppresses a Pokémon weaker than
    /// the lead party member (no reroll for a stronger one).
    pub fn roll<R: Rng + ?Sized>(
        &self,
        map: &MapId,
        kind: EncounterKind,
        lead_level: u32,
        repel_active: bool,
        rng: &mut R,
    ) -> Option<WildEncounter> {
        let rolled = match kind {
            EncounterKind::OldRod => Some(WildEncounter {
                species: OLD_ROD_SPECIES.to_string(),
                level: OLD_ROD_LEVEL,
            }),
            _ => self.roll_table(map, kind, rng),
        };

        match rolled {
            Some(found) if repel_active && found.level < lead_level => None,
            other => other,
        }
    }

    fn roll_table<R: Rng + ?Sized>(&self, map: &MapId, kind: EncounterKind, rng: &mut R) -> Option<WildEncounter> {
        let table = self.world.encounter_table(map, kind)?;
        let rate_draw: u8 = rng.random();
        if rate_draw >= table.rate {
            return None;
        }

        let candidates: Vec<&EncounterSlot> = match kind {
            // grass and water walk the shared cumulative distribution
            EncounterKind::Grass | EncounterKind::Water => {
                let slot = Self::pick_slot(rng.random_range(0.0..100.0));
                let rows: Vec<&EncounterSlot> = table
                    .slots
                    .iter()
                    .filter(|s| s.slot_index == slot && s.version.participates(self.version))
                    .collect();
                if rows.is_empty() {
                    warn!("{}", IntegrityError::EmptyEncounterSlot { map: map.clone(), slot });
                    return None;
                }
                rows
            },
            // rod tables are uniform over their (narrower) slot set
            EncounterKind::GoodRod | EncounterKind::SuperRod => {
                let rows: Vec<&EncounterSlot> = table
                    .slots
                    .iter()
                    .filter(|s| s.version.participates(self.version))
                    .collect();
                if rows.is_empty() {
                    return None;
                }
                vec![rows[rng.random_range(0..rows.len())]]
            },
            EncounterKind::OldRod => unreachable!("old rod never consults a table"),
        };

        let chosen = if candidates.len() == 1 {
            candidates[0]
        } else {
            // merged-version slot collision: uniform over the colliding rows
            candidates[rng.random_range(0..candidates.len())]
        };
        Some(WildEncounter {
            species: chosen.species.clone(),
            level: chosen.level,
        })
    }

    /// Map a percent draw in [0, 100) to a 1-based slot index.
    fn pick_slot(draw: f64) -> u8 {
        for (i, boundary) in SLOT_CUMULATIVE.iter().enumerate() {
            if draw < *boundary {
                return u8::try_from(i + 1).unwrap_or(10)
            }
        }
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::route_1_world;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn cumulative_table_sums_to_one_hundred() {
        assert!((SLOT_CUMULATIVE[9] - 100.0).abs() < f64::EPSILON);
        for pair in SLOT_CUMULATIVE.windows(2) {
            assert!(pair[0] < pair[1], "boundaries must be strictly increasing");
        }
    }

    #[test]
    fn pick_slot_respects_boundaries() {
        assert_eq!(EncounterGenerator::pick_slot(0.0), 1);
        assert_eq!(EncounterGenerator::pick_slot(19.8), 1);
        assert_eq!(EncounterGenerator::pick_slot(19.9), 2);
        assert_eq!(EncounterGenerator::pick_slot(99.9), 10);
    }

    #[test]
    fn roll_never_leaves_the_queried_table() {
        let world = route_1_world();
        let generator = EncounterGenerator::new(&world, GameVersion::Red);
        let route_1 = MapId::from_raw("Route1");
        let mut rng = StdRng::seed_from_u64(7);

        let mut hits = 0;
        for _ in 0..2000 {
            if let Some(found) = generator.roll(&route_1, EncounterKind::Grass, 1, false, &mut rng) {
                hits += 1;
                assert!(
                    found.species == "PIDGEY" || found.species == "RATTATA",
                    "unexpected species {}",
                    found.species
                );
                assert!((2..=5).contains(&found.level));
            }
        }
        assert!(hits > 0, "a nonzero rate should produce some encounters");
    }

    #[test]
    fn zero_rate_map_never_encounters() {
        let world = route_1_world();
        let generator = EncounterGenerator::new(&world, GameVersion::Red);
        let pallet = MapId::from_raw("PalletTown");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(generator.roll(&pallet, EncounterKind::Grass, 1, false, &mut rng).is_none());
        }
    }

    #[test]
    fn repel_suppresses_weaker_encounters() {
        let world = route_1_world();
        let generator = EncounterGenerator::new(&world, GameVersion::Red);
        let route_1 = MapId::from_raw("Route1");
        let mut rng = StdRng::seed_from_u64(11);

        for lead_level in [1_u32, 4, 10, 100] {
            for _ in 0..500 {
                if let Some(found) = generator.roll(&route_1, EncounterKind::Grass, lead_level, true, &mut rng) {
                    assert!(found.level >= lead_level);
                }
            }
        }
    }

    #[test]
    fn old_rod_is_always_a_level_5_magikarp() {
        let world = route_1_world();
        let generator = EncounterGenerator::new(&world, GameVersion::Red);
        let route_1 = MapId::from_raw("Route1");
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let found = generator
                .roll(&route_1, EncounterKind::OldRod, 1, false, &mut rng)
                .expect("old rod always bites");
            assert_eq!(found.species, OLD_ROD_SPECIES);
            assert_eq!(found.level, OLD_ROD_LEVEL);
        }
    }

    #[test]
    fn version_filter_excludes_other_versions_rows() {
        let world = route_1_world();
        let route_22 = MapId::from_raw("Route22");
        let mut rng = StdRng::seed_from_u64(5);

        let red = EncounterGenerator::new(&world, GameVersion::Red);
        for _ in 0..1000 {
            if let Some(found) = red.roll(&route_22, EncounterKind::Grass, 1, false, &mut rng) {
                assert_ne!(found.species, "SANDSHREW", "blue-only row leaked into a red roll");
            }
        }

        let merged = EncounterGenerator::new(&world, GameVersion::Merged);
        let mut species = std::collections::HashSet::new();
        for _ in 0..3000 {
            if let Some(found) = merged.roll(&route_22, EncounterKind::Grass, 1, false, &mut rng) {
                species.insert(found.species);
            }
        }
        assert!(species.contains("EKANS"), "red row should participate when merged");
        assert!(species.contains("SANDSHREW"), "blue row should participate when merged");
    }
}
