#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod dialogue;
pub mod encounter;
pub mod error;
pub mod flags;
pub mod loader;
pub mod map;
pub mod movement;
pub mod script;
pub mod session;
pub mod trainer;
pub mod trigger;
pub mod warp;
pub mod world;

// Re-exports for convenience
pub use dialogue::DialogueResolver;
pub use encounter::{EncounterGenerator, EncounterKind, GameVersion, WildEncounter};
pub use flags::EventFlagStore;
pub use loader::{build_world, load_world};
pub use map::{Direction, Map, MapId};
pub use session::{BattleOutcome, EngineRequest, Session, SessionSnapshot, StepOutcome, Terrain};
pub use trainer::TrainerSightDetector;
pub use trigger::CoordinateTriggerEvaluator;
pub use warp::WarpResolver;
pub use world::StaticWorld;
