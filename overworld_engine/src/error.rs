//! Typed error conditions raised while stepping a session.
//!
//! Data-integrity problems indicate malformed extracted data rather than a
//! runtime fault; the responsible operation logs the error and degrades to a
//! no-op instead of failing the session. The only fatal path in the engine is
//! world loading, which uses `anyhow` in [`crate::loader`].

use thiserror::Error;

use crate::map::MapId;

/// A referenced row is missing from the static data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("warp index {index} on '{map}' has no entry")]
    DanglingWarpEntry { map: MapId, index: u32 },
    #[error("warp to previous map on '{map}' but no previous map is recorded")]
    NoPreviousMap { map: MapId },
    #[error("unknown map '{0}'")]
    UnknownMap(String),
    #[error("trainer header {index} on '{map}' has no entry")]
    DanglingTrainerHeader { map: MapId, index: u32 },
    #[error("movement sequence '{label}' on '{map}' has no entry")]
    UnknownMovement { map: MapId, label: String },
    #[error("encounter slot {slot} on '{map}' has no row for the configured version")]
    EmptyEncounterSlot { map: MapId, slot: u8 },
    #[error("script state {index} on '{map}' has no entry")]
    UnknownScriptState { map: MapId, index: u32 },
}
