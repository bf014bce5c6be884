//! Dialogue resolution.
//!
//! Pure lookup chain: per-map TEXT_ constant -> dialogue label -> dialogue
//! string. A broken link is a [`DialogueError`]; callers treat it as "no
//! dialogue" and log it rather than blocking the interaction.

use thiserror::Error;

use crate::map::MapId;
use crate::world::StaticWorld;

/// A link in the text lookup chain is missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    #[error("no text pointer for '{constant}' on '{map}'")]
    UnknownTextConstant { map: MapId, constant: String },
    #[error("no dialogue string for label '{label}'")]
    UnknownLabel { label: String },
}

/// Resolves text constants against the static dialogue tables.
#[derive(Debug, Clone, Copy)]
pub struct DialogueResolver<'a> {
    world: &'a StaticWorld,
}

impl<'a> DialogueResolver<'a> {
    pub fn new(world: &'a StaticWorld) -> DialogueResolver<'a> {
        DialogueResolver { world }
    }

    /// Resolve a per-map text constant to its dialogue string.
    pub fn resolve(&self, map: &MapId, text_constant: &str) -> Result<&'a str, DialogueError> {
        let label = self
            .world
            .text_pointer(map, text_constant)
            .ok_or_else(|| DialogueError::UnknownTextConstant {
                map: map.clone(),
                constant: text_constant.to_string(),
            })?;
        self.by_label(label)
    }

    /// Resolve a dialogue label directly (used for trainer header texts,
    /// which skip the per-map pointer table).
    pub fn by_label(&self, label: &str) -> Result<&'a str, DialogueError> {
        self.world
            .dialogue(label)
            .ok_or_else(|| DialogueError::UnknownLabel { label: label.to_string() })
    }
}
