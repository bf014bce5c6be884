//! Scripted NPC movement playback.
//!
//! During a cutscene a script can play back an ordered sequence of
//! directional steps for one NPC, one step per simulation tick. While a
//! sequence is active the NPC's independent wandering is suppressed; the
//! session abandons active sequences cleanly at teardown.

use std::collections::VecDeque;

use crate::map::Direction;

/// Plays one movement sequence for one NPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcMovementPlayer {
    object_id: u8,
    steps: VecDeque<Direction>,
}

impl NpcMovementPlayer {
    pub fn new(object_id: u8, steps: &[Direction]) -> NpcMovementPlayer {
        NpcMovementPlayer {
            object_id,
            steps: steps.iter().copied().collect(),
        }
    }

    pub fn object_id(&self) -> u8 {
        self.object_id
    }

    /// Emit the next step, or `None` once the sequence has completed.
    pub fn tick(&mut self) -> Option<Direction> {
        self.steps.pop_front()
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}
