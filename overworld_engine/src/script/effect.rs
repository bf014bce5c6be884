//! Script effects and their dispatch.
//!
//! A script state's body is a small ordered list of typed effects rather
//! than raw interpreted instructions; this keeps the state-machine shape of
//! the source data while giving the engine a closed, testable instruction
//! set. Dispatch reports how execution should proceed: continue, stop, park
//! on an acknowledgment, or jump to another state.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use overworld_data::ScriptEffectDef;

use crate::dialogue::DialogueResolver;
use crate::error::IntegrityError;
use crate::flags::EventFlagStore;
use crate::map::MapId;
use crate::movement::NpcMovementPlayer;
use crate::script::WaitKind;
use crate::session::{EngineRequest, TrainerRef};
use crate::world::{ObjectKind, StaticWorld};

/// One instruction in a script state's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptEffect {
    SetFlag(String),
    ResetFlag(String),
    /// Abort the remaining effects unless the flag matches the expectation.
    FlagGuard { flag: String, expect_set: bool },
    ShowDialogue(String),
    PlayMovement { object_id: u8, label: String },
    RequestBattle { object_id: u8 },
    Transition(u32),
}

impl ScriptEffect {
    pub fn from_def(def: &ScriptEffectDef) -> ScriptEffect {
        match def {
            ScriptEffectDef::SetFlag { flag } => ScriptEffect::SetFlag(flag.clone()),
            ScriptEffectDef::ResetFlag { flag } => ScriptEffect::ResetFlag(flag.clone()),
            ScriptEffectDef::FlagGuard { flag, expect_set } => ScriptEffect::FlagGuard {
                flag: flag.clone(),
                expect_set: *expect_set,
            },
            ScriptEffectDef::ShowDialogue { text_constant } => ScriptEffect::ShowDialogue(text_constant.clone()),
            ScriptEffectDef::PlayMovement { object_id, label } => ScriptEffect::PlayMovement {
                object_id: *object_id,
                label: label.clone(),
            },
            ScriptEffectDef::RequestBattle { object_id } => ScriptEffect::RequestBattle { object_id: *object_id },
            ScriptEffectDef::Transition { to } => ScriptEffect::Transition(*to),
        }
    }
}

/// How execution proceeds after one effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectFlow {
    Continue,
    Stop,
    Wait(WaitKind),
    Jump(u32),
}

/// Mutable session surface an effect may touch. Built by the session per
/// engine step; the engine itself stays free of session borrows.
#[derive(Debug)]
pub struct EffectContext<'a> {
    pub world: &'a StaticWorld,
    pub flags: &'a EventFlagStore,
    pub requests: &'a mut VecDeque<EngineRequest>,
    pub movements: &'a mut Vec<NpcMovementPlayer>,
    pub active_battle: &'a mut Option<TrainerRef>,
}

/// Execute one effect against the session surface.
///
/// Data-integrity failures (unresolvable dialogue, unknown movement label,
/// dangling trainer links) degrade to a logged no-op and execution
/// continues, so one bad row cannot wedge a cutscene.
pub fn dispatch_effect(map: &MapId, effect: &ScriptEffect, ctx: &mut EffectContext<'_>) -> EffectFlow {
    match effect {
        ScriptEffect::SetFlag(flag) => {
            ctx.flags.set(flag);
            EffectFlow::Continue
        },
        ScriptEffect::ResetFlag(flag) => {
            ctx.flags.reset(flag);
            EffectFlow::Continue
        },
        ScriptEffect::FlagGuard { flag, expect_set } => {
            if ctx.flags.check(flag) == *expect_set {
                EffectFlow::Continue
            } else {
                EffectFlow::Stop
            }
        },
        ScriptEffect::ShowDialogue(text_constant) => {
            match DialogueResolver::new(ctx.world).resolve(map, text_constant) {
                Ok(text) => {
                    ctx.requests.push_back(EngineRequest::Dialogue { text: text.to_string() });
                    EffectFlow::Wait(WaitKind::Dialogue)
                },
                Err(err) => {
                    warn!("script dialogue on '{map}' degraded to no-op: {err}");
                    EffectFlow::Continue
                },
            }
        },
        ScriptEffect::PlayMovement { object_id, label } => match ctx.world.movement(map, label) {
            Some(steps) => {
                ctx.movements.push(NpcMovementPlayer::new(*object_id, steps));
                EffectFlow::Wait(WaitKind::Movement(*object_id))
            },
            None => {
                warn!(
                    "{}",
                    IntegrityError::UnknownMovement {
                        map: map.clone(),
                        label: label.clone(),
                    }
                );
                EffectFlow::Continue
            },
        },
        ScriptEffect::RequestBattle { object_id } => match build_battle_request(map, *object_id, ctx) {
            Some((request, trainer)) => {
                ctx.requests.push_back(request);
                *ctx.active_battle = Some(trainer);
                EffectFlow::Wait(WaitKind::Battle)
            },
            None => EffectFlow::Continue,
        },
        ScriptEffect::Transition(to) => EffectFlow::Jump(*to),
    }
}

/// Assemble a trainer battle request from an object's header, party, and
/// class records. Any dangling link degrades to `None` with a warning.
pub fn build_battle_request(
    map: &MapId,
    object_id: u8,
    ctx: &EffectContext<'_>,
) -> Option<(EngineRequest, TrainerRef)> {
    let Some(object) = ctx.world.object(map, object_id) else {
        warn!("battle request for missing object {object_id} on '{map}'");
        return None;
    };
    let ObjectKind::Trainer { header_index, .. } = &object.kind else {
        warn!("battle request for non-trainer object {object_id} on '{map}'");
        return None;
    };
    let Some(header) = ctx.world.trainer_header(map, *header_index) else {
        warn!(
            "{}",
            IntegrityError::DanglingTrainerHeader {
                map: map.clone(),
                index: *header_index,
            }
        );
        return None;
    };
    let Some(class) = ctx.world.trainer_class(&header.class_constant) else {
        warn!("unknown trainer class '{}' on '{map}'", header.class_constant);
        return None;
    };
    let Some(party) = ctx.world.trainer_party(&header.class_constant, header.party_index) else {
        warn!(
            "unknown trainer party {}#{} on '{map}'",
            header.class_constant, header.party_index
        );
        return None;
    };
    let request = EngineRequest::TrainerBattle {
        class: class.display_name.clone(),
        base_money: class.base_money,
        party: party.to_vec(),
        object_id,
    };
    let trainer = TrainerRef {
        object_id,
        header_index: *header_index,
    };
    Some((request, trainer))
}
