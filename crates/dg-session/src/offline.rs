//! Template generators that need no external model.
//!
//! Output is derived from the brief alone, so the same story and inputs
//! always produce the same text.

use std::sync::Arc;

use async_trait::async_trait;
use dg_core::TurnMode;

use crate::error::GeneratorResult;
use crate::generator::{
    Atmosphere, AtmosphereGenerator, Generators, NpcReaction, NpcResponder, PlotBeat,
    PlotGenerator, TurnBrief, WorldSimulator, WorldUpdate,
};

/// Minutes a dialogue-free turn takes in the world.
const MINUTES_PER_BEAT: u32 = 10;
/// Minutes an act transition skips ahead.
const MINUTES_PER_TRANSITION: u32 = 60;

/// Deterministic template output for every generator seam.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerators;

impl TemplateGenerators {
    /// A bundle that uses templates everywhere.
    pub fn bundle() -> Generators {
        Generators::uniform(Arc::new(Self))
    }
}

#[async_trait]
impl WorldSimulator for TemplateGenerators {
    async fn simulate(&self, brief: &TurnBrief) -> GeneratorResult<WorldUpdate> {
        let minutes = if brief.mode == TurnMode::ActTransition {
            MINUTES_PER_TRANSITION
        } else {
            MINUTES_PER_BEAT
        };
        Ok(WorldUpdate {
            minutes_elapsed: minutes,
            summary: format!("{minutes} minutes pass"),
            ..WorldUpdate::default()
        })
    }
}

#[async_trait]
impl PlotGenerator for TemplateGenerators {
    async fn generate(&self, brief: &TurnBrief) -> GeneratorResult<PlotBeat> {
        let narration = if let Some(forced) = brief.plot_overrides.first() {
            forced.clone()
        } else if brief.mode == TurnMode::ActTransition {
            format!("\"{}\" draws to a close.", brief.act_name)
        } else if let Some(hint) = brief.hints.first() {
            format!("The story stirs: {hint}.")
        } else {
            format!("Your words carry weight: \"{}\".", brief.player_input.trim())
        };
        Ok(PlotBeat {
            narration,
            ..PlotBeat::default()
        })
    }
}

#[async_trait]
impl AtmosphereGenerator for TemplateGenerators {
    async fn describe(&self, brief: &TurnBrief) -> GeneratorResult<Atmosphere> {
        let place = brief.world.location.as_deref().unwrap_or("the scene");
        let description = match brief.scene_mood.as_str() {
            "tense" => format!("The air in {place} is taut, every sound too loud."),
            "uneasy" => format!("Something in {place} feels slightly wrong."),
            _ => format!("{place} is quiet for the moment."),
        };
        Ok(Atmosphere {
            description,
            mood: brief.scene_mood.clone(),
        })
    }
}

#[async_trait]
impl NpcResponder for TemplateGenerators {
    async fn respond(&self, npc_id: &str, brief: &TurnBrief) -> GeneratorResult<NpcReaction> {
        let dialogue = match brief.npc_hints.get(npc_id) {
            Some(hint) => hint.clone(),
            None => format!("\"{}\"? Tell me more.", brief.player_input.trim()),
        };
        Ok(NpcReaction {
            action: "listens".to_string(),
            emotion: brief.scene_mood.clone(),
            ..NpcReaction::line(npc_id, dialogue)
        })
    }
}
