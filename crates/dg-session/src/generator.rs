//! Content generator seams.
//!
//! Generators are opaque to the session: each takes a [`TurnBrief`] and
//! asynchronously returns content. Only the declared side effects of that
//! content (time elapsed, cast changes, flags, moods) are interpreted.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dg_conductor::DialoguePhase;
use dg_core::{FlagValue, TurnMode};
use serde::{Deserialize, Serialize};

use crate::error::GeneratorResult;
use crate::world::WorldView;

/// Everything a generator needs to know about the turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnBrief {
    /// Turn number (1-based).
    pub turn: u32,
    /// Mode chosen for the turn.
    pub mode: TurnMode,
    /// Raw player input.
    pub player_input: String,
    /// The world as of this stage of the pipeline.
    pub world: WorldView,
    /// Current act number.
    pub act_number: u32,
    /// Current act name.
    pub act_name: String,
    /// Act progress in `[0, 1]`.
    pub progress: f64,
    /// Act urgency in `[0, 1]`.
    pub urgency: f64,
    /// Guidance for the plot generator.
    pub hints: Vec<String>,
    /// Narration forced by fired events.
    pub plot_overrides: Vec<String>,
    /// Reaction hints per NPC from fired events.
    pub npc_hints: BTreeMap<String, String>,
    /// Dialogue phase.
    pub dialogue_phase: DialoguePhase,
    /// Direction for NPC responders.
    pub phase_guidance: String,
    /// Scene mood.
    pub scene_mood: String,
    /// Tension in `[0, 1]`.
    pub tension: f64,
    /// NPCs that should respond.
    pub focal_npcs: Vec<String>,
}

/// World simulator output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldUpdate {
    /// In-world minutes that passed.
    pub minutes_elapsed: u32,
    /// New player location.
    pub location: Option<String>,
    /// NPCs that arrived.
    pub arrivals: Vec<String>,
    /// NPCs that left.
    pub departures: Vec<String>,
    /// Mood changes.
    pub npc_moods: BTreeMap<String, String>,
    /// One-line summary.
    pub summary: String,
}

/// Plot generator output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotBeat {
    /// Narration shown to the player.
    pub narration: String,
    /// Flags the beat sets.
    pub flags: BTreeMap<String, FlagValue>,
    /// NPCs the beat puts in focus.
    pub focal_npcs: Vec<String>,
}

/// Atmosphere generator output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Atmosphere {
    /// Ambient description.
    pub description: String,
    /// Mood word.
    pub mood: String,
}

/// One NPC's response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcReaction {
    /// NPC id.
    pub npc_id: String,
    /// Display name.
    pub name: String,
    /// Spoken line.
    pub dialogue: String,
    /// Visible action.
    pub action: String,
    /// Emotion shown.
    pub emotion: String,
    /// Change in attitude toward the player, in `[-1, 1]`.
    pub attitude_shift: f64,
}

impl NpcReaction {
    /// Reaction with only an id and a line.
    pub fn line(npc_id: impl Into<String>, dialogue: impl Into<String>) -> Self {
        let npc_id = npc_id.into();
        Self {
            name: npc_id.clone(),
            npc_id,
            dialogue: dialogue.into(),
            ..Self::default()
        }
    }

    /// `"npc: line"` summary.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.npc_id, self.dialogue)
    }
}

/// Advances the world clock and cast.
#[async_trait]
pub trait WorldSimulator: Send + Sync {
    /// Simulate the world for one turn.
    async fn simulate(&self, brief: &TurnBrief) -> GeneratorResult<WorldUpdate>;
}

/// Writes plot beats and act transitions.
#[async_trait]
pub trait PlotGenerator: Send + Sync {
    /// Generate a beat; `brief.mode` tells a transition from a plain advance.
    async fn generate(&self, brief: &TurnBrief) -> GeneratorResult<PlotBeat>;
}

/// Describes the surroundings.
#[async_trait]
pub trait AtmosphereGenerator: Send + Sync {
    /// Describe the scene.
    async fn describe(&self, brief: &TurnBrief) -> GeneratorResult<Atmosphere>;
}

/// Speaks for one NPC.
#[async_trait]
pub trait NpcResponder: Send + Sync {
    /// Respond as `npc_id`.
    async fn respond(&self, npc_id: &str, brief: &TurnBrief) -> GeneratorResult<NpcReaction>;
}

/// The generators a session dispatches to.
#[derive(Clone)]
pub struct Generators {
    /// World simulator.
    pub world: Arc<dyn WorldSimulator>,
    /// Plot generator.
    pub plot: Arc<dyn PlotGenerator>,
    /// Atmosphere generator.
    pub atmosphere: Arc<dyn AtmosphereGenerator>,
    /// NPC responder.
    pub npcs: Arc<dyn NpcResponder>,
}

impl std::fmt::Debug for Generators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generators").finish_non_exhaustive()
    }
}

impl Generators {
    /// Bundle four generators.
    pub fn new(
        world: Arc<dyn WorldSimulator>,
        plot: Arc<dyn PlotGenerator>,
        atmosphere: Arc<dyn AtmosphereGenerator>,
        npcs: Arc<dyn NpcResponder>,
    ) -> Self {
        Self {
            world,
            plot,
            atmosphere,
            npcs,
        }
    }

    /// Use one value for every seam.
    pub fn uniform<G>(generator: Arc<G>) -> Self
    where
        G: WorldSimulator + PlotGenerator + AtmosphereGenerator + NpcResponder + 'static,
    {
        Self {
            world: generator.clone(),
            plot: generator.clone(),
            atmosphere: generator.clone(),
            npcs: generator,
        }
    }

    /// Replace the world simulator.
    pub fn with_world(mut self, world: Arc<dyn WorldSimulator>) -> Self {
        self.world = world;
        self
    }

    /// Replace the plot generator.
    pub fn with_plot(mut self, plot: Arc<dyn PlotGenerator>) -> Self {
        self.plot = plot;
        self
    }

    /// Replace the atmosphere generator.
    pub fn with_atmosphere(mut self, atmosphere: Arc<dyn AtmosphereGenerator>) -> Self {
        self.atmosphere = atmosphere;
        self
    }

    /// Replace the NPC responder.
    pub fn with_npcs(mut self, npcs: Arc<dyn NpcResponder>) -> Self {
        self.npcs = npcs;
        self
    }
}
