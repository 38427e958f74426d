//! Read-only projections returned to callers.

use dg_core::TurnMode;
use dg_progress::EngineType;
use serde::Serialize;

use crate::generator::NpcReaction;

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    /// Whether any generator produced output.
    pub success: bool,
    /// Rendered text.
    pub text: String,
    /// Why the turn failed, when it did.
    pub error: Option<String>,
    /// Scene after the turn.
    pub scene_id: u32,
    /// Total turns after the turn.
    pub turn_id: u32,
    /// Mode the turn was played in.
    pub mode: TurnMode,
    /// NPC reactions in call order.
    pub reactions: Vec<NpcReaction>,
    /// Ids of events that fired.
    pub events: Vec<String>,
    /// Whether the turn crossed a scene boundary.
    pub boundary: bool,
    /// Generator calls that were omitted.
    pub warnings: Vec<String>,
}

/// Where the session stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    /// Current scene.
    pub scene_id: u32,
    /// Total turns played.
    pub turn_id: u32,
    /// Player location.
    pub location: Option<String>,
    /// In-world time as authored.
    pub current_time: Option<String>,
    /// NPCs present.
    pub present_npcs: Vec<String>,
    /// Engine in use.
    pub engine: EngineType,
    /// Current act number.
    pub act_number: u32,
    /// Current act name.
    pub act_name: String,
    /// Current act progress.
    pub progress: f64,
    /// Whether turns can still be played.
    pub can_continue: bool,
}
