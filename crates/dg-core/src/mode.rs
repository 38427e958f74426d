//! Turn modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a single player turn is handled.
///
/// Exactly one mode is chosen per turn. The mode decides which content
/// generators run and whether the turn may end on a scene boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnMode {
    /// Fast path: only NPC responses, no world-state simulation.
    Dialogue,
    /// Full path: world simulation, plot beat, ambience and NPC responses.
    PlotAdvance,
    /// Closes the current act and opens the next one.
    ActTransition,
}

impl TurnMode {
    /// All modes in escalation order.
    pub const ALL: [TurnMode; 3] = [
        TurnMode::Dialogue,
        TurnMode::PlotAdvance,
        TurnMode::ActTransition,
    ];

    /// Whether this is the dialogue fast path.
    pub fn is_dialogue(self) -> bool {
        self == TurnMode::Dialogue
    }

    /// Wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            TurnMode::Dialogue => "DIALOGUE",
            TurnMode::PlotAdvance => "PLOT_ADVANCE",
            TurnMode::ActTransition => "ACT_TRANSITION",
        }
    }
}

impl fmt::Display for TurnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
