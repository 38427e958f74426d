//! Event effects and the deltas they produce.

use std::collections::BTreeMap;
use std::fmt;

use dg_core::FlagValue;
use serde::{Deserialize, Serialize};

use crate::act::ActEnding;

fn success() -> ActEnding {
    ActEnding::Success
}

/// What an event does when applied.
///
/// Only [`EventEffect::SetFlag`] touches engine state. Every other effect
/// is handed back to the caller as a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEffect {
    /// Set an engine flag.
    SetFlag {
        /// Flag name.
        flag: String,
        /// New value.
        #[serde(default)]
        value: FlagValue,
    },
    /// Change an NPC's mood.
    NpcMood {
        /// NPC id.
        npc_id: String,
        /// New mood.
        mood: String,
    },
    /// Bring an NPC into a scene.
    SpawnNpc {
        /// NPC id.
        npc_id: String,
        /// Where; defaults to the player's location.
        #[serde(default)]
        location: Option<String>,
    },
    /// Close the current act.
    TriggerActTransition {
        /// How the act ends.
        #[serde(default = "success")]
        outcome: ActEnding,
    },
    /// Pass a hint to the plot generator.
    AddPlotHint {
        /// Hint text.
        hint: String,
    },
    /// An effect kind this build does not understand; ignored.
    #[serde(other)]
    Unrecognized,
}

/// A world change the caller must apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldDelta {
    /// Change an NPC's mood.
    NpcMood {
        /// NPC id.
        npc_id: String,
        /// New mood.
        mood: String,
    },
    /// Place an NPC somewhere.
    SpawnNpc {
        /// NPC id.
        npc_id: String,
        /// Target location, if known.
        location: Option<String>,
    },
}

impl fmt::Display for WorldDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NpcMood { npc_id, mood } => write!(f, "{npc_id} becomes {mood}"),
            Self::SpawnNpc {
                npc_id,
                location: Some(location),
            } => write!(f, "{npc_id} appears at {location}"),
            Self::SpawnNpc { npc_id, .. } => write!(f, "{npc_id} appears"),
        }
    }
}

/// Outcome of applying one event's effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppliedEffects {
    /// Event id.
    pub event_id: String,
    /// One line per applied effect.
    pub summaries: Vec<String>,
    /// Flags written to the engine store.
    pub flags_set: Vec<(String, FlagValue)>,
    /// World changes for the caller.
    pub deltas: Vec<WorldDelta>,
    /// Requested act ending, if any effect asked for one.
    pub act_transition: Option<ActEnding>,
    /// Hints for the plot generator.
    pub plot_hints: Vec<String>,
    /// Authored narration that replaces the generated plot beat.
    pub plot_override: Option<String>,
    /// Passive reaction hints per NPC id.
    pub npc_reactions: BTreeMap<String, String>,
}

impl AppliedEffects {
    /// Whether nothing happened.
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.plot_override.is_none() && self.npc_reactions.is_empty()
    }
}
