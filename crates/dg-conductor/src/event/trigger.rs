//! Event triggers and trigger conditions.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use dg_core::{FlagValue, GameState, clock};
use serde::{Deserialize, Serialize};

/// One clause of a condition trigger. All clauses must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    /// An engine flag holds the given value.
    Flag {
        /// Flag name.
        flag: String,
        /// Expected value.
        #[serde(default)]
        value: FlagValue,
    },
    /// An NPC is in the given mood.
    NpcMood {
        /// NPC id.
        npc_id: String,
        /// Expected mood.
        mood: String,
    },
    /// The player is at a location.
    Location {
        /// Location name.
        location: String,
    },
    /// The engine's turn index reached a minimum.
    TurnsElapsed {
        /// Minimum turn index.
        #[serde(default)]
        min_turns: u32,
    },
    /// A narrative requirement judged by the plot generator.
    ///
    /// Recorded on the event but never blocks firing.
    #[serde(rename = "narrative_condition", alias = "narrative")]
    Narrative {
        /// Requirement text.
        #[serde(default)]
        description: String,
    },
    /// A clause kind this build does not understand; never holds.
    #[serde(other)]
    Unrecognized,
}

impl TriggerCondition {
    /// Whether the clause holds.
    pub fn holds(&self, state: &GameState, flags: &BTreeMap<String, FlagValue>, turn: u32) -> bool {
        match self {
            Self::Flag { flag, value } => flags.get(flag) == Some(value),
            Self::NpcMood { npc_id, mood } => state.npc_moods.get(npc_id) == Some(mood),
            Self::Location { location } => state.player_location.as_ref() == Some(location),
            Self::TurnsElapsed { min_turns } => turn >= *min_turns,
            Self::Narrative { .. } => true,
            Self::Unrecognized => false,
        }
    }
}

/// Kind-specific part of a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fires once the world clock reaches a time or the turn index reaches
    /// a delay, whichever configured branch holds first.
    Time {
        /// In-world time, authored as `YYYY-MM-DD HH:MM`.
        #[serde(default, with = "clock::optional")]
        trigger_time: Option<NaiveDateTime>,
        /// Turn index at which the event fires.
        #[serde(default, alias = "time_after_turns")]
        after_turns: Option<u32>,
    },
    /// Fires when every clause holds.
    Condition {
        /// Clauses, all required.
        #[serde(default)]
        conditions: Vec<TriggerCondition>,
    },
    /// Fires with a fixed chance each turn.
    Probability {
        /// Chance per turn in `[0, 1]`.
        probability: f64,
    },
    /// Only fires when requested explicitly.
    Manual,
    /// A trigger kind this build does not understand; never fires.
    #[serde(other)]
    Unrecognized,
}

/// What makes an event fire, and how long it rests afterwards.
///
/// Story files write the kind's fields and `cooldown` side by side:
/// `{"type": "condition", "conditions": [...], "cooldown": 2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrigger {
    /// Kind and its parameters.
    #[serde(flatten)]
    pub kind: TriggerKind,
    /// Checks the event sits out after firing.
    #[serde(default, alias = "probability_cooldown")]
    pub cooldown: u32,
}

impl From<TriggerKind> for EventTrigger {
    fn from(kind: TriggerKind) -> Self {
        Self { kind, cooldown: 0 }
    }
}

impl EventTrigger {
    /// Time trigger firing at an in-world time.
    pub fn at_time(time: NaiveDateTime) -> Self {
        TriggerKind::Time {
            trigger_time: Some(time),
            after_turns: None,
        }
        .into()
    }

    /// Time trigger firing at a turn index.
    pub fn after_turns(turns: u32) -> Self {
        TriggerKind::Time {
            trigger_time: None,
            after_turns: Some(turns),
        }
        .into()
    }

    /// Condition trigger.
    pub fn when(conditions: Vec<TriggerCondition>) -> Self {
        TriggerKind::Condition { conditions }.into()
    }

    /// Probability trigger.
    pub fn chance(probability: f64, cooldown: u32) -> Self {
        Self::from(TriggerKind::Probability { probability }).with_cooldown(cooldown)
    }

    /// Manual trigger.
    pub fn manual() -> Self {
        TriggerKind::Manual.into()
    }

    /// Set the cooldown applied after firing.
    pub fn with_cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Kind name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TriggerKind::Time { .. } => "time",
            TriggerKind::Condition { .. } => "condition",
            TriggerKind::Probability { .. } => "probability",
            TriggerKind::Manual => "manual",
            TriggerKind::Unrecognized => "unrecognized",
        }
    }

    /// Narrative requirements attached to a condition trigger.
    pub fn narrative_requirements(&self) -> Vec<&str> {
        match &self.kind {
            TriggerKind::Condition { conditions } => conditions
                .iter()
                .filter_map(|c| match c {
                    TriggerCondition::Narrative { description } => Some(description.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
