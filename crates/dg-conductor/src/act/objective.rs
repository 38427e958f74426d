//! Act objectives, conditions, and urgency curves.

use std::fmt;

use dg_core::FlagValue;
use serde::{Deserialize, Serialize};

fn one() -> u32 {
    1
}

/// A completion or failure condition of an act.
///
/// Story files tag conditions with `"type"`. Kinds this build does not know
/// load as [`ActCondition::Unrecognized`] and are never satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActCondition {
    /// Total NPC interactions in the act reach a threshold.
    NpcInteractionCount {
        /// Required interaction count.
        #[serde(default = "one")]
        threshold: u32,
    },
    /// Interactions with one NPC reach a threshold.
    SpecificNpcInteraction {
        /// NPC id.
        npc_id: String,
        /// Required interaction count.
        #[serde(default = "one")]
        threshold: u32,
    },
    /// The player has visited every listed location during the act.
    LocationVisited {
        /// Locations to visit.
        locations: Vec<String>,
    },
    /// A flag holds the given value.
    #[serde(alias = "flag")]
    FlagSet {
        /// Flag name.
        flag: String,
        /// Expected value.
        #[serde(default)]
        value: FlagValue,
    },
    /// An event has occurred during the act.
    EventOccurred {
        /// Event id.
        event_id: String,
    },
    /// At least this many turns were spent in the act.
    TurnsElapsed {
        /// Minimum turns.
        #[serde(default = "one")]
        min_turns: u32,
    },
    /// A condition kind this build does not understand.
    #[serde(other)]
    Unrecognized,
}

impl ActCondition {
    /// Short kind name used in logs and completion flags.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NpcInteractionCount { .. } => "npc_interaction_count",
            Self::SpecificNpcInteraction { .. } => "specific_npc_interaction",
            Self::LocationVisited { .. } => "location_visited",
            Self::FlagSet { .. } => "flag_set",
            Self::EventOccurred { .. } => "event_occurred",
            Self::TurnsElapsed { .. } => "turns_elapsed",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ActCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NpcInteractionCount { threshold } => {
                write!(f, "talk to NPCs {threshold} time(s)")
            }
            Self::SpecificNpcInteraction { npc_id, threshold } => {
                write!(f, "talk to {npc_id} {threshold} time(s)")
            }
            Self::LocationVisited { locations } => write!(f, "visit {}", locations.join(", ")),
            Self::FlagSet { flag, value } => write!(f, "{flag} = {value}"),
            Self::EventOccurred { event_id } => write!(f, "event {event_id} occurs"),
            Self::TurnsElapsed { min_turns } => write!(f, "spend {min_turns} turn(s)"),
            Self::Unrecognized => write!(f, "unrecognized condition"),
        }
    }
}

/// How narrative pressure grows across an act's turn budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyCurve {
    /// Pressure grows with the share of turns used.
    #[default]
    Linear,
    /// Pressure rises quickly and flattens out.
    Exponential,
    /// Half pressure until 70% of the budget, then a steep rise to 1.
    Climax,
}

impl UrgencyCurve {
    /// Raw curve value for a turn ratio (turns used / budget).
    pub fn value(self, ratio: f64) -> f64 {
        let ratio = ratio.max(0.0);
        match self {
            Self::Linear => ratio,
            Self::Exponential => ratio.sqrt(),
            Self::Climax => {
                if ratio < 0.7 {
                    ratio * 0.5
                } else {
                    0.35 + (ratio - 0.7) * 2.17
                }
            }
        }
    }

    /// Urgency for a turn ratio given current progress, clamped to `[0, 1]`.
    ///
    /// An act lagging well behind its schedule gets a catch-up bonus.
    pub fn urgency(self, ratio: f64, progress: f64) -> f64 {
        let mut urgency = self.value(ratio);
        if progress < ratio * 0.8 {
            urgency += 0.2;
        }
        urgency.clamp(0.0, 1.0)
    }
}

impl fmt::Display for UrgencyCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Exponential => write!(f, "exponential"),
            Self::Climax => write!(f, "climax"),
        }
    }
}

fn default_max_turns() -> u32 {
    15
}

/// What an act is about and how it ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActObjective {
    /// Narrative description of the act.
    #[serde(default)]
    pub description: String,
    /// All must hold for the act to succeed.
    #[serde(default)]
    pub completion_conditions: Vec<ActCondition>,
    /// Any one ends the act in failure.
    #[serde(default)]
    pub failure_conditions: Vec<ActCondition>,
    /// Turn budget.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Pressure curve over the turn budget.
    #[serde(default)]
    pub urgency_curve: UrgencyCurve,
    /// Free-text guidance for the plot generator.
    #[serde(default)]
    pub plot_guidance: String,
}

impl Default for ActObjective {
    fn default() -> Self {
        Self {
            description: String::new(),
            completion_conditions: Vec::new(),
            failure_conditions: Vec::new(),
            max_turns: default_max_turns(),
            urgency_curve: UrgencyCurve::Linear,
            plot_guidance: String::new(),
        }
    }
}

impl ActObjective {
    /// Create an objective with a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Set the turn budget.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the urgency curve.
    pub fn with_curve(mut self, curve: UrgencyCurve) -> Self {
        self.urgency_curve = curve;
        self
    }

    /// Add a completion condition.
    pub fn with_completion(mut self, condition: ActCondition) -> Self {
        self.completion_conditions.push(condition);
        self
    }

    /// Add a failure condition.
    pub fn with_failure(mut self, condition: ActCondition) -> Self {
        self.failure_conditions.push(condition);
        self
    }

    /// Set the plot guidance.
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.plot_guidance = guidance.into();
        self
    }
}

/// An authored act: a number, a name and an objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActDefinition {
    /// 1-based act number. Assigned by position when absent in a story file.
    #[serde(default)]
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Objective of the act.
    #[serde(default)]
    pub objective: ActObjective,
}

impl ActDefinition {
    /// Create an act definition.
    pub fn new(number: u32, name: impl Into<String>, objective: ActObjective) -> Self {
        Self {
            number,
            name: name.into(),
            objective,
        }
    }

    /// The act used when a story defines none.
    pub fn free_exploration() -> Self {
        Self::new(
            1,
            "Free exploration",
            ActObjective::new("Explore the world freely.").with_max_turns(999),
        )
    }

    /// Open-ended act synthesized after the last authored one.
    pub fn open_development(number: u32) -> Self {
        Self::new(
            number,
            format!("Act {number}: Open development"),
            ActObjective::new("The story continues to unfold.").with_max_turns(20),
        )
    }
}
