//! Per-turn classification context.

use serde::{Deserialize, Serialize};

/// Everything the turn classifier looks at for one turn.
///
/// Built fresh by the conductor at the start of each turn; never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    /// Raw player input.
    pub player_input: String,
    /// Completion ratio of the current act, in `[0, 1]`.
    pub act_progress: f64,
    /// Narrative urgency of the current act, in `[0, 1]`.
    pub act_urgency: f64,
    /// Turns spent in the current act, including the one being decided.
    pub turns_in_act: u32,
    /// Turn budget of the current act.
    pub max_turns: u32,
    /// Consecutive dialogue turns since the last non-dialogue turn.
    pub dialogue_turns_since_plot: u32,
    /// Highest priority among events fired this turn, if any fired.
    pub highest_event_priority: Option<u8>,
    /// Ids of events fired this turn.
    pub triggered_event_ids: Vec<String>,
    /// Whether the player moved since the previous turn.
    pub location_changed: bool,
    /// Largest absolute NPC attitude shift seen since the previous turn.
    pub max_attitude_shift: f64,
}

impl TurnContext {
    /// Create a context for the given player input, everything else neutral.
    pub fn new(player_input: impl Into<String>) -> Self {
        Self {
            player_input: player_input.into(),
            ..Self::default()
        }
    }

    /// Whether the act's turn budget is used up.
    pub fn budget_exhausted(&self) -> bool {
        self.turns_in_act >= self.max_turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_neutral() {
        let ctx = TurnContext::new("hello");
        assert_eq!(ctx.player_input, "hello");
        assert_eq!(ctx.act_progress, 0.0);
        assert!(ctx.highest_event_priority.is_none());
        assert!(!ctx.location_changed);
    }

    #[test]
    fn budget_exhausted_at_max() {
        let ctx = TurnContext {
            turns_in_act: 3,
            max_turns: 3,
            ..TurnContext::new("")
        };
        assert!(ctx.budget_exhausted());
        let ctx = TurnContext {
            turns_in_act: 2,
            ..ctx
        };
        assert!(!ctx.budget_exhausted());
    }
}
