//! Dialogue phases within a run of dialogue turns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a conversation stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    /// Setting the scene.
    #[default]
    Opening,
    /// Digging into the topic.
    Rising,
    /// The key moment.
    Climax,
    /// Winding down.
    Falling,
}

impl DialoguePhase {
    /// The phase after this one. `Falling` stays put.
    pub fn next(self) -> Self {
        match self {
            Self::Opening => Self::Rising,
            Self::Rising => Self::Climax,
            Self::Climax | Self::Falling => Self::Falling,
        }
    }

    /// Direction for NPC responders in this phase.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::Opening => "opening: establish the situation, NPCs stay a little reserved",
            Self::Rising => "rising: go deeper, NPCs show more of their character",
            Self::Climax => "climax: the key moment, NPC emotions run stronger",
            Self::Falling => "falling: wrap up or hint ahead, set up what comes next",
        }
    }
}

impl fmt::Display for DialoguePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Rising => write!(f, "rising"),
            Self::Climax => write!(f, "climax"),
            Self::Falling => write!(f, "falling"),
        }
    }
}

/// Moves the phase forward every `phase_length` dialogue turns.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    phase: DialoguePhase,
    turns_in_phase: u32,
    phase_length: u32,
}

impl PhaseTracker {
    /// Create a tracker.
    pub fn new(phase_length: u32) -> Self {
        Self {
            phase: DialoguePhase::Opening,
            turns_in_phase: 0,
            phase_length: phase_length.max(1),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    /// Count a completed dialogue turn.
    pub fn record_dialogue_turn(&mut self) {
        self.turns_in_phase += 1;
        if self.turns_in_phase >= self.phase_length {
            self.phase = self.phase.next();
            self.turns_in_phase = 0;
            tracing::debug!(phase = %self.phase, "dialogue phase advanced");
        }
    }

    /// Back to the opening phase.
    pub fn reset(&mut self) {
        self.phase = DialoguePhase::Opening;
        self.turns_in_phase = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_every_three_turns() {
        let mut tracker = PhaseTracker::new(3);
        let mut phases = Vec::new();
        for _ in 0..10 {
            tracker.record_dialogue_turn();
            phases.push(tracker.phase());
        }
        assert_eq!(phases[1], DialoguePhase::Opening);
        assert_eq!(phases[2], DialoguePhase::Rising);
        assert_eq!(phases[5], DialoguePhase::Climax);
        assert_eq!(phases[8], DialoguePhase::Falling);
        assert_eq!(phases[9], DialoguePhase::Falling);
    }

    #[test]
    fn reset_returns_to_opening() {
        let mut tracker = PhaseTracker::new(1);
        tracker.record_dialogue_turn();
        assert_eq!(tracker.phase(), DialoguePhase::Rising);
        tracker.reset();
        assert_eq!(tracker.phase(), DialoguePhase::Opening);
    }
}
