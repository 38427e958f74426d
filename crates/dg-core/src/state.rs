//! Read-only game-state snapshot handed to the conductor each turn.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Snapshot of the world as seen by the orchestration core.
///
/// The conductor never mutates a snapshot; world changes flow back to the
/// session as explicit deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    /// Where the player currently is.
    pub player_location: Option<String>,
    /// NPCs present at the player's location.
    pub present_npcs: Vec<String>,
    /// NPC ids the player interacted with since the last evaluation.
    pub npc_interactions: Vec<String>,
    /// Event ids that have occurred and should count toward act conditions.
    pub triggered_event_ids: Vec<String>,
    /// Current mood per NPC id.
    pub npc_moods: HashMap<String, String>,
    /// Most recent attitude shift per NPC id, in `[-1, 1]`.
    pub attitude_shifts: HashMap<String, f64>,
    /// In-world clock, if the world keeps one.
    pub current_time: Option<NaiveDateTime>,
}

impl GameState {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the player location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.player_location = Some(location.into());
        self
    }

    /// Set the NPCs present at the player's location.
    pub fn with_present_npcs<I, S>(mut self, npcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.present_npcs = npcs.into_iter().map(Into::into).collect();
        self
    }

    /// Record an interaction with an NPC.
    pub fn with_interaction(mut self, npc_id: impl Into<String>) -> Self {
        self.npc_interactions.push(npc_id.into());
        self
    }

    /// Record an occurred event.
    pub fn with_event(mut self, event_id: impl Into<String>) -> Self {
        self.triggered_event_ids.push(event_id.into());
        self
    }

    /// Set an NPC's mood.
    pub fn with_mood(mut self, npc_id: impl Into<String>, mood: impl Into<String>) -> Self {
        self.npc_moods.insert(npc_id.into(), mood.into());
        self
    }

    /// Set an NPC's latest attitude shift.
    pub fn with_attitude_shift(mut self, npc_id: impl Into<String>, shift: f64) -> Self {
        self.attitude_shifts.insert(npc_id.into(), shift);
        self
    }

    /// Set the in-world clock.
    pub fn with_time(mut self, time: NaiveDateTime) -> Self {
        self.current_time = Some(time);
        self
    }

    /// Largest absolute attitude shift among all NPCs, or 0.
    pub fn max_attitude_shift(&self) -> f64 {
        self.attitude_shifts
            .values()
            .map(|s| s.abs())
            .fold(0.0, f64::max)
    }

    /// Whether the snapshot lists the given event as occurred.
    pub fn has_event(&self, event_id: &str) -> bool {
        self.triggered_event_ids.iter().any(|e| e == event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods() {
        let state = GameState::new()
            .with_location("harbor")
            .with_present_npcs(["mira", "olaf"])
            .with_interaction("mira")
            .with_event("storm")
            .with_mood("olaf", "angry");

        assert_eq!(state.player_location.as_deref(), Some("harbor"));
        assert_eq!(state.present_npcs, vec!["mira", "olaf"]);
        assert_eq!(state.npc_interactions, vec!["mira"]);
        assert!(state.has_event("storm"));
        assert!(!state.has_event("fire"));
        assert_eq!(state.npc_moods["olaf"], "angry");
    }

    #[test]
    fn max_attitude_shift_uses_magnitude() {
        let state = GameState::new()
            .with_attitude_shift("mira", 0.1)
            .with_attitude_shift("olaf", -0.4);
        assert!((state.max_attitude_shift() - 0.4).abs() < f64::EPSILON);
        assert_eq!(GameState::new().max_attitude_shift(), 0.0);
    }

    #[test]
    fn missing_fields_default() {
        let state: GameState = serde_json::from_str(r#"{"player_location":"gate"}"#).unwrap();
        assert_eq!(state.player_location.as_deref(), Some("gate"));
        assert!(state.present_npcs.is_empty());
        assert!(state.current_time.is_none());
    }
}
