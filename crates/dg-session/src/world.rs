//! The session's view of the world.
//!
//! The session owns the only mutable copy. Each turn it hands the conductor
//! a [`GameState`] snapshot and folds generator output and event deltas back
//! in afterwards.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use dg_conductor::{StorySetting, WorldDelta};
use dg_core::GameState;
use serde::Serialize;

use crate::generator::{NpcReaction, WorldUpdate};

/// Location, clock and cast as the session last saw them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldView {
    /// Player location.
    pub location: Option<String>,
    /// In-world time.
    pub current_time: Option<NaiveDateTime>,
    /// NPCs at the player's location.
    pub present_npcs: Vec<String>,
    /// Mood per NPC.
    pub npc_moods: BTreeMap<String, String>,
    /// Attitude shifts from the latest reactions.
    pub attitude_shifts: BTreeMap<String, f64>,
}

impl WorldView {
    /// View at the opening of a story.
    pub fn from_setting(setting: &StorySetting) -> Self {
        Self {
            location: setting.location.clone(),
            current_time: setting.start_time,
            present_npcs: setting.present_npcs.clone(),
            ..Self::default()
        }
    }

    /// Snapshot for the conductor.
    pub fn game_state(&self) -> GameState {
        GameState {
            player_location: self.location.clone(),
            present_npcs: self.present_npcs.clone(),
            npc_interactions: Vec::new(),
            triggered_event_ids: Vec::new(),
            npc_moods: self
                .npc_moods
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            attitude_shifts: self
                .attitude_shifts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            current_time: self.current_time,
        }
    }

    /// Whether an NPC is at the player's location.
    pub fn is_present(&self, npc_id: &str) -> bool {
        self.present_npcs.iter().any(|n| n == npc_id)
    }

    /// Fold in a world simulator update.
    pub fn apply_update(&mut self, update: &WorldUpdate) {
        if let Some(time) = self.current_time {
            self.current_time = Some(time + Duration::minutes(i64::from(update.minutes_elapsed)));
        }
        if let Some(location) = &update.location {
            self.location = Some(location.clone());
        }
        self.present_npcs.retain(|n| !update.departures.contains(n));
        for npc in &update.arrivals {
            if !self.is_present(npc) {
                self.present_npcs.push(npc.clone());
            }
        }
        for (npc, mood) in &update.npc_moods {
            self.npc_moods.insert(npc.clone(), mood.clone());
        }
    }

    /// Apply a delta produced by an event.
    pub fn apply_delta(&mut self, delta: &WorldDelta) {
        match delta {
            WorldDelta::NpcMood { npc_id, mood } => {
                self.npc_moods.insert(npc_id.clone(), mood.clone());
            }
            WorldDelta::SpawnNpc { npc_id, location } => {
                let here = match (location, &self.location) {
                    (Some(target), Some(current)) => target == current,
                    _ => true,
                };
                if here && !self.is_present(npc_id) {
                    self.present_npcs.push(npc_id.clone());
                }
            }
        }
    }

    /// Replace attitude shifts and moods with this turn's reactions.
    pub fn record_reactions(&mut self, reactions: &[NpcReaction]) {
        self.attitude_shifts = reactions
            .iter()
            .filter(|r| r.attitude_shift != 0.0)
            .map(|r| (r.npc_id.clone(), r.attitude_shift))
            .collect();
        for reaction in reactions {
            if !reaction.emotion.is_empty() {
                self.npc_moods
                    .insert(reaction.npc_id.clone(), reaction.emotion.clone());
            }
        }
    }
}
