//! Act progress tracking.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dg_core::{FlagValue, GameState};
use serde::Serialize;

use super::objective::{ActCondition, ActDefinition, ActObjective};
use super::state::{ActEnding, ActOutcome, ActState};

/// What happened in the current act so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActTallies {
    /// Locations the player stood in during the act.
    pub locations_visited: BTreeSet<String>,
    /// Interactions per NPC id during the act.
    pub npc_interactions: BTreeMap<String, u32>,
    /// Events seen during the act.
    pub events_occurred: BTreeSet<String>,
}

impl ActTallies {
    /// Total interactions across all NPCs.
    pub fn total_interactions(&self) -> u32 {
        self.npc_interactions.values().sum()
    }

    /// Interactions with one NPC.
    pub fn interactions_with(&self, npc_id: &str) -> u32 {
        self.npc_interactions.get(npc_id).copied().unwrap_or(0)
    }
}

/// Result of evaluating the current act.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// Act number.
    pub act_number: u32,
    /// Act name.
    pub act_name: String,
    /// Completion ratio in `[0, 1]`.
    pub progress: f64,
    /// Narrative urgency in `[0, 1]`.
    pub urgency: f64,
    /// Completion conditions that hold.
    pub completed: Vec<ActCondition>,
    /// Completion conditions that do not hold yet.
    pub pending: Vec<ActCondition>,
    /// Failure conditions that hold.
    pub failed: Vec<ActCondition>,
    /// Whether the act should end.
    pub should_advance: bool,
    /// Guidance for the plot generator.
    pub hints: Vec<String>,
    /// Turns entered in the act.
    pub turns_in_act: u32,
    /// Turn budget of the act.
    pub max_turns: u32,
}

impl ProgressReport {
    /// Turns left before the budget runs out.
    pub fn turns_remaining(&self) -> u32 {
        self.max_turns.saturating_sub(self.turns_in_act)
    }

    /// How the act would end if it ended now.
    pub fn ending(&self) -> ActEnding {
        if !self.failed.is_empty() {
            ActEnding::Failure
        } else if !self.completed.is_empty() && self.pending.is_empty() {
            ActEnding::Success
        } else {
            ActEnding::Timeout
        }
    }
}

/// An act that just ended and the act that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActTransition {
    /// The act that ended, with its outcome.
    pub completed: ActState,
    /// The act now being played.
    pub next: ActState,
    /// One-line narration of the change.
    pub narration: String,
}

/// Serializable view of the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActSnapshot {
    /// Current act.
    pub current: ActState,
    /// Number of finished acts.
    pub history_len: usize,
    /// Story flags.
    pub flags: BTreeMap<String, FlagValue>,
    /// Tallies of the current act.
    pub tallies: ActTallies,
}

/// Tracks the current act, its objective, and act history.
///
/// The definition list is copy-on-write: edits build a new list and swap
/// it in, so a snapshot taken with [`ActTracker::definitions`] never sees
/// a partially renumbered catalog.
#[derive(Debug, Clone)]
pub struct ActTracker {
    definitions: Arc<Vec<ActDefinition>>,
    current: ActState,
    objective: ActObjective,
    history: Vec<ActState>,
    tallies: ActTallies,
    flags: BTreeMap<String, FlagValue>,
}

impl Default for ActTracker {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ActTracker {
    /// Create a tracker positioned on the lowest-numbered act.
    ///
    /// With no definitions the story starts in free exploration.
    pub fn new(mut definitions: Vec<ActDefinition>) -> Self {
        definitions.sort_by_key(|d| d.number);
        let first = definitions
            .first()
            .cloned()
            .unwrap_or_else(ActDefinition::free_exploration);

        Self {
            definitions: Arc::new(definitions),
            current: ActState::start(first.number, first.name.clone()),
            objective: first.objective,
            history: Vec::new(),
            tallies: ActTallies::default(),
            flags: BTreeMap::new(),
        }
    }

    /// Get the current act.
    pub fn current(&self) -> &ActState {
        &self.current
    }

    /// Get the current act's objective.
    pub fn objective(&self) -> &ActObjective {
        &self.objective
    }

    /// Snapshot of the authored act list, ordered by number.
    pub fn definitions(&self) -> Arc<Vec<ActDefinition>> {
        Arc::clone(&self.definitions)
    }

    /// Finished acts, oldest first.
    pub fn history(&self) -> &[ActState] {
        &self.history
    }

    /// Tallies of the current act.
    pub fn tallies(&self) -> &ActTallies {
        &self.tallies
    }

    /// Story flags.
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Set a story flag.
    pub fn set_flag(&mut self, flag: impl Into<String>, value: FlagValue) {
        self.flags.insert(flag.into(), value);
    }

    /// Count a turn against the current act.
    pub fn enter_turn(&mut self) {
        self.current.turns_in_act += 1;
        tracing::debug!(
            act = self.current.number,
            turns = self.current.turns_in_act,
            "act turn entered"
        );
    }

    /// Record an interaction with an NPC.
    pub fn record_npc_interaction(&mut self, npc_id: impl Into<String>) {
        *self.tallies.npc_interactions.entry(npc_id.into()).or_insert(0) += 1;
    }

    /// Turns left in the current act's budget.
    pub fn turns_remaining(&self) -> u32 {
        self.objective
            .max_turns
            .saturating_sub(self.current.turns_in_act)
    }

    /// Fold a game-state snapshot into the tallies and evaluate the act.
    pub fn evaluate_progress(&mut self, state: &GameState) -> ProgressReport {
        self.absorb(state);

        let turns = self.current.turns_in_act;
        let objective = &self.objective;
        let (completed, pending) = self.partition(&objective.completion_conditions);
        let failed: Vec<ActCondition> = objective
            .failure_conditions
            .iter()
            .filter(|c| self.holds(c))
            .cloned()
            .collect();

        let ratio = f64::from(turns) / f64::from(objective.max_turns.max(1));
        let total = objective.completion_conditions.len();
        let progress = if total > 0 {
            completed.len() as f64 / total as f64
        } else {
            ratio.min(1.0)
        };
        let urgency = objective.urgency_curve.urgency(ratio, progress);

        let all_complete = total > 0 && pending.is_empty();
        let should_advance = all_complete || turns >= objective.max_turns || !failed.is_empty();
        let hints = self.hints(&pending, urgency);

        let flags: BTreeMap<String, bool> = objective
            .completion_conditions
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("{i}:{}", c.kind()), self.holds(c)))
            .collect();
        self.current.completion_flags = flags;
        self.current.progress = progress;

        tracing::debug!(
            act = self.current.number,
            progress,
            urgency,
            should_advance,
            "act evaluated"
        );

        ProgressReport {
            act_number: self.current.number,
            act_name: self.current.name.clone(),
            progress,
            urgency,
            completed,
            pending,
            failed,
            should_advance,
            hints,
            turns_in_act: turns,
            max_turns: self.objective.max_turns,
        }
    }

    fn absorb(&mut self, state: &GameState) {
        if let Some(location) = &state.player_location {
            self.tallies.locations_visited.insert(location.clone());
        }
        for npc in &state.npc_interactions {
            self.record_npc_interaction(npc.clone());
        }
        for event in &state.triggered_event_ids {
            self.tallies.events_occurred.insert(event.clone());
        }
    }

    fn partition(&self, conditions: &[ActCondition]) -> (Vec<ActCondition>, Vec<ActCondition>) {
        conditions.iter().cloned().partition(|c| self.holds(c))
    }

    fn holds(&self, condition: &ActCondition) -> bool {
        let tallies = &self.tallies;
        match condition {
            ActCondition::NpcInteractionCount { threshold } => {
                tallies.total_interactions() >= *threshold
            }
            ActCondition::SpecificNpcInteraction { npc_id, threshold } => {
                tallies.interactions_with(npc_id) >= *threshold
            }
            ActCondition::LocationVisited { locations } => locations
                .iter()
                .all(|l| tallies.locations_visited.contains(l)),
            ActCondition::FlagSet { flag, value } => self.flags.get(flag) == Some(value),
            ActCondition::EventOccurred { event_id } => tallies.events_occurred.contains(event_id),
            ActCondition::TurnsElapsed { min_turns } => self.current.turns_in_act >= *min_turns,
            ActCondition::Unrecognized => false,
        }
    }

    fn hints(&self, pending: &[ActCondition], urgency: f64) -> Vec<String> {
        let mut hints = Vec::new();
        for condition in pending {
            match condition {
                ActCondition::NpcInteractionCount { threshold } => hints.push(format!(
                    "steer the player toward more NPC conversations ({}/{threshold})",
                    self.tallies.total_interactions()
                )),
                ActCondition::LocationVisited { locations } => {
                    let unvisited: Vec<&str> = locations
                        .iter()
                        .filter(|l| !self.tallies.locations_visited.contains(*l))
                        .take(2)
                        .map(String::as_str)
                        .collect();
                    if !unvisited.is_empty() {
                        hints.push(format!(
                            "hint that the player could explore: {}",
                            unvisited.join(", ")
                        ));
                    }
                }
                ActCondition::SpecificNpcInteraction { npc_id, .. } => {
                    hints.push(format!("create an opening to interact with {npc_id}"));
                }
                _ => {}
            }
        }

        if urgency > 0.8 {
            hints.push("accelerate the plot toward a turning point".to_string());
        } else if urgency > 0.6 {
            hints.push("begin foreshadowing a major event".to_string());
        }
        if !self.objective.plot_guidance.is_empty() {
            hints.push(format!("guidance: {}", self.objective.plot_guidance));
        }
        hints
    }

    /// Close the current act and open the next one.
    ///
    /// The next act is the authored act numbered one higher; when there is
    /// none an open-ended act is synthesized.
    pub fn advance_to_next_act(&mut self, ending: ActEnding) -> ActTransition {
        let next_number = self.current.number + 1;
        let next_def = self
            .definitions
            .iter()
            .find(|d| d.number == next_number)
            .cloned()
            .unwrap_or_else(|| ActDefinition::open_development(next_number));

        let mut completed = std::mem::replace(
            &mut self.current,
            ActState::start(next_def.number, next_def.name.clone()),
        );
        completed.close(ending);
        self.objective = next_def.objective;
        self.tallies = ActTallies::default();

        let narration = transition_narration(&completed);
        tracing::info!(
            completed = completed.number,
            outcome = %completed.outcome,
            next = self.current.number,
            next_name = %self.current.name,
            "act transition"
        );

        self.history.push(completed.clone());
        ActTransition {
            completed,
            next: self.current.clone(),
            narration,
        }
    }

    /// Insert an act right after the current one, renumbering later acts.
    ///
    /// Returns the number given to the new act.
    pub fn insert_act_after_current(&mut self, mut definition: ActDefinition) -> u32 {
        let number = self.current.number + 1;
        definition.number = number;

        let mut acts: Vec<ActDefinition> = self.definitions.as_ref().clone();
        for act in acts.iter_mut().filter(|a| a.number >= number) {
            act.number += 1;
        }
        let index = acts.partition_point(|a| a.number < number);
        acts.insert(index, definition);
        self.definitions = Arc::new(acts);

        tracing::info!(number, "act inserted after current");
        number
    }

    /// Append an act after the highest-numbered one.
    ///
    /// Returns the number given to the new act.
    pub fn append_act(&mut self, mut definition: ActDefinition) -> u32 {
        let highest = self
            .definitions
            .iter()
            .map(|d| d.number)
            .max()
            .unwrap_or(0)
            .max(self.current.number);
        definition.number = highest + 1;
        let number = definition.number;

        let mut acts: Vec<ActDefinition> = self.definitions.as_ref().clone();
        acts.push(definition);
        self.definitions = Arc::new(acts);

        tracing::info!(number, "act appended");
        number
    }

    /// Serializable view of the tracker.
    pub fn snapshot(&self) -> ActSnapshot {
        ActSnapshot {
            current: self.current.clone(),
            history_len: self.history.len(),
            flags: self.flags.clone(),
            tallies: self.tallies.clone(),
        }
    }
}

fn transition_narration(act: &ActState) -> String {
    match act.outcome {
        ActOutcome::Success => format!("{} ends in triumph; a new chapter opens...", act.name),
        ActOutcome::Failure => format!("{} falls short, yet the story goes on...", act.name),
        ActOutcome::Timeout => format!(
            "Time runs on and {} draws to a close; fate turns its wheel...",
            act.name
        ),
        ActOutcome::Ongoing => format!("{} pauses here...", act.name),
    }
}
