//! The conductor: one decision per turn.
//!
//! The conductor owns the classifier, the act tracker and the event engine,
//! and is the only code that mutates them. Each turn:
//!
//! 1. [`Conductor::decide_turn_mode`] fires events, counts the turn against
//!    the act, evaluates progress and classifies the turn.
//! 2. The caller applies effects of fired events with
//!    [`Conductor::apply_event_effects`] and runs the generators.
//! 3. On an act transition the caller closes the act with
//!    [`Conductor::advance_act`].
//! 4. [`Conductor::on_turn_complete`] folds the turn's results back in.

use std::collections::BTreeMap;
use std::sync::Arc;

use dg_core::{FlagValue, GameState, TurnContext, TurnMode};
use serde::Serialize;

use crate::act::{ActDefinition, ActEnding, ActSnapshot, ActTracker, ActTransition, ProgressReport};
use crate::classifier::{AdvanceReason, Classification, TurnClassifier};
use crate::config::ConductorConfig;
use crate::error::ConductorResult;
use crate::event::{AppliedEffects, EventEngine, EventSlot, GameEvent};
use crate::phase::{DialoguePhase, PhaseTracker};
use crate::prethink::{PredictionRequest, Predictor, PrethinkSlot, TurnPrediction};
use crate::story::StoryDefinition;

/// Everything decided about one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnDecision {
    /// Turn number being played (1-based).
    pub turn: u32,
    /// Chosen mode.
    pub mode: TurnMode,
    /// Human-readable reason for the mode.
    pub reason: String,
    /// Structured reasons; empty for plain dialogue.
    #[serde(skip)]
    pub reasons: Vec<AdvanceReason>,
    /// Events fired this turn, strongest first.
    pub triggered_events: Vec<GameEvent>,
    /// Act evaluation for this turn.
    pub progress: ProgressReport,
    /// Current dialogue phase.
    pub dialogue_phase: DialoguePhase,
    /// Direction for NPC responders.
    pub phase_guidance: String,
    /// NPCs that should respond.
    pub focal_npcs: Vec<String>,
    /// Mood of the scene.
    pub scene_mood: String,
    /// Tension in `[0, 1]`.
    pub tension: f64,
    /// Whether a pre-think prediction refined this decision.
    pub used_prediction: bool,
}

/// Results of a completed turn, fed back into the conductor.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    /// Mode the turn was played in.
    pub mode: TurnMode,
    /// Player input of the turn.
    pub player_input: String,
    /// Player location the turn was decided at.
    pub location: Option<String>,
    /// NPCs that responded.
    pub npc_interactions: Vec<String>,
    /// Flags the plot output set.
    pub flags: Vec<(String, FlagValue)>,
    /// Up to three `"npc: line"` summaries for pre-think.
    pub reaction_summaries: Vec<String>,
}

impl TurnSummary {
    /// Summary with only mode and input.
    pub fn new(mode: TurnMode, player_input: impl Into<String>) -> Self {
        Self {
            mode,
            player_input: player_input.into(),
            location: None,
            npc_interactions: Vec::new(),
            flags: Vec::new(),
            reaction_summaries: Vec::new(),
        }
    }

    /// Set the location the turn was decided at.
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    /// Record an NPC that responded.
    pub fn with_interaction(mut self, npc_id: impl Into<String>) -> Self {
        self.npc_interactions.push(npc_id.into());
        self
    }
}

/// Serializable view of the conductor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConductorSnapshot {
    /// Turns completed.
    pub turns_completed: u32,
    /// Consecutive dialogue turns.
    pub dialogue_streak: u32,
    /// Current dialogue phase.
    pub dialogue_phase: DialoguePhase,
    /// Act tracker view.
    pub acts: ActSnapshot,
    /// Event engine flags.
    pub event_flags: BTreeMap<String, FlagValue>,
    /// Events fired so far.
    pub events_fired: usize,
}

/// Decides how each turn is handled.
pub struct Conductor {
    classifier: TurnClassifier,
    acts: ActTracker,
    events: EventEngine,
    phase: PhaseTracker,
    predictor: Option<Arc<dyn Predictor>>,
    prethink: PrethinkSlot,
    turns_completed: u32,
    last_location: Option<String>,
}

impl std::fmt::Debug for Conductor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conductor")
            .field("turns_completed", &self.turns_completed)
            .field("act", &self.acts.current().number)
            .field("events", &self.events)
            .field("phase", &self.phase.phase())
            .field("predictor", &self.predictor.is_some())
            .finish()
    }
}

impl Conductor {
    /// Create a conductor over explicit act and event catalogs.
    pub fn new(
        config: ConductorConfig,
        acts: Vec<ActDefinition>,
        events: Vec<GameEvent>,
    ) -> ConductorResult<Self> {
        Ok(Self {
            classifier: TurnClassifier::new(config.classifier),
            acts: ActTracker::new(acts),
            events: EventEngine::with_events(events, config.seed)?,
            phase: PhaseTracker::new(config.phase_length),
            predictor: None,
            prethink: PrethinkSlot::new(),
            turns_completed: 0,
            last_location: None,
        })
    }

    /// Create a conductor for a story; the story's classifier settings win.
    pub fn from_story(config: ConductorConfig, story: &StoryDefinition) -> ConductorResult<Self> {
        let config = config.with_classifier(story.classifier.clone());
        Self::new(config, story.acts.clone(), story.events.clone())
    }

    /// Attach a predictor for pre-think.
    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Get the classifier.
    pub fn classifier(&self) -> &TurnClassifier {
        &self.classifier
    }

    /// Get the act tracker.
    pub fn acts(&self) -> &ActTracker {
        &self.acts
    }

    /// Get the event engine.
    pub fn events(&self) -> &EventEngine {
        &self.events
    }

    /// Current dialogue phase.
    pub fn dialogue_phase(&self) -> DialoguePhase {
        self.phase.phase()
    }

    /// Turns completed so far.
    pub fn turns_completed(&self) -> u32 {
        self.turns_completed
    }

    /// Number of the turn about to be played.
    pub fn next_turn(&self) -> u32 {
        self.turns_completed + 1
    }

    /// Evaluate the current act without counting a turn.
    pub fn evaluate_progress(&mut self, state: &GameState) -> ProgressReport {
        self.acts.evaluate_progress(state)
    }

    /// Fire events for the turn about to be played.
    pub fn check_triggers(&mut self, state: &GameState) -> Vec<GameEvent> {
        let turn = self.next_turn();
        self.events.check_triggers(state, turn)
    }

    /// Decide how to handle the turn about to be played.
    pub fn decide_turn_mode(&mut self, player_input: &str, state: &GameState) -> TurnDecision {
        let turn = self.next_turn();
        let prediction = self.prethink.take_ready(turn);
        let fired = self.check_triggers(state);

        self.acts.enter_turn();
        let mut observed = state.clone();
        observed
            .triggered_event_ids
            .extend(fired.iter().map(|e| e.id.clone()));
        let report = self.acts.evaluate_progress(&observed);

        let location_changed = match (&self.last_location, &state.player_location) {
            (Some(before), Some(now)) => before != now,
            _ => false,
        };
        let ctx = TurnContext {
            player_input: player_input.to_string(),
            // A failed act is resolved even when its objectives are not.
            act_progress: if report.failed.is_empty() {
                report.progress
            } else {
                1.0
            },
            act_urgency: report.urgency,
            turns_in_act: report.turns_in_act,
            max_turns: report.max_turns,
            dialogue_turns_since_plot: self.classifier.dialogue_streak(),
            highest_event_priority: fired.iter().map(|e| e.priority).max(),
            triggered_event_ids: fired.iter().map(|e| e.id.clone()).collect(),
            location_changed,
            max_attitude_shift: state.max_attitude_shift(),
        };
        let classification = self.classifier.classify_with_reasons(&ctx);

        let decision = self.build_decision(turn, classification, fired, report, state, prediction);
        tracing::info!(
            turn,
            mode = %decision.mode,
            reason = %decision.reason,
            events = decision.triggered_events.len(),
            progress = decision.progress.progress,
            "turn mode decided"
        );
        decision
    }

    fn build_decision(
        &self,
        turn: u32,
        classification: Classification,
        fired: Vec<GameEvent>,
        report: ProgressReport,
        state: &GameState,
        prediction: Option<TurnPrediction>,
    ) -> TurnDecision {
        let phase = self.phase.phase();
        let mut decision = TurnDecision {
            turn,
            mode: classification.mode,
            reason: classification.reason_text(),
            reasons: classification.reasons,
            triggered_events: fired,
            dialogue_phase: phase,
            phase_guidance: phase.guidance().to_string(),
            focal_npcs: state.present_npcs.clone(),
            scene_mood: mood_for(report.urgency).to_string(),
            tension: report.urgency,
            progress: report,
            used_prediction: false,
        };

        if let Some(prediction) = prediction {
            let focal: Vec<String> = prediction
                .focal_npcs
                .iter()
                .filter(|npc| state.present_npcs.contains(npc))
                .cloned()
                .collect();
            if !focal.is_empty() {
                decision.focal_npcs = focal;
            }
            if !prediction.scene_mood.is_empty() {
                decision.scene_mood = prediction.scene_mood;
            }
            if !prediction.phase_guidance.is_empty() {
                decision.phase_guidance = prediction.phase_guidance;
            }
            decision.tension = prediction.tension.clamp(0.0, 1.0);
            decision.used_prediction = true;
        }
        decision
    }

    /// Apply a fired event's effects.
    ///
    /// Flag effects land in both the event engine and the act tracker.
    pub fn apply_event_effects(&mut self, event: &GameEvent, state: &GameState) -> AppliedEffects {
        let applied = self.events.apply_effects(event, state);
        for (flag, value) in &applied.flags_set {
            self.acts.set_flag(flag.clone(), value.clone());
        }
        applied
    }

    /// Fire a manual event; see [`EventEngine::trigger_manual_event`].
    pub fn trigger_manual_event(&mut self, event_id: &str) -> ConductorResult<Option<GameEvent>> {
        self.events.trigger_manual_event(event_id)
    }

    /// Add an event while the story runs.
    pub fn add_dynamic_event(&mut self, event: GameEvent) -> ConductorResult<EventSlot> {
        self.events.add_dynamic_event(event)
    }

    /// Insert an act right after the current one.
    pub fn insert_act_after_current(&mut self, definition: ActDefinition) -> u32 {
        self.acts.insert_act_after_current(definition)
    }

    /// Append an act at the end of the catalog.
    pub fn append_act(&mut self, definition: ActDefinition) -> u32 {
        self.acts.append_act(definition)
    }

    /// Close the current act and open the next.
    pub fn advance_act(&mut self, ending: ActEnding) -> ActTransition {
        let transition = self.acts.advance_to_next_act(ending);
        self.classifier.reset_dialogue_counter();
        self.phase.reset();
        self.events.import_flags(self.acts.flags());
        transition
    }

    /// Fold a completed turn back in and invalidate any stale prediction.
    pub fn on_turn_complete(&mut self, summary: &TurnSummary) {
        if let Some(location) = &summary.location {
            self.last_location = Some(location.clone());
        }
        if summary.mode.is_dialogue() {
            self.phase.record_dialogue_turn();
        } else {
            self.phase.reset();
            self.classifier.reset_dialogue_counter();
        }
        for npc in &summary.npc_interactions {
            self.acts.record_npc_interaction(npc.clone());
        }
        for (flag, value) in &summary.flags {
            self.acts.set_flag(flag.clone(), value.clone());
            self.events.set_flag(flag.clone(), value.clone());
        }
        self.turns_completed += 1;

        self.prethink.clear();
        tracing::debug!(turns = self.turns_completed, mode = %summary.mode, "turn completed");
    }

    /// Start predicting the next turn in the background.
    ///
    /// Does nothing without a predictor or a tokio runtime.
    pub fn schedule_prethink(&mut self, summary: &TurnSummary) -> bool {
        let Some(predictor) = self.predictor.clone() else {
            return false;
        };
        let act = self.acts.current();
        let request = PredictionRequest {
            for_turn: self.next_turn(),
            player_input: summary.player_input.clone(),
            mode_used: summary.mode,
            act_name: act.name.clone(),
            act_description: self.acts.objective().description.clone(),
            progress: act.progress,
            turns_in_act: act.turns_in_act,
            max_turns: self.acts.objective().max_turns,
            dialogue_streak: self.classifier.dialogue_streak(),
            reaction_summaries: summary.reaction_summaries.iter().take(3).cloned().collect(),
        };
        self.prethink.schedule(predictor, request)
    }

    /// Serializable view of the conductor.
    pub fn snapshot(&self) -> ConductorSnapshot {
        ConductorSnapshot {
            turns_completed: self.turns_completed,
            dialogue_streak: self.classifier.dialogue_streak(),
            dialogue_phase: self.phase.phase(),
            acts: self.acts.snapshot(),
            event_flags: self.events.flags().clone(),
            events_fired: self.events.history().len(),
        }
    }
}

fn mood_for(urgency: f64) -> &'static str {
    if urgency < 0.4 {
        "calm"
    } else if urgency < 0.7 {
        "uneasy"
    } else {
        "tense"
    }
}
