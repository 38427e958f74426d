//! The session façade.
//!
//! A [`Session`] drives one story in one runtime directory. Every turn is
//! bracketed by two progress writes: the first, made before any generator
//! runs, forbids engine switching; the second allows it only when the turn
//! crossed a scene boundary. A crash at any point therefore leaves a record
//! that never permits an unsafe switch.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use dg_conductor::act::ActTransition;
use dg_conductor::{ActEnding, Conductor, Predictor, StoryDefinition, TurnDecision, TurnSummary};
use dg_core::{GameState, TurnMode, clock};
use dg_progress::{
    EngineType, ProgressRecord, ProgressStore, SwitchRefusal, engine_conflict, resolve_engine,
};
use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::generator::{Generators, NpcReaction, TurnBrief};
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::result::{SessionStatus, TurnResult};
use crate::world::WorldView;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created; neither started nor resumed.
    New,
    /// Ready for the next turn.
    Active,
    /// A turn is being processed.
    MidTurn,
    /// Closed; no further turns.
    Closed,
}

/// What fired events contributed to a turn.
#[derive(Debug, Default)]
struct EventContribution {
    hints: Vec<String>,
    overrides: Vec<String>,
    npc_hints: BTreeMap<String, String>,
    ending: Option<ActEnding>,
}

/// One story being played in one runtime directory.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    story: StoryDefinition,
    generators: Generators,
    store: ProgressStore,
    conductor: Conductor,
    world: WorldView,
    engine: EngineType,
    state: SessionState,
    scene_id: u32,
    next_scene_id: u32,
    turn_count: u32,
    resume_check: Option<Result<ProgressRecord, SwitchRefusal>>,
}

impl Session {
    /// Create a session for a story.
    pub fn new(
        config: SessionConfig,
        story: StoryDefinition,
        generators: Generators,
    ) -> SessionResult<Self> {
        let conductor = Conductor::from_story(config.conductor.clone(), &story)?;
        let store = ProgressStore::new(&config.runtime_dir);
        let world = WorldView::from_setting(&story.setting);
        let engine = config.engine.unwrap_or_default();
        Ok(Self {
            config,
            story,
            generators,
            store,
            conductor,
            world,
            engine,
            state: SessionState::New,
            scene_id: 1,
            next_scene_id: 2,
            turn_count: 0,
            resume_check: None,
        })
    }

    /// Attach a predictor for next-turn pre-think.
    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.conductor = self.conductor.with_predictor(predictor);
        self
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Engine in use.
    pub fn engine(&self) -> EngineType {
        self.engine
    }

    /// The conductor.
    pub fn conductor(&self) -> &Conductor {
        &self.conductor
    }

    /// The world view.
    pub fn world(&self) -> &WorldView {
        &self.world
    }

    /// The progress store.
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Current scene.
    pub fn scene_id(&self) -> u32 {
        self.scene_id
    }

    /// Total turns played.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Begin the story from its first scene.
    ///
    /// A corrupted record is quarantined and ignored. The opening is a
    /// boundary, so the first record allows switching.
    pub fn start(&mut self) -> SessionResult<String> {
        self.ensure_new()?;
        let previous = self.store.load();
        if previous.corrupted {
            tracing::warn!(
                backup = ?previous.quarantined_to,
                "starting fresh over corrupted progress"
            );
        }

        self.engine = resolve_engine(self.config.engine, false, &self.store);
        self.scene_id = 1;
        self.next_scene_id = 2;
        self.turn_count = 0;
        self.persist(true)?;
        self.state = SessionState::Active;

        tracing::info!(
            title = %self.story.title,
            engine = %self.engine,
            runtime = %self.store.runtime_dir().display(),
            "session started"
        );
        Ok(self.opening_text())
    }

    /// Whether stored progress can be resumed.
    ///
    /// The answer is computed once and cached until
    /// [`Session::invalidate_resume_cache`]; a corrupted file is quarantined
    /// on the first check only.
    pub fn can_resume(&mut self) -> bool {
        self.resume_state().is_ok()
    }

    /// Why stored progress cannot be resumed; shares the cached check.
    pub fn resume_error(&mut self) -> Option<String> {
        self.resume_state().err().map(|refusal| describe_refusal(&refusal))
    }

    /// Forget the cached resume check.
    pub fn invalidate_resume_cache(&mut self) {
        self.resume_check = None;
    }

    fn resume_state(&mut self) -> Result<ProgressRecord, SwitchRefusal> {
        if let Some(cached) = &self.resume_check {
            return cached.clone();
        }
        let checked = if !self.store.exists() {
            Err(SwitchRefusal::Missing)
        } else {
            let record = self.store.load();
            if record.corrupted {
                Err(SwitchRefusal::Corrupted {
                    backup: record.quarantined_to.clone(),
                })
            } else {
                Ok(record)
            }
        };
        self.resume_check = Some(checked.clone());
        checked
    }

    /// Continue from stored progress.
    ///
    /// Fails when there is nothing usable to resume, and when an explicit
    /// engine differs from the stored one while the record forbids
    /// switching.
    pub fn resume(&mut self) -> SessionResult<String> {
        self.ensure_new()?;
        let record = self
            .resume_state()
            .map_err(|refusal| SessionError::CannotResume(describe_refusal(&refusal)))?;

        let conflict = self
            .config
            .engine
            .and_then(|requested| engine_conflict(requested, &self.store));
        match &conflict {
            Some(c) if !c.safe => {
                tracing::error!(stored = %c.stored, requested = %c.requested, "unsafe engine switch refused");
                return Err(SessionError::UnsafeSwitch(SwitchRefusal::MidTurn));
            }
            Some(c) => {
                tracing::info!(from = %c.stored, to = %c.requested, "engine switched at boundary");
            }
            None => {}
        }

        self.engine = resolve_engine(self.config.engine, true, &self.store);
        self.scene_id = record.current_scene_id;
        self.next_scene_id = record.next_scene_id;
        self.turn_count = record.turn_count;
        if self.engine == EngineType::Orchestrated {
            while self.conductor.acts().current().number < self.scene_id {
                self.conductor.advance_act(ActEnding::Success);
            }
        }
        if conflict.is_some() {
            self.persist(record.safe_to_switch_engine)?;
        }
        self.state = SessionState::Active;

        tracing::info!(
            scene = self.scene_id,
            turns = self.turn_count,
            engine = %self.engine,
            "session resumed"
        );
        let act = self.conductor.acts().current();
        Ok(format!(
            "Restored from checkpoint.\nScene: {}\nTotal turns: {}\nAct {}: {}",
            self.scene_id, self.turn_count, act.number, act.name
        ))
    }

    /// Play one turn.
    ///
    /// Generator failures never make this return `Err`; they show up in the
    /// result. Only lifecycle and persistence errors do.
    pub async fn process_turn(&mut self, player_input: &str) -> SessionResult<TurnResult> {
        match self.state {
            SessionState::Active | SessionState::MidTurn => {}
            SessionState::New => return Err(SessionError::NotActive),
            SessionState::Closed => return Err(SessionError::Closed),
        }
        self.persist(false)?;
        self.state = SessionState::MidTurn;

        let state = self.world.game_state();
        let decision = self.conductor.decide_turn_mode(player_input, &state);
        let events = self.apply_events(&decision, &state);
        let brief = self.brief(player_input, &decision, &events);
        let output = Pipeline::new(&self.generators, self.config.generator_timeout)
            .run(&brief)
            .await;
        let success = !output.all_failed();

        if let Some(update) = &output.world {
            self.world.apply_update(update);
        }
        self.world.record_reactions(&output.reactions);

        let summary = self.summary(player_input, &state, &decision, &output);
        self.conductor.on_turn_complete(&summary);
        self.turn_count += 1;

        let ending = events.ending.or_else(|| {
            (decision.mode == TurnMode::ActTransition).then(|| decision.progress.ending())
        });
        let transition = match ending {
            Some(ending) if success => Some(self.conductor.advance_act(ending)),
            Some(_) => {
                tracing::warn!(turn = decision.turn, "act transition postponed, turn failed");
                None
            }
            None => None,
        };
        let boundary = success && self.advance_scene(transition.is_some());
        self.conductor.schedule_prethink(&summary);

        self.persist(boundary)?;
        self.state = SessionState::Active;

        let error = (!success).then(|| "every generator call failed".to_string());
        if let Some(e) = &error {
            tracing::error!(turn = decision.turn, mode = %decision.mode, "{e}");
        }
        tracing::info!(
            turn = self.turn_count,
            scene = self.scene_id,
            mode = %decision.mode,
            success,
            boundary,
            "turn complete"
        );

        Ok(TurnResult {
            success,
            text: render(transition.as_ref(), &output),
            error,
            scene_id: self.scene_id,
            turn_id: self.turn_count,
            mode: decision.mode,
            events: decision.triggered_events.iter().map(|e| e.id.clone()).collect(),
            warnings: output.failures.iter().map(ToString::to_string).collect(),
            reactions: output.reactions,
            boundary,
        })
    }

    fn apply_events(&mut self, decision: &TurnDecision, state: &GameState) -> EventContribution {
        let mut contribution = EventContribution::default();
        for event in &decision.triggered_events {
            let applied = self.conductor.apply_event_effects(event, state);
            for delta in &applied.deltas {
                self.world.apply_delta(delta);
            }
            contribution.hints.extend(applied.plot_hints);
            contribution.overrides.extend(applied.plot_override);
            contribution.npc_hints.extend(applied.npc_reactions);
            if contribution.ending.is_none() {
                contribution.ending = applied.act_transition;
            }
        }
        contribution
    }

    fn brief(&self, player_input: &str, decision: &TurnDecision, events: &EventContribution) -> TurnBrief {
        let mut hints = decision.progress.hints.clone();
        hints.extend(events.hints.iter().cloned());
        TurnBrief {
            turn: decision.turn,
            mode: decision.mode,
            player_input: player_input.to_string(),
            world: self.world.clone(),
            act_number: decision.progress.act_number,
            act_name: decision.progress.act_name.clone(),
            progress: decision.progress.progress,
            urgency: decision.progress.urgency,
            hints,
            plot_overrides: events.overrides.clone(),
            npc_hints: events.npc_hints.clone(),
            dialogue_phase: decision.dialogue_phase,
            phase_guidance: decision.phase_guidance.clone(),
            scene_mood: decision.scene_mood.clone(),
            tension: decision.tension,
            focal_npcs: decision.focal_npcs.clone(),
        }
    }

    /// The summary carries the location the turn was decided at, so a move
    /// made by the world simulator shows up as a change on the next decision.
    fn summary(
        &self,
        player_input: &str,
        state: &GameState,
        decision: &TurnDecision,
        output: &PipelineOutput,
    ) -> TurnSummary {
        let mut summary = TurnSummary::new(decision.mode, player_input)
            .with_location(state.player_location.clone());
        summary.npc_interactions = output.reactions.iter().map(|r| r.npc_id.clone()).collect();
        summary.reaction_summaries = output
            .reactions
            .iter()
            .take(3)
            .map(NpcReaction::summary)
            .collect();
        if let Some(plot) = &output.plot {
            summary.flags = plot
                .flags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        summary
    }

    /// Move to the next scene if the engine says this turn ends one.
    fn advance_scene(&mut self, act_closed: bool) -> bool {
        let crossed = match self.engine {
            EngineType::Orchestrated => act_closed,
            EngineType::Linear => self.turn_count % self.config.turns_per_scene.max(1) == 0,
        };
        if crossed {
            self.scene_id = self.next_scene_id;
            self.next_scene_id = self.scene_id + 1;
            tracing::info!(scene = self.scene_id, engine = %self.engine, "scene boundary");
        }
        crossed
    }

    /// Write a checkpoint.
    ///
    /// `at_boundary` is the caller's assertion that switching is safe here;
    /// it is refused while a turn is in progress.
    pub fn save(&mut self, name: &str, at_boundary: bool) -> SessionResult<PathBuf> {
        match self.state {
            SessionState::Closed => return Err(SessionError::Closed),
            SessionState::MidTurn if at_boundary => return Err(SessionError::MidTurn),
            _ => {}
        }
        let path = self.persist(at_boundary)?;
        tracing::info!(name, at_boundary, path = %path.display(), "checkpoint written");
        Ok(path)
    }

    fn persist(&mut self, safe: bool) -> SessionResult<PathBuf> {
        let record = ProgressRecord::new(
            self.scene_id,
            self.next_scene_id,
            self.turn_count,
            self.engine,
            safe,
        );
        let path = self.store.save(&record)?;
        self.invalidate_resume_cache();
        Ok(path)
    }

    /// Where the session stands.
    pub fn get_status(&self) -> SessionStatus {
        let act = self.conductor.acts().current();
        SessionStatus {
            scene_id: self.scene_id,
            turn_id: self.turn_count,
            location: self.world.location.clone(),
            current_time: self.world.current_time.as_ref().map(clock::format_world_time),
            present_npcs: self.world.present_npcs.clone(),
            engine: self.engine,
            act_number: act.number,
            act_name: act.name.clone(),
            progress: act.progress,
            can_continue: matches!(self.state, SessionState::Active),
        }
    }

    /// Two things the player could try next.
    pub fn get_action_suggestions(&self) -> Vec<String> {
        let mut suggestions = Vec::new();
        match self.world.present_npcs.first() {
            Some(npc) => suggestions.push(format!("Talk to {npc}")),
            None => suggestions.push("Call out to see who is near".to_string()),
        }
        match &self.world.location {
            Some(location) => suggestions.push(format!("Look around {location}")),
            None => suggestions.push("Look around".to_string()),
        }
        suggestions
    }

    /// End the session. A pending pre-think is left to finish on its own.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::info!(turns = self.turn_count, scene = self.scene_id, "session closed");
        }
        self.state = SessionState::Closed;
    }

    fn ensure_new(&self) -> SessionResult<()> {
        match self.state {
            SessionState::New => Ok(()),
            SessionState::Closed => Err(SessionError::Closed),
            SessionState::Active | SessionState::MidTurn => Err(SessionError::AlreadyStarted),
        }
    }

    fn opening_text(&self) -> String {
        let mut lines = Vec::new();
        if !self.story.title.is_empty() {
            lines.push(format!("== {} ==", self.story.title));
        }
        if !self.story.setting.opening.is_empty() {
            lines.push(self.story.setting.opening.clone());
        }
        let act = self.conductor.acts().current();
        lines.push(format!("Act {}: {}", act.number, act.name));
        if let Some(location) = &self.world.location {
            lines.push(format!("You are at {location}."));
        }
        if !self.world.present_npcs.is_empty() {
            lines.push(format!("Here: {}", self.world.present_npcs.join(", ")));
        }
        lines.join("\n")
    }
}

fn describe_refusal(refusal: &SwitchRefusal) -> String {
    match refusal {
        SwitchRefusal::Corrupted {
            backup: Some(backup),
        } => format!("{refusal} (backup: {})", backup.display()),
        _ => refusal.reason(),
    }
}

fn render(transition: Option<&ActTransition>, output: &PipelineOutput) -> String {
    let mut lines = Vec::new();
    lines.extend(
        output
            .plot
            .iter()
            .map(|p| p.narration.clone())
            .filter(|n| !n.is_empty()),
    );
    lines.extend(transition.map(|t| t.narration.clone()));
    lines.extend(
        output
            .atmosphere
            .iter()
            .map(|a| a.description.clone())
            .filter(|d| !d.is_empty()),
    );
    for reaction in &output.reactions {
        let name = if reaction.name.is_empty() {
            &reaction.npc_id
        } else {
            &reaction.name
        };
        if reaction.action.is_empty() {
            lines.push(format!("{name}: {}", reaction.dialogue));
        } else {
            lines.push(format!("{name} ({}): {}", reaction.action, reaction.dialogue));
        }
    }
    lines.join("\n")
}
