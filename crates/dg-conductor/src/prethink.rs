//! Speculative preparation of the next turn.
//!
//! After a turn completes, the conductor may ask a [`Predictor`] what the
//! next turn will look like. The request runs as a detached tokio task. At
//! the start of the next turn the slot is polled once: a finished prediction
//! for that turn is used, anything else is dropped. The task is never awaited
//! and never cancelled; dropping its handle detaches it.

use std::sync::Arc;

use async_trait::async_trait;
use dg_core::TurnMode;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::ConductorResult;

/// What the predictor expects of the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnPrediction {
    /// Turn the prediction is for.
    pub for_turn: u32,
    /// Expected mode. Advisory only.
    pub predicted_mode: TurnMode,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Expected scene mood.
    pub scene_mood: String,
    /// Expected tension in `[0, 1]`.
    pub tension: f64,
    /// Short direction for NPC responders.
    pub phase_guidance: String,
    /// NPCs that should respond first.
    pub focal_npcs: Vec<String>,
}

impl Default for TurnPrediction {
    fn default() -> Self {
        Self {
            for_turn: 0,
            predicted_mode: TurnMode::Dialogue,
            confidence: 0.5,
            scene_mood: "calm".to_string(),
            tension: 0.3,
            phase_guidance: String::new(),
            focal_npcs: Vec::new(),
        }
    }
}

impl TurnPrediction {
    /// Parse the first JSON object found in free-form model output.
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end < start {
            return None;
        }
        serde_json::from_str(&text[start..=end]).ok()
    }
}

/// Input handed to a predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    /// Turn to predict.
    pub for_turn: u32,
    /// Input of the turn that just completed.
    pub player_input: String,
    /// Mode of the turn that just completed.
    pub mode_used: TurnMode,
    /// Current act name.
    pub act_name: String,
    /// Current act description.
    pub act_description: String,
    /// Current act progress.
    pub progress: f64,
    /// Turns spent in the act.
    pub turns_in_act: u32,
    /// Turn budget of the act.
    pub max_turns: u32,
    /// Consecutive dialogue turns.
    pub dialogue_streak: u32,
    /// Up to three `"npc: line"` summaries of the last turn.
    pub reaction_summaries: Vec<String>,
}

impl PredictionRequest {
    /// Render the request as a prompt for a language model.
    pub fn prompt(&self) -> String {
        let mut out = format!(
            "Predict how the next turn of an interactive story should be handled.\n\n\
             Act: {} ({})\nProgress: {:.0}%\nTurns: {}/{}\n\n\
             Last player action: {}\nLast mode: {}\nDialogue turns in a row: {}\n",
            self.act_name,
            self.act_description,
            self.progress * 100.0,
            self.turns_in_act,
            self.max_turns,
            self.player_input,
            self.mode_used,
            self.dialogue_streak,
        );
        if !self.reaction_summaries.is_empty() {
            out.push_str("\nNPC reactions:\n");
            for line in &self.reaction_summaries {
                out.push_str(&format!("- {line}\n"));
            }
        }
        out.push_str(
            "\nAnswer with JSON: {\"predicted_mode\": \"DIALOGUE|PLOT_ADVANCE|ACT_TRANSITION\", \
             \"confidence\": 0-1, \"scene_mood\": str, \"tension\": 0-1, \
             \"phase_guidance\": str, \"focal_npcs\": [str]}\n",
        );
        out
    }
}

/// Produces next-turn predictions.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Predict the next turn.
    async fn predict(&self, request: PredictionRequest) -> ConductorResult<TurnPrediction>;
}

struct Pending {
    for_turn: u32,
    handle: JoinHandle<Option<TurnPrediction>>,
}

/// Holds at most one in-flight prediction.
#[derive(Default)]
pub struct PrethinkSlot {
    pending: Option<Pending>,
}

impl std::fmt::Debug for PrethinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrethinkSlot")
            .field("pending_for", &self.pending.as_ref().map(|p| p.for_turn))
            .finish()
    }
}

impl PrethinkSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn of the in-flight prediction, if any.
    pub fn pending_for(&self) -> Option<u32> {
        self.pending.as_ref().map(|p| p.for_turn)
    }

    /// Start predicting in the background.
    ///
    /// Replaces any earlier request. Returns `false` when no tokio runtime
    /// is available, in which case nothing is scheduled.
    pub fn schedule(&mut self, predictor: Arc<dyn Predictor>, request: PredictionRequest) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, pre-think skipped");
            return false;
        };
        let for_turn = request.for_turn;
        let handle = runtime.spawn(async move {
            match predictor.predict(request).await {
                Ok(mut prediction) => {
                    prediction.for_turn = for_turn;
                    Some(prediction)
                }
                Err(e) => {
                    tracing::warn!(error = %e, for_turn, "pre-think failed");
                    None
                }
            }
        });
        self.pending = Some(Pending { for_turn, handle });
        true
    }

    /// Drop any in-flight prediction without cancelling it.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Take a finished prediction for `turn`.
    ///
    /// Empties the slot either way; an unfinished task is left to run
    /// detached and its result is lost.
    pub fn take_ready(&mut self, turn: u32) -> Option<TurnPrediction> {
        let pending = self.pending.take()?;
        if pending.for_turn != turn || !pending.handle.is_finished() {
            tracing::debug!(for_turn = pending.for_turn, turn, "pre-think discarded");
            return None;
        }
        match pending.handle.now_or_never() {
            Some(Ok(prediction)) => prediction,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "pre-think task failed");
                None
            }
            None => None,
        }
    }
}
