//! Per-mode generator pipelines.
//!
//! Every generator call is its own future bounded by the session timeout.
//! Independent calls are joined together; a failed or timed-out call is
//! logged and omitted without cancelling its siblings.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use dg_core::TurnMode;
use futures::future::join_all;

use crate::error::GeneratorResult;
use crate::generator::{Atmosphere, Generators, NpcReaction, PlotBeat, TurnBrief, WorldUpdate};

/// A generator call within a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// World simulator.
    World,
    /// Plot generator.
    Plot,
    /// Atmosphere generator.
    Atmosphere,
    /// Responder for one NPC.
    Npc(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::World => write!(f, "world"),
            Self::Plot => write!(f, "plot"),
            Self::Atmosphere => write!(f, "atmosphere"),
            Self::Npc(id) => write!(f, "npc:{id}"),
        }
    }
}

/// A call that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    /// Which call.
    pub stage: Stage,
    /// What went wrong.
    pub error: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

/// Collected output of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// World update, if the simulator ran and succeeded.
    pub world: Option<WorldUpdate>,
    /// Plot beat, if the plot generator ran and succeeded.
    pub plot: Option<PlotBeat>,
    /// Atmosphere, if the generator ran and succeeded.
    pub atmosphere: Option<Atmosphere>,
    /// Successful NPC reactions, in call order.
    pub reactions: Vec<NpcReaction>,
    /// Calls that failed or timed out.
    pub failures: Vec<StageFailure>,
    /// Calls attempted.
    pub attempted: usize,
}

impl PipelineOutput {
    /// Whether calls were made and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failures.len() == self.attempted
    }

    fn record<T>(&mut self, result: Result<T, StageFailure>) -> Option<T> {
        self.attempted += 1;
        match result {
            Ok(value) => Some(value),
            Err(failure) => {
                tracing::warn!(stage = %failure.stage, error = %failure.error, "generator call omitted");
                self.failures.push(failure);
                None
            }
        }
    }
}

/// Await one generator call for at most `limit`.
pub async fn bounded<T, F>(stage: Stage, limit: Duration, call: F) -> Result<T, StageFailure>
where
    F: Future<Output = GeneratorResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StageFailure {
            stage,
            error: e.to_string(),
        }),
        Err(_) => Err(StageFailure {
            stage,
            error: format!("timed out after {}ms", limit.as_millis()),
        }),
    }
}

/// Runs the pipeline that matches a turn's mode.
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    generators: &'a Generators,
    limit: Duration,
}

impl<'a> Pipeline<'a> {
    /// Pipeline over a generator bundle with a per-call bound.
    pub fn new(generators: &'a Generators, limit: Duration) -> Self {
        Self { generators, limit }
    }

    /// Run the pipeline for `brief.mode`.
    pub async fn run(&self, brief: &TurnBrief) -> PipelineOutput {
        let mut out = PipelineOutput::default();
        match brief.mode {
            TurnMode::Dialogue => {
                let speakers = speakers(brief, None);
                for result in self.respond_all(brief, &speakers).await {
                    if let Some(reaction) = out.record(result) {
                        out.reactions.push(reaction);
                    }
                }
            }
            TurnMode::PlotAdvance => {
                let brief = self.simulate(brief, &mut out).await;
                out.plot = self.plot(&brief, &mut out).await;

                let speakers = speakers(&brief, out.plot.as_ref());
                let (atmosphere, reactions) = futures::join!(
                    bounded(
                        Stage::Atmosphere,
                        self.limit,
                        self.generators.atmosphere.describe(&brief)
                    ),
                    self.respond_all(&brief, &speakers),
                );
                out.atmosphere = out.record(atmosphere);
                for result in reactions {
                    if let Some(reaction) = out.record(result) {
                        out.reactions.push(reaction);
                    }
                }
            }
            TurnMode::ActTransition => {
                let brief = self.simulate(brief, &mut out).await;
                out.plot = self.plot(&brief, &mut out).await;
                let atmosphere = bounded(
                    Stage::Atmosphere,
                    self.limit,
                    self.generators.atmosphere.describe(&brief),
                )
                .await;
                out.atmosphere = out.record(atmosphere);
            }
        }

        tracing::debug!(
            mode = %brief.mode,
            attempted = out.attempted,
            failed = out.failures.len(),
            reactions = out.reactions.len(),
            "pipeline finished"
        );
        out
    }

    async fn simulate(&self, brief: &TurnBrief, out: &mut PipelineOutput) -> TurnBrief {
        let result = bounded(Stage::World, self.limit, self.generators.world.simulate(brief)).await;
        let mut next = brief.clone();
        if let Some(update) = out.record(result) {
            next.world.apply_update(&update);
            out.world = Some(update);
        }
        next
    }

    async fn plot(&self, brief: &TurnBrief, out: &mut PipelineOutput) -> Option<PlotBeat> {
        let result = bounded(Stage::Plot, self.limit, self.generators.plot.generate(brief)).await;
        out.record(result)
    }

    async fn respond_all(
        &self,
        brief: &TurnBrief,
        npcs: &[String],
    ) -> Vec<Result<NpcReaction, StageFailure>> {
        let calls = npcs.iter().map(|npc| {
            bounded(
                Stage::Npc(npc.clone()),
                self.limit,
                self.generators.npcs.respond(npc, brief),
            )
        });
        join_all(calls).await
    }
}

/// NPCs that should speak: the plot's focus, then the decision's focus,
/// then everyone present. Only present NPCs ever speak.
fn speakers(brief: &TurnBrief, plot: Option<&PlotBeat>) -> Vec<String> {
    let present = |npc: &&String| brief.world.is_present(npc);
    let from_plot: Vec<String> = plot
        .map(|p| p.focal_npcs.iter().filter(present).cloned().collect())
        .unwrap_or_default();
    if !from_plot.is_empty() {
        return from_plot;
    }
    let focal: Vec<String> = brief.focal_npcs.iter().filter(present).cloned().collect();
    if !focal.is_empty() {
        return focal;
    }
    brief.world.present_npcs.clone()
}
