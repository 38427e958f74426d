//! Generator doubles for tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GeneratorError, GeneratorResult};
use crate::generator::{
    Atmosphere, AtmosphereGenerator, NpcReaction, NpcResponder, PlotBeat, PlotGenerator,
    TurnBrief, WorldSimulator, WorldUpdate,
};

/// Returns fixed output and records every call as `"<stage>@<turn>"`.
#[derive(Debug, Default)]
pub struct Scripted {
    /// World simulator output.
    pub world: WorldUpdate,
    /// Plot generator output.
    pub plot: PlotBeat,
    /// Atmosphere output.
    pub atmosphere: Atmosphere,
    /// Attitude shift given to every NPC reaction.
    pub attitude_shift: f64,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    /// Double with empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the world output.
    pub fn with_world(mut self, world: WorldUpdate) -> Self {
        self.world = world;
        self
    }

    /// Set the plot output.
    pub fn with_plot(mut self, plot: PlotBeat) -> Self {
        self.plot = plot;
        self
    }

    /// Set the attitude shift of every reaction.
    pub fn with_attitude_shift(mut self, shift: f64) -> Self {
        self.attitude_shift = shift;
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn log(&self, stage: &str, brief: &TurnBrief) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{stage}@{}", brief.turn));
        }
    }
}

#[async_trait]
impl WorldSimulator for Scripted {
    async fn simulate(&self, brief: &TurnBrief) -> GeneratorResult<WorldUpdate> {
        self.log("world", brief);
        Ok(self.world.clone())
    }
}

#[async_trait]
impl PlotGenerator for Scripted {
    async fn generate(&self, brief: &TurnBrief) -> GeneratorResult<PlotBeat> {
        self.log("plot", brief);
        Ok(self.plot.clone())
    }
}

#[async_trait]
impl AtmosphereGenerator for Scripted {
    async fn describe(&self, brief: &TurnBrief) -> GeneratorResult<Atmosphere> {
        self.log("atmosphere", brief);
        Ok(self.atmosphere.clone())
    }
}

#[async_trait]
impl NpcResponder for Scripted {
    async fn respond(&self, npc_id: &str, brief: &TurnBrief) -> GeneratorResult<NpcReaction> {
        self.log(&format!("npc:{npc_id}"), brief);
        Ok(NpcReaction {
            attitude_shift: self.attitude_shift,
            ..NpcReaction::line(npc_id, format!("{npc_id} answers"))
        })
    }
}

/// Fails every call.
#[derive(Debug, Clone, Default)]
pub struct Failing;

#[async_trait]
impl WorldSimulator for Failing {
    async fn simulate(&self, _brief: &TurnBrief) -> GeneratorResult<WorldUpdate> {
        Err(GeneratorError::Failed("world offline".to_string()))
    }
}

#[async_trait]
impl PlotGenerator for Failing {
    async fn generate(&self, _brief: &TurnBrief) -> GeneratorResult<PlotBeat> {
        Err(GeneratorError::Unparseable("plot".to_string()))
    }
}

#[async_trait]
impl AtmosphereGenerator for Failing {
    async fn describe(&self, _brief: &TurnBrief) -> GeneratorResult<Atmosphere> {
        Err(GeneratorError::Failed("atmosphere offline".to_string()))
    }
}

#[async_trait]
impl NpcResponder for Failing {
    async fn respond(&self, npc_id: &str, _brief: &TurnBrief) -> GeneratorResult<NpcReaction> {
        Err(GeneratorError::Failed(format!("{npc_id} offline")))
    }
}

/// Sleeps before answering with default output.
#[derive(Debug, Clone)]
pub struct Slow {
    /// How long each call takes.
    pub delay: Duration,
}

impl Slow {
    /// Double that takes `delay` per call.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl WorldSimulator for Slow {
    async fn simulate(&self, _brief: &TurnBrief) -> GeneratorResult<WorldUpdate> {
        tokio::time::sleep(self.delay).await;
        Ok(WorldUpdate::default())
    }
}

#[async_trait]
impl PlotGenerator for Slow {
    async fn generate(&self, _brief: &TurnBrief) -> GeneratorResult<PlotBeat> {
        tokio::time::sleep(self.delay).await;
        Ok(PlotBeat::default())
    }
}

#[async_trait]
impl AtmosphereGenerator for Slow {
    async fn describe(&self, _brief: &TurnBrief) -> GeneratorResult<Atmosphere> {
        tokio::time::sleep(self.delay).await;
        Ok(Atmosphere::default())
    }
}

#[async_trait]
impl NpcResponder for Slow {
    async fn respond(&self, npc_id: &str, _brief: &TurnBrief) -> GeneratorResult<NpcReaction> {
        tokio::time::sleep(self.delay).await;
        Ok(NpcReaction::line(npc_id, "..."))
    }
}
