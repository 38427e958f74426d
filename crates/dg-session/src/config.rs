//! Configuration for a session.

use std::path::PathBuf;
use std::time::Duration;

use dg_conductor::ConductorConfig;
use dg_progress::EngineType;

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Runtime directory holding `plot/progress.json`.
    pub runtime_dir: PathBuf,
    /// Engine chosen by the caller; `None` inherits or defaults.
    pub engine: Option<EngineType>,
    /// Upper bound for each generator call.
    pub generator_timeout: Duration,
    /// Turns per scene under the linear engine.
    pub turns_per_scene: u32,
    /// Conductor settings.
    pub conductor: ConductorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from("runtime"),
            engine: None,
            generator_timeout: Duration::from_secs(30),
            turns_per_scene: 10,
            conductor: ConductorConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Config for a runtime directory with default settings.
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        Self::default().with_runtime_dir(runtime_dir)
    }

    /// Set the runtime directory.
    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }

    /// Choose the engine explicitly.
    pub fn with_engine(mut self, engine: EngineType) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the per-call generator timeout.
    pub fn with_generator_timeout(mut self, timeout: Duration) -> Self {
        self.generator_timeout = timeout;
        self
    }

    /// Set turns per scene for the linear engine (at least 1).
    pub fn with_turns_per_scene(mut self, turns: u32) -> Self {
        self.turns_per_scene = turns.max(1);
        self
    }

    /// Set the conductor configuration.
    pub fn with_conductor(mut self, conductor: ConductorConfig) -> Self {
        self.conductor = conductor;
        self
    }

    /// Set the RNG seed used by the event engine.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.conductor = self.conductor.with_seed(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.runtime_dir, PathBuf::from("runtime"));
        assert!(cfg.engine.is_none());
        assert_eq!(cfg.generator_timeout, Duration::from_secs(30));
        assert_eq!(cfg.turns_per_scene, 10);
        assert_eq!(cfg.conductor.seed, 42);
    }

    #[test]
    fn builder_methods() {
        let cfg = SessionConfig::new("/tmp/run")
            .with_engine(EngineType::Linear)
            .with_generator_timeout(Duration::from_millis(250))
            .with_turns_per_scene(4)
            .with_seed(7);
        assert_eq!(cfg.runtime_dir, PathBuf::from("/tmp/run"));
        assert_eq!(cfg.engine, Some(EngineType::Linear));
        assert_eq!(cfg.generator_timeout, Duration::from_millis(250));
        assert_eq!(cfg.turns_per_scene, 4);
        assert_eq!(cfg.conductor.seed, 7);
    }

    #[test]
    fn turns_per_scene_clamped() {
        let cfg = SessionConfig::default().with_turns_per_scene(0);
        assert_eq!(cfg.turns_per_scene, 1);
    }
}
