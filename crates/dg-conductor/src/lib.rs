//! Turn orchestration for interactive narrative.
//!
//! A [`Conductor`] decides, once per player turn, whether the turn is plain
//! dialogue, a plot beat, or the end of an act. It combines a rule-based
//! [`TurnClassifier`], an [`ActTracker`] that measures progress against the
//! current act's objective, and an [`EventEngine`] that fires authored
//! events. Stories are loaded from JSON with [`StoryDefinition`].

pub mod act;
pub mod classifier;
pub mod conductor;
pub mod config;
pub mod error;
pub mod event;
pub mod phase;
pub mod prethink;
pub mod story;

pub use act::{ActDefinition, ActEnding, ActObjective, ActOutcome, ActTracker, ProgressReport};
pub use classifier::TurnClassifier;
pub use conductor::{Conductor, ConductorSnapshot, TurnDecision, TurnSummary};
pub use config::{ClassifierConfig, ConductorConfig};
pub use error::{ConductorError, ConductorResult};
pub use event::{AppliedEffects, EventEngine, GameEvent, WorldDelta};
pub use phase::DialoguePhase;
pub use prethink::{PredictionRequest, Predictor, TurnPrediction};
pub use story::{StoryDefinition, StorySetting};
