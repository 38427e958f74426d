//! Act tracking: objectives, progress, urgency, and act transitions.

pub mod objective;
pub mod state;
pub mod tracker;

pub use objective::{ActCondition, ActDefinition, ActObjective, UrgencyCurve};
pub use state::{ActEnding, ActOutcome, ActState};
pub use tracker::{ActSnapshot, ActTallies, ActTracker, ActTransition, ProgressReport};
