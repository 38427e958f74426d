//! Core types for the Dirigent turn-orchestration engine.
//!
//! Holds the vocabulary shared by every other crate. The conductor reads a
//! [`GameState`] snapshot, builds a [`TurnContext`] from it and picks a
//! [`TurnMode`] for the turn.

pub mod clock;
pub mod context;
pub mod flag;
pub mod mode;
pub mod state;

pub use context::TurnContext;
pub use flag::FlagValue;
pub use mode::TurnMode;
pub use state::GameState;
