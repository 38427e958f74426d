//! Crash-safe progress records for Dirigent runtimes.
//!
//! A runtime directory holds one progress record at `plot/progress.json`.
//! Saves replace it atomically, unreadable files are quarantined next to
//! it, and the record's switch flag decides whether another execution
//! engine may take over the story.

pub mod error;
pub mod record;
pub mod store;
pub mod switch;

pub use error::{ProgressError, ProgressResult};
pub use record::{CURRENT_FORMAT_VERSION, EngineType, ProgressRecord};
pub use store::ProgressStore;
pub use switch::{EngineConflict, SwitchRefusal, check_switch, engine_conflict, resolve_engine, switch_engine};
