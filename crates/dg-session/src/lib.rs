//! Crash-safe interactive sessions for Dirigent.
//!
//! A [`Session`] plays a story turn by turn: the conductor picks a mode,
//! the matching [`pipeline`] fans out to the content [`generator`]s, and
//! progress is written before and after every turn so that engine switches
//! only ever happen at scene boundaries.

pub mod config;
pub mod error;
pub mod generator;
pub mod offline;
pub mod pipeline;
pub mod result;
pub mod session;
pub mod testing;
pub mod world;

pub use config::SessionConfig;
pub use error::{GeneratorError, GeneratorResult, SessionError, SessionResult};
pub use generator::{
    Atmosphere, AtmosphereGenerator, Generators, NpcReaction, NpcResponder, PlotBeat,
    PlotGenerator, TurnBrief, WorldSimulator, WorldUpdate,
};
pub use offline::TemplateGenerators;
pub use result::{SessionStatus, TurnResult};
pub use session::{Session, SessionState};
pub use world::WorldView;
