//! Event triggering: time, condition, probability, and manual events.

pub mod effect;
pub mod engine;
pub mod trigger;

pub use effect::{AppliedEffects, EventEffect, WorldDelta};
pub use engine::{EventEngine, EventSlot, EventStatus, GameEvent, INTERRUPT_PRIORITY, TriggerRecord};
pub use trigger::{EventTrigger, TriggerCondition, TriggerKind};
