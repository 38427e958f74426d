//! The event trigger engine.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use dg_core::{FlagValue, GameState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::effect::{AppliedEffects, EventEffect, WorldDelta};
use super::trigger::{EventTrigger, TriggerKind};
use crate::error::{ConductorError, ConductorResult};

/// Priority at which an event interrupts the normal turn flow.
pub const INTERRUPT_PRIORITY: u8 = 8;

const MAX_HISTORY: usize = 256;

fn default_priority() -> u8 {
    5
}

/// An authored or dynamically added event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Unique event id.
    #[serde(alias = "event_id")]
    pub id: String,
    /// Display name.
    #[serde(default, alias = "event_name")]
    pub name: String,
    /// What the event is.
    #[serde(default)]
    pub description: String,
    /// When it fires.
    pub trigger: EventTrigger,
    /// Priority 1-10.
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Effects applied after firing.
    #[serde(default)]
    pub effects: Vec<EventEffect>,
    /// Authored narration that replaces the generated plot beat.
    #[serde(default)]
    pub plot_override: Option<String>,
    /// Passive reactions per NPC id.
    #[serde(default)]
    pub npc_reactions: BTreeMap<String, String>,
    /// Whether the event can fire more than once.
    #[serde(default, alias = "is_repeatable")]
    pub repeatable: bool,
}

impl GameEvent {
    /// Create an event with default priority and no effects.
    pub fn new(id: impl Into<String>, name: impl Into<String>, trigger: EventTrigger) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            trigger,
            priority: default_priority(),
            effects: Vec::new(),
            plot_override: None,
            npc_reactions: BTreeMap::new(),
            repeatable: false,
        }
    }

    /// Set the priority (clamped to 1-10).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }

    /// Add an effect.
    pub fn with_effect(mut self, effect: EventEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Make the event repeatable.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Set the narration override.
    pub fn with_plot_override(mut self, text: impl Into<String>) -> Self {
        self.plot_override = Some(text.into());
        self
    }

    /// Whether the event interrupts normal flow.
    pub fn interrupts(&self) -> bool {
        self.priority >= INTERRUPT_PRIORITY
    }
}

/// Stable handle of an event inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventSlot(usize);

impl EventSlot {
    /// Position in the catalog.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Firing state of one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventStatus {
    /// Whether the event has fired at least once.
    pub fired: bool,
    /// Turns left before the event may fire again.
    pub cooldown_remaining: u32,
    /// Turn index of the latest firing.
    pub fired_at_turn: Option<u32>,
}

#[derive(Debug, Clone)]
struct EventEntry {
    event: GameEvent,
    status: EventStatus,
}

/// One entry of the firing history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerRecord {
    /// Event id.
    pub event_id: String,
    /// Event name.
    pub event_name: String,
    /// Turn index of the firing.
    pub turn: u32,
    /// Whether it was requested explicitly.
    pub manual: bool,
    /// Wall-clock time of the firing.
    pub at: DateTime<Utc>,
}

/// Evaluates event triggers each turn and applies their effects.
///
/// Events live in an append-only catalog addressed by [`EventSlot`].
/// Probability draws use the engine's own RNG.
pub struct EventEngine {
    entries: Vec<EventEntry>,
    index: HashMap<String, EventSlot>,
    flags: BTreeMap<String, FlagValue>,
    history: Vec<TriggerRecord>,
    current_turn: u32,
    rng: StdRng,
}

impl std::fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEngine")
            .field("events", &self.entries.len())
            .field("flags", &self.flags)
            .field("current_turn", &self.current_turn)
            .field("history", &self.history.len())
            .finish()
    }
}

impl EventEngine {
    /// Create an engine with an RNG seeded from `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create an engine with an explicit RNG.
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            flags: BTreeMap::new(),
            history: Vec::new(),
            current_turn: 0,
            rng,
        }
    }

    /// Create an engine preloaded with a catalog.
    pub fn with_events(events: Vec<GameEvent>, seed: u64) -> ConductorResult<Self> {
        let mut engine = Self::new(seed);
        for event in events {
            engine.add_event(event)?;
        }
        Ok(engine)
    }

    /// Add an event to the catalog.
    pub fn add_event(&mut self, mut event: GameEvent) -> ConductorResult<EventSlot> {
        if self.index.contains_key(&event.id) {
            return Err(ConductorError::DuplicateEvent(event.id));
        }
        event.priority = event.priority.clamp(1, 10);
        if event.name.is_empty() {
            event.name = event.id.clone();
        }
        let slot = EventSlot(self.entries.len());
        self.index.insert(event.id.clone(), slot);
        self.entries.push(EventEntry {
            event,
            status: EventStatus::default(),
        });
        Ok(slot)
    }

    /// Add an event while the story is running.
    pub fn add_dynamic_event(&mut self, event: GameEvent) -> ConductorResult<EventSlot> {
        let name = event.name.clone();
        let slot = self.add_event(event)?;
        tracing::info!(event = %name, slot = slot.index(), "dynamic event added");
        Ok(slot)
    }

    /// Number of events in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an event by id.
    pub fn slot(&self, event_id: &str) -> Option<EventSlot> {
        self.index.get(event_id).copied()
    }

    /// Get an event by slot.
    pub fn event(&self, slot: EventSlot) -> Option<&GameEvent> {
        self.entries.get(slot.0).map(|e| &e.event)
    }

    /// Get an event's firing state.
    pub fn status(&self, slot: EventSlot) -> Option<EventStatus> {
        self.entries.get(slot.0).map(|e| e.status)
    }

    /// Turn index seen by the latest trigger check.
    pub fn current_turn(&self) -> u32 {
        self.current_turn
    }

    /// Engine flags.
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Read a flag.
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// Set a flag.
    pub fn set_flag(&mut self, name: impl Into<String>, value: FlagValue) {
        let name = name.into();
        tracing::debug!(flag = %name, value = %value, "engine flag set");
        self.flags.insert(name, value);
    }

    /// Adopt flags not already present; engine values win on conflict.
    pub fn import_flags(&mut self, flags: &BTreeMap<String, FlagValue>) {
        for (name, value) in flags {
            self.flags
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Firing history, oldest first.
    pub fn history(&self) -> &[TriggerRecord] {
        &self.history
    }

    /// History entries for one turn.
    pub fn fired_on_turn(&self, turn: u32) -> Vec<&TriggerRecord> {
        self.history.iter().filter(|r| r.turn == turn).collect()
    }

    /// Events that have fired and interrupt normal flow.
    pub fn pending_high_priority(&self) -> Vec<&GameEvent> {
        self.entries
            .iter()
            .filter(|e| e.status.fired && e.event.interrupts())
            .map(|e| &e.event)
            .collect()
    }

    /// Evaluate every trigger for a turn.
    ///
    /// Cooldowns tick down first, so the outcome does not depend on catalog
    /// order. Fired events come back strongest first; ties keep catalog order.
    pub fn check_triggers(&mut self, state: &GameState, turn: u32) -> Vec<GameEvent> {
        self.current_turn = turn;
        let cooling: Vec<bool> = self
            .entries
            .iter_mut()
            .map(|entry| {
                let remaining = entry.status.cooldown_remaining;
                entry.status.cooldown_remaining = remaining.saturating_sub(1);
                remaining > 0
            })
            .collect();

        let mut fired = Vec::new();
        for (i, cooling) in cooling.into_iter().enumerate() {
            if cooling || !self.should_fire(i, state, turn) {
                continue;
            }
            let entry = &mut self.entries[i];
            entry.status.fired = true;
            entry.status.fired_at_turn = Some(turn);
            entry.status.cooldown_remaining = entry.event.trigger.cooldown;
            tracing::info!(
                event = %entry.event.id,
                name = %entry.event.name,
                priority = entry.event.priority,
                turn,
                "event fired"
            );
            let event = entry.event.clone();
            self.record(&event, turn, false);
            fired.push(event);
        }

        fired.sort_by_key(|e| Reverse(e.priority));
        fired
    }

    fn should_fire(&mut self, i: usize, state: &GameState, turn: u32) -> bool {
        let entry = &self.entries[i];
        if entry.status.fired && !entry.event.repeatable {
            return false;
        }

        match &entry.event.trigger.kind {
            TriggerKind::Time {
                trigger_time,
                after_turns,
            } => {
                let clock_due = match (trigger_time, state.current_time) {
                    (Some(target), Some(now)) => now >= *target,
                    _ => false,
                };
                clock_due || after_turns.is_some_and(|n| turn >= n)
            }
            TriggerKind::Condition { conditions } => conditions
                .iter()
                .all(|c| c.holds(state, &self.flags, turn)),
            TriggerKind::Probability { probability } => {
                let p = *probability;
                p > 0.0 && self.rng.random::<f64>() < p
            }
            TriggerKind::Manual | TriggerKind::Unrecognized => false,
        }
    }

    fn record(&mut self, event: &GameEvent, turn: u32, manual: bool) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(TriggerRecord {
            event_id: event.id.clone(),
            event_name: event.name.clone(),
            turn,
            manual,
            at: Utc::now(),
        });
    }

    /// Fire an event on request.
    ///
    /// Returns `Ok(None)` when the event already fired and is not repeatable,
    /// or is still cooling down.
    pub fn trigger_manual_event(&mut self, event_id: &str) -> ConductorResult<Option<GameEvent>> {
        let slot = self
            .slot(event_id)
            .ok_or_else(|| ConductorError::UnknownEvent(event_id.to_string()))?;
        let turn = self.current_turn;
        let entry = &mut self.entries[slot.0];
        if entry.status.fired && !entry.event.repeatable {
            tracing::warn!(event = %event_id, "event already fired and is not repeatable");
            return Ok(None);
        }
        if entry.status.cooldown_remaining > 0 {
            tracing::debug!(
                event = %event_id,
                remaining = entry.status.cooldown_remaining,
                "event is cooling down"
            );
            return Ok(None);
        }
        entry.status.fired = true;
        entry.status.fired_at_turn = Some(turn);
        entry.status.cooldown_remaining = entry.event.trigger.cooldown;
        let event = entry.event.clone();
        tracing::info!(event = %event.id, turn, "event fired manually");
        self.record(&event, turn, true);
        Ok(Some(event))
    }

    /// Apply an event's effects.
    ///
    /// Flag effects mutate the engine's flag store; everything else is
    /// returned for the caller to apply.
    pub fn apply_effects(&mut self, event: &GameEvent, state: &GameState) -> AppliedEffects {
        let mut applied = AppliedEffects {
            event_id: event.id.clone(),
            plot_override: event.plot_override.clone(),
            npc_reactions: event.npc_reactions.clone(),
            ..AppliedEffects::default()
        };

        for effect in &event.effects {
            match effect {
                EventEffect::SetFlag { flag, value } => {
                    self.set_flag(flag.clone(), value.clone());
                    applied.summaries.push(format!("flag {flag} = {value}"));
                    applied.flags_set.push((flag.clone(), value.clone()));
                }
                EventEffect::NpcMood { npc_id, mood } => {
                    let delta = WorldDelta::NpcMood {
                        npc_id: npc_id.clone(),
                        mood: mood.clone(),
                    };
                    applied.summaries.push(delta.to_string());
                    applied.deltas.push(delta);
                }
                EventEffect::SpawnNpc { npc_id, location } => {
                    let delta = WorldDelta::SpawnNpc {
                        npc_id: npc_id.clone(),
                        location: location.clone().or_else(|| state.player_location.clone()),
                    };
                    applied.summaries.push(delta.to_string());
                    applied.deltas.push(delta);
                }
                EventEffect::TriggerActTransition { outcome } => {
                    applied.summaries.push(format!("act transition ({outcome})"));
                    applied.act_transition = Some(*outcome);
                }
                EventEffect::AddPlotHint { hint } => {
                    applied.summaries.push(format!("plot hint: {hint}"));
                    applied.plot_hints.push(hint.clone());
                }
                EventEffect::Unrecognized => {
                    tracing::debug!(event = %event.id, "unrecognized effect skipped");
                }
            }
        }

        tracing::info!(
            event = %event.id,
            effects = applied.summaries.len(),
            "event effects applied"
        );
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::act::ActEnding;
    use crate::event::trigger::TriggerCondition;
    use dg_core::clock::parse_world_time;

    fn engine(events: Vec<GameEvent>) -> EventEngine {
        EventEngine::with_events(events, 7).unwrap()
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut e = EventEngine::new(1);
        e.add_event(GameEvent::new("a", "A", EventTrigger::manual())).unwrap();
        let err = e.add_event(GameEvent::new("a", "A again", EventTrigger::manual()));
        assert!(matches!(err, Err(ConductorError::DuplicateEvent(id)) if id == "a"));
    }

    #[test]
    fn turn_delay_fires_once() {
        let mut e = engine(vec![GameEvent::new("bell", "Bell", EventTrigger::after_turns(2))]);
        let state = GameState::new();
        assert!(e.check_triggers(&state, 1).is_empty());
        assert_eq!(e.check_triggers(&state, 2).len(), 1);
        assert!(e.check_triggers(&state, 3).is_empty());
        assert_eq!(e.fired_on_turn(2).len(), 1);
    }

    #[test]
    fn clock_trigger_needs_world_time() {
        let at = parse_world_time("2024-11-26 18:00").unwrap();
        let mut e = engine(vec![GameEvent::new("dusk", "Dusk", EventTrigger::at_time(at))]);
        assert!(e.check_triggers(&GameState::new(), 5).is_empty());

        let early = GameState::new().with_time(parse_world_time("2024-11-26 17:59").unwrap());
        assert!(e.check_triggers(&early, 6).is_empty());
        let late = GameState::new().with_time(at);
        assert_eq!(e.check_triggers(&late, 7).len(), 1);
    }

    #[test]
    fn condition_trigger_requires_all_clauses() {
        let trigger = EventTrigger::when(vec![
            TriggerCondition::Location {
                location: "docks".into(),
            },
            TriggerCondition::Flag {
                flag: "alarm".into(),
                value: FlagValue::Bool(true),
            },
            TriggerCondition::Narrative {
                description: "tension is high".into(),
            },
        ]);
        let mut e = engine(vec![GameEvent::new("raid", "Raid", trigger)]);
        let at_docks = GameState::new().with_location("docks");
        assert!(e.check_triggers(&at_docks, 1).is_empty());
        e.set_flag("alarm", FlagValue::Bool(true));
        assert_eq!(e.check_triggers(&at_docks, 2).len(), 1);
    }

    #[test]
    fn unrecognized_clause_blocks_firing() {
        let trigger = EventTrigger::when(vec![TriggerCondition::Unrecognized]);
        let mut e = engine(vec![GameEvent::new("odd", "Odd", trigger).repeatable()]);
        assert!(e.check_triggers(&GameState::new(), 1).is_empty());
    }

    #[test]
    fn probability_bounds() {
        let mut e = engine(vec![
            GameEvent::new("never", "Never", EventTrigger::chance(0.0, 0)).repeatable(),
            GameEvent::new("always", "Always", EventTrigger::chance(1.0, 0)).repeatable(),
        ]);
        for turn in 1..=20 {
            let fired = e.check_triggers(&GameState::new(), turn);
            assert_eq!(fired.len(), 1);
            assert_eq!(fired[0].id, "always");
        }
    }

    #[test]
    fn probability_cooldown() {
        let mut e = engine(vec![
            GameEvent::new("gust", "Gust", EventTrigger::chance(1.0, 2)).repeatable(),
        ]);
        let state = GameState::new();
        let fired: Vec<bool> = (1..=6)
            .map(|t| !e.check_triggers(&state, t).is_empty())
            .collect();
        // a cooldown of 2 sits out the next two checks
        assert_eq!(fired, vec![true, false, false, true, false, false]);
        assert_eq!(e.status(e.slot("gust").unwrap()).unwrap().cooldown_remaining, 0);
    }

    #[test]
    fn condition_cooldown() {
        let event: GameEvent = serde_json::from_str(
            r#"{"id": "tide", "repeatable": true,
                "trigger": {"type": "condition", "conditions": [], "cooldown": 2}}"#,
        )
        .unwrap();
        let mut e = engine(vec![event]);
        let state = GameState::new();
        let fired: Vec<u32> = (1..=4)
            .filter(|&t| !e.check_triggers(&state, t).is_empty())
            .collect();
        assert_eq!(fired, vec![1, 4]);
    }

    #[test]
    fn manual_cooldown() {
        let mut e = engine(vec![
            GameEvent::new("horn", "Horn", EventTrigger::manual().with_cooldown(1)).repeatable(),
        ]);
        let state = GameState::new();
        e.check_triggers(&state, 1);
        assert!(e.trigger_manual_event("horn").unwrap().is_some());
        assert!(e.trigger_manual_event("horn").unwrap().is_none());

        // one check sits out the cooldown
        e.check_triggers(&state, 2);
        assert!(e.trigger_manual_event("horn").unwrap().is_some());
    }

    #[test]
    fn seeded_engines_agree() {
        let events = || vec![GameEvent::new("coin", "Coin", EventTrigger::chance(0.5, 0)).repeatable()];
        let mut a = EventEngine::with_events(events(), 99).unwrap();
        let mut b = EventEngine::with_events(events(), 99).unwrap();
        let state = GameState::new();
        for turn in 1..=30 {
            assert_eq!(
                a.check_triggers(&state, turn).len(),
                b.check_triggers(&state, turn).len()
            );
        }
    }

    #[test]
    fn fired_events_sorted_by_priority() {
        let mut e = engine(vec![
            GameEvent::new("low", "Low", EventTrigger::after_turns(0)).with_priority(3),
            GameEvent::new("high", "High", EventTrigger::after_turns(0)).with_priority(9),
            GameEvent::new("mid", "Mid", EventTrigger::after_turns(0)),
        ]);
        let ids: Vec<String> = e
            .check_triggers(&GameState::new(), 1)
            .into_iter()
            .map(|ev| ev.id)
            .collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        assert_eq!(e.pending_high_priority().len(), 1);
    }

    #[test]
    fn manual_and_unknown_never_fire_automatically() {
        let mut e = engine(vec![
            GameEvent::new("door", "Door", EventTrigger::manual()),
            GameEvent::new("odd", "Odd", TriggerKind::Unrecognized.into()),
        ]);
        assert!(e.check_triggers(&GameState::new(), 1).is_empty());

        let fired = e.trigger_manual_event("door").unwrap();
        assert_eq!(fired.map(|ev| ev.id), Some("door".to_string()));
        assert!(e.history()[0].manual);
        assert!(e.trigger_manual_event("door").unwrap().is_none());
        assert!(matches!(
            e.trigger_manual_event("nope"),
            Err(ConductorError::UnknownEvent(_))
        ));
    }

    #[test]
    fn apply_effects_only_mutates_flags() {
        let event = GameEvent::new("storm", "Storm", EventTrigger::manual())
            .with_effect(EventEffect::SetFlag {
                flag: "wet".into(),
                value: FlagValue::Bool(true),
            })
            .with_effect(EventEffect::NpcMood {
                npc_id: "olaf".into(),
                mood: "grim".into(),
            })
            .with_effect(EventEffect::SpawnNpc {
                npc_id: "sailor".into(),
                location: None,
            })
            .with_effect(EventEffect::TriggerActTransition {
                outcome: ActEnding::Failure,
            })
            .with_effect(EventEffect::AddPlotHint {
                hint: "lightning".into(),
            })
            .with_plot_override("The sky splits open.");
        let mut e = engine(vec![]);
        let state = GameState::new().with_location("deck");
        let applied = e.apply_effects(&event, &state);

        assert_eq!(e.flag("wet"), Some(&FlagValue::Bool(true)));
        assert_eq!(applied.summaries.len(), 5);
        assert_eq!(
            applied.deltas[1],
            WorldDelta::SpawnNpc {
                npc_id: "sailor".into(),
                location: Some("deck".into())
            }
        );
        assert_eq!(applied.act_transition, Some(ActEnding::Failure));
        assert_eq!(applied.plot_hints, vec!["lightning"]);
        assert_eq!(applied.plot_override.as_deref(), Some("The sky splits open."));
        assert!(state.npc_moods.is_empty());
    }

    #[test]
    fn import_flags_keeps_engine_values() {
        let mut e = engine(vec![]);
        e.set_flag("a", FlagValue::Integer(1));
        let mut other = BTreeMap::new();
        other.insert("a".to_string(), FlagValue::Integer(2));
        other.insert("b".to_string(), FlagValue::Integer(3));
        e.import_flags(&other);
        assert_eq!(e.flag("a"), Some(&FlagValue::Integer(1)));
        assert_eq!(e.flag("b"), Some(&FlagValue::Integer(3)));
    }

    #[test]
    fn event_defaults_from_json() {
        let event: GameEvent = serde_json::from_str(
            r#"{"event_id": "x", "trigger": {"type": "manual"}, "is_repeatable": true}"#,
        )
        .unwrap();
        assert_eq!(event.priority, 5);
        assert!(event.repeatable);
        assert!(!event.interrupts());
    }
}
