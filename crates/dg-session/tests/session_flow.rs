//! Integration tests: session_flow.
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dg_conductor::StoryDefinition;
use dg_core::TurnMode;
use dg_progress::{EngineType, ProgressRecord, ProgressStore};
use dg_session::testing::{Failing, Scripted, Slow};
use dg_session::{
    GeneratorResult, Generators, NpcReaction, NpcResponder, Session, SessionConfig, SessionError,
    TemplateGenerators, TurnBrief,
};
use tempfile::TempDir;

const THREE_TURN_ACT: &str = r#"{
    "title": "Harbor Lights",
    "acts": [
        {"name": "Arrival", "objective": {"description": "arrive", "max_turns": 3, "urgency_curve": "linear"}},
        {"name": "Departure", "objective": {"description": "leave", "max_turns": 10}}
    ],
    "setting": {"location": "pier", "present_npcs": ["mira"]}
}"#;

const ONE_TURN_ACT: &str = r#"{
    "acts": [{"name": "Blink", "objective": {"max_turns": 1}}],
    "setting": {"location": "pier", "present_npcs": ["mira"]}
}"#;

fn story(json: &str) -> StoryDefinition {
    StoryDefinition::from_json(json).unwrap()
}

fn session(dir: &TempDir, json: &str, generators: Generators) -> Session {
    Session::new(SessionConfig::new(dir.path()), story(json), generators).unwrap()
}

fn stored(dir: &TempDir) -> ProgressRecord {
    ProgressStore::new(dir.path()).load()
}

fn close_to(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.01
}

#[tokio::test]
async fn three_dialogue_turns_end_the_act() {
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, THREE_TURN_ACT, TemplateGenerators::bundle());
    s.start().unwrap();

    let mut modes = Vec::new();
    let mut progress = Vec::new();
    for input in ["hello", "nice weather today", "hmm"] {
        let result = s.process_turn(input).await.unwrap();
        assert!(result.success);
        modes.push(result.mode);
        progress.push(s.conductor().acts().history().last().map_or_else(
            || s.get_status().progress,
            |closed| closed.progress,
        ));
    }

    assert_eq!(
        modes,
        vec![TurnMode::Dialogue, TurnMode::Dialogue, TurnMode::ActTransition]
    );
    assert!(close_to(progress[0], 0.33));
    assert!(close_to(progress[1], 0.67));
    assert!(close_to(progress[2], 1.0));
    assert_eq!(s.get_status().act_name, "Departure");
    assert_eq!(s.scene_id(), 2);
}

#[tokio::test]
async fn switch_flag_follows_boundaries() {
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, THREE_TURN_ACT, TemplateGenerators::bundle());
    s.start().unwrap();
    assert!(stored(&dir).safe_to_switch_engine);

    let first = s.process_turn("hello").await.unwrap();
    assert!(!first.boundary);
    let record = stored(&dir);
    assert!(!record.safe_to_switch_engine);
    assert_eq!(record.turn_count, 1);
    assert_eq!(record.current_scene_id, 1);

    s.process_turn("hello again").await.unwrap();
    assert!(!stored(&dir).safe_to_switch_engine);

    let third = s.process_turn("hmm").await.unwrap();
    assert!(third.boundary);
    let record = stored(&dir);
    assert!(record.safe_to_switch_engine);
    assert_eq!(record.current_scene_id, 2);
    assert_eq!(record.next_scene_id, 3);
    assert_eq!(record.turn_count, 3);
}

#[tokio::test]
async fn every_turn_of_a_one_turn_act_is_a_boundary() {
    let json = r#"{
        "acts": [
            {"name": "One", "objective": {"max_turns": 1}},
            {"name": "Two", "objective": {"max_turns": 1}},
            {"name": "Three", "objective": {"max_turns": 1}}
        ],
        "setting": {"location": "pier"}
    }"#;
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, json, TemplateGenerators::bundle());
    s.start().unwrap();
    for scene in 2..5 {
        let result = s.process_turn("wait").await.unwrap();
        assert_eq!(result.mode, TurnMode::ActTransition);
        assert!(result.boundary);
        assert!(stored(&dir).safe_to_switch_engine);
        assert_eq!(stored(&dir).current_scene_id, scene);
    }
}

/// Reads the progress file from inside a generator call.
#[derive(Default)]
struct Inspector {
    runtime: std::path::PathBuf,
    seen: Mutex<Vec<bool>>,
}

#[async_trait]
impl NpcResponder for Inspector {
    async fn respond(&self, npc_id: &str, _brief: &TurnBrief) -> GeneratorResult<NpcReaction> {
        let record = ProgressStore::new(&self.runtime).load();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(record.safe_to_switch_engine);
        }
        Ok(NpcReaction::line(npc_id, "..."))
    }
}

#[tokio::test]
async fn start_record_is_durable_before_generators_run() {
    let dir = TempDir::new().unwrap();
    let inspector = Arc::new(Inspector {
        runtime: dir.path().to_path_buf(),
        ..Inspector::default()
    });
    let generators = TemplateGenerators::bundle().with_npcs(inspector.clone());
    let mut s = session(&dir, THREE_TURN_ACT, generators);
    s.start().unwrap();
    s.process_turn("hello").await.unwrap();
    s.process_turn("hello").await.unwrap();

    assert_eq!(*inspector.seen.lock().unwrap(), vec![false, false]);
}

#[tokio::test]
async fn failed_turn_does_not_cross_a_boundary() {
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, ONE_TURN_ACT, Generators::uniform(Arc::new(Failing)));
    s.start().unwrap();

    let result = s.process_turn("wait").await.unwrap();
    assert_eq!(result.mode, TurnMode::ActTransition);
    assert!(!result.success);
    assert!(!result.boundary);
    assert!(result.error.is_some());
    assert_eq!(result.warnings.len(), 3);

    assert_eq!(s.conductor().acts().current().number, 1);
    let record = stored(&dir);
    assert!(!record.safe_to_switch_engine);
    assert_eq!(record.current_scene_id, 1);
    assert_eq!(record.turn_count, 1);
}

#[tokio::test]
async fn one_failing_generator_is_omitted() {
    let dir = TempDir::new().unwrap();
    let generators = TemplateGenerators::bundle().with_atmosphere(Arc::new(Failing));
    let mut s = session(&dir, ONE_TURN_ACT, generators);
    s.start().unwrap();

    let result = s.process_turn("wait").await.unwrap();
    assert!(result.success);
    assert!(result.boundary);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("atmosphere"));
    assert!(result.text.contains("Blink"));
}

#[tokio::test]
async fn slow_generators_time_out() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig::new(dir.path()).with_generator_timeout(Duration::from_millis(20));
    let generators = Generators::uniform(Arc::new(Slow::new(Duration::from_secs(5))));
    let mut s = Session::new(config, story(THREE_TURN_ACT), generators).unwrap();
    s.start().unwrap();

    let result = s.process_turn("hello").await.unwrap();
    assert!(!result.success);
    assert!(result.warnings[0].contains("timed out"));
    assert!(!stored(&dir).safe_to_switch_engine);
}

#[tokio::test]
async fn plot_turn_runs_world_then_plot() {
    let dir = TempDir::new().unwrap();
    let scripted = Arc::new(Scripted::new());
    let mut s = session(&dir, THREE_TURN_ACT, Generators::uniform(scripted.clone()));
    s.start().unwrap();

    let result = s.process_turn("I walk to the lighthouse").await.unwrap();
    assert_eq!(result.mode, TurnMode::PlotAdvance);

    let calls = scripted.calls();
    assert_eq!(&calls[..2], &["world@1".to_string(), "plot@1".to_string()]);
    assert!(calls.contains(&"atmosphere@1".to_string()));
    assert!(calls.contains(&"npc:mira@1".to_string()));
    assert_eq!(calls.len(), 4);
}

#[tokio::test]
async fn world_move_advances_the_next_turn() {
    let json = r#"{
        "acts": [{"name": "Market day", "objective": {"max_turns": 10}}],
        "setting": {"location": "pier", "present_npcs": ["mira"]}
    }"#;
    let dir = TempDir::new().unwrap();
    let scripted = Arc::new(Scripted::new().with_world(dg_session::WorldUpdate {
        location: Some("market".to_string()),
        ..Default::default()
    }));
    let mut s = session(&dir, json, Generators::uniform(scripted));
    s.start().unwrap();

    let first = s.process_turn("I walk to the lighthouse").await.unwrap();
    assert_eq!(first.mode, TurnMode::PlotAdvance);
    assert_eq!(s.get_status().location.as_deref(), Some("market"));

    let second = s.process_turn("hmm").await.unwrap();
    assert_eq!(second.mode, TurnMode::PlotAdvance);

    // staying put is not a change
    let third = s.process_turn("hmm").await.unwrap();
    assert_eq!(third.mode, TurnMode::Dialogue);
}

#[tokio::test]
async fn events_shape_the_turn() {
    let json = r#"{
        "acts": [{"name": "Storm", "objective": {"max_turns": 10,
            "completion_conditions": [{"type": "flag", "flag": "bell_rung"}]}}],
        "events": [{
            "id": "bell", "name": "The bell", "priority": 8,
            "trigger": {"type": "time", "time_after_turns": 1},
            "plot_override": "The harbor bell tolls.",
            "npc_reactions": {"mira": "Did you hear that?"},
            "effects": [{"type": "set_flag", "flag": "bell_rung"}]
        }],
        "setting": {"location": "pier", "present_npcs": ["mira"]}
    }"#;
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, json, TemplateGenerators::bundle());
    s.start().unwrap();

    let first = s.process_turn("hello").await.unwrap();
    assert_eq!(first.mode, TurnMode::PlotAdvance);
    assert_eq!(first.events, vec!["bell".to_string()]);
    assert!(first.text.contains("The harbor bell tolls."));
    assert!(first.text.contains("Did you hear that?"));

    let second = s.process_turn("hello").await.unwrap();
    assert_eq!(second.mode, TurnMode::ActTransition);
    assert!(second.events.is_empty());
    assert!(second.boundary);
}

#[tokio::test]
async fn linear_engine_counts_turns_per_scene() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig::new(dir.path())
        .with_engine(EngineType::Linear)
        .with_turns_per_scene(2);
    let mut s = Session::new(config, story(THREE_TURN_ACT), TemplateGenerators::bundle()).unwrap();
    s.start().unwrap();
    assert_eq!(s.engine(), EngineType::Linear);

    assert!(!s.process_turn("hello").await.unwrap().boundary);
    assert!(s.process_turn("hello").await.unwrap().boundary);
    let record = stored(&dir);
    assert_eq!(record.engine_type, EngineType::Linear);
    assert_eq!(record.current_scene_id, 2);
    assert!(record.safe_to_switch_engine);
}

#[tokio::test]
async fn manual_checkpoint_sets_the_flag_explicitly() {
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, THREE_TURN_ACT, TemplateGenerators::bundle());
    s.start().unwrap();
    s.process_turn("hello").await.unwrap();

    let path = s.save("quit", false).unwrap();
    assert_eq!(path, dir.path().join("plot").join("progress.json"));
    assert!(!stored(&dir).safe_to_switch_engine);

    s.save("checkpoint", true).unwrap();
    assert!(stored(&dir).safe_to_switch_engine);
}

#[test]
fn closed_session_refuses_turns() {
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, THREE_TURN_ACT, TemplateGenerators::bundle());
    s.start().unwrap();
    s.close();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let result = runtime.block_on(s.process_turn("hello"));
    assert!(matches!(result, Err(SessionError::Closed)));
}

#[test]
fn start_writes_only_the_plot_dir() {
    let dir = TempDir::new().unwrap();
    let mut s = session(&dir, THREE_TURN_ACT, TemplateGenerators::bundle());
    s.start().unwrap();
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}
