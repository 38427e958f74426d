//! Integration tests: progress_store.
use std::fs;

use dg_progress::{
    EngineType, ProgressRecord, ProgressStore, SwitchRefusal, check_switch, switch_engine,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn plot_entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.path().join("plot"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn corruption_then_fresh_start() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::new(dir.path());
    fs::create_dir_all(dir.path().join("plot")).unwrap();
    fs::write(store.path(), "{\"current_scene_id\": ").unwrap();

    let first = store.load();
    assert!(first.corrupted);
    assert_eq!(first.current_scene_id, 1);
    assert_eq!(first.next_scene_id, 2);

    let entries = plot_entries(&dir);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("progress.corrupted_"));
    assert!(entries[0].ends_with(".json"));

    // The broken file is gone, so the second load is a plain fresh start.
    let second = store.load();
    assert!(!second.corrupted);
    assert_eq!(plot_entries(&dir).len(), 1);

    store.save(&ProgressRecord::default()).unwrap();
    assert_eq!(plot_entries(&dir).len(), 2);
    assert!(!store.load().corrupted);
}

#[test]
fn future_format_is_not_guessed() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::new(dir.path());
    fs::create_dir_all(dir.path().join("plot")).unwrap();
    fs::write(
        store.path(),
        r#"{"format_version": 99, "current_scene_id": 5, "next_scene_id": 6}"#,
    )
    .unwrap();

    let record = store.load();
    assert!(record.corrupted);
    assert_eq!(record.current_scene_id, 1);
}

#[test]
fn version_one_file_upgrades_on_save() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::new(dir.path());
    fs::create_dir_all(dir.path().join("plot")).unwrap();
    fs::write(
        store.path(),
        r#"{"current_scene_id": 3, "next_scene_id": 4, "can_switch_engine": true}"#,
    )
    .unwrap();

    let record = store.load();
    assert_eq!(record.format_version, 1);
    assert!(record.safe_to_switch_engine);

    store.save(&record).unwrap();
    let text = fs::read_to_string(store.path()).unwrap();
    assert!(text.contains("\"format_version\": 2"));
    assert!(text.contains("\"safe_to_switch_engine\": true"));
    assert!(!text.contains("can_switch_engine"));
}

#[test]
fn no_temp_files_left_behind() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::new(dir.path());
    for turn in 0..5 {
        store
            .save(&ProgressRecord::new(1, 2, turn, EngineType::Orchestrated, turn % 2 == 0))
            .unwrap();
    }
    assert_eq!(plot_entries(&dir), vec!["progress.json".to_string()]);
}

#[test]
fn switch_follows_the_flag() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::new(dir.path());
    assert_eq!(check_switch(&store), Err(SwitchRefusal::Missing));

    store
        .save(&ProgressRecord::new(4, 5, 30, EngineType::Linear, false))
        .unwrap();
    assert_eq!(check_switch(&store), Err(SwitchRefusal::MidTurn));

    store
        .save(&ProgressRecord::new(4, 5, 30, EngineType::Linear, true))
        .unwrap();
    let record = switch_engine(&store, EngineType::Orchestrated).unwrap();
    assert_eq!(record.engine_type, EngineType::Orchestrated);
    assert_eq!(record.current_scene_id, 4);
    assert!(check_switch(&store).is_ok());
}

proptest! {
    #[test]
    fn resave_is_byte_identical(
        current in 1u32..1000,
        gap in 1u32..50,
        turns in 0u32..10_000,
        linear in any::<bool>(),
        safe in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        let engine = if linear { EngineType::Linear } else { EngineType::Orchestrated };
        let record = ProgressRecord::new(current, current + gap, turns, engine, safe);

        store.save(&record).unwrap();
        let first = fs::read(store.path()).unwrap();
        let loaded = store.load();
        prop_assert_eq!(&loaded, &record);

        store.save(&loaded).unwrap();
        let second = fs::read(store.path()).unwrap();
        prop_assert_eq!(first, second);
    }
}
