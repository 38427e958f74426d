//! Engine switching.
//!
//! Another engine may take over a story only when the record on disk was
//! written at a scene boundary. Anything else is refused.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ProgressResult;
use crate::record::{EngineType, ProgressRecord};
use crate::store::ProgressStore;

/// Why a switch is not possible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchRefusal {
    /// No record has been written yet.
    #[error("progress.json missing")]
    Missing,
    /// The record on disk was unusable.
    #[error("progress.json corrupted")]
    Corrupted {
        /// Where the unusable file was moved.
        backup: Option<PathBuf>,
    },
    /// The record was written in the middle of a turn.
    #[error("mid-turn, switching disabled")]
    MidTurn,
}

impl SwitchRefusal {
    /// Short reason shown to players.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Load the record and confirm that another engine may take over.
pub fn check_switch(store: &ProgressStore) -> Result<ProgressRecord, SwitchRefusal> {
    if !store.exists() {
        return Err(SwitchRefusal::Missing);
    }
    let record = store.load();
    if record.corrupted {
        return Err(SwitchRefusal::Corrupted {
            backup: record.quarantined_to,
        });
    }
    if !record.safe_to_switch_engine {
        return Err(SwitchRefusal::MidTurn);
    }
    Ok(record)
}

/// Hand the story to `target`.
///
/// The switch is checked first; on success the record is rewritten with the
/// new engine and stays at a boundary.
pub fn switch_engine(store: &ProgressStore, target: EngineType) -> ProgressResult<ProgressRecord> {
    let record = check_switch(store)?;
    let from = record.engine_type;
    let switched = ProgressRecord {
        engine_type: target,
        ..record.with_switch_allowed(true)
    };
    store.save(&switched)?;
    tracing::info!(%from, to = %target, scene = switched.current_scene_id, "engine switched");
    Ok(switched)
}

/// Pick the engine for a new or resumed session.
///
/// An explicit choice wins. A resumed session otherwise keeps the engine
/// of a usable record. Everything else falls back to the default engine.
pub fn resolve_engine(explicit: Option<EngineType>, resuming: bool, store: &ProgressStore) -> EngineType {
    if let Some(engine) = explicit {
        return engine;
    }
    if resuming && store.exists() {
        let record = store.load();
        if !record.corrupted {
            return record.engine_type;
        }
    }
    EngineType::default()
}

/// A requested engine that differs from the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConflict {
    /// Engine in the record.
    pub stored: EngineType,
    /// Engine asked for.
    pub requested: EngineType,
    /// Whether the record allows the change.
    pub safe: bool,
}

/// Compare `requested` with the engine of a usable stored record.
pub fn engine_conflict(requested: EngineType, store: &ProgressStore) -> Option<EngineConflict> {
    if !store.exists() {
        return None;
    }
    let record = store.load();
    if record.corrupted || record.engine_type == requested {
        return None;
    }
    Some(EngineConflict {
        stored: record.engine_type,
        requested,
        safe: record.safe_to_switch_engine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProgressError;
    use tempfile::TempDir;

    fn store_with(record: &ProgressRecord) -> (TempDir, ProgressStore) {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        store.save(record).unwrap();
        (dir, store)
    }

    #[test]
    fn refusal_reasons() {
        assert_eq!(SwitchRefusal::Missing.reason(), "progress.json missing");
        assert_eq!(
            SwitchRefusal::Corrupted { backup: None }.reason(),
            "progress.json corrupted"
        );
        assert_eq!(SwitchRefusal::MidTurn.reason(), "mid-turn, switching disabled");
    }

    #[test]
    fn missing_record_refused() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        assert_eq!(check_switch(&store), Err(SwitchRefusal::Missing));
    }

    #[test]
    fn mid_turn_record_refused() {
        let (_dir, store) = store_with(&ProgressRecord::new(2, 3, 7, EngineType::Orchestrated, false));
        assert_eq!(check_switch(&store), Err(SwitchRefusal::MidTurn));
        let err = switch_engine(&store, EngineType::Linear).unwrap_err();
        assert!(matches!(err, ProgressError::SwitchRefused(SwitchRefusal::MidTurn)));
        assert_eq!(store.load().engine_type, EngineType::Orchestrated);
    }

    #[test]
    fn boundary_record_switches() {
        let (_dir, store) = store_with(&ProgressRecord::new(2, 3, 7, EngineType::Orchestrated, true));
        let switched = switch_engine(&store, EngineType::Linear).unwrap();
        assert_eq!(switched.engine_type, EngineType::Linear);
        assert_eq!(switched.current_scene_id, 2);
        assert_eq!(switched.turn_count, 7);

        let loaded = store.load();
        assert_eq!(loaded.engine_type, EngineType::Linear);
        assert!(loaded.safe_to_switch_engine);
    }

    #[test]
    fn corrupted_record_refused() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "][").unwrap();
        match check_switch(&store) {
            Err(SwitchRefusal::Corrupted { backup }) => assert!(backup.unwrap().exists()),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn engine_resolution_order() {
        let (_dir, store) = store_with(&ProgressRecord::new(1, 2, 0, EngineType::Linear, true));
        assert_eq!(
            resolve_engine(Some(EngineType::Orchestrated), true, &store),
            EngineType::Orchestrated
        );
        assert_eq!(resolve_engine(None, true, &store), EngineType::Linear);
        assert_eq!(resolve_engine(None, false, &store), EngineType::Orchestrated);
    }

    #[test]
    fn conflicts_reported() {
        let (_dir, store) = store_with(&ProgressRecord::new(1, 2, 0, EngineType::Linear, false));
        assert!(engine_conflict(EngineType::Linear, &store).is_none());
        let conflict = engine_conflict(EngineType::Orchestrated, &store).unwrap();
        assert_eq!(conflict.stored, EngineType::Linear);
        assert!(!conflict.safe);
    }
}
