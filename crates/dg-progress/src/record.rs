//! The persisted progress record.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProgressError;

/// Format version written by this build.
pub const CURRENT_FORMAT_VERSION: u32 = 2;

/// Execution strategy a story runs under.
///
/// Strategies keep different in-memory state, so one may only take over
/// from another at a scene boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    /// Scenes follow the conductor's act transitions.
    #[default]
    Orchestrated,
    /// Scenes advance after a fixed number of turns.
    Linear,
}

impl EngineType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrated => "orchestrated",
            Self::Linear => "linear",
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "orchestrated" => Ok(Self::Orchestrated),
            "linear" => Ok(Self::Linear),
            other => Err(ProgressError::UnknownEngine(other.to_string())),
        }
    }
}

fn version_one() -> u32 {
    1
}

fn scene_one() -> u32 {
    1
}

fn scene_two() -> u32 {
    2
}

/// Where a story stands on disk.
///
/// `corrupted` and `quarantined_to` are set by the loader only and are
/// never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Schema version; files without one are version 1.
    #[serde(default = "version_one")]
    pub format_version: u32,
    /// Scene being played.
    #[serde(default = "scene_one")]
    pub current_scene_id: u32,
    /// Scene that follows; always greater than `current_scene_id`.
    #[serde(default = "scene_two")]
    pub next_scene_id: u32,
    /// Turns played in total.
    #[serde(default)]
    pub turn_count: u32,
    /// Engine that wrote the record.
    #[serde(default)]
    pub engine_type: EngineType,
    /// Whether another engine may take over from this record.
    #[serde(default, alias = "can_switch_engine")]
    pub safe_to_switch_engine: bool,
    /// When the record was written.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// The file on disk could not be used.
    #[serde(skip)]
    pub corrupted: bool,
    /// Where the unusable file was moved.
    #[serde(skip)]
    pub quarantined_to: Option<PathBuf>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            current_scene_id: 1,
            next_scene_id: 2,
            turn_count: 0,
            engine_type: EngineType::default(),
            safe_to_switch_engine: false,
            updated_at: Utc::now(),
            corrupted: false,
            quarantined_to: None,
        }
    }
}

impl ProgressRecord {
    /// A fresh record stamped now.
    pub fn new(
        current_scene_id: u32,
        next_scene_id: u32,
        turn_count: u32,
        engine_type: EngineType,
        safe_to_switch_engine: bool,
    ) -> Self {
        Self {
            current_scene_id,
            next_scene_id,
            turn_count,
            engine_type,
            safe_to_switch_engine,
            ..Self::default()
        }
    }

    /// Default record flagged as corrupted.
    pub fn corrupted(quarantined_to: Option<PathBuf>) -> Self {
        Self {
            corrupted: true,
            quarantined_to,
            ..Self::default()
        }
    }

    /// Whether the scene ids are in order.
    pub fn scenes_ordered(&self) -> bool {
        self.next_scene_id > self.current_scene_id
    }

    /// Whether this build can interpret the record.
    pub fn is_supported(&self) -> bool {
        (1..=CURRENT_FORMAT_VERSION).contains(&self.format_version) && self.scenes_ordered()
    }

    /// Copy with the switch flag set and the timestamp refreshed.
    pub fn with_switch_allowed(&self, allowed: bool) -> Self {
        Self {
            safe_to_switch_engine: allowed,
            updated_at: Utc::now(),
            corrupted: false,
            quarantined_to: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let record = ProgressRecord::default();
        assert_eq!(record.format_version, 2);
        assert_eq!(record.current_scene_id, 1);
        assert_eq!(record.next_scene_id, 2);
        assert_eq!(record.engine_type, EngineType::Orchestrated);
        assert!(!record.safe_to_switch_engine);
        assert!(!record.corrupted);
    }

    #[test]
    fn version_one_fields_default() {
        let record: ProgressRecord =
            serde_json::from_str(r#"{"current_scene_id": 4, "next_scene_id": 5, "can_switch_engine": true}"#)
                .unwrap();
        assert_eq!(record.format_version, 1);
        assert_eq!(record.turn_count, 0);
        assert_eq!(record.engine_type, EngineType::Orchestrated);
        assert!(record.safe_to_switch_engine);
        assert!(record.is_supported());
    }

    #[test]
    fn loader_fields_never_serialized() {
        let record = ProgressRecord::corrupted(Some(PathBuf::from("/tmp/x")));
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("corrupted"));
        assert!(!json.contains("quarantined"));
    }

    #[test]
    fn unsupported_records() {
        let backwards = ProgressRecord::new(3, 3, 0, EngineType::Linear, false);
        assert!(!backwards.is_supported());
        let future = ProgressRecord {
            format_version: 9,
            ..ProgressRecord::default()
        };
        assert!(!future.is_supported());
    }

    #[test]
    fn engine_names() {
        assert_eq!("Linear".parse::<EngineType>().unwrap(), EngineType::Linear);
        assert_eq!(EngineType::Orchestrated.to_string(), "orchestrated");
        assert!("steam".parse::<EngineType>().is_err());
    }
}
