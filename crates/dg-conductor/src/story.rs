//! Story definition files.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDateTime;
use dg_core::clock;
use serde::{Deserialize, Serialize};

use crate::act::ActDefinition;
use crate::config::ClassifierConfig;
use crate::error::{ConductorError, ConductorResult};
use crate::event::GameEvent;

/// Where and when the story opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySetting {
    /// Starting location.
    pub location: Option<String>,
    /// NPCs present at the start.
    pub present_npcs: Vec<String>,
    /// Starting in-world time.
    #[serde(with = "clock::optional")]
    pub start_time: Option<NaiveDateTime>,
    /// Opening narration.
    pub opening: String,
}

/// A complete story: acts, events, classifier overrides, and setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryDefinition {
    /// Story title.
    pub title: String,
    /// Authored acts.
    pub acts: Vec<ActDefinition>,
    /// Authored events.
    pub events: Vec<GameEvent>,
    /// Classifier overrides; absent fields keep their defaults.
    pub classifier: ClassifierConfig,
    /// Opening setting.
    pub setting: StorySetting,
}

impl StoryDefinition {
    /// Parse and validate a story from JSON.
    pub fn from_json(text: &str) -> ConductorResult<Self> {
        let mut story: StoryDefinition = serde_json::from_str(text)?;
        story.normalize()?;
        Ok(story)
    }

    /// Load and validate a story file.
    pub fn load(path: &Path) -> ConductorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConductorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let story = Self::from_json(&text)?;
        tracing::info!(
            path = %path.display(),
            title = %story.title,
            acts = story.acts.len(),
            events = story.events.len(),
            "story loaded"
        );
        Ok(story)
    }

    /// Number unnumbered acts by position and reject duplicates.
    fn normalize(&mut self) -> ConductorResult<()> {
        for (i, act) in self.acts.iter_mut().enumerate() {
            if act.number == 0 {
                act.number = i as u32 + 1;
            }
        }

        let mut numbers = BTreeSet::new();
        for act in &self.acts {
            if !numbers.insert(act.number) {
                return Err(ConductorError::DuplicateAct(act.number));
            }
        }

        let mut ids = BTreeSet::new();
        for event in &self.events {
            if !ids.insert(event.id.as_str()) {
                return Err(ConductorError::DuplicateEvent(event.id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::act::ActCondition;
    use crate::event::EventTrigger;
    use std::io::Write;

    const STORY: &str = r#"{
        "title": "Harbor Lights",
        "acts": [
            {"name": "Arrival", "objective": {"description": "reach the harbor", "max_turns": 3}},
            {"name": "The Storm", "objective": {
                "completion_conditions": [{"type": "event_occurred", "event_id": "storm"}]
            }}
        ],
        "events": [
            {"id": "storm", "name": "Storm", "priority": 8,
             "trigger": {"type": "time", "time_after_turns": 5}}
        ],
        "classifier": {"max_dialogue_turns": 3},
        "setting": {"location": "pier", "present_npcs": ["mira"], "start_time": "1890-05-01 06:00"}
    }"#;

    #[test]
    fn parse_story() {
        let story = StoryDefinition::from_json(STORY).unwrap();
        assert_eq!(story.title, "Harbor Lights");
        assert_eq!(story.acts[0].number, 1);
        assert_eq!(story.acts[1].number, 2);
        assert_eq!(story.acts[0].objective.max_turns, 3);
        assert_eq!(story.acts[1].objective.max_turns, 15);
        assert_eq!(
            story.acts[1].objective.completion_conditions[0],
            ActCondition::EventOccurred {
                event_id: "storm".to_string()
            }
        );
        assert_eq!(story.events[0].trigger, EventTrigger::after_turns(5));
        assert_eq!(story.classifier.max_dialogue_turns, 3);
        assert_eq!(story.classifier.progress_threshold, 0.8);
        assert_eq!(story.setting.location.as_deref(), Some("pier"));
        assert!(story.setting.start_time.is_some());
    }

    #[test]
    fn empty_story_is_valid() {
        let story = StoryDefinition::from_json("{}").unwrap();
        assert!(story.acts.is_empty());
        assert!(story.events.is_empty());
    }

    #[test]
    fn duplicate_events_rejected() {
        let json = r#"{"events": [
            {"id": "a", "trigger": {"type": "manual"}},
            {"id": "a", "trigger": {"type": "manual"}}
        ]}"#;
        assert!(matches!(
            StoryDefinition::from_json(json),
            Err(ConductorError::DuplicateEvent(id)) if id == "a"
        ));
    }

    #[test]
    fn duplicate_act_numbers_rejected() {
        let json = r#"{"acts": [{"number": 2, "name": "A"}, {"number": 2, "name": "B"}]}"#;
        assert!(matches!(
            StoryDefinition::from_json(json),
            Err(ConductorError::DuplicateAct(2))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STORY.as_bytes()).unwrap();
        let story = StoryDefinition::load(file.path()).unwrap();
        assert_eq!(story.acts.len(), 2);

        let missing = StoryDefinition::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(missing, Err(ConductorError::Io { .. })));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            StoryDefinition::from_json("{"),
            Err(ConductorError::Parse(_))
        ));
    }
}
