//! Configuration for turn classification and the conductor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Keyword category that marks a significant player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    /// Movement between places.
    Action,
    /// Commitment to a choice.
    Decision,
    /// Disclosure of hidden information.
    Revelation,
    /// Hostility or threats.
    Conflict,
    /// Bonds made or broken.
    Relationship,
}

impl fmt::Display for KeywordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action => write!(f, "action"),
            Self::Decision => write!(f, "decision"),
            Self::Revelation => write!(f, "revelation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Relationship => write!(f, "relationship"),
        }
    }
}

/// Significant-action keywords, grouped by category.
///
/// Missing categories in a story file fall back to the built-in lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSet {
    /// Movement keywords.
    pub action: Vec<String>,
    /// Decision keywords.
    pub decision: Vec<String>,
    /// Revelation keywords.
    pub revelation: Vec<String>,
    /// Conflict keywords.
    pub conflict: Vec<String>,
    /// Relationship keywords.
    pub relationship: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_string()).collect()
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self {
            action: words(&["go", "leave", "enter", "move", "head", "travel", "walk"]),
            decision: words(&["decide", "choose", "agree", "refuse", "accept", "give up"]),
            revelation: words(&["tell", "reveal", "confess", "admit", "discover", "truth"]),
            conflict: words(&["attack", "fight", "resist", "threaten", "warn"]),
            relationship: words(&["love", "apologize", "forgive", "promise", "betray"]),
        }
    }
}

impl KeywordSet {
    /// An empty keyword set.
    pub fn empty() -> Self {
        Self {
            action: Vec::new(),
            decision: Vec::new(),
            revelation: Vec::new(),
            conflict: Vec::new(),
            relationship: Vec::new(),
        }
    }

    /// Iterate over `(category, keyword)` pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (KeywordCategory, &str)> {
        [
            (KeywordCategory::Action, &self.action),
            (KeywordCategory::Decision, &self.decision),
            (KeywordCategory::Revelation, &self.revelation),
            (KeywordCategory::Conflict, &self.conflict),
            (KeywordCategory::Relationship, &self.relationship),
        ]
        .into_iter()
        .flat_map(|(cat, list)| list.iter().map(move |k| (cat, k.as_str())))
    }

    /// Add a keyword to a category.
    pub fn with_keyword(mut self, category: KeywordCategory, keyword: impl Into<String>) -> Self {
        let list = match category {
            KeywordCategory::Action => &mut self.action,
            KeywordCategory::Decision => &mut self.decision,
            KeywordCategory::Revelation => &mut self.revelation,
            KeywordCategory::Conflict => &mut self.conflict,
            KeywordCategory::Relationship => &mut self.relationship,
        };
        list.push(keyword.into());
        self
    }
}

/// Thresholds used by the turn classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Act progress at which a plot beat is due.
    pub progress_threshold: f64,
    /// Act urgency at which a plot beat is due.
    pub urgency_threshold: f64,
    /// Consecutive dialogue turns before a plot beat is forced.
    pub max_dialogue_turns: u32,
    /// Event priority that forces a plot beat.
    pub event_priority_threshold: u8,
    /// NPC attitude shift magnitude that forces a plot beat.
    pub attitude_shift_threshold: f64,
    /// Significant-action keywords.
    pub keywords: KeywordSet,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            progress_threshold: 0.8,
            urgency_threshold: 0.7,
            max_dialogue_turns: 5,
            event_priority_threshold: 7,
            attitude_shift_threshold: 0.15,
            keywords: KeywordSet::default(),
        }
    }
}

impl ClassifierConfig {
    /// Set the progress threshold.
    pub fn with_progress_threshold(mut self, value: f64) -> Self {
        self.progress_threshold = value;
        self
    }

    /// Set the urgency threshold.
    pub fn with_urgency_threshold(mut self, value: f64) -> Self {
        self.urgency_threshold = value;
        self
    }

    /// Set the maximum dialogue streak.
    pub fn with_max_dialogue_turns(mut self, turns: u32) -> Self {
        self.max_dialogue_turns = turns;
        self
    }

    /// Set the event priority threshold.
    pub fn with_event_priority_threshold(mut self, priority: u8) -> Self {
        self.event_priority_threshold = priority;
        self
    }

    /// Set the attitude shift threshold.
    pub fn with_attitude_shift_threshold(mut self, value: f64) -> Self {
        self.attitude_shift_threshold = value;
        self
    }

    /// Replace the keyword set.
    pub fn with_keywords(mut self, keywords: KeywordSet) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Configuration for a conductor.
#[derive(Debug, Clone)]
pub struct ConductorConfig {
    /// RNG seed for probability triggers.
    pub seed: u64,
    /// Classification thresholds.
    pub classifier: ClassifierConfig,
    /// Dialogue turns spent in each dialogue phase.
    pub phase_length: u32,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            classifier: ClassifierConfig::default(),
            phase_length: 3,
        }
    }
}

impl ConductorConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the classifier configuration.
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the dialogue phase length (at least 1).
    pub fn with_phase_length(mut self, turns: u32) -> Self {
        self.phase_length = turns.max(1);
        self
    }
}
