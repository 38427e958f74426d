//! Runtime state of an act.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an act ended, or that it has not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActOutcome {
    /// Still being played.
    #[default]
    Ongoing,
    /// Completion conditions met.
    Success,
    /// A failure condition fired.
    Failure,
    /// Turn budget ran out.
    Timeout,
}

impl ActOutcome {
    /// Whether the act has ended.
    pub fn is_terminal(self) -> bool {
        self != ActOutcome::Ongoing
    }
}

impl fmt::Display for ActOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// A terminal outcome, used to close an act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActEnding {
    /// Completion conditions met.
    Success,
    /// A failure condition fired.
    Failure,
    /// Turn budget ran out.
    Timeout,
}

impl From<ActEnding> for ActOutcome {
    fn from(ending: ActEnding) -> Self {
        match ending {
            ActEnding::Success => ActOutcome::Success,
            ActEnding::Failure => ActOutcome::Failure,
            ActEnding::Timeout => ActOutcome::Timeout,
        }
    }
}

impl fmt::Display for ActEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ActOutcome::from(*self).fmt(f)
    }
}

/// The act being played, or one that has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActState {
    /// Act number.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Turns entered in this act, counting the one being decided.
    pub turns_in_act: u32,
    /// Last evaluated progress.
    pub progress: f64,
    /// Satisfaction per completion condition, keyed `"<index>:<kind>"`.
    pub completion_flags: BTreeMap<String, bool>,
    /// Outcome so far.
    pub outcome: ActOutcome,
    /// When the act started.
    pub started_at: DateTime<Utc>,
    /// When the act ended.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ActState {
    /// Start a fresh act.
    pub fn start(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            turns_in_act: 0,
            progress: 0.0,
            completion_flags: BTreeMap::new(),
            outcome: ActOutcome::Ongoing,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Whether the act has ended.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Close the act with an ending.
    pub fn close(&mut self, ending: ActEnding) {
        self.outcome = ending.into();
        self.ended_at = Some(Utc::now());
    }
}
