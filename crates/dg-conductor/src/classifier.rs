//! Turn classification.
//!
//! Rules are checked in a fixed order. An act that is complete or out of
//! turns always yields [`TurnMode::ActTransition`]; otherwise any plot
//! trigger yields [`TurnMode::PlotAdvance`]; everything else is dialogue.

use std::fmt;

use dg_core::{TurnContext, TurnMode};

use crate::config::{ClassifierConfig, KeywordCategory};

/// Why a turn left the dialogue fast path.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceReason {
    /// Act progress reached 1.
    ActComplete,
    /// Act ran out of turns.
    BudgetExhausted {
        /// Turns spent in the act.
        turns: u32,
        /// Turn budget.
        max: u32,
    },
    /// An event at or above the priority threshold fired.
    HighPriorityEvent {
        /// Priority of the strongest event.
        priority: u8,
    },
    /// Act progress crossed the threshold.
    Progress(f64),
    /// Act urgency crossed the threshold.
    Urgency(f64),
    /// Too many dialogue turns in a row.
    DialogueStreak(u32),
    /// Player input contains a significant-action keyword.
    Keyword {
        /// Matched category.
        category: KeywordCategory,
        /// Matched keyword.
        keyword: String,
    },
    /// The player changed location.
    LocationChanged,
    /// An NPC's attitude shifted sharply.
    AttitudeShift(f64),
}

impl fmt::Display for AdvanceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActComplete => write!(f, "act objectives complete"),
            Self::BudgetExhausted { turns, max } => {
                write!(f, "act turn budget used ({turns}/{max})")
            }
            Self::HighPriorityEvent { priority } => {
                write!(f, "high-priority event (priority {priority})")
            }
            Self::Progress(p) => write!(f, "act progress {:.0}%", p * 100.0),
            Self::Urgency(u) => write!(f, "narrative urgency {u:.2}"),
            Self::DialogueStreak(n) => write!(f, "{n} dialogue turns without plot"),
            Self::Keyword { category, keyword } => {
                write!(f, "{category} keyword \"{keyword}\"")
            }
            Self::LocationChanged => write!(f, "player changed location"),
            Self::AttitudeShift(s) => write!(f, "NPC attitude shifted by {s:.2}"),
        }
    }
}

/// Result of classifying one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Chosen mode.
    pub mode: TurnMode,
    /// Every rule that pushed the turn off the dialogue path.
    pub reasons: Vec<AdvanceReason>,
}

impl Classification {
    /// Human-readable summary of the reasons.
    pub fn reason_text(&self) -> String {
        if self.reasons.is_empty() {
            return "conversation continues".to_string();
        }
        self.reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Picks a [`TurnMode`] for each turn.
///
/// Stateless apart from the consecutive-dialogue counter.
#[derive(Debug, Clone)]
pub struct TurnClassifier {
    config: ClassifierConfig,
    dialogue_streak: u32,
}

impl TurnClassifier {
    /// Create a classifier.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            dialogue_streak: 0,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Consecutive dialogue turns since the last non-dialogue turn.
    pub fn dialogue_streak(&self) -> u32 {
        self.dialogue_streak
    }

    /// Reset the dialogue counter.
    pub fn reset_dialogue_counter(&mut self) {
        self.dialogue_streak = 0;
    }

    /// Classify a turn.
    pub fn classify(&mut self, ctx: &TurnContext) -> TurnMode {
        self.classify_with_reasons(ctx).mode
    }

    /// Classify a turn and report which rules fired.
    pub fn classify_with_reasons(&mut self, ctx: &TurnContext) -> Classification {
        let transition = self.transition_reasons(ctx);
        if !transition.is_empty() {
            self.dialogue_streak = 0;
            return Classification {
                mode: TurnMode::ActTransition,
                reasons: transition,
            };
        }

        let reasons = self.plot_reasons(ctx);
        if reasons.is_empty() {
            self.dialogue_streak += 1;
            Classification {
                mode: TurnMode::Dialogue,
                reasons,
            }
        } else {
            self.dialogue_streak = 0;
            Classification {
                mode: TurnMode::PlotAdvance,
                reasons,
            }
        }
    }

    fn transition_reasons(&self, ctx: &TurnContext) -> Vec<AdvanceReason> {
        let mut reasons = Vec::new();
        if ctx.act_progress >= 1.0 {
            reasons.push(AdvanceReason::ActComplete);
        }
        if ctx.budget_exhausted() {
            reasons.push(AdvanceReason::BudgetExhausted {
                turns: ctx.turns_in_act,
                max: ctx.max_turns,
            });
        }
        reasons
    }

    fn plot_reasons(&self, ctx: &TurnContext) -> Vec<AdvanceReason> {
        let cfg = &self.config;
        let mut reasons = Vec::new();

        if let Some(priority) = ctx
            .highest_event_priority
            .filter(|p| *p >= cfg.event_priority_threshold)
        {
            reasons.push(AdvanceReason::HighPriorityEvent { priority });
        }
        if ctx.act_progress >= cfg.progress_threshold {
            reasons.push(AdvanceReason::Progress(ctx.act_progress));
        }
        if ctx.act_urgency >= cfg.urgency_threshold {
            reasons.push(AdvanceReason::Urgency(ctx.act_urgency));
        }
        if self.dialogue_streak >= cfg.max_dialogue_turns {
            reasons.push(AdvanceReason::DialogueStreak(self.dialogue_streak));
        }
        if let Some((category, keyword)) = self.match_keyword(&ctx.player_input) {
            reasons.push(AdvanceReason::Keyword {
                category,
                keyword: keyword.to_string(),
            });
        }
        if ctx.location_changed {
            reasons.push(AdvanceReason::LocationChanged);
        }
        if ctx.max_attitude_shift > cfg.attitude_shift_threshold {
            reasons.push(AdvanceReason::AttitudeShift(ctx.max_attitude_shift));
        }
        reasons
    }

    /// First significant-action keyword found in the input.
    pub fn match_keyword(&self, input: &str) -> Option<(KeywordCategory, &str)> {
        let lower = input.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|t| !t.is_empty())
            .collect();

        self.config
            .keywords
            .iter()
            .find(|(_, keyword)| keyword_matches(&lower, &tokens, keyword))
    }
}

/// ASCII keywords match whole words (with simple inflections); other
/// scripts have no word breaks and match as substrings.
fn keyword_matches(lower: &str, tokens: &[&str], keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    if !keyword.is_ascii() {
        return lower.contains(&keyword);
    }

    let parts: Vec<&str> = keyword.split_whitespace().collect();
    if parts.len() > 1 {
        return tokens.windows(parts.len()).any(|window| {
            window
                .iter()
                .zip(&parts)
                .all(|(token, part)| word_matches(token, part))
        });
    }
    tokens.iter().any(|token| word_matches(token, &keyword))
}

fn word_matches(token: &str, word: &str) -> bool {
    if token == word {
        return true;
    }
    ["s", "es", "ed", "d", "ing"]
        .iter()
        .any(|suffix| token.strip_suffix(suffix) == Some(word))
}
