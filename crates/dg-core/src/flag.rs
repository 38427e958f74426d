//! Story flag values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value stored under a story flag.
///
/// Story files write flag values as bare JSON scalars, so the enum is
/// untagged: `true`, `3`, `0.5` and `"open"` all deserialize directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer counter.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A text value.
    Text(String),
}

impl Default for FlagValue {
    fn default() -> Self {
        FlagValue::Bool(true)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Integer(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Text(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_deserialize_untagged() {
        let values: Vec<FlagValue> = serde_json::from_str(r#"[true, 3, 0.5, "open"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FlagValue::Bool(true),
                FlagValue::Integer(3),
                FlagValue::Float(0.5),
                FlagValue::Text("open".to_string()),
            ]
        );
    }

    #[test]
    fn default_is_true() {
        assert_eq!(FlagValue::default(), FlagValue::Bool(true));
    }

    #[test]
    fn display() {
        assert_eq!(FlagValue::from(false).to_string(), "false");
        assert_eq!(FlagValue::from(7).to_string(), "7");
        assert_eq!(FlagValue::from("gate").to_string(), "gate");
    }
}
