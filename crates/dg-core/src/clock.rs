//! In-world clock values as authored in story files.
//!
//! Story authors write times as `YYYY-MM-DD HH:MM`. Seconds and the ISO `T`
//! separator are accepted on input; output always uses the authored form.

use chrono::NaiveDateTime;

/// Authored time format.
pub const WORLD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const ACCEPTED_FORMATS: [&str; 4] = [
    WORLD_TIME_FORMAT,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse an authored in-world time.
pub fn parse_world_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Format an in-world time the way authors write it.
pub fn format_world_time(time: &NaiveDateTime) -> String {
    time.format(WORLD_TIME_FORMAT).to_string()
}

/// Serde adapter for `Option<NaiveDateTime>` fields written in the authored form.
pub mod optional {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serialize an optional time as `YYYY-MM-DD HH:MM` or `null`.
    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&super::format_world_time(time)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional authored time; malformed text is an error.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(text) => super::parse_world_time(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid world time: {text}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamp {
        #[serde(default, with = "optional")]
        at: Option<NaiveDateTime>,
    }

    #[test]
    fn parses_authored_and_iso_forms() {
        let a = parse_world_time("2024-11-26 18:30").unwrap();
        let b = parse_world_time("2024-11-26T18:30:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(format_world_time(&a), "2024-11-26 18:30");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_world_time("dusk").is_none());
        assert!(serde_json::from_str::<Stamp>(r#"{"at":"dusk"}"#).is_err());
    }

    #[test]
    fn serde_adapter() {
        let stamp: Stamp = serde_json::from_str(r#"{"at":"2024-01-02 03:04"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&stamp).unwrap(),
            r#"{"at":"2024-01-02 03:04"}"#
        );
        let empty: Stamp = serde_json::from_str("{}").unwrap();
        assert!(empty.at.is_none());
    }
}
