//! Remote payload types.
//!
//! The remote service is loose with JSON types: identifiers and flags arrive
//! as numbers or strings depending on the endpoint, so the deserializers
//! here accept both.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier, normalised to its decimal/text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl RemoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for RemoteId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::String(s) => Ok(Self(s.trim().to_string())),
            other => Err(de::Error::custom(format!("expected id, found {other}"))),
        }
    }
}

/// Truthiness of a loosely typed flag: `1`, `true`, `"1"` and other
/// non-empty, non-zero values count as set.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn de_truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?))
}

fn de_lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// `null` or missing list becomes empty.
fn de_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Remote sub-task codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Watch,
    WatchComprehension,
    Learn,
    Speak,
    Chat,
}

impl ActivityType {
    pub const WATCH: i64 = 9;
    pub const LEARN: i64 = 10;
    pub const SPEAK: i64 = 11;
    pub const WATCH_COMPREHENSION: i64 = 40;
    pub const CHAT: i64 = 55;

    /// `None` for codes this version does not know.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::WATCH => Some(Self::Watch),
            Self::WATCH_COMPREHENSION => Some(Self::WatchComprehension),
            Self::LEARN => Some(Self::Learn),
            Self::SPEAK => Some(Self::Speak),
            Self::CHAT => Some(Self::Chat),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Watch => Self::WATCH,
            Self::WatchComprehension => Self::WATCH_COMPREHENSION,
            Self::Learn => Self::LEARN,
            Self::Speak => Self::SPEAK,
            Self::Chat => Self::CHAT,
        }
    }
}

/// Per-video progress report from the report-card service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteProgressReport {
    #[serde(rename = "dialogID", default)]
    pub dialog_id: Option<RemoteId>,
    #[serde(default)]
    pub hash: Option<RemoteId>,
    #[serde(rename = "totalPoints", default, deserialize_with = "de_lenient_int")]
    pub total_points: Option<i64>,
    /// Occasionally missing upstream.
    #[serde(default)]
    pub activities: Option<Vec<ActivityEntry>>,
}

impl RemoteProgressReport {
    /// Activities, empty when absent.
    pub fn activities(&self) -> &[ActivityEntry] {
        self.activities.as_deref().unwrap_or_default()
    }
}

/// One sub-task of a progress report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ActivityEntry {
    #[serde(rename = "activityTypeID", default, deserialize_with = "de_lenient_int")]
    pub activity_type_id: Option<i64>,
    #[serde(default, deserialize_with = "de_truthy")]
    pub completed: bool,
    #[serde(rename = "watchedDialogLines", default, deserialize_with = "de_list")]
    pub watched_dialog_lines: Vec<DialogLineRef>,
    #[serde(rename = "learnedDialogLines", default, deserialize_with = "de_list")]
    pub learned_dialog_lines: Vec<LearnedLine>,
    #[serde(rename = "spokenDialogLines", default, deserialize_with = "de_list")]
    pub spoken_dialog_lines: Vec<DialogLineRef>,
    #[serde(rename = "submittedQuestionIds", default, deserialize_with = "de_list")]
    pub submitted_question_ids: Vec<RemoteId>,
}

impl ActivityEntry {
    pub fn activity_type(&self) -> Option<ActivityType> {
        self.activity_type_id.and_then(ActivityType::from_code)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DialogLineRef {
    #[serde(rename = "dialogLineID")]
    pub dialog_line_id: RemoteId,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LearnedLine {
    #[serde(rename = "learnedWords", default, deserialize_with = "de_list")]
    pub learned_words: Vec<LearnedWord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LearnedWord {
    #[serde(rename = "wordHeadID")]
    pub word_head_id: RemoteId,
    #[serde(default, deserialize_with = "de_truthy")]
    pub completed: bool,
}

/// One entry of the dialog listing. The raw JSON is kept for the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogMetadata {
    pub dialog_id: i64,
    pub title: Option<String>,
    pub raw: Value,
}

impl DialogMetadata {
    /// `None` when the entry carries no usable `dialogID`.
    pub fn from_json(raw: Value) -> Option<Self> {
        let dialog_id = match raw.get("dialogID")? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        let title = raw.get("title").and_then(Value::as_str).map(String::from);
        Some(Self {
            dialog_id,
            title,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let ids: Vec<RemoteId> = serde_json::from_value(json!([101, "102", " 103 "])).unwrap();
        assert_eq!(ids, vec![RemoteId::from(101), RemoteId::from("102"), RemoteId::from("103")]);
        assert!(serde_json::from_value::<RemoteId>(json!(null)).is_err());
    }

    #[test]
    fn test_truthy_follows_loose_flags() {
        for yes in [json!(1), json!(true), json!("1"), json!("yes"), json!(0.5)] {
            assert!(truthy(&yes), "{yes}");
        }
        for no in [json!(0), json!(false), json!("0"), json!(""), json!(null), json!([])] {
            assert!(!truthy(&no), "{no}");
        }
    }

    #[test]
    fn test_report_parses_all_activity_shapes() {
        let report: RemoteProgressReport = serde_json::from_value(json!({
            "dialogID": 7,
            "hash": "abc",
            "totalPoints": "42",
            "activities": [
                {"activityTypeID": 9, "completed": 1,
                 "watchedDialogLines": [{"dialogLineID": 101}]},
                {"activityTypeID": 10, "completed": 0,
                 "learnedDialogLines": [{"learnedWords": [
                     {"wordHeadID": 55, "completed": true},
                     {"wordHeadID": 56, "completed": false}]}]},
                {"activityTypeID": 11, "spokenDialogLines": null},
                {"activityTypeID": 55, "submittedQuestionIds": ["q1", 2]},
                {"activityTypeID": 77}
            ]
        }))
        .unwrap();

        assert_eq!(report.total_points, Some(42));
        assert_eq!(report.hash, Some(RemoteId::from("abc")));
        let kinds: Vec<Option<ActivityType>> =
            report.activities().iter().map(ActivityEntry::activity_type).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ActivityType::Watch),
                Some(ActivityType::Learn),
                Some(ActivityType::Speak),
                Some(ActivityType::Chat),
                None
            ]
        );
        assert!(report.activities()[0].completed);
        assert!(report.activities()[2].spoken_dialog_lines.is_empty());
    }

    #[test]
    fn test_missing_activities() {
        let report: RemoteProgressReport = serde_json::from_value(json!({"dialogID": 1})).unwrap();
        assert!(report.activities.is_none());
        assert!(report.activities().is_empty());
    }

    #[test]
    fn test_dialog_metadata_requires_id() {
        let meta = DialogMetadata::from_json(json!({"dialogID": "12", "title": "Intro"})).unwrap();
        assert_eq!(meta.dialog_id, 12);
        assert_eq!(meta.title.as_deref(), Some("Intro"));
        assert!(DialogMetadata::from_json(json!({"title": "x"})).is_none());
    }

    #[test]
    fn test_activity_codes_roundtrip() {
        for kind in [
            ActivityType::Watch,
            ActivityType::WatchComprehension,
            ActivityType::Learn,
            ActivityType::Speak,
            ActivityType::Chat,
        ] {
            assert_eq!(ActivityType::from_code(kind.code()), Some(kind));
        }
    }
}
