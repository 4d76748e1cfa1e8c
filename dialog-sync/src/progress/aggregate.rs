//! In-memory progress aggregate.
//!
//! The attempts table stores id lists as comma-joined text; here they are
//! real sets and counts are always derived from them.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::database::models::{AttemptDbModel, AttemptKey};

/// Insertion-ordered set of opaque remote identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSet(IndexSet<String>);

impl IdSet {
    pub const DELIMITER: char = ',';

    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted form, skipping blank entries.
    pub fn parse(text: &str) -> Self {
        text.split(Self::DELIMITER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect()
    }

    /// Returns `true` when the id was not present yet.
    pub fn insert(&mut self, id: impl AsRef<str>) -> bool {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return false;
        }
        self.0.insert(id.to_string())
    }

    pub fn union_with<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.insert(id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_superset(&self, other: &IdSet) -> bool {
        other.iter().all(|id| self.contains(id))
    }

    /// Persisted form: ids joined by `,` in insertion order.
    pub fn to_delimited(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }
}

impl<S: AsRef<str>> FromIterator<S> for IdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.union_with(iter);
        set
    }
}

impl std::fmt::Display for IdSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_delimited())
    }
}

/// Progress of one remote sub-task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub complete: bool,
    pub ids: IdSet,
}

impl TaskProgress {
    fn from_columns(complete: i64, ids: &str) -> Self {
        Self {
            complete: complete != 0,
            ids: IdSet::parse(ids),
        }
    }

    pub fn count(&self) -> i64 {
        self.ids.len() as i64
    }
}

/// Progress of one user on one video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressAggregate {
    pub watch: TaskProgress,
    pub learn: TaskProgress,
    pub speak: TaskProgress,
    pub chat: TaskProgress,
    pub total_points: i64,
    /// Remote dialog hash of the last report that carried one.
    pub hash: Option<String>,
}

impl ProgressAggregate {
    pub fn from_model(row: &AttemptDbModel) -> Self {
        Self {
            watch: TaskProgress::from_columns(row.watch_complete, &row.watch_line_ids),
            learn: TaskProgress::from_columns(row.learn_complete, &row.learn_word_ids),
            speak: TaskProgress::from_columns(row.speak_complete, &row.speak_line_ids),
            chat: TaskProgress::from_columns(row.chat_complete, &row.chat_question_ids),
            total_points: row.total_points,
            hash: row.hash.clone(),
        }
    }

    /// Write the progress columns of `row`. Counts are recomputed from the sets.
    pub fn apply_to(&self, row: &mut AttemptDbModel) {
        row.watch_complete = i64::from(self.watch.complete);
        row.watch_count = self.watch.count();
        row.watch_line_ids = self.watch.ids.to_delimited();
        row.learn_complete = i64::from(self.learn.complete);
        row.learn_count = self.learn.count();
        row.learn_word_ids = self.learn.ids.to_delimited();
        row.speak_complete = i64::from(self.speak.complete);
        row.speak_count = self.speak.count();
        row.speak_line_ids = self.speak.ids.to_delimited();
        row.chat_complete = i64::from(self.chat.complete);
        row.chat_count = self.chat.count();
        row.chat_question_ids = self.chat.ids.to_delimited();
        row.total_points = self.total_points;
        row.hash = self.hash.clone();
    }

    /// Fresh row for `key` holding this aggregate.
    pub fn to_model(&self, key: AttemptKey) -> AttemptDbModel {
        let mut row = AttemptDbModel::new(key);
        self.apply_to(&mut row);
        row
    }

    /// Every id set of `self` contains the matching set of `other`.
    pub fn covers(&self, other: &ProgressAggregate) -> bool {
        self.watch.ids.is_superset(&other.watch.ids)
            && self.learn.ids.is_superset(&other.learn.ids)
            && self.speak.ids.is_superset(&other.speak.ids)
            && self.chat.ids.is_superset(&other.chat.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blanks_and_duplicates() {
        let set = IdSet::parse("101, 102,,101,");
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_delimited(), "101,102");
        assert!(IdSet::parse("").is_empty());
    }

    #[test]
    fn test_union_keeps_first_seen_order() {
        let mut set = IdSet::parse("3,1");
        set.union_with(["2", "1", "4"]);
        assert_eq!(set.to_string(), "3,1,2,4");
        assert!(set.is_superset(&IdSet::parse("1,4")));
        assert!(!set.is_superset(&IdSet::parse("5")));
    }

    #[test]
    fn test_model_conversion_derives_counts() {
        let key = AttemptKey::new(1, 2, 3);
        let mut row = AttemptDbModel::new(key);
        row.watch_complete = 1;
        row.watch_line_ids = "101,102".to_string();
        // A stale stored count is corrected on the way back.
        row.watch_count = 9;
        row.hash = Some("h".to_string());

        let aggregate = ProgressAggregate::from_model(&row);
        assert!(aggregate.watch.complete);
        assert_eq!(aggregate.watch.count(), 2);

        let written = aggregate.to_model(key);
        assert_eq!(written.watch_count, 2);
        assert_eq!(written.watch_line_ids, "101,102");
        assert_eq!(written.hash.as_deref(), Some("h"));
        assert_eq!(written.learn_word_ids, "");
    }
}
