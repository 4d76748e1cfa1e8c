//! Per-user, per-video progress model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identity of one progress row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    pub activity_id: i64,
    pub user_id: i64,
    pub video_id: i64,
}

impl AttemptKey {
    pub fn new(activity_id: i64, user_id: i64, video_id: i64) -> Self {
        Self {
            activity_id,
            user_id,
            video_id,
        }
    }
}

impl std::fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "activity={} user={} video={}",
            self.activity_id, self.user_id, self.video_id
        )
    }
}

/// Flat row of the `attempts` table. Id lists are comma-joined text.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptDbModel {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: i64,
    pub video_id: i64,
    pub watch_complete: i64,
    pub watch_count: i64,
    pub watch_line_ids: String,
    pub learn_complete: i64,
    pub learn_count: i64,
    pub learn_word_ids: String,
    pub speak_complete: i64,
    pub speak_count: i64,
    pub speak_line_ids: String,
    pub chat_complete: i64,
    pub chat_count: i64,
    pub chat_question_ids: String,
    pub total_points: i64,
    pub hash: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AttemptDbModel {
    /// Empty row for `key`; `id` is assigned on insert.
    pub fn new(key: AttemptKey) -> Self {
        let now = crate::database::time::now_ms();
        Self {
            id: 0,
            activity_id: key.activity_id,
            user_id: key.user_id,
            video_id: key.video_id,
            watch_complete: 0,
            watch_count: 0,
            watch_line_ids: String::new(),
            learn_complete: 0,
            learn_count: 0,
            learn_word_ids: String::new(),
            speak_complete: 0,
            speak_count: 0,
            speak_line_ids: String::new(),
            chat_complete: 0,
            chat_count: 0,
            chat_question_ids: String::new(),
            total_points: 0,
            hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> AttemptKey {
        AttemptKey::new(self.activity_id, self.user_id, self.video_id)
    }

    /// Whether the progress columns (everything except ids and timestamps) match.
    pub fn same_progress(&self, other: &Self) -> bool {
        self.watch_complete == other.watch_complete
            && self.watch_count == other.watch_count
            && self.watch_line_ids == other.watch_line_ids
            && self.learn_complete == other.learn_complete
            && self.learn_count == other.learn_count
            && self.learn_word_ids == other.learn_word_ids
            && self.speak_complete == other.speak_complete
            && self.speak_count == other.speak_count
            && self.speak_line_ids == other.speak_line_ids
            && self.chat_complete == other.chat_complete
            && self.chat_count == other.chat_count
            && self.chat_question_ids == other.chat_question_ids
            && self.total_points == other.total_points
            && self.hash == other.hash
    }
}
