//! Per-activity progress totals.

use serde::{Deserialize, Serialize};

use crate::database::models::AttemptDbModel;

/// Totals of one user across all videos of an activity.
///
/// `watch` counts completed videos; the others count learned words,
/// spoken lines and answered chat questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub watch: i64,
    pub learn: i64,
    pub speak: i64,
    pub chat: i64,
}

impl ProgressSummary {
    pub fn from_attempts<'a>(attempts: impl IntoIterator<Item = &'a AttemptDbModel>) -> Self {
        attempts
            .into_iter()
            .fold(Self::default(), |mut summary, attempt| {
                summary.watch += attempt.watch_complete;
                summary.learn += attempt.learn_count;
                summary.speak += attempt.speak_count;
                summary.chat += attempt.chat_count;
                summary
            })
    }
}
