//! Host collaborators.
//!
//! Grades and completion state are owned by the embedding host; the
//! progress service only tells it when something changed.

use async_trait::async_trait;

use crate::Result;

/// Host grade book.
#[async_trait]
pub trait GradeBook: Send + Sync {
    /// Recompute the grade of `user_id` for the activity.
    async fn update_grades(&self, activity_id: i64, user_id: i64) -> Result<()>;
}

/// Host completion tracking.
#[async_trait]
pub trait CompletionTracker: Send + Sync {
    /// Whether completion tracking is on for the course module.
    async fn is_enabled(&self, course_module_id: i64) -> bool;

    async fn mark_complete(&self, course_module_id: i64, user_id: i64) -> Result<()>;
}

/// Grade book that ignores updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGradeBook;

#[async_trait]
impl GradeBook for NoopGradeBook {
    async fn update_grades(&self, _activity_id: i64, _user_id: i64) -> Result<()> {
        Ok(())
    }
}

/// Completion tracker with tracking switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCompletion;

#[async_trait]
impl CompletionTracker for DisabledCompletion {
    async fn is_enabled(&self, _course_module_id: i64) -> bool {
        false
    }

    async fn mark_complete(&self, _course_module_id: i64, _user_id: i64) -> Result<()> {
        Ok(())
    }
}
