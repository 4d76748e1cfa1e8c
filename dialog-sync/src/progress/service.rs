//! Progress service: merge, persist and notify.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::aggregate::ProgressAggregate;
use super::reconciler::merge;
use super::summary::ProgressSummary;
use crate::Result;
use crate::activity::Activity;
use crate::database::models::{AttemptDbModel, AttemptKey};
use crate::database::repositories::AttemptRepository;
use crate::host::{CompletionTracker, GradeBook};
use crate::notification::{ProgressEvent, ProgressEventBroadcaster};
use crate::remote::RemoteProgressReport;

pub struct ProgressService {
    attempts: Arc<dyn AttemptRepository>,
    events: ProgressEventBroadcaster,
    grades: Arc<dyn GradeBook>,
    completion: Arc<dyn CompletionTracker>,
}

impl ProgressService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        events: ProgressEventBroadcaster,
        grades: Arc<dyn GradeBook>,
        completion: Arc<dyn CompletionTracker>,
    ) -> Self {
        Self {
            attempts,
            events,
            grades,
            completion,
        }
    }

    pub fn events(&self) -> &ProgressEventBroadcaster {
        &self.events
    }

    /// Merge `report` into the stored progress of `user_id` on `video_id`.
    ///
    /// The read-merge-write runs in one immediate transaction, so duplicate
    /// deliveries of a report serialize and converge on the same row.
    #[instrument(skip(self, activity, report), fields(activity_id = activity.id()))]
    pub async fn update_progress(
        &self,
        activity: &Activity,
        user_id: i64,
        video_id: i64,
        report: &RemoteProgressReport,
    ) -> Result<AttemptDbModel> {
        let key = AttemptKey::new(activity.id(), user_id, video_id);
        let update = |existing: Option<&AttemptDbModel>| {
            let prior = existing.map(ProgressAggregate::from_model);
            let merged = merge(report, prior.as_ref());
            let mut row = existing
                .cloned()
                .unwrap_or_else(|| AttemptDbModel::new(key));
            merged.apply_to(&mut row);
            row
        };
        let row = self.attempts.upsert_with(key, &update).await?;

        self.events.publish(ProgressEvent::ProgressUpdated {
            context_ref: activity.context_ref().to_string(),
            attempt_id: row.id,
            activity_id: activity.id(),
        });

        self.grades.update_grades(activity.id(), user_id).await?;
        self.update_completion(activity, user_id).await?;
        Ok(row)
    }

    async fn update_completion(&self, activity: &Activity, user_id: i64) -> Result<()> {
        if !activity.completion_goals() || !self.completion.is_enabled(activity.course_module_id()).await {
            return Ok(());
        }
        let summary = self.summary(activity.id(), user_id).await?;
        if activity.completion_goals_met(&summary) {
            info!(user_id, "Completion goals met");
            self.completion
                .mark_complete(activity.course_module_id(), user_id)
                .await?;
        } else {
            debug!(user_id, ?summary, "Completion goals not met yet");
        }
        Ok(())
    }

    /// Totals of `user_id` across the videos of the activity.
    pub async fn summary(&self, activity_id: i64, user_id: i64) -> Result<ProgressSummary> {
        let attempts = self.attempts.list_for_user(activity_id, user_id, None).await?;
        Ok(ProgressSummary::from_attempts(&attempts))
    }

    /// Stored attempts of `user_id`, optionally for one video.
    pub async fn attempts(
        &self,
        activity_id: i64,
        user_id: i64,
        video_id: Option<i64>,
    ) -> Result<Vec<AttemptDbModel>> {
        self.attempts.list_for_user(activity_id, user_id, video_id).await
    }
}
