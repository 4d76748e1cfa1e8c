//! Activity model.
//!
//! [`Activity`] composes the stored [`ActivityInstance`] with the course
//! module it belongs to and the plugin settings, and exposes both through
//! named accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::{HostContext, PluginConfig};
use crate::database::repositories::VideoRepository;
use crate::progress::ProgressSummary;

/// Per-activity goals. Zero means "no goal".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionGoals {
    pub watch: i64,
    pub learn: i64,
    pub speak: i64,
    pub chat: i64,
}

impl CompletionGoals {
    pub fn from_defaults(config: &PluginConfig) -> Self {
        Self {
            watch: config.default_watch_goal,
            learn: config.default_learn_goal,
            speak: config.default_speak_goal,
            chat: config.default_chat_goal,
        }
    }

    /// Every non-zero goal is reached by `summary`.
    pub fn met_by(&self, summary: &ProgressSummary) -> bool {
        [
            (self.watch, summary.watch),
            (self.learn, summary.learn),
            (self.speak, summary.speak),
            (self.chat, summary.chat),
        ]
        .into_iter()
        .all(|(goal, reached)| goal <= 0 || reached >= goal)
    }
}

/// Stored activity record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInstance {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub activity_open: Option<DateTime<Utc>>,
    pub activity_close: Option<DateTime<Utc>>,
    pub video_open: Option<DateTime<Utc>>,
    pub video_close: Option<DateTime<Utc>>,
    pub goals: CompletionGoals,
    /// Mark the activity complete once the goals are met.
    pub completion_goals: bool,
    /// Progress is shown but no longer recorded.
    pub read_only: bool,
}

fn within(open: Option<DateTime<Utc>>, close: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    !open.is_some_and(|open| open > now) && !close.is_some_and(|close| close < now)
}

/// Activity as seen by one request.
#[derive(Debug, Clone)]
pub struct Activity {
    instance: ActivityInstance,
    course_module_id: i64,
    context_ref: String,
    config: PluginConfig,
    time: DateTime<Utc>,
    available: bool,
    viewable: bool,
}

impl Activity {
    pub fn new(
        instance: ActivityInstance,
        course_module_id: i64,
        ctx: &HostContext,
        config: PluginConfig,
        time: DateTime<Utc>,
    ) -> Self {
        let available = ctx.can_manage || within(instance.activity_open, instance.activity_close, time);
        let viewable = ctx.can_manage || within(instance.video_open, instance.video_close, time);
        Self {
            instance,
            course_module_id,
            context_ref: ctx.context_ref.clone(),
            config,
            time,
            available,
            viewable,
        }
    }

    pub fn instance(&self) -> &ActivityInstance {
        &self.instance
    }

    pub fn id(&self) -> i64 {
        self.instance.id
    }

    pub fn course_id(&self) -> i64 {
        self.instance.course_id
    }

    pub fn name(&self) -> &str {
        &self.instance.name
    }

    pub fn goals(&self) -> CompletionGoals {
        self.instance.goals
    }

    pub fn completion_goals(&self) -> bool {
        self.instance.completion_goals
    }

    pub fn read_only(&self) -> bool {
        self.instance.read_only
    }

    pub fn course_module_id(&self) -> i64 {
        self.course_module_id
    }

    pub fn context_ref(&self) -> &str {
        &self.context_ref
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_viewable(&self) -> bool {
        self.viewable
    }

    pub fn not_available(&self) -> bool {
        !self.available
    }

    pub fn not_viewable(&self) -> bool {
        !self.viewable
    }

    pub fn watch_goal_set(&self) -> bool {
        self.instance.goals.watch > 0
    }

    pub fn learn_goal_set(&self) -> bool {
        self.instance.goals.learn > 0
    }

    pub fn speak_goal_set(&self) -> bool {
        self.instance.goals.speak > 0
    }

    pub fn chat_goal_set(&self) -> bool {
        self.instance.goals.chat > 0
    }

    /// Site switch for the chat activity.
    pub fn chat_mode_enabled(&self) -> bool {
        self.config.chat_mode
    }

    pub fn completion_goals_met(&self, summary: &ProgressSummary) -> bool {
        self.instance.goals.met_by(summary)
    }

    /// Remote video ids in display order.
    pub async fn video_ids(&self, videos: &dyn VideoRepository) -> Result<Vec<i64>> {
        Ok(videos
            .list_for_activity(self.id())
            .await?
            .into_iter()
            .map(|v| v.video_id)
            .collect())
    }

    /// Append a video. Returns `false` when it is already listed.
    pub async fn add_video(&self, videos: &dyn VideoRepository, video_id: i64) -> Result<bool> {
        videos.add_video(self.id(), video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::database::repositories::SqlxVideoRepository;
    use chrono::Duration;

    fn instance() -> ActivityInstance {
        ActivityInstance {
            id: 3,
            course_id: 2,
            name: "Unit 1".to_string(),
            goals: CompletionGoals {
                watch: 2,
                learn: 0,
                speak: 5,
                chat: 0,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_open_and_close_windows() {
        let now = Utc::now();
        let student = HostContext::new(1, 2);

        let open = Activity::new(instance(), 9, &student, PluginConfig::default(), now);
        assert!(open.is_available() && open.is_viewable());

        let future = ActivityInstance {
            activity_open: Some(now + Duration::hours(1)),
            video_close: Some(now - Duration::hours(1)),
            ..instance()
        };
        let closed = Activity::new(future.clone(), 9, &student, PluginConfig::default(), now);
        assert!(closed.not_available());
        assert!(closed.not_viewable());

        let manager = student.with_manage(true);
        let managed = Activity::new(future, 9, &manager, PluginConfig::default(), now);
        assert!(managed.is_available() && managed.is_viewable());
    }

    #[test]
    fn test_goal_predicates() {
        let activity = Activity::new(instance(), 9, &HostContext::new(1, 2), PluginConfig::default(), Utc::now());
        assert!(activity.watch_goal_set());
        assert!(!activity.learn_goal_set());
        assert!(activity.speak_goal_set());
        assert!(!activity.chat_goal_set());
        assert!(!activity.chat_mode_enabled());
    }

    #[test]
    fn test_completion_goals() {
        let goals = instance().goals;
        let short = ProgressSummary {
            watch: 2,
            learn: 0,
            speak: 4,
            chat: 0,
        };
        assert!(!goals.met_by(&short));
        assert!(goals.met_by(&ProgressSummary { speak: 5, ..short }));
        assert!(CompletionGoals::default().met_by(&ProgressSummary::default()));
    }

    #[tokio::test]
    async fn test_videos_keep_insertion_order() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqlxVideoRepository::new(db.pool.clone(), db.write_pool.clone());
        let activity = Activity::new(instance(), 9, &HostContext::new(1, 2), PluginConfig::default(), Utc::now());

        assert!(activity.add_video(&repo, 30).await.unwrap());
        assert!(activity.add_video(&repo, 10).await.unwrap());
        assert!(!activity.add_video(&repo, 30).await.unwrap());
        assert_eq!(activity.video_ids(&repo).await.unwrap(), vec![30, 10]);
    }
}
