//! Explicit per-request host context.

use serde::{Deserialize, Serialize};

/// Everything about the current request that the host would otherwise keep
/// in process-wide state: the user, the course, languages and permissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostContext {
    pub user_id: i64,
    pub course_id: i64,
    /// Host context reference of the course module (for events).
    pub context_ref: String,
    /// The user holds the manage capability on this activity.
    pub can_manage: bool,
    /// Preferred language of the user, e.g. `"fr_ca"`.
    pub user_language: Option<String>,
    /// Default language of the site.
    pub site_language: Option<String>,
    /// Language the current page is rendered in.
    pub current_language: String,
    pub timezone: String,
}

impl HostContext {
    pub fn new(user_id: i64, course_id: i64) -> Self {
        Self {
            user_id,
            course_id,
            context_ref: format!("course:{course_id}"),
            can_manage: false,
            user_language: None,
            site_language: None,
            current_language: "en".to_string(),
            timezone: "UTC".to_string(),
        }
    }

    pub fn with_context_ref(mut self, context_ref: impl Into<String>) -> Self {
        self.context_ref = context_ref.into();
        self
    }

    pub fn with_manage(mut self, can_manage: bool) -> Self {
        self.can_manage = can_manage;
        self
    }

    pub fn with_languages(
        mut self,
        current: impl Into<String>,
        user: Option<String>,
        site: Option<String>,
    ) -> Self {
        self.current_language = current.into();
        self.user_language = user;
        self.site_language = site;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }
}
