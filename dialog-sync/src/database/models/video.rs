//! Video cache and activity video list models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cached remote metadata for one video, filled once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogCacheDbModel {
    pub video_id: i64,
    pub name: Option<String>,
    /// Raw JSON of the remote dialog listing entry.
    pub details_json: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DialogCacheDbModel {
    pub fn is_filled(&self) -> bool {
        self.details_json.is_some()
    }
}

/// One entry of an activity's ordered video list.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityVideoDbModel {
    pub id: i64,
    pub activity_id: i64,
    pub video_id: i64,
    pub sort_order: i64,
}
