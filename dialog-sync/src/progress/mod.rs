//! Progress reconciliation.
//!
//! Remote progress reports are merged into one aggregate per user and
//! video. Id sets only grow and counts are derived from them, so replaying
//! a report is harmless.

pub mod aggregate;
pub mod reconciler;
pub mod service;
pub mod summary;

pub use aggregate::{IdSet, ProgressAggregate, TaskProgress};
pub use reconciler::merge;
pub use service::ProgressService;
pub use summary::ProgressSummary;
