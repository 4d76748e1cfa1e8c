//! Outbound notifications.

pub mod events;

pub use events::{ProgressEvent, ProgressEventBroadcaster};
