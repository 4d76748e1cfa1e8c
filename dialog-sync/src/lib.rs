//! dialog-sync library crate.
//!
//! Authenticates against the remote lesson service and keeps per-user
//! video progress in step with its report cards.

pub mod activity;
pub mod config;
pub mod credentials;
pub mod database;
pub mod error;
pub mod host;
pub mod logging;
pub mod notification;
pub mod page;
pub mod progress;
pub mod remote;
pub mod session;

pub use error::{Error, Result};
