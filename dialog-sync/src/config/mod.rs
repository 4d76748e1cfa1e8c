//! Configuration.
//!
//! Stored plugin settings, process configuration loaded from the
//! environment, and the explicit per-request host context.

pub mod app;
pub mod context;
pub mod plugin;

pub use app::AppConfig;
pub use context::HostContext;
pub use plugin::{PluginConfig, SdkMode};
