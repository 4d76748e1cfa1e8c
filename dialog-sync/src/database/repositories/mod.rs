//! Repository layer for database access.

pub mod account;
pub mod attempt;
pub mod video;

pub use account::*;
pub use attempt::*;
pub use video::*;
