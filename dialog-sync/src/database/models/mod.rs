//! Database models.
//!
//! These map directly onto the baseline schema.

pub mod account;
pub mod attempt;
pub mod video;

pub use account::*;
pub use attempt::*;
pub use video::*;
