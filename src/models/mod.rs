//! Data models

pub mod feedback;
pub mod log_entry;
pub mod risk;
pub mod stats;
pub mod user;

pub use feedback::*;
pub use log_entry::*;
pub use risk::*;
pub use stats::*;
pub use user::*;
