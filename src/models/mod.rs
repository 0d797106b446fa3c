//! Data models for the minutes backend.
//!
//! Field names serialize to the document shapes clients already use
//! (`_id`, `meetingSeries_id`, camelCase elsewhere).

mod label;
mod minutes;
mod series;
mod topic;
mod user;

pub use label::*;
pub use minutes::*;
pub use series::*;
pub use topic::*;
pub use user::*;
