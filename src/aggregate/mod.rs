//! Topic, info item and action item wrappers over a topic parent.

mod item;
mod parent;
mod topic;

pub use item::*;
pub use parent::*;
pub use topic::*;
