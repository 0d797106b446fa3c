//! Workflows over the document store.

mod finalizer;
mod is_edited;
mod minutes_finder;
mod series;
mod topics_finalizer;

pub use finalizer::*;
pub use is_edited::*;
pub use minutes_finder::*;
pub use series::*;
pub use topics_finalizer::*;
