//! Domain data structures.
//!
//! - `item`: the unit of work and its per-stage state
//! - `report`: per-item outcomes and the aggregated run report

pub mod item;
pub mod report;

pub use item::{EpisodeRef, PipelineItem, Stage, WorkItem};
pub use report::{ItemOutcome, ItemStatus, RunReport};
