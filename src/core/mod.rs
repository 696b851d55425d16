//! Orchestration core: the feed cursor store and the pipeline driver.

pub mod cursor;
pub mod orchestrator;

pub use cursor::{CursorStore, SqliteCursorStore};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
