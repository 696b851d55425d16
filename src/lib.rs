//! podjay - incremental podcast summary pipeline
//!
//! Turns a list of podcast feeds or episodes into emailed summaries:
//! discover new episodes through the directory API, download the audio,
//! normalize it, transcribe it, summarize the transcript and mail the
//! result.
//!
//! # Architecture
//!
//! The orchestrator drives each item through an ordered stage sequence;
//! a per-feed cursor in SQLite decides what is new. A failure in any
//! stage is contained to that item: it is recorded in the run report and
//! the next item is attempted. Only a cursor-store failure aborts a run.
//!
//! # Modules
//!
//! - `adapters`: stage capability traits and their production
//!   implementations (directory, HTTP download, ffmpeg, whisper,
//!   generation service, SMTP)
//! - `core`: orchestration logic and the feed cursor store
//! - `domain`: data structures (EpisodeRef, WorkItem, outcomes, report)
//! - `cli`: command-line interface

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod names;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use core::{CursorStore, Orchestrator, OrchestratorSettings, SqliteCursorStore};
pub use domain::{EpisodeRef, ItemOutcome, ItemStatus, RunReport, Stage, WorkItem};
pub use error::{PipelineError, StorageError};
