//! Error taxonomy for the pipeline.
//!
//! Stage-level failures (`PipelineError`) are contained to a single item by
//! the orchestrator. Cursor persistence failures (`StorageError`) abort the
//! whole run, since dedup correctness is a run-wide invariant.

use std::path::PathBuf;

use thiserror::Error;

/// A failure inside one pipeline stage.
///
/// The orchestrator records these as `Failed(stage, error)` outcomes and
/// moves on to the next item; they never propagate across items.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream error from {service}: {message}")]
    Upstream { service: &'static str, message: String },

    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("transcode failed for {input}: exit {exit_code}: {stderr}")]
    Transcode {
        input: PathBuf,
        exit_code: i32,
        stderr: String,
    },

    #[error("transcription failed for {input}: exit {exit_code}: {stderr}")]
    Transcription {
        input: PathBuf,
        exit_code: i32,
        stderr: String,
    },

    #[error("invalid input for {stage}: {reason}")]
    InvalidInput { stage: &'static str, reason: String },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure in the cursor store. Always fatal for the run.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cursor store unavailable: {0}")]
    Unavailable(String),

    #[error("cursor query failed: {0}")]
    Query(#[from] rusqlite::Error),
}
