//! Capability interfaces for the external stages, plus their production
//! implementations.
//!
//! Each trait covers exactly one external collaborator (directory lookup,
//! audio download, transcoding tool, speech-to-text engine, generation
//! service, mail transport). The orchestrator only ever sees the traits,
//! so tests substitute canned implementations and never touch real media,
//! models or networks.

pub mod anthropic;
pub mod directory;
pub mod fetcher;
pub mod ffmpeg;
pub mod smtp;
pub mod whisper;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::EpisodeRef;
use crate::error::PipelineError;

pub use anthropic::AnthropicSummarizer;
pub use directory::PodcastIndexClient;
pub use fetcher::HttpFetcher;
pub use ffmpeg::FfmpegTranscoder;
pub use smtp::SmtpNotifier;
pub use whisper::WhisperTranscriber;

/// Looks up normalized episode metadata in the external directory.
#[async_trait]
pub trait EpisodeResolver: Send + Sync {
    async fn resolve_by_episode_id(&self, episode_id: i64) -> Result<EpisodeRef, PipelineError>;

    /// The single most-recent episode of the feed; `NotFound` when the
    /// feed has no episodes.
    async fn resolve_latest_by_feed_id(&self, feed_id: i64) -> Result<EpisodeRef, PipelineError>;
}

/// Downloads an audio blob to local storage, atomically: on failure no
/// partial file remains.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, PipelineError>;
}

/// Normalizes arbitrary input audio into the canonical mono 16 kHz
/// 16-bit PCM waveform the transcriber requires.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path) -> Result<PathBuf, PipelineError>;
}

/// Runs speech-to-text over a canonical waveform.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, canonical_audio: &Path) -> Result<String, PipelineError>;
}

/// Composes a prompt from the template and transcript and returns a
/// markdown summary from the generation service.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        prompt_template: &str,
        transcript: &str,
    ) -> Result<String, PipelineError>;
}

/// Renders the summary and dispatches it to the configured recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary_markdown: &str, subject_title: &str)
        -> Result<(), PipelineError>;
}
