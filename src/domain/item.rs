//! Work items and per-stage pipeline state.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One line of the input list: either a feed to poll for its latest
/// episode, or an explicit episode id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItem {
    /// Poll the directory for the most recent episode of this feed.
    Feed(i64),

    /// Process one specific episode.
    Episode(i64),
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Feed(id) => write!(f, "feed:{}", id),
            WorkItem::Episode(id) => write!(f, "episode:{}", id),
        }
    }
}

/// Normalized episode metadata returned by the directory.
///
/// Immutable once resolved; discarded when the item reaches a terminal
/// state. `feed_id` is absent when the episode was looked up directly by
/// its own id and the directory response carried no feed reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub feed_id: Option<i64>,
    pub episode_id: i64,
    pub audio_url: String,
    pub title: String,
}

/// One episode's working state as it moves through the stages.
///
/// Each field is filled in by the stage that produces it. Owned by exactly
/// one in-flight item; never shared.
#[derive(Debug, Clone)]
pub struct PipelineItem {
    pub episode: EpisodeRef,
    pub local_audio: Option<PathBuf>,
    pub canonical_audio: Option<PathBuf>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
}

impl PipelineItem {
    pub fn new(episode: EpisodeRef) -> Self {
        Self {
            episode,
            local_audio: None,
            canonical_audio: None,
            transcript: None,
            summary: None,
        }
    }
}

/// The ordered pipeline stages, used for outcome reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    CursorCheck,
    Fetch,
    Transcode,
    Transcribe,
    Summarize,
    Notify,
    AcceptCursor,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::CursorCheck => "cursor_check",
            Stage::Fetch => "fetch",
            Stage::Transcode => "transcode",
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
            Stage::Notify => "notify",
            Stage::AcceptCursor => "accept_cursor",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_item_display() {
        assert_eq!(WorkItem::Feed(123).to_string(), "feed:123");
        assert_eq!(WorkItem::Episode(456).to_string(), "episode:456");
    }

    #[test]
    fn pipeline_item_starts_empty() {
        let item = PipelineItem::new(EpisodeRef {
            feed_id: Some(1),
            episode_id: 2,
            audio_url: "https://x/a.mp3".to_string(),
            title: "Ep".to_string(),
        });
        assert!(item.local_audio.is_none());
        assert!(item.canonical_audio.is_none());
        assert!(item.transcript.is_none());
        assert!(item.summary.is_none());
    }
}
