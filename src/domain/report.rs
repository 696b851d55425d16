//! Per-item outcomes and the aggregated run report.
//!
//! Outcomes are plain values so reporting stays decoupled from
//! presentation; the CLI decides how to print them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{Stage, WorkItem};

/// Terminal status of one processed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ItemStatus {
    /// All stages completed and the cursor was accepted.
    Done,

    /// The resolved episode matched the stored cursor; nothing to do.
    Skipped,

    /// A stage failed; the error is carried as text for reporting.
    Failed { stage: Stage, error: String },
}

/// The recorded result of one input item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item: WorkItem,
    pub status: ItemStatus,

    /// Episode title, when resolution got far enough to know it.
    pub title: Option<String>,

    /// Audio URL of a newly accepted episode (feed mode appends these to
    /// the discovered-links log).
    pub audio_url: Option<String>,
}

impl ItemOutcome {
    pub fn new(item: WorkItem, status: ItemStatus) -> Self {
        Self {
            item,
            status,
            title: None,
            audio_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, ItemStatus::Done)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ItemStatus::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ItemStatus::Failed { .. })
    }
}

/// Aggregated result of one run over the input list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn done_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Audio URLs of episodes accepted during this run, in outcome order.
    pub fn discovered_audio_urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_done())
            .filter_map(|o| o.audio_url.as_deref())
            .collect()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let mut report = RunReport::new();
        report.record(ItemOutcome::new(WorkItem::Feed(1), ItemStatus::Done));
        report.record(ItemOutcome::new(WorkItem::Feed(2), ItemStatus::Skipped));
        report.record(ItemOutcome::new(
            WorkItem::Feed(3),
            ItemStatus::Failed {
                stage: Stage::Fetch,
                error: "boom".to_string(),
            },
        ));
        report.finish();

        assert_eq!(report.done_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn discovered_urls_only_from_done_items() {
        let mut report = RunReport::new();
        report.record(
            ItemOutcome::new(WorkItem::Feed(1), ItemStatus::Done)
                .with_audio_url("https://x/a.mp3"),
        );
        report.record(
            ItemOutcome::new(WorkItem::Feed(2), ItemStatus::Skipped)
                .with_audio_url("https://x/b.mp3"),
        );

        assert_eq!(report.discovered_audio_urls(), vec!["https://x/a.mp3"]);
    }
}
