//! Pipeline orchestrator.
//!
//! Drives each input item through resolve → cursor check → fetch →
//! transcode → transcribe → summarize → notify, isolating failure to the
//! single item. Cursor acceptance happens exactly once per new episode,
//! and only after notification succeeds: a crash mid-item means the
//! episode is re-processed next run (possible duplicate email) rather
//! than silently lost.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::adapters::{
    EpisodeResolver, MediaFetcher, Notifier, Summarizer, Transcoder, Transcriber,
};
use crate::domain::{EpisodeRef, ItemOutcome, ItemStatus, PipelineItem, RunReport, Stage, WorkItem};
use crate::error::{PipelineError, StorageError};
use crate::names::safe_file_stem;

use super::cursor::CursorStore;

/// Run-level settings the orchestrator needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Root for per-item audio working directories.
    pub audio_dir: PathBuf,

    /// Where successful transcripts are written.
    pub transcripts_dir: PathBuf,

    /// Instruction template prepended to each transcript for the
    /// summarizer.
    pub prompt_template: String,

    /// Maximum items in flight; 1 reproduces strictly sequential
    /// processing.
    pub concurrency: usize,
}

/// Sequences the stage components over an ordered list of work items.
///
/// The orchestrator is the only component that talks to more than one
/// collaborator; data flows strictly downward through the stages.
#[derive(Clone)]
pub struct Orchestrator {
    resolver: Arc<dyn EpisodeResolver>,
    fetcher: Arc<dyn MediaFetcher>,
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
    notifier: Arc<dyn Notifier>,
    cursors: Arc<dyn CursorStore>,
    settings: Arc<OrchestratorSettings>,
    /// One lock per feed: the cursor check and the eventual accept must
    /// not interleave across concurrent items of the same feed, or a
    /// slow older episode could overwrite a newer cursor value.
    feed_locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<dyn EpisodeResolver>,
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
        notifier: Arc<dyn Notifier>,
        cursors: Arc<dyn CursorStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            transcoder,
            transcriber,
            summarizer,
            notifier,
            cursors,
            settings: Arc::new(settings),
            feed_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_feed(&self, feed_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.feed_locks.lock().await;
            Arc::clone(locks.entry(feed_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Process every item in order.
    ///
    /// Item `i+1` is always attempted regardless of item `i`'s outcome;
    /// the only error that escapes is a cursor-store failure, which aborts
    /// the run. Setting `cancel` stops dispatching new items while letting
    /// in-flight items reach a terminal state.
    pub async fn run(
        &self,
        items: &[WorkItem],
        cancel: &AtomicBool,
    ) -> Result<RunReport, StorageError> {
        let items = dedupe_items(items);
        let mut report = RunReport::new();
        info!(count = items.len(), "Starting run");

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks: JoinSet<(usize, Result<ItemOutcome, StorageError>)> = JoinSet::new();
        let mut indexed: Vec<Option<ItemOutcome>> = vec![None; items.len()];
        let mut storage_failure: Option<StorageError> = None;

        for (idx, item) in items.iter().copied().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                warn!("Cancellation requested, not dispatching remaining items");
                break;
            }
            if storage_failure.is_some() {
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
            let worker = self.clone();
            tasks.spawn(async move {
                let outcome = worker.process_item(item).await;
                drop(permit);
                (idx, outcome)
            });

            // Drain any finished tasks so a storage failure stops dispatch
            // promptly instead of after the whole list.
            while let Some(joined) = tasks.try_join_next() {
                collect_outcome(joined, &mut indexed, &mut storage_failure);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            collect_outcome(joined, &mut indexed, &mut storage_failure);
        }

        if let Some(err) = storage_failure {
            error!(error = %err, "Cursor store failed, aborting run");
            return Err(err);
        }

        for outcome in indexed.into_iter().flatten() {
            report.record(outcome);
        }
        report.finish();

        info!(
            done = report.done_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "Run finished"
        );
        Ok(report)
    }

    /// Drive one item through the stage sequence.
    ///
    /// Stage failures come back as `Failed` outcomes; only cursor-store
    /// errors escape as `Err`.
    #[instrument(skip(self), fields(item = %item))]
    async fn process_item(&self, item: WorkItem) -> Result<ItemOutcome, StorageError> {
        let episode = match self.resolve(item).await {
            Ok(episode) => episode,
            Err(e) => return Ok(self.fail(item, None, Stage::Resolve, e)),
        };
        let title = episode.title.clone();

        // Two episode-mode items can resolve to the same feed; hold that
        // feed's lock from the cursor check through acceptance so they run
        // one at a time. Episodes without a feed reference have no dedup
        // boundary and are always processed.
        let _feed_guard = match episode.feed_id {
            Some(feed_id) => Some(self.lock_feed(feed_id).await),
            None => None,
        };
        if let Some(feed_id) = episode.feed_id {
            if self.cursors.get(feed_id)? == Some(episode.episode_id) {
                info!(feed_id, episode_id = episode.episode_id, "Episode already processed");
                return Ok(
                    ItemOutcome::new(item, ItemStatus::Skipped).with_title(title)
                );
            }
            info!(feed_id, episode_id = episode.episode_id, title = %title, "New episode");
        }

        let mut state = PipelineItem::new(episode);

        let work_dir = self
            .settings
            .audio_dir
            .join(format!("ep{}", state.episode.episode_id));
        match self.fetcher.fetch(&state.episode.audio_url, &work_dir).await {
            Ok(path) => state.local_audio = Some(path),
            Err(e) => return Ok(self.fail(item, Some(&state.episode), Stage::Fetch, e)),
        }

        let local_audio = state.local_audio.clone().unwrap_or_default();
        match self.transcoder.transcode(&local_audio).await {
            Ok(path) => state.canonical_audio = Some(path),
            Err(e) => return Ok(self.fail(item, Some(&state.episode), Stage::Transcode, e)),
        }

        let canonical = state.canonical_audio.clone().unwrap_or_default();
        match self.transcriber.transcribe(&canonical).await {
            Ok(text) => state.transcript = Some(text),
            Err(e) => return Ok(self.fail(item, Some(&state.episode), Stage::Transcribe, e)),
        }

        let transcript = state.transcript.clone().unwrap_or_default();
        if let Err(e) = self.write_transcript(&state.episode, &transcript).await {
            return Ok(self.fail(item, Some(&state.episode), Stage::Transcribe, e));
        }

        match self
            .summarizer
            .summarize(&self.settings.prompt_template, &transcript)
            .await
        {
            Ok(summary) => state.summary = Some(summary),
            Err(e) => return Ok(self.fail(item, Some(&state.episode), Stage::Summarize, e)),
        }

        let summary = state.summary.clone().unwrap_or_default();
        if let Err(e) = self.notifier.notify(&summary, &state.episode.title).await {
            return Ok(self.fail(item, Some(&state.episode), Stage::Notify, e));
        }

        // Accept the cursor only now that the terminal stage succeeded.
        if let Some(feed_id) = state.episode.feed_id {
            self.cursors.upsert(feed_id, state.episode.episode_id)?;
        }

        info!(episode_id = state.episode.episode_id, title = %title, "Episode processed");
        Ok(ItemOutcome::new(item, ItemStatus::Done)
            .with_title(title)
            .with_audio_url(state.episode.audio_url.clone()))
    }

    async fn resolve(&self, item: WorkItem) -> Result<EpisodeRef, PipelineError> {
        match item {
            WorkItem::Episode(id) => self.resolver.resolve_by_episode_id(id).await,
            WorkItem::Feed(id) => self.resolver.resolve_latest_by_feed_id(id).await,
        }
    }

    async fn write_transcript(
        &self,
        episode: &EpisodeRef,
        transcript: &str,
    ) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.settings.transcripts_dir).await?;
        let path = self
            .settings
            .transcripts_dir
            .join(format!("{}.txt", safe_file_stem(&episode.title)));
        tokio::fs::write(&path, transcript).await?;
        Ok(())
    }

    fn fail(
        &self,
        item: WorkItem,
        episode: Option<&EpisodeRef>,
        stage: Stage,
        error: PipelineError,
    ) -> ItemOutcome {
        warn!(%item, %stage, error = %error, "Stage failed, continuing with next item");
        let mut outcome = ItemOutcome::new(
            item,
            ItemStatus::Failed {
                stage,
                error: error.to_string(),
            },
        );
        if let Some(episode) = episode {
            outcome = outcome.with_title(episode.title.clone());
        }
        outcome
    }
}

fn collect_outcome(
    joined: Result<(usize, Result<ItemOutcome, StorageError>), tokio::task::JoinError>,
    indexed: &mut [Option<ItemOutcome>],
    storage_failure: &mut Option<StorageError>,
) {
    let result = match joined {
        Ok((idx, Ok(outcome))) => {
            indexed[idx] = Some(outcome);
            return;
        }
        Ok((_, Err(e))) => e,
        Err(join_err) => StorageError::Unavailable(format!("worker panicked: {}", join_err)),
    };
    if storage_failure.is_none() {
        *storage_failure = Some(result);
    }
}

/// Drop repeated input lines; `upsert` is idempotent anyway, but
/// duplicates would also waste the expensive stages. Distinct items that
/// resolve to the same feed are serialized later, by the per-feed lock.
fn dedupe_items(items: &[WorkItem]) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    items
        .iter()
        .copied()
        .filter(|item| seen.insert(*item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_preserves_order_and_drops_repeats() {
        let items = [
            WorkItem::Feed(1),
            WorkItem::Feed(2),
            WorkItem::Feed(1),
            WorkItem::Episode(2),
            WorkItem::Episode(2),
        ];
        assert_eq!(
            dedupe_items(&items),
            vec![WorkItem::Feed(1), WorkItem::Feed(2), WorkItem::Episode(2)]
        );
    }
}
