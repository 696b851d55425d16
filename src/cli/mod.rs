//! Command-line interface for podjay.
//!
//! Two processing modes mirror the two input surfaces: a list of feed ids
//! (poll each feed for its latest episode) or a list of explicit episode
//! ids. Both drive the same pipeline.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::adapters::{
    AnthropicSummarizer, FfmpegTranscoder, HttpFetcher, PodcastIndexClient, SmtpNotifier,
    WhisperTranscriber,
};
use crate::config::Config;
use crate::core::{Orchestrator, OrchestratorSettings, SqliteCursorStore};
use crate::domain::{ItemStatus, RunReport, WorkItem};

/// podjay - incremental podcast summary pipeline
#[derive(Parser, Debug)]
#[command(name = "podjay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, env = "PODJAY_CONFIG", default_value = "podjay.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check each feed in the list for a new latest episode and process it
    Feeds {
        /// File with one feed id per line
        list: PathBuf,
    },

    /// Process each episode id in the list
    Episodes {
        /// File with one episode id per line
        list: PathBuf,
    },

    /// Show the resolved configuration (secrets redacted)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(&self.config)?;

        match self.command {
            Commands::Feeds { list } => {
                let items = read_id_list(&list, WorkItem::Feed).await?;
                let report = run_pipeline(&config, items).await?;
                append_links(&config.links_path(), &report).await?;
                print_report(&report);
            }
            Commands::Episodes { list } => {
                let items = read_id_list(&list, WorkItem::Episode).await?;
                let report = run_pipeline(&config, items).await?;
                print_report(&report);
            }
            Commands::Config => print_config(&config),
        }

        Ok(())
    }
}

/// Wire up the production components and run the orchestrator.
async fn run_pipeline(config: &Config, items: Vec<WorkItem>) -> Result<RunReport> {
    let prompt_template = tokio::fs::read_to_string(&config.prompt_path)
        .await
        .with_context(|| format!("Failed to read prompt template: {}", config.prompt_path.display()))?
        .trim()
        .to_string();

    let cursors = Arc::new(SqliteCursorStore::open(&config.cursor_db_path())?);
    let resolver = Arc::new(PodcastIndexClient::new(
        config.directory.clone(),
        config.http_timeout(),
    )?);
    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout())?);
    let transcoder = Arc::new(FfmpegTranscoder::new(
        config.tools.ffmpeg.clone(),
        config.transcode_timeout(),
    ));
    let transcriber = Arc::new(WhisperTranscriber::new(
        config.tools.whisper.clone(),
        config.tools.whisper_model.clone(),
        config.transcribe_timeout(),
    ));
    let summarizer = Arc::new(AnthropicSummarizer::new(
        config.summarizer.clone(),
        config.summarize_timeout(),
    )?);
    let notifier = Arc::new(SmtpNotifier::new(
        config.smtp.clone(),
        config.header_image_path.clone(),
    )?);

    let orchestrator = Orchestrator::new(
        resolver,
        fetcher,
        transcoder,
        transcriber,
        summarizer,
        notifier,
        cursors,
        OrchestratorSettings {
            audio_dir: config.audio_dir(),
            transcripts_dir: config.transcripts_dir(),
            prompt_template,
            concurrency: config.run.concurrency,
        },
    );

    // Ctrl-C stops dispatching new items; in-flight items finish.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight items");
            cancel_flag.store(true, Ordering::SeqCst);
        }
    });

    let report = orchestrator.run(&items, &cancel).await?;
    Ok(report)
}

/// Read one numeric id per line; blank lines and `#` comments are skipped,
/// unparsable lines are reported and skipped.
async fn read_id_list(path: &Path, make: fn(i64) -> WorkItem) -> Result<Vec<WorkItem>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input list: {}", path.display()))?;

    let mut items = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<i64>() {
            Ok(id) => items.push(make(id)),
            Err(_) => warn!(line, "Skipping unparsable id in input list"),
        }
    }
    Ok(items)
}

/// Append the audio URLs of newly accepted episodes to the links log.
async fn append_links(path: &Path, report: &RunReport) -> Result<()> {
    let urls = report.discovered_audio_urls();
    if urls.is_empty() {
        return Ok(());
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open links log: {}", path.display()))?;
    for url in urls {
        file.write_all(format!("{}\n", url).as_bytes()).await?;
    }
    file.flush().await?;
    Ok(())
}

fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        let title = outcome.title.as_deref().unwrap_or("<unresolved>");
        match &outcome.status {
            ItemStatus::Done => println!("done    {} \"{}\"", outcome.item, title),
            ItemStatus::Skipped => println!("skip    {} \"{}\"", outcome.item, title),
            ItemStatus::Failed { stage, error } => {
                println!("failed  {} at {}: {}", outcome.item, stage, error)
            }
        }
    }
    println!(
        "{} done, {} skipped, {} failed",
        report.done_count(),
        report.skipped_count(),
        report.failed_count()
    );
}

fn print_config(config: &Config) {
    println!("home:          {}", config.home.display());
    println!("prompt:        {}", config.prompt_path.display());
    println!("header image:  {}", config.header_image_path.display());
    println!("cursor db:     {}", config.cursor_db_path().display());
    println!("directory url: {}", config.directory.base_url);
    println!("user agent:    {}", config.directory.user_agent);
    println!("smtp:          {}:{}", config.smtp.server, config.smtp.port);
    println!("recipient:     {}", config.smtp.recipient);
    println!("model:         {}", config.summarizer.model);
    println!("whisper:       {} ({})", config.tools.whisper, config.tools.whisper_model);
    println!("concurrency:   {}", config.run.concurrency);
}
