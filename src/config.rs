//! Configuration for podjay.
//!
//! Sources (highest priority first):
//! 1. Environment variables (PODJAY_HOME plus the secret overrides below)
//! 2. Config file (podjay.yaml, path given on the command line or
//!    $PODJAY_HOME/podjay.yaml)
//! 3. Defaults (~/.podjay)
//!
//! The resolved `Config` is built once in the CLI and passed explicitly
//! into each component; nothing reads configuration ambiently.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw config file schema (matches the YAML structure).
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub directory: DirectoryConfig,
    pub smtp: SmtpConfig,
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Podcast directory API credentials and endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_directory_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Minimum spacing between successive directory requests.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub sender: String,
    pub recipient: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_summarizer_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Workspace root; audio, transcripts and the cursor db live under it.
    pub home: Option<String>,
    pub prompt: Option<String>,
    pub header_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_whisper")]
    pub whisper: String,
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            whisper: default_whisper(),
            whisper_model: default_whisper_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_seconds: u64,
    #[serde(default = "default_transcribe_timeout")]
    pub transcribe_timeout_seconds: u64,
    #[serde(default = "default_summarize_timeout")]
    pub summarize_timeout_seconds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            http_timeout_seconds: default_http_timeout(),
            transcode_timeout_seconds: default_transcode_timeout(),
            transcribe_timeout_seconds: default_transcribe_timeout(),
            summarize_timeout_seconds: default_summarize_timeout(),
        }
    }
}

fn default_directory_base_url() -> String {
    "https://api.podcastindex.org/api/1.0".to_string()
}
fn default_user_agent() -> String {
    "PodcastJay".to_string()
}
fn default_min_request_interval_ms() -> u64 {
    500
}
fn default_smtp_port() -> u16 {
    25
}
fn default_model() -> String {
    "claude-3-opus-20240229".to_string()
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_summarizer_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}
fn default_whisper() -> String {
    "whisper".to_string()
}
fn default_whisper_model() -> String {
    "medium".to_string()
}
fn default_concurrency() -> usize {
    1
}
fn default_http_timeout() -> u64 {
    120
}
fn default_transcode_timeout() -> u64 {
    600
}
fn default_transcribe_timeout() -> u64 {
    3600
}
fn default_summarize_timeout() -> u64 {
    300
}

/// Fully resolved configuration with absolute paths.
#[derive(Debug, Clone)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub smtp: SmtpConfig,
    pub summarizer: SummarizerConfig,
    pub tools: ToolsConfig,
    pub run: RunConfig,

    /// Workspace root.
    pub home: PathBuf,
    /// Prompt template file for the summarizer.
    pub prompt_path: PathBuf,
    /// Inline header image for the email.
    pub header_image_path: PathBuf,
}

impl Config {
    /// Load a config file and resolve all paths.
    ///
    /// Relative paths in the file are resolved against the file's parent
    /// directory. `PODJAY_HOME` overrides the workspace root, and the
    /// secret env vars below override their file counterparts so the YAML
    /// can be committed without credentials.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        Self::resolve(file, base)
    }

    fn resolve(mut file: ConfigFile, base: &Path) -> Result<Self> {
        if let Ok(key) = std::env::var("PODJAY_INDEX_KEY") {
            file.directory.api_key = key;
        }
        if let Ok(secret) = std::env::var("PODJAY_INDEX_SECRET") {
            file.directory.api_secret = secret;
        }
        if let Ok(key) = std::env::var("PODJAY_LLM_KEY") {
            file.summarizer.api_key = key;
        }
        if let Ok(password) = std::env::var("PODJAY_SMTP_PASSWORD") {
            file.smtp.password = Some(password);
        }

        let home = if let Ok(env_home) = std::env::var("PODJAY_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home) = file.paths.home {
            resolve_path(base, home)
        } else {
            default_home()?
        };

        let prompt_path = match file.paths.prompt {
            Some(ref p) => resolve_path(base, p),
            None => home.join("prompt.txt"),
        };
        let header_image_path = match file.paths.header_image {
            Some(ref p) => resolve_path(base, p),
            None => home.join("header.png"),
        };

        Ok(Self {
            directory: file.directory,
            smtp: file.smtp,
            summarizer: file.summarizer,
            tools: file.tools,
            run: file.run,
            home,
            prompt_path,
            header_image_path,
        })
    }

    /// Directory where downloaded and transcoded audio is kept.
    pub fn audio_dir(&self) -> PathBuf {
        self.home.join("podcast_audio")
    }

    /// Directory where transcripts are written.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.home.join("transcripts")
    }

    /// Cursor database path.
    pub fn cursor_db_path(&self) -> PathBuf {
        self.home.join("podcasts.db")
    }

    /// Log of newly discovered audio URLs (feed mode).
    pub fn links_path(&self) -> PathBuf {
        self.home.join("podcast-links.txt")
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.run.http_timeout_seconds)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.run.transcode_timeout_seconds)
    }

    pub fn transcribe_timeout(&self) -> Duration {
        Duration::from_secs(self.run.transcribe_timeout_seconds)
    }

    pub fn summarize_timeout(&self) -> Duration {
        Duration::from_secs(self.run.summarize_timeout_seconds)
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".podjay"))
}

fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = Path::new(path_str);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    // Normalize away leading `./` so resolved paths compare cleanly.
    let mut resolved = base.to_path_buf();
    for component in path.components() {
        if component != std::path::Component::CurDir {
            resolved.push(component);
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
directory:
  api_key: k
  api_secret: s
smtp:
  server: mail.example
  sender: from@example.com
  recipient: to@example.com
summarizer:
  api_key: llm-key
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("podjay.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", MINIMAL).unwrap();
        // Pin the workspace so the test ignores the real home directory.
        write!(f, "paths:\n  home: ./work\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.directory.user_agent, "PodcastJay");
        assert_eq!(config.tools.whisper_model, "medium");
        assert_eq!(config.run.concurrency, 1);
        assert_eq!(config.home, temp.path().join("work"));
        assert_eq!(config.prompt_path, temp.path().join("work/prompt.txt"));
        assert_eq!(config.cursor_db_path(), temp.path().join("work/podcasts.db"));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("podjay.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", MINIMAL).unwrap();
        write!(
            f,
            "paths:\n  home: ./data\n  prompt: ./templates/prompt.txt\n"
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.home, temp.path().join("data"));
        assert_eq!(config.prompt_path, temp.path().join("templates/prompt.txt"));
    }
}
