//! Podcast directory client (Podcast Index API).
//!
//! Every request is signed per-call: the `Authorization` header is the
//! SHA-1 hex digest of `key ∥ secret ∥ unix-timestamp`, with the timestamp
//! echoed in `X-Auth-Date`. The digest must be reproducible byte-for-byte
//! for the directory to accept it.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::domain::EpisodeRef;
use crate::error::PipelineError;

use super::EpisodeResolver;

/// Signed client for the podcast directory lookups.
pub struct PodcastIndexClient {
    config: DirectoryConfig,
    client: reqwest::Client,
    /// Rate gate: completion time of the most recent request.
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

/// `episodes/byid` response body.
#[derive(Debug, Deserialize)]
struct ByIdResponse {
    episode: Option<EpisodeBody>,
}

/// `episodes/byfeedid` response body.
#[derive(Debug, Deserialize)]
struct ByFeedIdResponse {
    #[serde(default)]
    items: Vec<EpisodeBody>,
}

#[derive(Debug, Deserialize)]
struct EpisodeBody {
    id: Option<i64>,
    #[serde(rename = "enclosureUrl")]
    enclosure_url: Option<String>,
    title: Option<String>,
    #[serde(rename = "feedId")]
    feed_id: Option<i64>,
}

impl PodcastIndexClient {
    pub fn new(config: DirectoryConfig, http_timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| PipelineError::Upstream {
                service: "directory",
                message: e.to_string(),
            })?;

        Ok(Self {
            config,
            client,
            last_request: tokio::sync::Mutex::new(None),
        })
    }

    /// Space successive directory calls by the configured minimum interval.
    async fn rate_gate(&self) {
        let interval = Duration::from_millis(self.config.min_request_interval_ms);
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, PipelineError> {
        self.rate_gate().await;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            .to_string();
        let signature = sign(&self.config.api_key, &self.config.api_secret, &timestamp);

        debug!(%url, "Directory lookup");

        let response = self
            .client
            .get(url)
            .header("X-Auth-Date", &timestamp)
            .header("X-Auth-Key", &self.config.api_key)
            .header("Authorization", &signature)
            .header("User-Agent", &self.config.user_agent)
            .send()
            .await
            .map_err(|e| PipelineError::Upstream {
                service: "directory",
                message: e.to_string(),
            })?;

        if response.status() != StatusCode::OK {
            return Err(PipelineError::Upstream {
                service: "directory",
                message: format!("status {} for {}", response.status(), url),
            });
        }

        response.json().await.map_err(|e| PipelineError::Upstream {
            service: "directory",
            message: format!("malformed response: {}", e),
        })
    }
}

#[async_trait]
impl EpisodeResolver for PodcastIndexClient {
    async fn resolve_by_episode_id(&self, episode_id: i64) -> Result<EpisodeRef, PipelineError> {
        let url = format!("{}/episodes/byid?id={}", self.config.base_url, episode_id);
        let body: ByIdResponse = self.get_json(&url).await?;

        let episode = body
            .episode
            .ok_or_else(|| PipelineError::NotFound(format!("episode {}", episode_id)))?;

        episode_ref(episode, Some(episode_id))
            .ok_or_else(|| PipelineError::NotFound(format!("episode {}", episode_id)))
    }

    async fn resolve_latest_by_feed_id(&self, feed_id: i64) -> Result<EpisodeRef, PipelineError> {
        let url = format!(
            "{}/episodes/byfeedid?id={}&max=1",
            self.config.base_url, feed_id
        );
        let body: ByFeedIdResponse = self.get_json(&url).await?;

        let latest = body
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::NotFound(format!("feed {} has no episodes", feed_id)))?;

        let mut episode = episode_ref(latest, None)
            .ok_or_else(|| PipelineError::NotFound(format!("feed {}", feed_id)))?;
        episode.feed_id.get_or_insert(feed_id);
        Ok(episode)
    }
}

/// Normalize a directory episode body; `None` when required fields are
/// absent (the directory sometimes returns entries without enclosures).
fn episode_ref(body: EpisodeBody, known_id: Option<i64>) -> Option<EpisodeRef> {
    let episode_id = body.id.or(known_id)?;
    let audio_url = body.enclosure_url?;
    Some(EpisodeRef {
        feed_id: body.feed_id,
        episode_id,
        audio_url,
        title: body.title.unwrap_or_default(),
    })
}

/// Compute the request signature: lowercase SHA-1 hex of
/// `key ∥ secret ∥ timestamp`.
pub fn sign(api_key: &str, api_secret: &str, timestamp: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(api_key.as_bytes());
    hasher.update(api_secret.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let a = sign("key", "secret", "1700000000");
        let b = sign("key", "secret", "1700000000");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn signature_matches_known_vector() {
        // SHA-1("keysecret1700000000")
        assert_eq!(
            sign("key", "secret", "1700000000"),
            "abaf71c02050c31e4d4e6b08c1625173af0445ba"
        );
    }

    #[test]
    fn signature_varies_with_each_input() {
        let base = sign("key", "secret", "100");
        assert_ne!(base, sign("key2", "secret", "100"));
        assert_ne!(base, sign("key", "secret2", "100"));
        assert_ne!(base, sign("key", "secret", "101"));
    }

    #[test]
    fn episode_ref_requires_enclosure() {
        let body = EpisodeBody {
            id: Some(1),
            enclosure_url: None,
            title: Some("t".to_string()),
            feed_id: None,
        };
        assert!(episode_ref(body, None).is_none());
    }

    #[test]
    fn episode_ref_falls_back_to_known_id() {
        let body = EpisodeBody {
            id: None,
            enclosure_url: Some("https://x/a.mp3".to_string()),
            title: None,
            feed_id: Some(7),
        };
        let episode = episode_ref(body, Some(456)).unwrap();
        assert_eq!(episode.episode_id, 456);
        assert_eq!(episode.feed_id, Some(7));
        assert_eq!(episode.title, "");
    }
}
