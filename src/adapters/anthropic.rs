//! Summarization stage: Anthropic messages API.
//!
//! The prompt is plain textual composition: instruction template, blank
//! line, transcript. One single-turn request, bounded output tokens, no
//! internal retry; retry policy belongs to the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::SummarizerConfig;
use crate::error::PipelineError;

use super::Summarizer;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicSummarizer {
    config: SummarizerConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicSummarizer {
    pub fn new(config: SummarizerConfig, step_timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(step_timeout)
            .build()
            .map_err(|e| PipelineError::Upstream {
                service: "summarizer",
                message: e.to_string(),
            })?;
        Ok(Self { config, client })
    }

    /// Compose the prompt sent to the generation service.
    pub fn compose_prompt(prompt_template: &str, transcript: &str) -> String {
        format!("{}\n\n{}", prompt_template.trim(), transcript)
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(
        &self,
        prompt_template: &str,
        transcript: &str,
    ) -> Result<String, PipelineError> {
        let prompt = Self::compose_prompt(prompt_template, transcript);
        let url = format!("{}/v1/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.config.model,
                "max_tokens": self.config.max_tokens,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| PipelineError::Upstream {
                service: "summarizer",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream {
                service: "summarizer",
                message: format!("status {}: {}", status, body),
            });
        }

        let body: MessagesResponse =
            response.json().await.map_err(|e| PipelineError::Upstream {
                service: "summarizer",
                message: format!("malformed response: {}", e),
            })?;

        let summary = body
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| PipelineError::Upstream {
                service: "summarizer",
                message: "response contained no text content".to_string(),
            })?;

        debug!(chars = summary.len(), "Summary generated");
        Ok(summary)
    }
}
