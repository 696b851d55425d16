//! Speech-to-text stage: local whisper binary.
//!
//! The most expensive stage, so failures carry the file, exit code and
//! captured stderr for offline diagnosis. The input file must exist
//! before the engine is spawned.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::PipelineError;

use super::Transcriber;

pub struct WhisperTranscriber {
    binary_path: String,
    model: String,
    step_timeout: Duration,
}

impl WhisperTranscriber {
    pub fn new(
        binary_path: impl Into<String>,
        model: impl Into<String>,
        step_timeout: Duration,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            model: model.into(),
            step_timeout,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, canonical_audio: &Path) -> Result<String, PipelineError> {
        if !canonical_audio.is_file() {
            return Err(PipelineError::InvalidInput {
                stage: "transcribe",
                reason: format!("audio file does not exist: {}", canonical_audio.display()),
            });
        }

        let child = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("txt")
            .arg(canonical_audio)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::Transcription {
                input: canonical_audio.to_path_buf(),
                exit_code: -1,
                stderr: format!("failed to spawn {}: {}", self.binary_path, e),
            })?;

        let output = timeout(self.step_timeout, child.wait_with_output())
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: "transcribe",
                seconds: self.step_timeout.as_secs(),
            })?
            .map_err(|e| PipelineError::Transcription {
                input: canonical_audio.to_path_buf(),
                exit_code: -1,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Transcription {
                input: canonical_audio.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(PipelineError::Transcription {
                input: canonical_audio.to_path_buf(),
                exit_code: 0,
                stderr: "engine produced no output".to_string(),
            });
        }

        debug!(input = %canonical_audio.display(), chars = transcript.len(), "Audio transcribed");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_fails_before_spawning() {
        let transcriber = WhisperTranscriber::new(
            "/nonexistent/whisper",
            "medium",
            Duration::from_secs(1),
        );

        let err = transcriber
            .transcribe(Path::new("/no/such/audio.wav"))
            .await
            .unwrap_err();

        // InvalidInput, not a spawn failure: the engine was never invoked.
        assert!(matches!(
            err,
            PipelineError::InvalidInput { stage: "transcribe", .. }
        ));
    }
}
