//! Transcoding stage: ffmpeg subprocess.
//!
//! Whatever the input container/codec, the output is canonical audio:
//! mono, 16 kHz, signed 16-bit little-endian PCM. The transcriber refuses
//! anything else.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::PipelineError;

use super::Transcoder;

pub struct FfmpegTranscoder {
    binary_path: String,
    step_timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary_path: impl Into<String>, step_timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            step_timeout,
        }
    }

    /// Output path for a given input. Always a distinct file, even when
    /// the source already arrived as a `.wav`; ffmpeg cannot read and
    /// write the same path.
    fn output_path(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        input.with_file_name(format!("{}.16k.wav", stem))
    }

    /// Arguments forcing the canonical output format. Split out so tests
    /// can assert the invariant without running ffmpeg.
    fn args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path) -> Result<PathBuf, PipelineError> {
        let output_path = Self::output_path(input);

        // kill_on_drop: when the timeout drops the wait future, the
        // child goes with it instead of running on detached.
        let child = Command::new(&self.binary_path)
            .args(Self::args(input, &output_path))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::Transcode {
                input: input.to_path_buf(),
                exit_code: -1,
                stderr: format!("failed to spawn {}: {}", self.binary_path, e),
            })?;

        let output = timeout(self.step_timeout, child.wait_with_output())
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: "transcode",
                seconds: self.step_timeout.as_secs(),
            })?
            .map_err(|e| PipelineError::Transcode {
                input: input.to_path_buf(),
                exit_code: -1,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Transcode {
                input: input.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(input = %input.display(), output = %output_path.display(), "Audio transcoded");
        Ok(output_path)
    }
}
