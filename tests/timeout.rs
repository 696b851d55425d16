//! Subprocess timeout behavior.
//!
//! A stage binary that stops responding must come back as a timeout
//! error, and the child process must be reaped, not left running
//! detached after the stage has already been reported as failed.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use podjay::adapters::{FfmpegTranscoder, Transcoder, Transcriber, WhisperTranscriber};
use podjay::error::PipelineError;

/// Drop an executable shell script into `dir`, standing in for a stage
/// binary.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A script that sleeps past the timeout and then touches a marker file.
/// If the marker ever appears, the child survived the timeout.
fn stalling_script(dir: &Path, name: &str, marker: &Path) -> PathBuf {
    write_script(
        dir,
        name,
        &format!("#!/bin/sh\nsleep 1\ntouch {}\n", marker.display()),
    )
}

#[tokio::test]
async fn stalled_transcoder_times_out_and_child_is_reaped() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("still_running");
    let script = stalling_script(temp.path(), "slow-ffmpeg.sh", &marker);
    let input = temp.path().join("ep.mp3");
    fs::write(&input, b"mp3").unwrap();

    let transcoder =
        FfmpegTranscoder::new(script.display().to_string(), Duration::from_millis(100));
    let err = transcoder.transcode(&input).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Timeout {
            stage: "transcode",
            ..
        }
    ));

    // Well past the script's sleep: the marker must never appear.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn stalled_transcriber_times_out_and_child_is_reaped() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("still_running");
    let script = stalling_script(temp.path(), "slow-whisper.sh", &marker);
    let audio = temp.path().join("ep.16k.wav");
    fs::write(&audio, b"wav").unwrap();

    let transcriber = WhisperTranscriber::new(
        script.display().to_string(),
        "medium",
        Duration::from_millis(100),
    );
    let err = transcriber.transcribe(&audio).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Timeout {
            stage: "transcribe",
            ..
        }
    ));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn fast_transcoder_completes_within_timeout() {
    let temp = TempDir::new().unwrap();
    let script = write_script(temp.path(), "fast-ffmpeg.sh", "#!/bin/sh\nexit 0\n");
    let input = temp.path().join("ep.mp3");
    fs::write(&input, b"mp3").unwrap();

    let transcoder = FfmpegTranscoder::new(script.display().to_string(), Duration::from_secs(5));
    let output = transcoder.transcode(&input).await.unwrap();
    assert_eq!(output, temp.path().join("ep.16k.wav"));
}
