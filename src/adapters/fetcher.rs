//! Audio download stage.
//!
//! Streams the response body into a temp file in the destination
//! directory and renames it into place only after the full body has
//! arrived, so an interrupted transfer never leaves a truncated file
//! behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::PipelineError;
use crate::names::url_basename;

use super::MediaFetcher;

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http_timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| PipelineError::Upstream {
                service: "fetcher",
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, PipelineError> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::Download {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let temp = NamedTempFile::new_in(dest_dir)?;
        let mut file = tokio::fs::File::from_std(temp.reopen()?);

        let mut stream = response.bytes_stream();
        let mut bytes_written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::Download {
                url: url.to_string(),
                reason: format!("transfer interrupted: {}", e),
            })?;
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        let final_path = dest_dir.join(url_basename(url));
        let staged = temp.into_temp_path();
        tokio::fs::rename(&staged, &final_path)
            .await
            .map_err(|e| PipelineError::Download {
                url: url.to_string(),
                reason: format!("failed to finalize download: {}", e),
            })?;
        // The rename already moved the file; disarm the delete-on-drop.
        let _ = staged.keep();

        debug!(url, bytes = bytes_written, path = %final_path.display(), "Audio downloaded");
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// One-shot HTTP server that answers any request with the body.
    async fn serve_once(body: &'static [u8]) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(body).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetch_writes_full_body_and_leaves_no_staging_file() {
        let base = serve_once(b"hello audio").await;
        let temp = tempfile::TempDir::new().unwrap();

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/shows/episode.mp3?token=abc", base);
        let path = fetcher.fetch(&url, temp.path()).await.unwrap();

        assert_eq!(path, temp.path().join("episode.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello audio");

        // Only the final file remains; the staging file was renamed away.
        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
