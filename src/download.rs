use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::contract::Fetcher;
use crate::error::DownloadError;

/// Bound on a whole transfer when none is configured.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches uploads over plain HTTP(S) GET.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn map_transport(&self, e: reqwest::Error) -> DownloadError {
        if e.is_timeout() {
            DownloadError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            DownloadError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path, max_bytes: u64) -> Result<u64, DownloadError> {
        info!(url = %url, dest = %dest.display(), "Downloading source file");

        let mut response = self.client.get(url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to send download request");
            self.map_transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Download returned non-success status");
            return Err(DownloadError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        if let Some(len) = response.content_length() {
            if len > max_bytes {
                error!(content_length = len, max_bytes, "Declared body exceeds size limit");
                return Err(DownloadError::TooLarge { limit: max_bytes });
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            error!(error = ?e, url = %url, "Download interrupted");
            self.map_transport(e)
        })? {
            written += chunk.len() as u64;
            if written > max_bytes {
                error!(written, max_bytes, "Body exceeded size limit while streaming");
                return Err(DownloadError::TooLarge { limit: max_bytes });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(url = %url, bytes = written, "Download complete");
        Ok(written)
    }
}
