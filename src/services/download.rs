use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("access denied (403), the video URL may have expired")]
    Forbidden,

    #[error("video not found (404)")]
    NotFound,

    #[error("download failed with HTTP {0}")]
    Status(u16),

    #[error("downloaded file is empty")]
    Empty,

    #[error("download request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not write video file: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    fn is_retryable(&self) -> bool {
        !matches!(self, DownloadError::Forbidden | DownloadError::NotFound)
    }
}

/// Stores finished videos locally so they outlive the service's expiring URLs.
#[derive(Clone)]
pub struct VideoDownloader {
    http: Client,
    dir: PathBuf,
    attempts: u32,
    initial_backoff: Duration,
    timeout: Duration,
}

impl VideoDownloader {
    /// `timeout` bounds each attempt, body included.
    pub fn new(http: Client, dir: PathBuf, timeout: Duration) -> Self {
        Self {
            http,
            dir,
            attempts: DEFAULT_ATTEMPTS,
            initial_backoff: DEFAULT_BACKOFF,
            timeout,
        }
    }

    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub async fn download(&self, url: &str, task_id: &str) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name_for(url, task_id));

        let mut delay = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.fetch_to(url, &path).await {
                Ok(size) => {
                    info!("downloaded {} ({} bytes)", path.display(), size);
                    return Ok(path);
                }
                Err(e) if !e.is_retryable() || attempt >= self.attempts => {
                    error!("giving up on {} after {} attempt(s): {}", url, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "download attempt {} failed: {}, retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.http.get(url).timeout(self.timeout).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => return Err(DownloadError::Forbidden),
            StatusCode::NOT_FOUND => return Err(DownloadError::NotFound),
            other => return Err(DownloadError::Status(other.as_u16())),
        }

        save_stream(response.bytes_stream(), path).await
    }
}

/// Writes `stream` to `path`. No partial or empty file survives a failure.
async fn save_stream<S, B, E>(stream: S, path: &Path) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<DownloadError>,
{
    match write_chunks(stream, path).await {
        Ok(0) => {
            let _ = tokio::fs::remove_file(path).await;
            Err(DownloadError::Empty)
        }
        Ok(written) => Ok(written),
        Err(e) => {
            let _ = tokio::fs::remove_file(path).await;
            Err(e)
        }
    }
}

async fn write_chunks<S, B, E>(stream: S, path: &Path) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<DownloadError>,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = std::pin::pin!(stream);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => return Err(e.into()),
        };
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// `video_{task_id}_{unix_ts}{ext}`
pub fn file_name_for(url: &str, task_id: &str) -> String {
    let safe_id: String = task_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    format!(
        "video_{}_{}{}",
        safe_id,
        chrono::Utc::now().timestamp(),
        extension_of(url)
    )
}

fn extension_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".mp4".to_string())
}
