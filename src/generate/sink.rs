//! ResultSink - collects a produced video and hands it to the uploader.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures_util::StreamExt;

use super::error::GenerationError;

/// Hard ceiling on downloaded videos (25 MiB).
pub const MAX_VIDEO_BYTES: u64 = 25 * 1024 * 1024;

/// Extension given to uploaded files.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Number of prompt characters kept in the file name.
const FILENAME_PROMPT_CHARS: usize = 30;

/// Default timeout for downloading a video (120 seconds).
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Default timeout for the upload collaborator (120 seconds).
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors reported by an upload collaborator.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status returned by the upload target
        status: u16,
        /// Response body, if any
        message: String,
    },

    #[error("upload response contained no attachment URL")]
    MissingUrl,

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Permanent storage for finished videos.
///
/// Built once at startup and shared across requests; this crate never owns
/// its connection lifecycle.
#[async_trait]
pub trait VideoUploader: Send + Sync {
    /// Store `video` under `filename` and return its public URL.
    async fn upload(&self, video: Vec<u8>, filename: &str, prompt: &str)
        -> Result<String, UploadError>;
}

/// Downloads a provider's video, enforces the size ceiling, and uploads it.
pub struct ResultSink {
    uploader: Arc<dyn VideoUploader>,
    max_bytes: u64,
    download_timeout: Duration,
    upload_timeout: Duration,
    http_client: reqwest::Client,
}

impl ResultSink {
    pub fn new(uploader: Arc<dyn VideoUploader>) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            uploader,
            max_bytes: MAX_VIDEO_BYTES,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            http_client,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Download `video_url`, check its size, and upload it.
    ///
    /// Returns the uploader's URL verbatim.
    ///
    /// # Errors
    ///
    /// `DownloadFailure` for non-2xx or transport errors, `SizeLimitExceeded`
    /// when the body is larger than the ceiling, `UploadFailure` when the
    /// uploader fails, times out, or returns an empty URL.
    pub async fn process(&self, video_url: &str, prompt: &str) -> Result<String, GenerationError> {
        let video = self.download(video_url).await?;
        log::info!("Video downloaded, size: {} bytes", video.len());

        let filename = safe_filename(prompt, Local::now());
        log::info!("Uploading video as {}", filename);

        let uploaded = tokio::time::timeout(
            self.upload_timeout,
            self.uploader.upload(video, &filename, prompt),
        )
        .await
        .map_err(|_| {
            GenerationError::UploadFailure(format!("timed out after {:?}", self.upload_timeout))
        })?
        .map_err(|e| GenerationError::UploadFailure(e.to_string()))?;

        if uploaded.is_empty() {
            return Err(GenerationError::UploadFailure(
                "uploader returned an empty URL".to_string(),
            ));
        }

        log::info!("Video uploaded: {}", uploaded);
        Ok(uploaded)
    }

    /// Download a video into memory, aborting once it crosses the ceiling.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
        log::info!("Downloading video from {}", url);

        let response = self
            .http_client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(download_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Failed to download video: {}, {}", status, error_text);
            return Err(GenerationError::DownloadFailure(format!(
                "status {}: {}",
                status, error_text
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                log::error!(
                    "Video size ({} bytes) exceeds the {} byte limit",
                    length,
                    self.max_bytes
                );
                return Err(GenerationError::SizeLimitExceeded {
                    size: length,
                    limit: self.max_bytes,
                });
            }
        }

        let mut video: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(download_error)?;
            let size = (video.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                log::error!(
                    "Video exceeded the {} byte limit while downloading",
                    self.max_bytes
                );
                return Err(GenerationError::SizeLimitExceeded {
                    size,
                    limit: self.max_bytes,
                });
            }
            video.extend_from_slice(&chunk);
        }

        Ok(video)
    }
}

fn download_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::DownloadFailure(format!("timed out: {}", e))
    } else {
        GenerationError::DownloadFailure(e.to_string())
    }
}

/// Build a filesystem-safe file name from a prompt and timestamp.
///
/// Keeps the first 30 characters of the prompt, replaces everything outside
/// `[A-Za-z0-9]` with `_`, and appends `_YYYYmmdd_HHMMSS.mp4`.
pub fn safe_filename(prompt: &str, timestamp: DateTime<Local>) -> String {
    let short: String = prompt.chars().take(FILENAME_PROMPT_CHARS).collect();
    let safe: String = short
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{}_{}.{}",
        safe,
        timestamp.format("%Y%m%d_%H%M%S"),
        VIDEO_EXTENSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 4, 26, 13, 44, 36).unwrap()
    }

    #[test]
    fn test_safe_filename_replaces_symbols() {
        assert_eq!(
            safe_filename("a cat, on a skateboard!", at_noon()),
            "a_cat__on_a_skateboard__20250426_134436.mp4"
        );
    }

    #[test]
    fn test_safe_filename_truncates_to_30_chars() {
        let name = safe_filename("A grandmaster plays chess against a robot", at_noon());
        assert_eq!(name, "A_grandmaster_plays_chess_agai_20250426_134436.mp4");
    }

    #[test]
    fn test_safe_filename_trims_truncated_prompt() {
        let name = safe_filename("  padded  ", at_noon());
        assert_eq!(name, "padded_20250426_134436.mp4");
    }

    #[test]
    fn test_safe_filename_non_ascii() {
        let name = safe_filename("café über", at_noon());
        assert_eq!(name, "caf___ber_20250426_134436.mp4");
    }

    #[test]
    fn test_max_video_bytes_is_25_mib() {
        assert_eq!(MAX_VIDEO_BYTES, 26_214_400);
    }

    #[test]
    fn test_upload_error_display() {
        let err = UploadError::Rejected {
            status: 413,
            message: "too large".to_string(),
        };
        assert_eq!(err.to_string(), "upload rejected with status 413: too large");
        assert_eq!(
            UploadError::MissingUrl.to_string(),
            "upload response contained no attachment URL"
        );
    }
}
