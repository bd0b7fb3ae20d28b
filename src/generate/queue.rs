//! QueueClient - drives the two-phase queue protocol.
//!
//! 1. `POST {base}/queue/join` registers a job and returns an `event_id`.
//! 2. `GET {base}/queue/data?session_hash=...` streams newline-delimited
//!    events until the job completes, fails, or the poll times out.
//!
//! This client never retries. Fallback across providers happens in the
//! orchestrator.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::GenerationError;
use super::events::process_line;
use super::session::QueueSession;
use super::types::ProviderResult;

/// Path of the submit endpoint, relative to the provider base URL.
pub const QUEUE_JOIN_PATH: &str = "/queue/join";

/// Path of the streamed data endpoint, relative to the provider base URL.
pub const QUEUE_DATA_PATH: &str = "/queue/data";

/// Default bound on the poll phase (60 seconds).
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for the join request (30 seconds).
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest stream line kept in memory (1 MiB). Longer lines are dropped.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Request body for the queue join endpoint.
///
/// `data` is positional: `[prompt, style, "", step_count]`.
#[derive(Debug, Clone, Serialize)]
pub struct JoinRequest {
    pub data: (String, String, String, u32),
    pub event_data: Option<Value>,
    pub fn_index: u32,
    pub session_hash: String,
    pub trigger_id: u32,
}

impl JoinRequest {
    pub fn new(
        prompt: impl Into<String>,
        style: impl Into<String>,
        step_count: u32,
        fn_index: u32,
        trigger_id: u32,
        session_hash: impl Into<String>,
    ) -> Self {
        Self {
            data: (prompt.into(), style.into(), String::new(), step_count),
            event_data: None,
            fn_index,
            session_hash: session_hash.into(),
            trigger_id,
        }
    }
}

/// Response from the queue join endpoint.
#[derive(Debug, Deserialize)]
struct JoinResponse {
    #[serde(default)]
    event_id: Option<String>,
}

/// Client for one backend's queue endpoints.
pub struct QueueClient {
    label: String,
    base_url: String,
    headers: HeaderMap,
    join_query: Vec<(String, String)>,
    join_timeout: Duration,
    http_client: reqwest::Client,
}

impl QueueClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// `label` tags log lines, usually the provider name. No overall client
    /// timeout is set because the data stream is long-lived; each phase is
    /// bounded individually.
    pub fn new(label: impl Into<String>, base_url: impl Into<String>) -> Result<Self, GenerationError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(GenerationError::InvalidConfiguration(
                "base URL is empty".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            label: label.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            join_query: Vec::new(),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            http_client,
        })
    }

    /// Replace the fixed header set sent with every request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Extra query parameters appended to the join request.
    pub fn with_join_query(mut self, query: Vec<(String, String)>) -> Self {
        self.join_query = query;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Submit a job to the queue.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::QueueJoinFailure` on a non-2xx response or a
    /// body without an `event_id`, and `GenerationError::Http` if the request
    /// itself fails.
    pub async fn submit(&self, request: &JoinRequest) -> Result<QueueSession, GenerationError> {
        let url = format!("{}{}", self.base_url, QUEUE_JOIN_PATH);
        log::debug!("[{}] Joining queue at {}", self.label, url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers.clone())
            .query(&self.join_query)
            .timeout(self.join_timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "[{}] Queue join failed: {}, {}",
                self.label,
                status,
                error_text
            );
            return Err(GenerationError::QueueJoinFailure(format!(
                "status {}: {}",
                status, error_text
            )));
        }

        let join_response: JoinResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::QueueJoinFailure(format!("invalid response: {}", e)))?;

        match join_response.event_id.filter(|id| !id.is_empty()) {
            Some(event_id) => {
                log::info!("[{}] Queue join successful, event_id: {}", self.label, event_id);
                Ok(QueueSession {
                    session_hash: request.session_hash.clone(),
                    event_id,
                    base_url: self.base_url.clone(),
                })
            }
            None => {
                log::error!("[{}] Failed to get event_id from queue response", self.label);
                Err(GenerationError::QueueJoinFailure(
                    "response carried no event_id".to_string(),
                ))
            }
        }
    }

    /// Stream job events until a terminal event, bounded by `timeout`.
    ///
    /// Takes the session by value: it does not outlive this call. On timeout
    /// the response stream is dropped, which closes the connection.
    pub async fn poll(&self, session: QueueSession, timeout: Duration) -> ProviderResult {
        log::info!(
            "[{}] Waiting for event {} (timeout: {:?})",
            self.label,
            session.event_id,
            timeout
        );

        match tokio::time::timeout(timeout, self.read_stream(&session)).await {
            Ok(result) => result,
            Err(_) => {
                log::error!("[{}] Generation timed out after {:?}", self.label, timeout);
                Err(GenerationError::TimeoutFailure(timeout))
            }
        }
    }

    async fn read_stream(&self, session: &QueueSession) -> ProviderResult {
        let url = format!("{}{}", session.base_url, QUEUE_DATA_PATH);

        let mut headers = self.headers.clone();
        headers.remove(CONTENT_TYPE);
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .query(&[("session_hash", session.session_hash.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "[{}] Data stream failed: {}, {}",
                self.label,
                status,
                error_text
            );
            return Err(GenerationError::StreamFailure {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::new(MAX_LINE_BYTES);

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            for line in lines.push(&chunk, &self.label) {
                if let Some(result) = process_line(&line, &self.label) {
                    return result;
                }
            }
        }

        // A final event may arrive without a trailing newline
        if let Some(line) = lines.finish() {
            if let Some(result) = process_line(&line, &self.label) {
                return result;
            }
        }

        log::error!("[{}] No video URL found in the response", self.label);
        Err(GenerationError::NoVideoFound)
    }
}

/// Splits streamed bytes into lines.
///
/// A pending line longer than `max_line` is dropped up to its next newline,
/// so the buffer never holds more than `max_line` plus one chunk.
struct LineBuffer {
    pending: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl LineBuffer {
    fn new(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Append a chunk and return the lines it completed.
    fn push(&mut self, chunk: &[u8], label: &str) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        if self.pending.len() > self.max_line {
            if !self.discarding {
                let err = GenerationError::ParseFailure(format!(
                    "stream line exceeds {} bytes, dropped",
                    self.max_line
                ));
                log::warn!("[{}] {}", label, err);
            }
            self.pending.clear();
            self.discarding = true;
        }

        lines
    }

    /// The unterminated tail, unless it belongs to a dropped line.
    fn finish(self) -> Option<String> {
        if self.discarding || self.pending.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.pending).into_owned())
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
