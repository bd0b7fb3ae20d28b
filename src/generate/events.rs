//! Queue data stream events.
//!
//! The data endpoint emits newline-delimited lines. Relevant lines look like
//! `data: {"msg": "...", ...}`; everything else is skipped.

use serde::Deserialize;
use serde_json::Value;

use super::error::GenerationError;
use super::types::ProviderResult;

/// Prefix marking an event line in the data stream.
pub const EVENT_PREFIX: &str = "data: ";

/// Which extraction rule produced a video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    /// `{"url": "..."}`
    Direct,
    /// `{"video": {"url": "..."}}`
    VideoObject,
    /// `{"<any key>": {"url": "..."}}`, first match in document order
    Nested,
}

/// A parsed stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// Step counters, when the backend reports them.
    Progress {
        progress: Option<f64>,
        length: Option<f64>,
    },
    /// Terminal-success candidate.
    Completed {
        success: Option<bool>,
        video_url: Option<(UrlSource, String)>,
        error: Option<String>,
    },
    /// Backend-reported failure.
    Error { message: String },
    /// Any other message (`estimation`, `heartbeat`, `process_starts`, ...).
    Other(String),
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    msg: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    output: Option<RawOutput>,
    #[serde(default)]
    progress_data: Option<Vec<RawProgress>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    length: Option<f64>,
}

/// Parse one stream line.
///
/// Returns `None` for lines that are not events (blank, comments, other
/// prefixes) and `Some(Err(ParseFailure))` for event lines with bad JSON.
pub fn parse_event_line(line: &str) -> Option<Result<QueueEvent, GenerationError>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let payload = line.strip_prefix(EVENT_PREFIX)?;

    let raw: RawEvent = match serde_json::from_str(payload) {
        Ok(raw) => raw,
        Err(e) => return Some(Err(GenerationError::ParseFailure(e.to_string()))),
    };

    let event = match raw.msg.as_str() {
        "progress" => {
            let first = raw.progress_data.and_then(|mut p| {
                if p.is_empty() {
                    None
                } else {
                    Some(p.swap_remove(0))
                }
            });
            QueueEvent::Progress {
                progress: first.as_ref().and_then(|p| p.progress),
                length: first.as_ref().and_then(|p| p.length),
            }
        }
        "process_completed" => {
            let (video_url, error) = match raw.output {
                Some(output) => (
                    output
                        .data
                        .as_ref()
                        .and_then(|data| data.first())
                        .and_then(extract_video_url),
                    output.error.map(|e| error_text(&e)),
                ),
                None => (None, None),
            };
            QueueEvent::Completed {
                success: raw.success,
                video_url,
                error,
            }
        }
        "error" => QueueEvent::Error {
            message: raw
                .error
                .map(|e| error_text(&e))
                .unwrap_or_else(|| "Unknown error".to_string()),
        },
        other => QueueEvent::Other(other.to_string()),
    };

    Some(Ok(event))
}

/// Extract a video URL from the first element of `output.data`.
///
/// Rules, in precedence order:
/// 1. [`UrlSource::Direct`]: a string `url` field on the item itself
/// 2. [`UrlSource::VideoObject`]: `video.url`
/// 3. [`UrlSource::Nested`]: the first object-valued field holding a `url`
///
/// Empty strings never match.
pub fn extract_video_url(item: &Value) -> Option<(UrlSource, String)> {
    let object = item.as_object()?;

    if let Some(url) = non_empty_url(item) {
        return Some((UrlSource::Direct, url));
    }

    if let Some(url) = object.get("video").and_then(non_empty_url) {
        return Some((UrlSource::VideoObject, url));
    }

    object
        .values()
        .filter(|v| v.is_object())
        .find_map(non_empty_url)
        .map(|url| (UrlSource::Nested, url))
}

fn non_empty_url(value: &Value) -> Option<String> {
    value
        .get("url")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "Unknown error".to_string(),
        other => other.to_string(),
    }
}

/// Decide whether an event ends the poll.
///
/// Returns `None` to keep reading, `Some(result)` to stop.
pub fn resolve_event(event: &QueueEvent, label: &str) -> Option<ProviderResult> {
    match event {
        QueueEvent::Progress { progress, length } => {
            match (progress, length) {
                (Some(p), Some(l)) => log::info!("[{}] Progress: {}/{} steps", label, p, l),
                _ => log::info!("[{}] Progress update", label),
            }
            None
        }
        QueueEvent::Completed {
            video_url: Some((source, url)),
            ..
        } => {
            log::info!("[{}] Video URL found ({:?}): {}", label, source, url);
            Some(Ok(url.clone()))
        }
        QueueEvent::Completed {
            success: Some(false),
            error,
            ..
        } => {
            let message = error
                .clone()
                .unwrap_or_else(|| "Generation failed".to_string());
            log::error!("[{}] Generation failed: {}", label, message);
            Some(Err(GenerationError::ProviderError(message)))
        }
        QueueEvent::Completed { .. } => {
            log::error!("[{}] Completed event carried no video URL", label);
            Some(Err(GenerationError::NoVideoFound))
        }
        QueueEvent::Error { message } => {
            log::error!("[{}] Backend error: {}", label, message);
            Some(Err(GenerationError::ProviderError(message.clone())))
        }
        QueueEvent::Other(msg) => {
            log::debug!("[{}] Received message: {}", label, msg);
            None
        }
    }
}

/// Parse and resolve one raw line. Malformed event lines are logged and skipped.
pub fn process_line(line: &str, label: &str) -> Option<ProviderResult> {
    match parse_event_line(line)? {
        Ok(event) => resolve_event(&event, label),
        Err(e) => {
            log::warn!("[{}] {} (line: {})", label, e, line.trim_end());
            None
        }
    }
}

/// Run a sequence of lines through the parser until a terminal event.
///
/// A sequence that ends without one resolves to `NoVideoFound`.
pub fn scan_lines<'a, I>(lines: I, label: &str) -> ProviderResult
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .find_map(|line| process_line(line, label))
        .unwrap_or(Err(GenerationError::NoVideoFound))
}
