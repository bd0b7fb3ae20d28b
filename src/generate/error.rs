//! Error taxonomy for the generation pipeline.

use std::time::Duration;

/// Errors that can occur while generating, collecting, or uploading a video.
///
/// Every stage returns one of these as a value. Only the fallback
/// orchestrator aggregates several of them into `AllProvidersFailed`.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Queue join failed: {0}")]
    QueueJoinFailure(String),

    #[error("Data stream failed with status {status}: {message}")]
    StreamFailure {
        /// HTTP status returned by the queue data endpoint
        status: u16,
        /// Response body, if any
        message: String,
    },

    #[error("Failed to parse stream event: {0}")]
    ParseFailure(String),

    #[error("Generation timed out after {0:?}")]
    TimeoutFailure(Duration),

    #[error("No video URL found in the response")]
    NoVideoFound,

    #[error("Provider reported an error: {0}")]
    ProviderError(String),

    #[error("Failed to download video: {0}")]
    DownloadFailure(String),

    #[error("Video size ({size} bytes) exceeds the {limit} byte limit")]
    SizeLimitExceeded {
        /// Bytes observed when the limit was crossed
        size: u64,
        /// Configured ceiling
        limit: u64,
    },

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("All providers failed: {}", summarize(.errors))]
    AllProvidersFailed {
        /// One message per attempted provider, in attempt order
        errors: Vec<String>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl GenerationError {
    /// Returns true for failures raised after a provider already produced a URL.
    pub fn is_sink_failure(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailure(_) | Self::SizeLimitExceeded { .. } | Self::UploadFailure(_)
        )
    }

    /// Per-provider messages carried by an aggregated failure.
    pub fn provider_errors(&self) -> &[String] {
        match self {
            Self::AllProvidersFailed { errors } => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[String]) -> String {
    if errors.is_empty() {
        "no providers configured".to_string()
    } else {
        errors.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(GenerationError::EmptyPrompt.to_string(), "Empty prompt");
        assert_eq!(
            GenerationError::NoVideoFound.to_string(),
            "No video URL found in the response"
        );
        assert_eq!(
            GenerationError::StreamFailure {
                status: 503,
                message: "busy".to_string()
            }
            .to_string(),
            "Data stream failed with status 503: busy"
        );
        assert_eq!(
            GenerationError::SizeLimitExceeded { size: 11, limit: 10 }.to_string(),
            "Video size (11 bytes) exceeds the 10 byte limit"
        );
    }

    #[test]
    fn test_all_providers_failed_joins_in_order() {
        let err = GenerationError::AllProvidersFailed {
            errors: vec![
                "alpha: Generation timed out after 60s".to_string(),
                "beta: No video URL found in the response".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "All providers failed: alpha: Generation timed out after 60s; \
             beta: No video URL found in the response"
        );
        assert_eq!(err.provider_errors().len(), 2);
    }

    #[test]
    fn test_all_providers_failed_with_no_providers() {
        let err = GenerationError::AllProvidersFailed { errors: vec![] };
        assert_eq!(err.to_string(), "All providers failed: no providers configured");
        assert!(err.provider_errors().is_empty());
    }

    #[test]
    fn test_sink_failures_are_classified() {
        assert!(GenerationError::DownloadFailure("404".into()).is_sink_failure());
        assert!(GenerationError::SizeLimitExceeded { size: 2, limit: 1 }.is_sink_failure());
        assert!(GenerationError::UploadFailure("rejected".into()).is_sink_failure());

        assert!(!GenerationError::NoVideoFound.is_sink_failure());
        assert!(!GenerationError::TimeoutFailure(Duration::from_secs(1)).is_sink_failure());
        assert!(!GenerationError::QueueJoinFailure("500".into()).is_sink_failure());
    }
}
