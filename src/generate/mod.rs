//! Video generation orchestration.
//!
//! Prompts are normalized per provider, submitted to queue-based backends,
//! and followed over the backend's data stream. Providers are tried in
//! priority order until one produces a video that passes the result sink.

mod discord;
mod error;
mod events;
mod fallback;
mod provider;
mod queue;
mod safety;
mod session;
mod sink;
mod style;
mod types;

pub use discord::{DiscordWebhookUploader, DISCORD_WEBHOOK_URL_ENV};
pub use error::GenerationError;
pub use events::{
    extract_video_url, parse_event_line, process_line, resolve_event, scan_lines, QueueEvent,
    UrlSource, EVENT_PREFIX,
};
pub use fallback::FallbackOrchestrator;
pub use provider::{
    default_headers, providers_from_config, QueueProvider, StyleSlot, VideoProvider,
    DEFAULT_STEP_COUNT, DEFAULT_USER_AGENT,
};
pub use queue::{JoinRequest, QueueClient, DEFAULT_POLL_TIMEOUT, QUEUE_DATA_PATH, QUEUE_JOIN_PATH};
pub use safety::{ContentSafety, KeywordSafetyGate, RiskLevel, SafetyVerdict};
pub use session::{new_session_hash, QueueSession};
pub use sink::{safe_filename, ResultSink, UploadError, VideoUploader, MAX_VIDEO_BYTES, VIDEO_EXTENSION};
pub use style::{
    canonicalize_style, SupportedStyles, DEFAULT_STYLE, DEFAULT_SUPPORTED_STYLES, FALLBACK_STYLE,
};
pub use types::{validate_prompt, GeneratedVideo, GenerationRequest, NormalizedPayload, ProviderResult};
