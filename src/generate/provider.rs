//! Video providers.
//!
//! A provider is anything that turns `(prompt, style)` into a video URL.
//! `QueueProvider` is the one concrete backend shape: a queue protocol
//! client plus the constants and payload quirks its backend expects.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;

use super::error::GenerationError;
use super::queue::{JoinRequest, QueueClient, DEFAULT_POLL_TIMEOUT};
use super::session::new_session_hash;
use super::style::SupportedStyles;
use super::types::{NormalizedPayload, ProviderResult};

/// Browser-like user agent most queue backends expect.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Default number of inference steps sent in the payload.
pub const DEFAULT_STEP_COUNT: u32 = 8;

/// Single-provider generation contract.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Name used in logs and aggregated error messages.
    fn name(&self) -> &str;

    /// Generate a video and return the backend's URL for it.
    async fn generate(&self, prompt: &str, style: Option<&str>) -> ProviderResult;

    /// How this provider would rewrite `(prompt, style)`.
    fn normalize(&self, prompt: &str, style: Option<&str>) -> NormalizedPayload {
        SupportedStyles::default().normalize(prompt, style)
    }
}

/// What a backend expects in the style slot of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleSlot {
    /// Send the normalized style.
    #[default]
    Normalized,
    /// Send an empty string; the style only survives inside the prompt.
    Empty,
    /// Send a fixed backend value (e.g. a model name).
    Fixed(String),
}

impl StyleSlot {
    /// Value placed in the payload's style slot for a normalized style.
    pub fn resolve(&self, normalized: &str) -> String {
        match self {
            StyleSlot::Normalized => normalized.to_string(),
            StyleSlot::Empty => String::new(),
            StyleSlot::Fixed(value) => value.clone(),
        }
    }
}

/// A backend speaking the queue join/data protocol.
pub struct QueueProvider {
    name: String,
    client: QueueClient,
    fn_index: u32,
    trigger_id: u32,
    step_count: u32,
    style_slot: StyleSlot,
    styles: SupportedStyles,
    poll_timeout: Duration,
}

impl QueueProvider {
    /// Create a provider with default headers, styles, and timeouts.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        fn_index: u32,
        trigger_id: u32,
    ) -> Result<Self, GenerationError> {
        let name = name.into();
        let base_url = base_url.into();
        let client = QueueClient::new(name.clone(), base_url.clone())?
            .with_headers(default_headers(&base_url, false)?);

        Ok(Self {
            name,
            client,
            fn_index,
            trigger_id,
            step_count: DEFAULT_STEP_COUNT,
            style_slot: StyleSlot::Normalized,
            styles: SupportedStyles::default(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        })
    }

    /// Build a provider from its configuration entry and a resolved base URL.
    pub fn from_config(config: &ProviderConfig, base_url: &str) -> Result<Self, GenerationError> {
        let query = config
            .join_query
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let client = QueueClient::new(config.name.clone(), base_url)?
            .with_headers(default_headers(base_url, config.origin_headers)?)
            .with_join_query(query);

        Ok(Self {
            name: config.name.clone(),
            client,
            fn_index: config.fn_index,
            trigger_id: config.trigger_id,
            step_count: config.step_count,
            style_slot: config.style_slot.clone(),
            styles: SupportedStyles::new(config.supported_styles.iter().cloned()),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        })
    }

    pub fn with_step_count(mut self, step_count: u32) -> Self {
        self.step_count = step_count;
        self
    }

    pub fn with_style_slot(mut self, style_slot: StyleSlot) -> Self {
        self.style_slot = style_slot;
        self
    }

    pub fn with_supported_styles(mut self, styles: SupportedStyles) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn supported_styles(&self) -> &SupportedStyles {
        &self.styles
    }

    /// Build the join payload for an already-normalized prompt and style.
    pub fn join_request(&self, payload: &NormalizedPayload, session_hash: String) -> JoinRequest {
        JoinRequest::new(
            payload.prompt.clone(),
            self.style_slot.resolve(&payload.style),
            self.step_count,
            self.fn_index,
            self.trigger_id,
            session_hash,
        )
    }
}

#[async_trait]
impl VideoProvider for QueueProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, style: Option<&str>) -> ProviderResult {
        let payload = self.normalize(prompt, style);
        log::info!(
            "[{}] Using prompt: '{}', style: '{}'",
            self.name,
            payload.prompt,
            payload.style
        );

        let request = self.join_request(&payload, new_session_hash());
        let session = self.client.submit(&request).await?;
        self.client.poll(session, self.poll_timeout).await
    }

    fn normalize(&self, prompt: &str, style: Option<&str>) -> NormalizedPayload {
        self.styles.normalize(prompt, style)
    }
}

/// Fixed header set for a backend.
///
/// With `origin` set, `Origin` and `Referer` are derived from the base URL,
/// which some hosted spaces require.
pub fn default_headers(base_url: &str, origin: bool) -> Result<HeaderMap, GenerationError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    if origin {
        let base = base_url.trim_end_matches('/');
        headers.insert(HeaderName::from_static("origin"), header_value(base)?);
        headers.insert(
            HeaderName::from_static("referer"),
            header_value(&format!("{}/?__theme=system", base))?,
        );
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, GenerationError> {
    HeaderValue::from_str(value).map_err(|e| {
        GenerationError::InvalidConfiguration(format!("invalid header value '{}': {}", value, e))
    })
}

/// Build providers from configuration, in configured order.
///
/// Disabled entries and entries whose base URL cannot be resolved are
/// skipped with a warning.
pub fn providers_from_config(
    configs: &[ProviderConfig],
) -> Result<Vec<Box<dyn VideoProvider>>, GenerationError> {
    let mut providers: Vec<Box<dyn VideoProvider>> = Vec::new();

    for config in configs {
        if !config.enabled {
            log::info!("[{}] Provider disabled, skipping", config.name);
            continue;
        }
        let Some(base_url) = config.resolve_base_url() else {
            log::warn!(
                "[{}] No base URL configured (set base_url or {}), skipping",
                config.name,
                config.base_url_env.as_deref().unwrap_or("base_url_env")
            );
            continue;
        };
        providers.push(Box::new(QueueProvider::from_config(config, &base_url)?));
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            base_url: Some("https://space.example".to_string()),
            base_url_env: None,
            fn_index: 1,
            trigger_id: 8,
            step_count: 8,
            style_slot: StyleSlot::Normalized,
            supported_styles: vec!["Anime".into(), "Realistic".into(), "3D".into()],
            origin_headers: false,
            join_query: BTreeMap::new(),
            poll_timeout_secs: 60,
            enabled: true,
        }
    }

    #[test]
    fn test_join_request_uses_normalized_style() {
        let provider = QueueProvider::new("alpha", "https://space.example", 1, 8).unwrap();
        let payload = provider.normalize("a cat on a skateboard", Some("Cyberpunk"));
        let request = provider.join_request(&payload, "hash".to_string());

        assert_eq!(request.data.0, "a cat on a skateboard, Cyberpunk style");
        assert_eq!(request.data.1, "Realistic");
        assert_eq!(request.data.2, "");
        assert_eq!(request.data.3, DEFAULT_STEP_COUNT);
        assert_eq!(request.fn_index, 1);
        assert_eq!(request.trigger_id, 8);
        assert_eq!(request.session_hash, "hash");
    }

    #[test]
    fn test_join_request_empty_style_slot() {
        let provider = QueueProvider::new("alpha", "https://space.example", 1, 8)
            .unwrap()
            .with_style_slot(StyleSlot::Empty);
        let payload = provider.normalize("a cat", Some("Anime"));
        assert_eq!(provider.join_request(&payload, "h".into()).data.1, "");
    }

    #[test]
    fn test_join_request_fixed_style_slot() {
        let provider = QueueProvider::new("bytes", "https://space.example", 1, 1)
            .unwrap()
            .with_style_slot(StyleSlot::Fixed("epiCRealism".into()))
            .with_supported_styles(SupportedStyles::none())
            .with_step_count(4);
        let payload = provider.normalize("a cat", Some("anime"));
        let request = provider.join_request(&payload, "h".into());
        assert_eq!(request.data.0, "a cat, Anime style");
        assert_eq!(request.data.1, "epiCRealism");
        assert_eq!(request.data.3, 4);
    }

    #[test]
    fn test_default_headers_without_origin() {
        let headers = default_headers("https://space.example", false).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
        assert!(headers.get("origin").is_none());
        assert!(headers.get("referer").is_none());
    }

    #[test]
    fn test_default_headers_with_origin() {
        let headers = default_headers("https://space.example/", true).unwrap();
        assert_eq!(headers.get("origin").unwrap(), "https://space.example");
        assert_eq!(
            headers.get("referer").unwrap(),
            "https://space.example/?__theme=system"
        );
    }

    #[test]
    fn test_from_config_applies_settings() {
        let mut cfg = config("alpha");
        cfg.poll_timeout_secs = 5;
        cfg.supported_styles = vec!["Anime".into()];
        let provider = QueueProvider::from_config(&cfg, "https://space.example").unwrap();

        assert_eq!(provider.name(), "alpha");
        assert_eq!(provider.poll_timeout(), Duration::from_secs(5));
        assert!(provider.supported_styles().contains("Anime"));
        assert!(!provider.supported_styles().contains("Realistic"));
    }

    #[test]
    fn test_providers_from_config_keeps_order_and_skips() {
        let mut disabled = config("disabled");
        disabled.enabled = false;
        let mut unresolved = config("unresolved");
        unresolved.base_url = None;
        unresolved.base_url_env = Some("PROMPTREEL_TEST_UNSET_PROVIDER_URL".into());

        let providers = providers_from_config(&[
            config("first"),
            disabled,
            unresolved,
            config("second"),
        ])
        .unwrap();

        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
