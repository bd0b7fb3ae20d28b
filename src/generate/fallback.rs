//! FallbackOrchestrator - tries providers in priority order.
//!
//! Providers run strictly one after another. The first result that survives
//! the sink wins and later providers are never contacted.

use super::error::GenerationError;
use super::provider::VideoProvider;
use super::sink::ResultSink;
use super::types::{GeneratedVideo, GenerationRequest};

pub struct FallbackOrchestrator {
    providers: Vec<Box<dyn VideoProvider>>,
    sink: ResultSink,
}

impl FallbackOrchestrator {
    /// `providers` is in priority order.
    pub fn new(providers: Vec<Box<dyn VideoProvider>>, sink: ResultSink) -> Self {
        Self { providers, sink }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Generate a video, falling back across providers.
    ///
    /// A provider counts as failed when its own generation fails or when the
    /// sink rejects its output (download, size, upload). Either way the next
    /// provider is tried; the same provider is never retried.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::AllProvidersFailed` carrying one
    /// `"<provider>: <error>"` message per attempt, in attempt order.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedVideo, GenerationError> {
        let mut errors = Vec::with_capacity(self.providers.len());

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            log::info!(
                "Trying provider {} ({}/{})",
                name,
                index + 1,
                self.providers.len()
            );

            let video_url = match provider.generate(request.prompt(), request.style()).await {
                Ok(url) if !url.is_empty() => url,
                Ok(_) => {
                    log::warn!("[{}] Provider returned an empty video URL", name);
                    errors.push(format!("{}: {}", name, GenerationError::NoVideoFound));
                    continue;
                }
                Err(e) => {
                    log::warn!("[{}] Generation failed: {}", name, e);
                    errors.push(format!("{}: {}", name, e));
                    continue;
                }
            };

            match self.sink.process(&video_url, request.prompt()).await {
                Ok(final_url) => {
                    log::info!("[{}] Video ready: {}", name, final_url);
                    return Ok(GeneratedVideo {
                        video_url: final_url,
                        provider: name.to_string(),
                    });
                }
                Err(e) => {
                    log::warn!("[{}] Result rejected: {}", name, e);
                    errors.push(format!("{}: {}", name, e));
                }
            }
        }

        log::error!("All {} providers failed", self.providers.len());
        Err(GenerationError::AllProvidersFailed { errors })
    }
}
