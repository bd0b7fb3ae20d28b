//! Request and result types shared across the pipeline.

use super::error::GenerationError;

/// Outcome of one provider attempt: the produced video URL or a typed failure.
///
/// An `Ok` value is never empty; the stream parser refuses empty URLs.
pub type ProviderResult = Result<String, GenerationError>;

/// A caller's generation request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    style: Option<String>,
}

impl GenerationRequest {
    /// Build a request, rejecting empty or whitespace-only prompts.
    pub fn new(prompt: impl Into<String>, style: Option<String>) -> Result<Self, GenerationError> {
        let prompt = prompt.into();
        validate_prompt(&prompt)?;
        Ok(Self { prompt, style })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }
}

/// Provider-specific prompt and style produced by the style normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPayload {
    pub prompt: String,
    pub style: String,
}

/// Final result of a successful orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    /// Public URL returned by the upload collaborator.
    pub video_url: String,
    /// Name of the provider whose output was accepted.
    pub provider: String,
}

/// Validate a prompt before it reaches any provider.
pub fn validate_prompt(prompt: &str) -> Result<(), GenerationError> {
    if prompt.trim().is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_empty_prompt() {
        assert!(matches!(
            GenerationRequest::new("", None),
            Err(GenerationError::EmptyPrompt)
        ));
        assert!(matches!(
            GenerationRequest::new("  \t\n ", Some("Anime".into())),
            Err(GenerationError::EmptyPrompt)
        ));
    }

    #[test]
    fn test_request_keeps_prompt_verbatim() {
        let request = GenerationRequest::new("  a cat  ", Some("cyberpunk".into())).unwrap();
        assert_eq!(request.prompt(), "  a cat  ");
        assert_eq!(request.style(), Some("cyberpunk"));
    }

    #[test]
    fn test_request_without_style() {
        let request = GenerationRequest::new("a dog", None).unwrap();
        assert_eq!(request.style(), None);
    }
}
