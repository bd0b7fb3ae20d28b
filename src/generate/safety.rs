//! Content-safety gate consulted before generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Terms that mark a prompt as unsafe for video generation.
const DEFAULT_BLOCKED_TERMS: &[&str] = &[
    "nsfw",
    "nude",
    "naked",
    "porn",
    "sexual",
    "explicit",
    "gore",
    "beheading",
    "suicide",
    "self-harm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Verdict returned by a safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub risk_level: RiskLevel,
    pub reason: String,
}

/// Classifies prompts before they are sent to any provider.
#[async_trait]
pub trait ContentSafety: Send + Sync {
    async fn check(&self, prompt: &str) -> SafetyVerdict;
}

/// Case-insensitive blocked-term matcher.
pub struct KeywordSafetyGate {
    terms: Vec<String>,
}

impl KeywordSafetyGate {
    pub fn new<I, S>(extra_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = DEFAULT_BLOCKED_TERMS.iter().map(|t| t.to_string()).collect();
        terms.extend(
            extra_terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    fn matching_term(&self, prompt: &str) -> Option<&str> {
        let lower = prompt.to_lowercase();
        self.terms
            .iter()
            .find(|term| lower.contains(term.as_str()))
            .map(String::as_str)
    }
}

impl Default for KeywordSafetyGate {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

#[async_trait]
impl ContentSafety for KeywordSafetyGate {
    async fn check(&self, prompt: &str) -> SafetyVerdict {
        match self.matching_term(prompt) {
            Some(term) => {
                log::warn!("Prompt blocked by safety gate (term: {})", term);
                SafetyVerdict {
                    is_safe: false,
                    risk_level: RiskLevel::High,
                    reason: format!("prompt contains blocked term '{}'", term),
                }
            }
            None => SafetyVerdict {
                is_safe: true,
                risk_level: RiskLevel::None,
                reason: "no blocked terms found".to_string(),
            },
        }
    }
}
