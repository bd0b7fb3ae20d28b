//! Style normalization.
//!
//! Backends only understand a handful of base styles. Anything else is folded
//! into the prompt text and the base style is forced to "Realistic".

use std::collections::BTreeSet;

use super::types::NormalizedPayload;

/// Base style used when the caller does not ask for one.
pub const DEFAULT_STYLE: &str = "Anime";

/// Base style used when the requested style is folded into the prompt.
pub const FALLBACK_STYLE: &str = "Realistic";

/// Styles most backends accept natively.
pub const DEFAULT_SUPPORTED_STYLES: &[&str] = &["Anime", "Realistic", "3D"];

/// The set of styles one provider can pass through as a structured parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedStyles {
    styles: BTreeSet<String>,
}

impl SupportedStyles {
    pub fn new<I, S>(styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            styles: styles.into_iter().map(Into::into).collect(),
        }
    }

    /// A provider with no native styles: every requested style is folded.
    pub fn none() -> Self {
        Self {
            styles: BTreeSet::new(),
        }
    }

    pub fn contains(&self, style: &str) -> bool {
        self.styles.contains(style)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(String::as_str)
    }

    /// Map `(prompt, style)` to what this provider should receive.
    ///
    /// - absent or blank style: `(prompt, "Anime")`
    /// - supported style: `(prompt, Style)` with the first letter upper-cased
    /// - anything else: `("{prompt}, {Style} style", "Realistic")`
    pub fn normalize(&self, prompt: &str, style: Option<&str>) -> NormalizedPayload {
        let requested = match style.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => {
                return NormalizedPayload {
                    prompt: prompt.to_string(),
                    style: DEFAULT_STYLE.to_string(),
                }
            }
        };

        let style = canonicalize_style(requested);
        if self.contains(&style) {
            NormalizedPayload {
                prompt: prompt.to_string(),
                style,
            }
        } else {
            NormalizedPayload {
                prompt: format!("{}, {} style", prompt, style),
                style: FALLBACK_STYLE.to_string(),
            }
        }
    }
}

impl Default for SupportedStyles {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_STYLES.iter().copied())
    }
}

/// Upper-case the first character of a style name, leaving the rest as is.
pub fn canonicalize_style(style: &str) -> String {
    let mut chars = style.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_style_defaults_to_anime() {
        let styles = SupportedStyles::default();
        let out = styles.normalize("a cat", None);
        assert_eq!(out.prompt, "a cat");
        assert_eq!(out.style, "Anime");
    }

    #[test]
    fn test_empty_and_blank_style_default_to_anime() {
        let styles = SupportedStyles::default();
        assert_eq!(styles.normalize("a cat", Some("")).style, "Anime");
        assert_eq!(styles.normalize("a cat", Some("   ")).style, "Anime");
        // Even a provider with no native styles gets the base default
        assert_eq!(SupportedStyles::none().normalize("a cat", None).style, "Anime");
    }

    #[test]
    fn test_supported_styles_pass_through() {
        let styles = SupportedStyles::default();
        for style in ["Anime", "Realistic", "3D"] {
            let out = styles.normalize("a lighthouse", Some(style));
            assert_eq!(out.prompt, "a lighthouse");
            assert_eq!(out.style, style);
        }
    }

    #[test]
    fn test_supported_styles_are_capitalized() {
        let styles = SupportedStyles::default();
        assert_eq!(styles.normalize("x", Some("anime")).style, "Anime");
        assert_eq!(styles.normalize("x", Some("realistic")).style, "Realistic");
        // "3d" only capitalizes the digit, so it is not "3D" and gets folded
        let out = styles.normalize("x", Some("3d"));
        assert_eq!(out.prompt, "x, 3d style");
        assert_eq!(out.style, "Realistic");
    }

    #[test]
    fn test_unsupported_style_is_folded_into_prompt() {
        let styles = SupportedStyles::default();
        let out = styles.normalize("a cat on a skateboard", Some("Cyberpunk"));
        assert_eq!(out.prompt, "a cat on a skateboard, Cyberpunk style");
        assert_eq!(out.style, "Realistic");

        let out = styles.normalize("a bridge", Some("oil Painting"));
        assert_eq!(out.prompt, "a bridge, Oil Painting style");
        assert_eq!(out.style, "Realistic");

        let out = styles.normalize("a bridge", Some("graffiti"));
        assert_eq!(out.prompt, "a bridge, Graffiti style");
    }

    #[test]
    fn test_provider_without_native_styles_folds_everything() {
        let out = SupportedStyles::none().normalize("a fox", Some("anime"));
        assert_eq!(out.prompt, "a fox, Anime style");
        assert_eq!(out.style, "Realistic");
    }

    #[test]
    fn test_custom_supported_set() {
        let styles = SupportedStyles::new(["Anime", "Cyberpunk"]);
        let out = styles.normalize("a city", Some("cyberpunk"));
        assert_eq!(out.prompt, "a city");
        assert_eq!(out.style, "Cyberpunk");
        assert!(!styles.contains("Realistic"));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let styles = SupportedStyles::default();
        let first = styles.normalize("waves", Some("water Color"));
        let second = styles.normalize("waves", Some("water Color"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_canonicalize_style() {
        assert_eq!(canonicalize_style("cyberpunk"), "Cyberpunk");
        assert_eq!(canonicalize_style("oil painting"), "Oil painting");
        assert_eq!(canonicalize_style("3D"), "3D");
        assert_eq!(canonicalize_style("éclair"), "Éclair");
        assert_eq!(canonicalize_style(""), "");
    }
}
