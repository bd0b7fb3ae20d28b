//! Configuration file handling for promptreel.
//!
//! Loads configuration from `~/.config/promptreel/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::generate::{
    StyleSlot, DEFAULT_STEP_COUNT, DEFAULT_SUPPORTED_STYLES, DISCORD_WEBHOOK_URL_ENV,
    MAX_VIDEO_BYTES,
};

/// Configuration file structure for promptreel.
/// Loaded from ~/.config/promptreel/config.toml (or custom path via --config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Providers in priority order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            sink: SinkConfig::default(),
            upload: UploadConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

/// One queue backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Literal base URL. Takes precedence over `base_url_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,
    pub fn_index: u32,
    pub trigger_id: u32,
    #[serde(default = "default_step_count")]
    pub step_count: u32,
    #[serde(default)]
    pub style_slot: StyleSlot,
    #[serde(default = "default_supported_styles")]
    pub supported_styles: Vec<String>,
    /// Send Origin/Referer headers derived from the base URL.
    #[serde(default)]
    pub origin_headers: bool,
    /// Extra query parameters for the join request.
    #[serde(default)]
    pub join_query: BTreeMap<String, String>,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ProviderConfig {
    /// Resolve the base URL from `base_url` or the named environment variable.
    pub fn resolve_base_url(&self) -> Option<String> {
        if let Some(url) = self.base_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return Some(url.clone());
        }
        self.base_url_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_transfer_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_transfer_timeout_secs")]
    pub upload_timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            download_timeout_secs: default_transfer_timeout_secs(),
            upload_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_url_env: default_webhook_url_env(),
        }
    }
}

impl UploadConfig {
    pub fn resolve_webhook_url(&self) -> Option<String> {
        if let Some(url) = self.webhook_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return Some(url.clone());
        }
        std::env::var(&self.webhook_url_env)
            .ok()
            .filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub blocked_terms: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_terms: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_step_count() -> u32 {
    DEFAULT_STEP_COUNT
}

fn default_supported_styles() -> Vec<String> {
    DEFAULT_SUPPORTED_STYLES.iter().map(|s| s.to_string()).collect()
}

fn default_poll_timeout_secs() -> u64 {
    60
}

fn default_max_bytes() -> u64 {
    MAX_VIDEO_BYTES
}

fn default_transfer_timeout_secs() -> u64 {
    120
}

fn default_webhook_url_env() -> String {
    DISCORD_WEBHOOK_URL_ENV.to_string()
}

/// The three known backends, in quality order.
fn default_providers() -> Vec<ProviderConfig> {
    let theme_query: BTreeMap<String, String> =
        [("__theme".to_string(), "system".to_string())].into_iter().collect();

    vec![
        ProviderConfig {
            name: "sahaniji".to_string(),
            base_url: None,
            base_url_env: Some("SAHANIJI_VIDEO_URL".to_string()),
            fn_index: 1,
            trigger_id: 8,
            step_count: DEFAULT_STEP_COUNT,
            style_slot: StyleSlot::Normalized,
            supported_styles: default_supported_styles(),
            origin_headers: false,
            join_query: BTreeMap::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
            enabled: true,
        },
        ProviderConfig {
            name: "kingnish".to_string(),
            base_url: None,
            base_url_env: Some("KINGNISH_VIDEO_URL".to_string()),
            fn_index: 0,
            trigger_id: 1,
            step_count: DEFAULT_STEP_COUNT,
            style_slot: StyleSlot::Normalized,
            supported_styles: default_supported_styles(),
            origin_headers: true,
            join_query: theme_query.clone(),
            poll_timeout_secs: default_poll_timeout_secs(),
            enabled: true,
        },
        ProviderConfig {
            name: "bytedance".to_string(),
            base_url: None,
            base_url_env: Some("BYTEDANCE_VIDEO_URL".to_string()),
            fn_index: 1,
            trigger_id: 1,
            step_count: DEFAULT_STEP_COUNT,
            style_slot: StyleSlot::Fixed("epiCRealism".to_string()),
            supported_styles: default_supported_styles(),
            origin_headers: true,
            join_query: theme_query,
            poll_timeout_secs: default_poll_timeout_secs(),
            enabled: true,
        },
    ]
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Write the default configuration to `path`, refusing to overwrite.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let content = Config::default().to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
    AlreadyExists(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::AlreadyExists(path) => {
                write!(f, "Config file '{}' already exists", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
            ConfigError::AlreadyExists(_) => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("promptreel").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/promptreel/config.toml")
        })
}
