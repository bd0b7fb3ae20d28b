//! DiscordWebhookUploader - stores finished videos as Discord attachments.
//!
//! Posts a multipart message to a channel webhook with `?wait=true`, so the
//! created message (and its attachment CDN URL) comes back in the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::sink::{UploadError, VideoUploader};

/// Default environment variable holding the webhook URL.
pub const DISCORD_WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";

/// Embed color (blue).
const EMBED_COLOR: u32 = 0x3498db;

/// Discord caps embed descriptions at 4096 characters.
const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    url: String,
}

pub struct DiscordWebhookUploader {
    webhook_url: String,
    http_client: reqwest::Client,
}

impl DiscordWebhookUploader {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, UploadError> {
        let webhook_url = webhook_url.into();
        if webhook_url.trim().is_empty() {
            return Err(UploadError::Other("webhook URL is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            webhook_url,
            http_client,
        })
    }

    /// Read the webhook URL from `DISCORD_WEBHOOK_URL`.
    pub fn from_env() -> Result<Self, UploadError> {
        let url = std::env::var(DISCORD_WEBHOOK_URL_ENV).map_err(|_| {
            UploadError::Other(format!("{} is not set", DISCORD_WEBHOOK_URL_ENV))
        })?;
        Self::new(url)
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }
}

/// Message body describing the upload.
fn embed_payload(filename: &str, prompt: &str, size_bytes: usize) -> serde_json::Value {
    let description: String = format!("Prompt: {}", prompt)
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect();
    let size_mb = size_bytes as f64 / (1024.0 * 1024.0);

    serde_json::json!({
        "embeds": [{
            "title": "AI Generated Video",
            "description": description,
            "color": EMBED_COLOR,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "fields": [
                { "name": "File Name", "value": format!("`{}`", filename), "inline": false },
                { "name": "Size", "value": format!("{:.2}MB", size_mb), "inline": true }
            ]
        }]
    })
}

#[async_trait]
impl VideoUploader for DiscordWebhookUploader {
    async fn upload(
        &self,
        video: Vec<u8>,
        filename: &str,
        prompt: &str,
    ) -> Result<String, UploadError> {
        let payload = embed_payload(filename, prompt, video.len());
        let file = Part::bytes(video)
            .file_name(filename.to_string())
            .mime_str("video/mp4")?;
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", file);

        let response = self
            .http_client
            .post(&self.webhook_url)
            .query(&[("wait", "true")])
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Failed to upload to Discord: {}, {}", status, message);
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let message: WebhookMessage = response.json().await?;
        message
            .attachments
            .into_iter()
            .next()
            .map(|a| a.url)
            .filter(|url| !url.is_empty())
            .ok_or(UploadError::MissingUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_url() {
        assert!(DiscordWebhookUploader::new("").is_err());
    }

    #[test]
    fn test_from_env() {
        let original = std::env::var(DISCORD_WEBHOOK_URL_ENV).ok();

        std::env::set_var(DISCORD_WEBHOOK_URL_ENV, "https://discord.example/api/webhooks/1/t");
        let uploader = DiscordWebhookUploader::from_env().unwrap();
        assert_eq!(uploader.webhook_url(), "https://discord.example/api/webhooks/1/t");

        std::env::remove_var(DISCORD_WEBHOOK_URL_ENV);
        assert!(DiscordWebhookUploader::from_env().is_err());

        if let Some(val) = original {
            std::env::set_var(DISCORD_WEBHOOK_URL_ENV, val);
        }
    }

    #[test]
    fn test_embed_payload_fields() {
        let payload = embed_payload("cat_20250101_000000.mp4", "a cat", 1024 * 1024 * 3 / 2);
        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "AI Generated Video");
        assert_eq!(embed["description"], "Prompt: a cat");
        assert_eq!(embed["fields"][0]["value"], "`cat_20250101_000000.mp4`");
        assert_eq!(embed["fields"][1]["value"], "1.50MB");
    }

    #[test]
    fn test_embed_description_is_capped() {
        let prompt = "x".repeat(10_000);
        let payload = embed_payload("f.mp4", &prompt, 1);
        let description = payload["embeds"][0]["description"].as_str().unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
    }
}
