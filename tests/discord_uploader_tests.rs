//! Mock HTTP tests for the Discord webhook uploader.

use promptreel::generate::{DiscordWebhookUploader, UploadError, VideoUploader};
use wiremock::matchers::{header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn webhook_url(server: &MockServer) -> String {
    format!("{}/api/webhooks/1/token", server.uri())
}

#[tokio::test]
async fn test_upload_returns_attachment_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .and(query_param("wait", "true"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "1",
            "attachments": [{"url": "https://cdn.discordapp.com/attachments/1/2/a_cat.mp4"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = DiscordWebhookUploader::new(webhook_url(&server)).unwrap();
    let url = uploader
        .upload(vec![1, 2, 3], "a_cat_20250101_000000.mp4", "a cat")
        .await
        .unwrap();

    assert_eq!(url, "https://cdn.discordapp.com/attachments/1/2/a_cat.mp4");
}

#[tokio::test]
async fn test_upload_sends_file_and_embed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "attachments": [{"url": "https://cdn.example/v.mp4"}]
        })))
        .mount(&server)
        .await;

    let uploader = DiscordWebhookUploader::new(webhook_url(&server)).unwrap();
    uploader
        .upload(b"video-bytes".to_vec(), "neon_city_20250101_000000.mp4", "neon city")
        .await
        .unwrap();

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"payload_json\""));
    assert!(body.contains("Prompt: neon city"));
    assert!(body.contains("name=\"files[0]\""));
    assert!(body.contains("filename=\"neon_city_20250101_000000.mp4\""));
    assert!(body.contains("video-bytes"));
}

#[tokio::test]
async fn test_upload_rejected_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .respond_with(ResponseTemplate::new(413).set_body_string("Request entity too large"))
        .mount(&server)
        .await;

    let uploader = DiscordWebhookUploader::new(webhook_url(&server)).unwrap();
    let err = uploader.upload(vec![0; 8], "f.mp4", "p").await.unwrap_err();

    match err {
        UploadError::Rejected { status, message } => {
            assert_eq!(status, 413);
            assert_eq!(message, "Request entity too large");
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_without_attachments_is_missing_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
        .mount(&server)
        .await;

    let uploader = DiscordWebhookUploader::new(webhook_url(&server)).unwrap();
    let err = uploader.upload(vec![0; 8], "f.mp4", "p").await.unwrap_err();
    assert!(matches!(err, UploadError::MissingUrl));
}
