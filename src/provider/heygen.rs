use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{CreateVideoRequest, ProviderStatus, StatusReport, VideoProvider};
use crate::ReelError;

pub const DEFAULT_BASE_URL: &str = "https://api.heygen.com/v2";

const API_KEY_HEADER: &str = "X-Api-Key";

/// HeyGen v2 API client
pub struct HeyGenClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateVideoResponse {
    data: Option<CreateVideoData>,
}

#[derive(Debug, Deserialize)]
struct CreateVideoData {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoStatusResponse {
    data: Option<VideoStatusData>,
}

#[derive(Debug, Deserialize)]
struct VideoStatusData {
    status: Option<String>,
    video_url: Option<String>,
    thumbnail_url: Option<String>,
    error: Option<Value>,
}

impl HeyGenClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    fn api_key(&self) -> Result<&str, ReelError> {
        self.api_key.as_deref().ok_or_else(|| {
            ReelError::configuration(
                "HeyGen API key not configured. Set HEYGEN_API_KEY or video.api_key in the config file.",
            )
        })
    }

    /// Turn a non-success response into a `ReelError::Provider`
    async fn error_from_response(response: reqwest::Response) -> ReelError {
        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();
        let message = error_message(&raw_body).unwrap_or_else(|| status_text(status));

        tracing::error!(status = status.as_u16(), body = %raw_body, "HeyGen API error");

        ReelError::Provider {
            status_code: Some(status.as_u16()),
            message,
            raw_body: (!raw_body.is_empty()).then_some(raw_body),
        }
    }
}

#[async_trait]
impl VideoProvider for HeyGenClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn create_video(&self, request: &CreateVideoRequest) -> Result<String, ReelError> {
        let api_key = self.api_key()?;
        let url = format!("{}/video/generate", self.base_url);

        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: CreateVideoResponse = response
            .json()
            .await
            .map_err(|e| ReelError::transport(format!("Invalid create response: {}", e)))?;

        body.data
            .and_then(|data| data.video_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ReelError::Provider {
                status_code: None,
                message: "No video ID returned from HeyGen".to_string(),
                raw_body: None,
            })
    }

    async fn video_status(&self, job_id: &str) -> Result<StatusReport, ReelError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/video/status/{}",
            self.base_url,
            urlencoding::encode(job_id)
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: VideoStatusResponse = response
            .json()
            .await
            .map_err(|e| ReelError::transport(format!("Invalid status response: {}", e)))?;

        let data = body
            .data
            .ok_or_else(|| ReelError::transport("Status response has no data"))?;

        Ok(StatusReport {
            status: ProviderStatus::parse(data.status.as_deref()),
            video_url: data.video_url.filter(|url| !url.is_empty()),
            thumbnail_url: data.thumbnail_url.filter(|url| !url.is_empty()),
            error: data.error.as_ref().and_then(message_from_value),
        })
    }

    fn provider_name(&self) -> &'static str {
        "HeyGen"
    }
}

/// Pull a human readable message out of a JSON error body
pub(crate) fn error_message(raw_body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw_body).ok()?;
    value
        .get("message")
        .and_then(message_from_value)
        .or_else(|| value.get("error").and_then(message_from_value))
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map.get("message").and_then(message_from_value),
        _ => None,
    }
}

fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HeyGen API error: {}", reason),
        None => format!("HeyGen API error: HTTP {}", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CreateVideoRequest {
        CreateVideoRequest::avatar("Hello world", "avatar-9", "voice-9", None)
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"bad avatar"}"#), Some("bad avatar".to_string()));
        assert_eq!(error_message(r#"{"error":"quota"}"#), Some("quota".to_string()));
        assert_eq!(
            error_message(r#"{"error":{"code":"x","message":"voice missing"}}"#),
            Some("voice missing".to_string())
        );
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message(r#"{"detail":"nope"}"#), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = HeyGenClient::new("http://127.0.0.1:9", Some("  ".to_string()));
        assert!(!client.is_configured());

        let err = client.create_video(&request()).await.unwrap_err();
        assert!(matches!(err, ReelError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_create_video_sends_key_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/video/generate"))
            .and(header("X-Api-Key", "secret"))
            .and(body_partial_json(json!({
                "dimension": {"width": 1280, "height": 720},
                "video_inputs": [{"voice": {"input_text": "Hello world"}}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"video_id": "vid-123", "status": "pending"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("secret".to_string()));
        let job_id = client.create_video(&request()).await.unwrap();
        assert_eq!(job_id, "vid-123");
    }

    #[tokio::test]
    async fn test_create_video_structured_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/video/generate"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"code": "invalid", "message": "avatar not found"}})),
            )
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        match client.create_video(&request()).await.unwrap_err() {
            ReelError::Provider { status_code, message, raw_body } => {
                assert_eq!(status_code, Some(400));
                assert_eq!(message, "avatar not found");
                assert!(raw_body.unwrap().contains("avatar not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_video_unstructured_error_uses_status_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        match client.create_video(&request()).await.unwrap_err() {
            ReelError::Provider { status_code, message, raw_body } => {
                assert_eq!(status_code, Some(502));
                assert_eq!(message, "HeyGen API error: Bad Gateway");
                assert_eq!(raw_body.as_deref(), Some("upstream down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_video_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        let err = client.create_video(&request()).await.unwrap_err();
        assert!(matches!(err, ReelError::Provider { .. }));
        assert!(err.to_string().contains("No video ID"));
    }

    #[tokio::test]
    async fn test_video_status_completed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/status/vid-1"))
            .and(header("X-Api-Key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "video_id": "vid-1",
                    "status": "completed",
                    "video_url": "https://cdn.example.com/vid-1.mp4",
                    "thumbnail_url": "https://cdn.example.com/vid-1.jpg"
                }
            })))
            .mount(&server)
            .await;

        let client = HeyGenClient::new(format!("{}/", server.uri()), Some("k".to_string()));
        let report = client.video_status("vid-1").await.unwrap();
        assert_eq!(report.status, ProviderStatus::Completed);
        assert_eq!(report.video_url.as_deref(), Some("https://cdn.example.com/vid-1.mp4"));
        assert_eq!(report.thumbnail_url.as_deref(), Some("https://cdn.example.com/vid-1.jpg"));
    }

    #[tokio::test]
    async fn test_video_status_failed_with_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/status/vid-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"video_id": "vid-2", "status": "failed", "error": {"message": "voice rejected"}}
            })))
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        let report = client.video_status("vid-2").await.unwrap();
        assert_eq!(report.status, ProviderStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("voice rejected"));
    }

    #[tokio::test]
    async fn test_video_status_structured_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/status/vid-3"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "render queue unavailable"}})),
            )
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        match client.video_status("vid-3").await.unwrap_err() {
            ReelError::Provider { status_code, message, raw_body } => {
                assert_eq!(status_code, Some(500));
                assert_eq!(message, "render queue unavailable");
                assert!(raw_body.unwrap().contains("render queue unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_video_status_without_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        let err = client.video_status("vid-4").await.unwrap_err();
        assert!(matches!(err, ReelError::Provider { status_code: None, .. }));
        assert_eq!(err.to_string(), "Status response has no data");
    }

    #[tokio::test]
    async fn test_video_status_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = HeyGenClient::new(server.uri(), Some("k".to_string()));
        let err = client.video_status("vid-5").await.unwrap_err();
        assert!(matches!(err, ReelError::Provider { status_code: None, .. }));
        assert!(err.to_string().starts_with("Invalid status response"));
    }

    #[tokio::test]
    async fn test_status_error_fails_poll_after_one_check() {
        use crate::video::poller::tests::RecordingScheduler;
        use crate::video::{JobPoller, PollOutcome, PollSettings, Terminal};
        use std::sync::Arc;
        use tokio_util::sync::CancellationToken;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video/status/vid-6"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "try later"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(HeyGenClient::new(server.uri(), Some("k".to_string())));
        let poller = JobPoller::new(client, Arc::new(RecordingScheduler::default()), PollSettings::default());

        let outcome = poller.wait_for_completion("vid-6", &CancellationToken::new()).await;
        assert_eq!(
            outcome,
            PollOutcome::Terminal(Terminal::Failed {
                message: "try later".to_string()
            })
        );
    }
}
