//! Client for the external workflow webhook that turns an idea into a node tree.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::WebhookConfig;
use crate::error::{GenerationError, Result};
use crate::model::{GenerationRequest, RawPayload};

const PREVIEW_CHARS: usize = 200;
const PROBE_IDEA: &str = "Test connection";

#[async_trait::async_trait]
pub trait IdeaGenerator: Send + Sync {
    /// Send the idea and return the response body as received, checked only for being JSON.
    /// Shape validation is left to the caller.
    async fn generate(&self, idea: &str) -> Result<RawPayload>;

    /// Check that the service answers at all, without interpreting the answer.
    async fn probe(&self) -> ProbeReport;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl ProbeReport {
    fn success(status_code: u16, body: &str) -> Self {
        Self {
            status: ProbeStatus::Success,
            webhook_status_code: Some(status_code),
            response_preview: Some(preview(body)),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    fn failure(error: String) -> Self {
        Self {
            status: ProbeStatus::Error,
            webhook_status_code: None,
            response_preview: None,
            error: Some(error),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Truncate to the first `PREVIEW_CHARS` characters, marking the cut with "...".
pub fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        let head: String = body.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

fn classify(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::ExternalTimeout
    } else if err.is_decode() {
        GenerationError::invalid_shape(err.to_string())
    } else {
        GenerationError::ExternalUnreachable(err.to_string())
    }
}

/// Posts `{"idea": ...}` to a fixed webhook URL with a bounded wait.
#[derive(Debug, Clone)]
pub struct WebhookGenerator {
    url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl WebhookGenerator {
    pub fn new(url: impl Into<String>, timeout: Duration, probe_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
            probe_timeout,
        })
    }

    pub fn from_config(config: &WebhookConfig) -> anyhow::Result<Self> {
        Self::new(config.url.clone(), config.timeout(), config.probe_timeout())
    }
}

#[async_trait::async_trait]
impl IdeaGenerator for WebhookGenerator {
    async fn generate(&self, idea: &str) -> Result<RawPayload> {
        let request = GenerationRequest {
            idea: idea.to_string(),
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(GenerationError::ExternalStatus {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        RawPayload::from_text(body)
            .map_err(|e| GenerationError::invalid_shape(format!("response body is not JSON: {}", e)))
    }

    async fn probe(&self) -> ProbeReport {
        let request = GenerationRequest {
            idea: PROBE_IDEA.to_string(),
        };
        let sent = self
            .client
            .post(&self.url)
            .timeout(self.probe_timeout)
            .json(&request)
            .send()
            .await;

        match sent {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => ProbeReport::success(status, &body),
                    Err(e) => ProbeReport::failure(e.to_string()),
                }
            }
            Err(e) => ProbeReport::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Serve `app` on an ephemeral local port and return its base URL
    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", address)
    }

    fn generator(base_url: &str, timeout: Duration) -> WebhookGenerator {
        WebhookGenerator::new(format!("{}/webhook", base_url), timeout, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_body_and_sends_idea() {
        let app = Router::new().route(
            "/webhook",
            post(|Json(request): Json<GenerationRequest>| async move {
                Json(json!({"idea": request.idea, "nodes": []}))
            }),
        );
        let base_url = spawn(app).await;

        let body = generator(&base_url, Duration::from_secs(5))
            .generate("Build a chatbot")
            .await
            .unwrap();
        assert_eq!(body.to_value().unwrap(), json!({"idea": "Build a chatbot", "nodes": []}));
    }

    #[tokio::test]
    async fn test_generate_keeps_body_text_verbatim() {
        const BODY: &str = r#"{"nodes":[{"title":"A","id":1,"children":[]}],"idea":"x"}"#;
        let app = Router::new().route("/webhook", post(|| async { BODY }));
        let base_url = spawn(app).await;

        let payload = generator(&base_url, Duration::from_secs(5))
            .generate("x")
            .await
            .unwrap();
        assert_eq!(payload.as_str(), BODY);
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let app = Router::new().route(
            "/webhook",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "workflow crashed") }),
        );
        let base_url = spawn(app).await;

        match generator(&base_url, Duration::from_secs(5)).generate("x").await {
            Err(GenerationError::ExternalStatus { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "workflow crashed");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_webhook_times_out() {
        let app = Router::new().route(
            "/webhook",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"idea": "late", "nodes": []}))
            }),
        );
        let base_url = spawn(app).await;

        let result = generator(&base_url, Duration::from_millis(200)).generate("x").await;
        assert!(matches!(result, Err(GenerationError::ExternalTimeout)), "{:?}", result);
    }

    #[tokio::test]
    async fn test_unreachable_webhook() {
        // Bind then release a port so nothing is listening on it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let result = generator(&format!("http://{}", address), Duration::from_secs(5))
            .generate("x")
            .await;
        assert!(matches!(result, Err(GenerationError::ExternalUnreachable(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_truncated_body_is_unreachable() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promise 100 bytes of body, send a few, then hang up
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.ends_with(b"}") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"idea\"")
                .await
                .unwrap();
        });

        let result = generator(&format!("http://{}", address), Duration::from_secs(5))
            .generate("x")
            .await;
        assert!(matches!(result, Err(GenerationError::ExternalUnreachable(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_shape() {
        let app = Router::new().route("/webhook", post(|| async { "<html>oops</html>" }));
        let base_url = spawn(app).await;

        let result = generator(&base_url, Duration::from_secs(5)).generate("x").await;
        assert!(matches!(result, Err(GenerationError::ExternalInvalidShape(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_probe_reports_status_and_preview() {
        let long_body = "x".repeat(300);
        let app = Router::new().route(
            "/webhook",
            post(move || {
                let body = long_body.clone();
                async move { (StatusCode::ACCEPTED, body) }
            }),
        );
        let base_url = spawn(app).await;

        let report = generator(&base_url, Duration::from_secs(5)).probe().await;
        assert_eq!(report.status, ProbeStatus::Success);
        assert_eq!(report.webhook_status_code, Some(202));
        assert_eq!(report.response_preview.as_deref().map(str::len), Some(203));
    }

    #[test]
    fn test_preview_keeps_short_bodies() {
        assert_eq!(preview("short"), "short");
        assert_eq!(preview(&"é".repeat(201)), format!("{}...", "é".repeat(200)));
    }
}
