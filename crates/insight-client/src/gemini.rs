//! Gemini `generateContent` client.
//!
//! One request per [`Analyzer::analyze`] call: an inline image part followed
//! by the text instruction. Every failure past the credential check collapses
//! into [`AnalysisError::Failed`]; the cause goes to the log.

use async_trait::async_trait;
use insight_core::analysis::{AnalysisError, AnalysisRequest, Analyzer};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Checked at call time, not at construction.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Internal cause of a failed call. Logged, never returned.
#[derive(Error, Debug)]
enum CallError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("prompt blocked: {0}")]
    Blocked(String),
    #[error("response contained no text")]
    Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentRequest {
    /// Image part first, then the instruction.
    pub fn from_analysis(request: &AnalysisRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: request.mime_type.clone(),
                            data: request.payload.clone(),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(request.prompt.clone()),
                    },
                ],
            }],
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate; `None` when there is no text.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// [`Analyzer`] backed by the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    async fn call(&self, api_key: &str, request: &AnalysisRequest) -> Result<String, CallError> {
        let body = GenerateContentRequest::from_analysis(request);
        tracing::info!(
            model = %self.settings.model,
            mime_type = %request.mime_type,
            payload_len = request.payload.len(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CallError::Status { status, body: text });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(CallError::Blocked(reason));
        }
        parsed.text().ok_or(CallError::Empty)
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, AnalysisError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AnalysisError::MissingCredential)?;

        match self.call(api_key, request).await {
            Ok(text) => {
                tracing::info!(chars = text.chars().count(), "analysis received");
                Ok(text)
            }
            Err(err) => {
                tracing::error!(error = %err, "Gemini API call failed");
                Err(AnalysisError::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve_once, CannedResponse};
    use insight_core::analysis::DEFAULT_PROMPT;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            mime_type: "image/png".into(),
            payload: "iVBORw0KGgo=".into(),
            prompt: DEFAULT_PROMPT.into(),
        }
    }

    fn client(base_url: &str, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiSettings {
            api_key: api_key.map(str::to_string),
            model: "gemini-2.5-flash".into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateContentRequest::from_analysis(&request())).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "iVBORw0KGgo=");
        assert!(parts[0].get("text").is_none());
        assert_eq!(parts[1]["text"], DEFAULT_PROMPT);
        assert!(parts[1].get("inlineData").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"첫째 "},{"text":"둘째"}],"role":"model"}}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text().as_deref(), Some("첫째 둘째"));
    }

    #[test]
    fn test_response_without_text() {
        let resp: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(resp.text(), None);
        let resp: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap();
        assert_eq!(resp.text(), None);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let c = client("https://example.test/", Some("k"));
        assert_eq!(
            c.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let c = client("http://127.0.0.1:1", None);
        assert_eq!(c.analyze(&request()).await, Err(AnalysisError::MissingCredential));
        let c = client("http://127.0.0.1:1", Some("   "));
        assert_eq!(c.analyze(&request()).await, Err(AnalysisError::MissingCredential));
    }

    #[tokio::test]
    async fn test_success_sends_one_request() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"온화한 인상입니다."}]}}]}"#;
        let server = serve_once(CannedResponse::json(200, body)).await;
        let c = client(&server.base_url, Some("secret"));

        let text = c.analyze(&request()).await.unwrap();
        assert_eq!(text, "온화한 인상입니다.");

        let seen = server.request.await.unwrap();
        assert!(seen.head.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"));
        assert!(seen.head.to_ascii_lowercase().contains("x-goog-api-key: secret"));
        let sent: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(sent["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
    }

    #[tokio::test]
    async fn test_http_error_is_generic_failure() {
        let server = serve_once(CannedResponse::json(403, r#"{"error":{"code":403}}"#)).await;
        let c = client(&server.base_url, Some("bad"));
        assert_eq!(c.analyze(&request()).await, Err(AnalysisError::Failed));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_generic_failure() {
        let body = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let server = serve_once(CannedResponse::json(200, body)).await;
        let c = client(&server.base_url, Some("k"));
        assert_eq!(c.analyze(&request()).await, Err(AnalysisError::Failed));
    }

    #[tokio::test]
    async fn test_garbage_body_is_generic_failure() {
        let server = serve_once(CannedResponse::json(200, "not json")).await;
        let c = client(&server.base_url, Some("k"));
        assert_eq!(c.analyze(&request()).await, Err(AnalysisError::Failed));
    }
}
