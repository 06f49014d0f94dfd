//! KakaoTalk share via the Kakao "send to me" memo API.
//!
//! Optional. The memo API authenticates with a user OAuth access token
//! (issued by Kakao Login with the `talk_message` scope), not an app key.
//! A missing token, or one of the placeholders shipped in sample configs,
//! keeps the feature hidden instead of failing.

use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_KAKAO_BASE_URL: &str = "https://kapi.kakao.com";
/// Placeholder credentials from sample configuration. Treated as "not configured".
pub const PLACEHOLDER_KAKAO_TOKENS: &[&str] =
    &["YOUR_KAKAO_JAVASCRIPT_KEY", "YOUR_KAKAO_ACCESS_TOKEN"];

const MEMO_PATH: &str = "/v2/api/talk/memo/default/send";
const SHARE_TEXT_PREFIX: &str = "AI 얼굴 분석 결과:\n\n";
const BUTTON_TITLE: &str = "결과 확인하기";

#[derive(Error, Debug)]
pub enum KakaoError {
    #[error("Kakao share is not initialized; configure a Kakao user access token")]
    NotInitialized,
    #[error("Kakao request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Kakao API returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Whether `access_token` is a usable credential.
pub fn is_configured(access_token: Option<&str>) -> bool {
    matches!(
        access_token.map(str::trim),
        Some(t) if !t.is_empty() && !PLACEHOLDER_KAKAO_TOKENS.contains(&t)
    )
}

/// Text template sent to Kakao, including the result link and button.
pub fn text_template(text: &str, url: Option<&str>) -> serde_json::Value {
    let link = match url {
        Some(url) => json!({ "web_url": url, "mobile_web_url": url }),
        None => json!({}),
    };
    json!({
        "object_type": "text",
        "text": format!("{SHARE_TEXT_PREFIX}{text}"),
        "link": link,
        "buttons": [
            { "title": BUTTON_TITLE, "link": link },
        ],
    })
}

/// Initialized Kakao share client.
pub struct KakaoShare {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl KakaoShare {
    /// Initialize from the configured user access token. `None` means the feature stays hidden.
    pub fn init(access_token: Option<&str>, base_url: &str, timeout: Duration) -> Option<Self> {
        if !is_configured(access_token) {
            tracing::debug!("Kakao access token missing or placeholder; chat share disabled");
            return None;
        }
        let http = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(http) => http,
            Err(err) => {
                tracing::error!(error = %err, "Kakao client initialization failed");
                return None;
            }
        };
        Some(Self {
            http,
            access_token: access_token.unwrap_or_default().trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send `text` to the user's own KakaoTalk chat.
    pub async fn send(&self, text: &str, url: Option<&str>) -> Result<(), KakaoError> {
        let template = text_template(text, url).to_string();
        let response = self
            .http
            .post(format!("{}{MEMO_PATH}", self.base_url))
            .bearer_auth(&self.access_token)
            .form(&[("template_object", template.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KakaoError::Status { status, body });
        }
        tracing::info!("shared result to KakaoTalk");
        Ok(())
    }
}

/// Send through `share` when initialized; report [`KakaoError::NotInitialized`] otherwise.
pub async fn share(
    share: Option<&KakaoShare>,
    text: &str,
    url: Option<&str>,
) -> Result<(), KakaoError> {
    match share {
        Some(s) => s.send(text, url).await,
        None => Err(KakaoError::NotInitialized),
    }
}
