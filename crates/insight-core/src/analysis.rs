//! The remote analysis seam.
//!
//! [`Analyzer`] is implemented by the Gemini client in `insight-client` and
//! by in-test fakes. Implementations perform exactly one outbound call per
//! [`Analyzer::analyze`] and never retry.

use async_trait::async_trait;
use thiserror::Error;

/// Default generative model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Fixed instruction sent alongside the image: analyze this face photo in
/// Korean, describing facial features, overall impression and emotional
/// state in detail and from a positive point of view.
pub const DEFAULT_PROMPT: &str = "이 얼굴 사진을 분석해주세요. 한국어로 답변해주세요. 얼굴의 특징, 전체적인 인상, 그리고 사진에서 드러나는 감정 상태에 대해 상세하고 긍정적인 관점에서 설명해주세요.";

/// One analysis call's input.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub mime_type: String,
    /// Base64 image payload, without a data URL prefix.
    pub payload: String,
    pub prompt: String,
}

/// Failures surfaced to the user. Causes are logged by the implementation,
/// never carried here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("API 키가 설정되지 않았습니다. API_KEY 또는 GEMINI_API_KEY를 설정해주세요.")]
    MissingCredential,
    #[error("AI 분석 결과를 받지 못했습니다. API 설정을 확인한 뒤 다시 시도해주세요.")]
    Failed,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Model name reported alongside results.
    fn model(&self) -> &str;

    /// Perform one analysis call and return the response text.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, AnalysisError>;
}
