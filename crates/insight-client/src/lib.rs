//! insight-client — Outbound HTTP clients.
//!
//! [`GeminiClient`] implements the [`insight_core::Analyzer`] seam against
//! the Gemini REST API; [`KakaoShare`] is the optional KakaoTalk share.

pub mod gemini;
pub mod kakao;

#[cfg(test)]
mod testing;

pub use gemini::{ClientError, GeminiClient, GeminiSettings};
pub use kakao::{KakaoError, KakaoShare};
