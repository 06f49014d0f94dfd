use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier of one analysis cycle.
///
/// Issued by [`Session`](crate::Session) on every accepted upload, strictly
/// increasing. Asynchronous completions carry the id of the cycle that
/// started them so a reset or a newer upload can discard them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file the user picked, with the MIME type it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub path: PathBuf,
    /// Display name (final path component).
    pub file_name: String,
    /// Declared MIME type, e.g. `image/png`.
    pub mime_type: String,
}

/// File contents converted for preview and for transmission.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    /// `data:<mime>;base64,<payload>`.
    pub data_url: String,
    /// The data URL with the scheme prefix stripped.
    pub payload: String,
}

/// What the user sees while the analysis is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub data_url: String,
    pub byte_len: usize,
    /// Pixel dimensions, when the bytes decode as a known image format.
    pub dimensions: Option<(u32, u32)>,
}

/// Text returned by the remote analysis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub model: String,
    pub completed_at: DateTime<Utc>,
}

/// Host capabilities, detected once at startup and passed down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub clipboard: bool,
    pub native_share: bool,
    pub chat_share: bool,
}

/// Actions offered on a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultAction {
    Copy,
    Share,
    ChatShare,
    Download,
}

impl ResultAction {
    pub fn label(self) -> &'static str {
        match self {
            ResultAction::Copy => "copy",
            ResultAction::Share => "share",
            ResultAction::ChatShare => "kakao",
            ResultAction::Download => "download",
        }
    }
}

impl Capabilities {
    /// Actions to show, in display order. Download is always offered.
    pub fn actions(&self) -> Vec<ResultAction> {
        let mut actions = Vec::with_capacity(4);
        if self.clipboard {
            actions.push(ResultAction::Copy);
        }
        if self.native_share {
            actions.push(ResultAction::Share);
        }
        if self.chat_share {
            actions.push(ResultAction::ChatShare);
        }
        actions.push(ResultAction::Download);
        actions
    }
}
