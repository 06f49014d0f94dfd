//! Plain-text rendering of the session status for terminal front ends.

use crate::session::Status;
use crate::types::{Capabilities, Preview};
use std::fmt::Write as _;

pub const RESULT_HEADING: &str = "AI 분석 결과";
pub const LOADING_MESSAGE: &str = "AI가 당신의 얼굴을 분석하고 있습니다...";
pub const UPLOAD_PROMPT: &str = "upload <path> (PNG, JPG, WEBP)";

fn describe_preview(preview: &Preview) -> String {
    match preview.dimensions {
        Some((w, h)) => format!("{w}x{h}, {} bytes", preview.byte_len),
        None => format!("{} bytes", preview.byte_len),
    }
}

/// Render `status` the way the result surface shows it.
pub fn render_status(status: &Status, caps: &Capabilities) -> String {
    let mut out = String::new();
    match status {
        Status::Idle { rejection } => {
            let _ = writeln!(out, "{UPLOAD_PROMPT}");
            if let Some(rejection) = rejection {
                let _ = writeln!(out, "오류: {rejection}");
            }
        }
        Status::Previewing { image, .. } => {
            let _ = writeln!(out, "[{}] reading...", image.file_name);
        }
        Status::Loading { image, preview, .. } => {
            let _ = writeln!(out, "[{}] {}", image.file_name, describe_preview(preview));
            let _ = writeln!(out, "{LOADING_MESSAGE}");
        }
        Status::Success {
            image,
            preview,
            result,
            ..
        } => {
            let _ = writeln!(out, "[{}] {}", image.file_name, describe_preview(preview));
            let _ = writeln!(out, "== {RESULT_HEADING} ==");
            let _ = writeln!(out, "{}", result.text);
            let actions: Vec<&str> = caps.actions().into_iter().map(|a| a.label()).collect();
            let _ = writeln!(out, "actions: {}", actions.join(", "));
        }
        Status::Error { image, error, .. } => {
            let _ = writeln!(out, "[{}]", image.file_name);
            let _ = writeln!(out, "오류: {error}");
        }
    }
    out
}
