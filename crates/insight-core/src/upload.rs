//! Upload surface: turn a user-supplied path into a [`SelectedImage`] and
//! decide whether it may start an analysis cycle.
//!
//! Validation trusts the declared MIME type. The declared type comes from an
//! explicit override when the caller has one, otherwise from the file
//! extension.

use crate::types::SelectedImage;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix every accepted MIME type starts with.
pub const IMAGE_MIME_PREFIX: &str = "image/";

const FALLBACK_MIME: &str = "application/octet-stream";

/// Common non-image types, so rejections name what the file actually is.
const OTHER_MIME_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("이미지 파일만 업로드할 수 있습니다. ({mime_type})")]
    NotAnImage { mime_type: String },
}

/// Derive the declared MIME type of a path from its extension.
pub fn declared_mime(path: &Path) -> String {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK_MIME.to_string();
    };
    let ext = ext.to_ascii_lowercase();

    if let Some(format) = ImageFormat::from_extension(&ext) {
        return format.to_mime_type().to_string();
    }
    // Formats the `image` crate does not decode but browsers still label as images.
    match ext.as_str() {
        "heic" => return "image/heic".to_string(),
        "heif" => return "image/heif".to_string(),
        "svg" => return "image/svg+xml".to_string(),
        _ => {}
    }

    OTHER_MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| mime.to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// Normalize a path typed or dropped into a terminal.
///
/// Terminals paste dropped files as quoted paths, backslash-escaped paths or
/// `file://` URLs depending on the emulator.
pub fn normalize_dropped_path(input: &str) -> PathBuf {
    let trimmed = input.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);
    let without_scheme = unquoted.strip_prefix("file://").unwrap_or(unquoted);

    let mut out = String::with_capacity(without_scheme.len());
    let mut chars = without_scheme.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    PathBuf::from(out)
}

/// Build a [`SelectedImage`] for `path`, using `mime_override` when given.
pub fn select(path: impl Into<PathBuf>, mime_override: Option<&str>) -> SelectedImage {
    let path = path.into();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let mime_type = match mime_override {
        Some(m) => m.trim().to_ascii_lowercase(),
        None => declared_mime(&path),
    };
    SelectedImage {
        path,
        file_name,
        mime_type,
    }
}

/// Accept only files whose declared MIME type is an image type.
pub fn validate(image: &SelectedImage) -> Result<(), UploadError> {
    if image.mime_type.starts_with(IMAGE_MIME_PREFIX) {
        Ok(())
    } else {
        Err(UploadError::NotAnImage {
            mime_type: image.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_mime_images() {
        assert_eq!(declared_mime(Path::new("photo.png")), "image/png");
        assert_eq!(declared_mime(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(declared_mime(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(declared_mime(Path::new("photo.webp")), "image/webp");
        assert_eq!(declared_mime(Path::new("photo.heic")), "image/heic");
    }

    #[test]
    fn test_declared_mime_non_images() {
        assert_eq!(declared_mime(Path::new("document.pdf")), "application/pdf");
        assert_eq!(declared_mime(Path::new("notes.txt")), "text/plain");
        assert_eq!(declared_mime(Path::new("archive.xyz")), FALLBACK_MIME);
        assert_eq!(declared_mime(Path::new("Makefile")), FALLBACK_MIME);
    }

    #[test]
    fn test_validate_accepts_png() {
        let image = select("photo.png", None);
        assert_eq!(image.file_name, "photo.png");
        assert!(validate(&image).is_ok());
    }

    #[test]
    fn test_validate_rejects_pdf() {
        let image = select("document.pdf", None);
        assert_eq!(
            validate(&image),
            Err(UploadError::NotAnImage {
                mime_type: "application/pdf".into()
            })
        );
    }

    #[test]
    fn test_rejection_message() {
        let err = validate(&select("document.pdf", None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "이미지 파일만 업로드할 수 있습니다. (application/pdf)"
        );
    }

    #[test]
    fn test_mime_override_wins() {
        let image = select("upload.bin", Some("Image/PNG"));
        assert_eq!(image.mime_type, "image/png");
        assert!(validate(&image).is_ok());

        let image = select("photo.png", Some("application/pdf"));
        assert!(validate(&image).is_err());
    }

    #[test]
    fn test_normalize_dropped_path() {
        assert_eq!(normalize_dropped_path("  photo.png \n"), PathBuf::from("photo.png"));
        assert_eq!(
            normalize_dropped_path("'/home/u/My Photos/a.png'"),
            PathBuf::from("/home/u/My Photos/a.png")
        );
        assert_eq!(
            normalize_dropped_path("\"/tmp/a b.jpg\""),
            PathBuf::from("/tmp/a b.jpg")
        );
        assert_eq!(
            normalize_dropped_path("/home/u/My\\ Photos/a.png"),
            PathBuf::from("/home/u/My Photos/a.png")
        );
        assert_eq!(
            normalize_dropped_path("file:///tmp/face.webp"),
            PathBuf::from("/tmp/face.webp")
        );
    }
}
