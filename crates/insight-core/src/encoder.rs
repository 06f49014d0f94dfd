//! Data URL and base64 payload encoding for a selected image.

use crate::types::{EncodedImage, Preview, SelectedImage};
use base64::{engine::general_purpose, Engine as _};
use image::ImageReader;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data URL: no payload separator")]
    MalformedDataUrl,
}

/// Build `data:<mime>;base64,<payload>` for the given bytes.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let payload = general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{payload}")
}

/// Strip the `data:*/*;base64,` prefix, leaving the payload.
pub fn strip_data_url_prefix(data_url: &str) -> Result<&str, EncodeError> {
    data_url
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or(EncodeError::MalformedDataUrl)
}

/// Read the file behind `image` and encode it for preview and transmission.
///
/// Single-shot; a read failure is returned as [`EncodeError::Read`].
pub async fn encode(image: &SelectedImage) -> Result<EncodedImage, EncodeError> {
    let bytes = tokio::fs::read(&image.path)
        .await
        .map_err(|source| EncodeError::Read {
            path: image.path.display().to_string(),
            source,
        })?;
    encode_bytes(&image.mime_type, bytes)
}

/// Encode bytes already in memory.
pub fn encode_bytes(mime_type: &str, bytes: Vec<u8>) -> Result<EncodedImage, EncodeError> {
    let data_url = to_data_url(mime_type, &bytes);
    let payload = strip_data_url_prefix(&data_url)?.to_string();
    tracing::debug!(
        mime_type,
        bytes = bytes.len(),
        payload_len = payload.len(),
        "image encoded"
    );
    Ok(EncodedImage {
        bytes,
        data_url,
        payload,
    })
}

impl EncodedImage {
    /// Preview metadata. Dimensions are best-effort: undecodable content still previews.
    pub fn preview(&self) -> Preview {
        let dimensions = ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());
        Preview {
            data_url: self.data_url.clone(),
            byte_len: self.bytes.len(),
            dimensions,
        }
    }
}
