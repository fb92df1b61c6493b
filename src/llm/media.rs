use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::LlmError;

/// A media file read from disk and encoded for inline upload
#[derive(Debug, Clone)]
pub struct InlineMedia {
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl InlineMedia {
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Whether a media reference points off the local filesystem
pub fn is_remote(reference: &str) -> bool {
    ["http://", "https://", "gs://", "data:"]
        .iter()
        .any(|scheme| reference.starts_with(scheme))
}

/// MIME type guessed from the reference's extension
pub fn guess_mime(reference: &str) -> String {
    mime_guess::from_path(reference)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Lower-cased file extension of a reference
pub fn extension(reference: &str) -> Option<String> {
    Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Read a local media file and base64-encode it
pub async fn load_inline(reference: &str) -> Result<InlineMedia, LlmError> {
    let bytes = tokio::fs::read(reference)
        .await
        .map_err(|e| LlmError::Media {
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;

    Ok(InlineMedia {
        mime_type: guess_mime(reference),
        data: STANDARD.encode(bytes),
    })
}
