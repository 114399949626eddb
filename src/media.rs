use crate::error::{GenError, GenResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;
use tokio::fs;

/// Which part of the shoot an input image plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRole {
    Product,
    Model,
}

/// An input image held in memory, shared read-only across every
/// generation call of a run.
#[derive(Debug, Clone)]
pub struct MediaReference {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub role: MediaRole,
}

impl MediaReference {
    pub async fn from_file<P: AsRef<Path>>(path: P, role: MediaRole) -> GenResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let mime_type = mime_for_extension(&ext)
            .ok_or_else(|| GenError::encoding(format!("unsupported image type: {}", path.display())))?;

        let bytes = fs::read(path)
            .await
            .map_err(|e| GenError::encoding(format!("failed to read {}: {}", path.display(), e)))?;

        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
            role,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>, role: MediaRole) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            role,
        }
    }

    /// Base64 payload for inline transport.
    pub fn encoded_data(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// The image set an ad run works from: the product shot, plus the model
/// shot for templates that feature a person.
#[derive(Debug, Clone)]
pub struct MediaSet {
    pub product: MediaReference,
    pub model: Option<MediaReference>,
}

impl MediaSet {
    pub fn new(product: MediaReference) -> Self {
        Self {
            product,
            model: None,
        }
    }

    pub fn with_model(mut self, model: MediaReference) -> Self {
        self.model = Some(model);
        self
    }

    /// References in transport order: product first, then model.
    pub fn references(&self) -> Vec<&MediaReference> {
        let mut refs = vec![&self.product];
        if let Some(model) = &self.model {
            refs.push(model);
        }
        refs
    }
}

/// A binary payload returned by a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaPayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// A generated still tied to the 0-based scene it belongs to.
#[derive(Debug, Clone)]
pub struct RenderedAsset {
    pub scene_index: usize,
    pub payload: MediaPayload,
}
