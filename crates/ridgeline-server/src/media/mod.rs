// SPDX-License-Identifier: Apache-2.0

//! Image uploads.
//!
//! Every backend stores the same normalized name,
//! `<folder>/<slugified stem>-<10 hex of sha256>.<ext>`, so re-uploading the
//! same bytes under the same name is idempotent.

mod cloudinary;
mod local;
mod r2;

pub use cloudinary::{cloudinary_signature, CloudinaryUploader};
pub use local::LocalDiskUploader;
pub use r2::R2Uploader;

use crate::config::{SiteConfig, UploadBackendConfig};
use async_trait::async_trait;
use bytes::Bytes;
use ridgeline_api::{ApiError, ApiErrorCode};
use ridgeline_core::{short_hash, slugify};
use serde::Serialize;
use serde_json::json;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub const ACCEPTED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
];

const NAME_HASH_LEN: usize = 10;
const MAX_FOLDER_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaErrorCode {
    Empty,
    TooLarge,
    UnsupportedType,
    InvalidPath,
    Backend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaError {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaError {
    #[must_use]
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn backend(message: impl Display) -> Self {
        Self::new(MediaErrorCode::Backend, message.to_string())
    }
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for MediaError {}

impl From<MediaError> for ApiError {
    fn from(value: MediaError) -> Self {
        let code = match value.code {
            MediaErrorCode::Empty => ApiErrorCode::ValidationFailed,
            MediaErrorCode::TooLarge => ApiErrorCode::PayloadTooLarge,
            MediaErrorCode::UnsupportedType => ApiErrorCode::UnsupportedMediaType,
            MediaErrorCode::InvalidPath => ApiErrorCode::InvalidParameter,
            MediaErrorCode::Backend => ApiErrorCode::UploadFailed,
        };
        ApiError::new(
            code,
            value.message,
            json!({"media_code": value.code}),
            "req-unknown",
        )
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: Option<String>,
    pub folder: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMedia {
    /// Public URL to put in content.
    pub url: String,
    /// Backend-specific handle accepted by `delete`.
    pub path: String,
    pub backend: &'static str,
    pub bytes: u64,
    pub content_type: String,
}

/// A validated upload with its final object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    pub folder: Option<String>,
    /// `<stem>-<hash>` without extension.
    pub name: String,
    pub ext: &'static str,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

impl PreparedUpload {
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.ext)
    }

    #[must_use]
    pub fn key(&self) -> String {
        match &self.folder {
            Some(folder) => format!("{folder}/{}", self.file_name()),
            None => self.file_name(),
        }
    }
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn upload(&self, request: UploadRequest) -> Result<StoredMedia, MediaError>;

    /// `Ok(false)` when nothing was stored under `path`.
    async fn delete(&self, path: &str) -> Result<bool, MediaError>;
}

/// Image type from magic bytes.
#[must_use]
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.len() >= 12
        && &bytes[4..8] == b"ftyp"
        && (&bytes[8..12] == b"avif" || &bytes[8..12] == b"avis")
    {
        Some("image/avif")
    } else {
        None
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ACCEPTED_IMAGE_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

/// Slugify each segment of a user-supplied folder; `None` when nothing is left.
pub fn normalize_folder(raw: &str) -> Result<Option<String>, MediaError> {
    let segments: Vec<String> = raw
        .split(['/', '\\'])
        .map(slugify)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() > MAX_FOLDER_DEPTH {
        return Err(MediaError::new(
            MediaErrorCode::InvalidPath,
            format!("folder nesting is limited to {MAX_FOLDER_DEPTH} levels"),
        ));
    }
    Ok((!segments.is_empty()).then(|| segments.join("/")))
}

/// Check size and type, and compute the stored name.
///
/// The sniffed type is authoritative; a declared type that names another
/// accepted image type is rejected as a mismatch.
pub fn prepare_upload(request: UploadRequest, max_bytes: usize) -> Result<PreparedUpload, MediaError> {
    if request.bytes.is_empty() {
        return Err(MediaError::new(MediaErrorCode::Empty, "uploaded file is empty"));
    }
    if request.bytes.len() > max_bytes {
        return Err(MediaError::new(
            MediaErrorCode::TooLarge,
            format!(
                "file is {} bytes, the limit is {max_bytes}",
                request.bytes.len()
            ),
        ));
    }
    let sniffed = sniff_image_type(&request.bytes).ok_or_else(|| {
        MediaError::new(
            MediaErrorCode::UnsupportedType,
            "only jpeg, png, webp, gif and avif images are accepted",
        )
    })?;
    if let Some(declared) = request.content_type.as_deref().map(str::trim) {
        let declared = declared.split(';').next().unwrap_or(declared).trim();
        if extension_for(declared).is_some() && declared != sniffed {
            return Err(MediaError::new(
                MediaErrorCode::UnsupportedType,
                format!("declared type {declared} does not match file contents ({sniffed})"),
            ));
        }
    }
    let ext = extension_for(sniffed).unwrap_or("bin");
    let stem = request
        .file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let stem = stem.rsplit_once('.').map_or(stem, |(s, _)| s);
    let mut slug = slugify(stem);
    if slug.is_empty() {
        slug = "image".to_string();
    }
    let folder = match request.folder.as_deref() {
        Some(raw) => normalize_folder(raw)?,
        None => None,
    };
    Ok(PreparedUpload {
        folder,
        name: format!("{slug}-{}", short_hash(&request.bytes, NAME_HASH_LEN)),
        ext,
        content_type: sniffed,
        bytes: request.bytes,
    })
}

/// Validate a stored object key handed back for deletion.
pub fn validate_media_key(raw: &str) -> Result<String, MediaError> {
    let key = raw.trim().trim_start_matches('/');
    let ok = !key.is_empty()
        && key.split('/').all(|seg| {
            !seg.is_empty()
                && seg != "."
                && seg != ".."
                && seg
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        });
    if ok {
        Ok(key.to_string())
    } else {
        Err(MediaError::new(
            MediaErrorCode::InvalidPath,
            format!("invalid media path `{raw}`"),
        ))
    }
}

pub fn build_uploader(cfg: &SiteConfig) -> Result<Arc<dyn MediaUploader>, MediaError> {
    let max = cfg.max_upload_bytes;
    Ok(match &cfg.upload {
        UploadBackendConfig::Local { public_root } => {
            Arc::new(LocalDiskUploader::new(public_root.clone(), max))
        }
        UploadBackendConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
            api_base_url,
            default_folder,
        } => Arc::new(CloudinaryUploader::new(
            cloud_name,
            api_key,
            api_secret,
            api_base_url,
            default_folder,
            max,
        )?),
        UploadBackendConfig::R2 {
            account_id,
            access_key_id,
            secret_access_key,
            bucket,
            public_base_url,
        } => Arc::new(R2Uploader::new(
            account_id,
            access_key_id,
            secret_access_key,
            bucket,
            public_base_url,
            max,
        )?),
    })
}
