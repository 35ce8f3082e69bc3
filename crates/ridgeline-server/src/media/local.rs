use super::{prepare_upload, validate_media_key, MediaError, MediaUploader, StoredMedia, UploadRequest};
use async_trait::async_trait;
use std::path::PathBuf;

const URL_PREFIX: &str = "/uploads";

/// Writes under `<public_root>/uploads`, which the server exposes at `/uploads`.
pub struct LocalDiskUploader {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalDiskUploader {
    #[must_use]
    pub fn new(public_root: PathBuf, max_bytes: usize) -> Self {
        Self {
            root: public_root.join("uploads"),
            max_bytes,
        }
    }
}

#[async_trait]
impl MediaUploader for LocalDiskUploader {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, request: UploadRequest) -> Result<StoredMedia, MediaError> {
        let prepared = prepare_upload(request, self.max_bytes)?;
        let key = prepared.key();
        let target = self.root.join(&key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::backend(format!("create {}: {e}", parent.display())))?;
        }
        let tmp = target.with_extension(format!("{}.tmp", prepared.ext));
        tokio::fs::write(&tmp, &prepared.bytes)
            .await
            .map_err(|e| MediaError::backend(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| MediaError::backend(format!("rename {}: {e}", target.display())))?;
        let url = format!("{URL_PREFIX}/{key}");
        Ok(StoredMedia {
            path: url.clone(),
            url,
            backend: self.backend_name(),
            bytes: prepared.bytes.len() as u64,
            content_type: prepared.content_type.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<bool, MediaError> {
        let trimmed = path.trim();
        let key = validate_media_key(trimmed.strip_prefix(URL_PREFIX).unwrap_or(trimmed))?;
        match tokio::fs::remove_file(self.root.join(&key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaError::backend(format!("remove {key}: {e}"))),
        }
    }
}
