// SPDX-License-Identifier: Apache-2.0

use super::{prepare_upload, validate_media_key, MediaError, MediaUploader, StoredMedia, UploadRequest};
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;

const HANDLE_PREFIX: &str = "r2:";

/// Cloudflare R2 through its S3-compatible API.
pub struct R2Uploader {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
    max_bytes: usize,
}

impl R2Uploader {
    pub fn new(
        account_id: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: &str,
        public_base_url: &str,
        max_bytes: usize,
    ) -> Result<Self, MediaError> {
        let store = AmazonS3Builder::new()
            .with_endpoint(format!("https://{account_id}.r2.cloudflarestorage.com"))
            .with_region("auto")
            .with_bucket_name(bucket)
            .with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key)
            .build()
            .map_err(|e| MediaError::backend(format!("r2 client: {e}")))?;
        Ok(Self::with_store(Arc::new(store), public_base_url, max_bytes))
    }

    /// Any object store; tests pass `InMemory`.
    #[must_use]
    pub fn with_store(store: Arc<dyn ObjectStore>, public_base_url: &str, max_bytes: usize) -> Self {
        Self {
            store,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    fn location(key: &str) -> Result<ObjectPath, MediaError> {
        ObjectPath::parse(key).map_err(|e| MediaError::backend(format!("object key {key}: {e}")))
    }
}

#[async_trait]
impl MediaUploader for R2Uploader {
    fn backend_name(&self) -> &'static str {
        "r2"
    }

    async fn upload(&self, request: UploadRequest) -> Result<StoredMedia, MediaError> {
        let prepared = prepare_upload(request, self.max_bytes)?;
        let key = prepared.key();
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, prepared.content_type.into());
        attributes.insert(
            Attribute::CacheControl,
            "public, max-age=31536000, immutable".into(),
        );
        let opts = PutOptions {
            attributes,
            ..PutOptions::default()
        };
        let size = prepared.bytes.len() as u64;
        self.store
            .put_opts(&Self::location(&key)?, PutPayload::from(prepared.bytes), opts)
            .await
            .map_err(|e| MediaError::backend(format!("r2 put {key}: {e}")))?;
        Ok(StoredMedia {
            url: format!("{}/{key}", self.public_base_url),
            path: format!("{HANDLE_PREFIX}{key}"),
            backend: self.backend_name(),
            bytes: size,
            content_type: prepared.content_type.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<bool, MediaError> {
        let trimmed = path.trim();
        let raw = trimmed
            .strip_prefix(HANDLE_PREFIX)
            .or_else(|| trimmed.strip_prefix(self.public_base_url.as_str()))
            .unwrap_or(trimmed);
        let key = validate_media_key(raw)?;
        let location = Self::location(&key)?;
        match self.store.head(&location).await {
            Ok(_) => {}
            Err(object_store::Error::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(MediaError::backend(format!("r2 head {key}: {e}"))),
        }
        self.store
            .delete(&location)
            .await
            .map_err(|e| MediaError::backend(format!("r2 delete {key}: {e}")))?;
        Ok(true)
    }
}
