use super::{prepare_upload, MediaError, MediaUploader, StoredMedia, UploadRequest};
use super::{normalize_folder, MediaErrorCode};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use ridgeline_core::sha256_hex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

const HANDLE_PREFIX: &str = "cloudinary:";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `sha256(sorted "k=v&k=v" + secret)`; empty values are left out the way
/// Cloudinary's own SDKs do.
#[must_use]
pub fn cloudinary_signature(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    sha256_hex(format!("{joined}{api_secret}").as_bytes())
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DestroyReply {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct CloudinaryUploader {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base_url: String,
    default_folder: Option<String>,
    max_bytes: usize,
}

impl CloudinaryUploader {
    pub fn new(
        cloud_name: &str,
        api_key: &str,
        api_secret: &str,
        api_base_url: &str,
        default_folder: &str,
        max_bytes: usize,
    ) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(MediaError::backend)?;
        Ok(Self {
            client,
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            default_folder: normalize_folder(default_folder)?,
            max_bytes,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{action}",
            self.api_base_url, self.cloud_name
        )
    }

    async fn read_reply<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, MediaError> {
        let status = response.status();
        let body = response.bytes().await.map_err(MediaError::backend)?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorReply>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(MediaError::backend(format!("cloudinary returned {status}: {detail}")));
        }
        serde_json::from_slice(&body)
            .map_err(|e| MediaError::backend(format!("unexpected cloudinary reply: {e}")))
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    fn backend_name(&self) -> &'static str {
        "cloudinary"
    }

    async fn upload(&self, request: UploadRequest) -> Result<StoredMedia, MediaError> {
        let prepared = prepare_upload(request, self.max_bytes)?;
        let folder = match (&self.default_folder, &prepared.folder) {
            (Some(base), Some(sub)) => format!("{base}/{sub}"),
            (Some(base), None) => base.clone(),
            (None, Some(sub)) => sub.clone(),
            (None, None) => String::new(),
        };
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("folder", folder.clone());
        params.insert("public_id", prepared.name.clone());
        params.insert("timestamp", timestamp.clone());
        let signature = cloudinary_signature(&params, &self.api_secret);

        let part = Part::bytes(prepared.bytes.to_vec())
            .file_name(prepared.file_name())
            .mime_str(prepared.content_type)
            .map_err(MediaError::backend)?;
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", prepared.name.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        if !folder.is_empty() {
            form = form.text("folder", folder);
        }
        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::backend(format!("cloudinary upload: {e}")))?;
        let reply: UploadReply = Self::read_reply(response).await?;
        Ok(StoredMedia {
            url: reply.secure_url,
            path: format!("{HANDLE_PREFIX}{}", reply.public_id),
            backend: self.backend_name(),
            bytes: reply.bytes.unwrap_or(prepared.bytes.len() as u64),
            content_type: prepared.content_type.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<bool, MediaError> {
        let public_id = path.trim().strip_prefix(HANDLE_PREFIX).unwrap_or(path.trim());
        if public_id.is_empty() || public_id.contains("..") {
            return Err(MediaError::new(
                MediaErrorCode::InvalidPath,
                format!("invalid cloudinary public id `{path}`"),
            ));
        }
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", timestamp.clone());
        let signature = cloudinary_signature(&params, &self.api_secret);
        let fields = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];
        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&fields)
            .send()
            .await
            .map_err(|e| MediaError::backend(format!("cloudinary destroy: {e}")))?;
        let reply: DestroyReply = Self::read_reply(response).await?;
        match reply.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => {
                warn!(public_id, result = other, "unexpected cloudinary destroy result");
                Err(MediaError::backend(format!("cloudinary destroy: {other}")))
            }
        }
    }
}
