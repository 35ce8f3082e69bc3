// SPDX-License-Identifier: Apache-2.0

use ridgeline_model::ValidationError;
use ridgeline_store::{StoreError, StoreErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidParameter,
    ValidationFailed,
    NotFound,
    Unauthorized,
    Conflict,
    PayloadTooLarge,
    UnsupportedMediaType,
    RateLimited,
    StorageUnavailable,
    UploadFailed,
    NotReady,
    Internal,
}

impl ApiErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "InvalidParameter",
            Self::ValidationFailed => "ValidationFailed",
            Self::NotFound => "NotFound",
            Self::Unauthorized => "Unauthorized",
            Self::Conflict => "Conflict",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::UnsupportedMediaType => "UnsupportedMediaType",
            Self::RateLimited => "RateLimited",
            Self::StorageUnavailable => "StorageUnavailable",
            Self::UploadFailed => "UploadFailed",
            Self::NotReady => "NotReady",
            Self::Internal => "Internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

/// `{"error": {...}}`, the body of every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiErrorEnvelope {
    pub error: ApiError,
}

impl ApiError {
    #[must_use]
    pub fn new(
        code: ApiErrorCode,
        message: impl Into<String>,
        details: Value,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: request_id.into(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = request_id.to_string();
        self
    }

    #[must_use]
    pub fn into_envelope(self) -> ApiErrorEnvelope {
        ApiErrorEnvelope { error: self }
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidParameter,
            format!("invalid parameter: {name}"),
            json!({"parameter": name, "value": value}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn validation_failed(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            ApiErrorCode::ValidationFailed,
            format!("validation failed: {reason}"),
            json!({"field_errors": [{"field": field, "reason": reason}]}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{what} not found"),
            json!({"resource": what}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ApiErrorCode::Unauthorized,
            "missing or invalid admin credentials",
            json!({}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message, json!({}), "req-unknown")
    }

    #[must_use]
    pub fn rate_limited(scope: &str) -> Self {
        Self::new(
            ApiErrorCode::RateLimited,
            "too many requests",
            json!({"scope": scope}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message, json!({}), "req-unknown")
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            value.0.clone(),
            json!({"field_errors": [{"reason": value.0}]}),
            "req-unknown",
        )
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        let code = match value.code {
            StoreErrorCode::NotFound => ApiErrorCode::NotFound,
            StoreErrorCode::Validation => ApiErrorCode::ValidationFailed,
            StoreErrorCode::Conflict => ApiErrorCode::Conflict,
            StoreErrorCode::Io | StoreErrorCode::Database => ApiErrorCode::StorageUnavailable,
            StoreErrorCode::Unsupported => ApiErrorCode::InvalidParameter,
            _ => ApiErrorCode::Internal,
        };
        Self::new(
            code,
            value.message,
            json!({"store_code": value.code.as_str()}),
            "req-unknown",
        )
    }
}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de>>() {}
    assert_traits::<ApiErrorCode>();
    assert_traits::<ApiErrorEnvelope>();
};
