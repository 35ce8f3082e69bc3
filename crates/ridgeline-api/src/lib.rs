// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Wire contract of the admin API: error envelope, status mapping, request
//! and response bodies, query parameters and the OpenAPI document.

pub mod dto;
pub mod error_mapping;
mod errors;
mod openapi;
pub mod params;

pub use dto::{
    ActivityUpsert, InquirySubmission, ListResponse, MutationResponse, PageUpsert,
    RevalidateRequest, RevalidateResponse, SettingsUpdate, StorageStatus, SyncDirection,
    SyncRequest, SyncResponse, UploadResponse,
};
pub use error_mapping::{map_error, ApiErrorMapping, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode, ApiErrorEnvelope};
pub use openapi::openapi_v1_spec;
pub use params::{parse_list_params, ListParams, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};

pub const CRATE_NAME: &str = "ridgeline-api";
pub const API_VERSION: &str = "v1";
