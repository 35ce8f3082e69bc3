// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub mod canonical;
pub mod images;
pub mod slug;

pub use images::{normalize_image_path, ImageHosts, PLACEHOLDER_IMAGE};
pub use slug::slugify;

pub const CRATE_NAME: &str = "ridgeline-core";

pub const ENV_RIDGELINE_CONTENT_ROOT: &str = "RIDGELINE_CONTENT_ROOT";
pub const ENV_RIDGELINE_DB_PATH: &str = "RIDGELINE_DB_PATH";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

/// Structured error printed by the operations CLI under `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Short content fingerprint used in generated file names.
#[must_use]
pub fn short_hash(bytes: &[u8], len: usize) -> String {
    let full = sha256_hex(bytes);
    full.chars().take(len.min(full.len())).collect()
}

#[must_use]
pub fn resolve_content_root() -> PathBuf {
    env_path_or(ENV_RIDGELINE_CONTENT_ROOT, "content")
}

#[must_use]
pub fn resolve_db_path() -> PathBuf {
    env_path_or(ENV_RIDGELINE_DB_PATH, "data/ridgeline.sqlite")
}

fn env_path_or(name: &str, fallback: &str) -> PathBuf {
    if let Ok(explicit) = std::env::var(name) {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    PathBuf::from(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn machine_error_serializes_details_in_key_order() {
        let err = MachineError::new("usage_error", "bad flag")
            .with_detail("flag", "--db")
            .with_detail("arg", "x");
        let json = serde_json::to_string(&err).expect("encode");
        assert_eq!(
            json,
            r#"{"code":"usage_error","message":"bad flag","details":{"arg":"x","flag":"--db"}}"#
        );
        assert_eq!(err.to_string(), "usage_error: bad flag");
    }

    #[test]
    fn short_hash_truncates_without_panicking() {
        assert_eq!(short_hash(b"abc", 10), "ba7816bf8f");
        assert_eq!(short_hash(b"abc", 500).len(), 64);
    }
}
