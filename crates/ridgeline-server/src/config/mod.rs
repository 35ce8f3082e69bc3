use ridgeline_core::ImageHosts;
use ridgeline_model::{Locale, LocaleSet};
use ridgeline_store::StorageMode;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 5.0,
            refill_per_sec: 0.1,
        }
    }
}

/// Where uploaded images end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadBackendConfig {
    Local {
        public_root: PathBuf,
    },
    Cloudinary {
        cloud_name: String,
        api_key: String,
        api_secret: String,
        /// Overridable so tests can point at a fake server.
        api_base_url: String,
        default_folder: String,
    },
    R2 {
        account_id: String,
        access_key_id: String,
        secret_access_key: String,
        bucket: String,
        public_base_url: String,
    },
}

impl UploadBackendConfig {
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Cloudinary { .. } => "cloudinary",
            Self::R2 { .. } => "r2",
        }
    }

    fn redacted(&self) -> Value {
        match self {
            Self::Local { public_root } => json!({
                "backend": "local",
                "public_root": public_root.display().to_string(),
            }),
            Self::Cloudinary {
                cloud_name,
                api_base_url,
                default_folder,
                ..
            } => json!({
                "backend": "cloudinary",
                "cloud_name": cloud_name,
                "api_key": REDACTED,
                "api_secret": REDACTED,
                "api_base_url": api_base_url,
                "default_folder": default_folder,
            }),
            Self::R2 {
                account_id,
                bucket,
                public_base_url,
                ..
            } => json!({
                "backend": "r2",
                "account_id": account_id,
                "access_key_id": REDACTED,
                "secret_access_key": REDACTED,
                "bucket": bucket,
                "public_base_url": public_base_url,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub bind_addr: String,
    pub site_name: String,
    pub locales: LocaleSet,
    pub content_root: PathBuf,
    pub db_path: PathBuf,
    pub storage_mode: StorageMode,
    /// Static files (`/images`, `/uploads`) are served from here.
    pub public_root: PathBuf,
    pub admin_tokens: Vec<String>,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub revalidate_secret: Option<String>,
    pub enable_debug_dashboard: bool,
    pub page_cache_ttl: Duration,
    pub page_cache_max_entries: usize,
    pub max_body_bytes: usize,
    pub max_upload_bytes: usize,
    pub upload: UploadBackendConfig,
    pub image_hosts: ImageHosts,
    pub contact_rate_limit: RateLimitConfig,
    pub login_rate_limit: RateLimitConfig,
    /// Key rate limits by `X-Forwarded-For` instead of the socket peer.
    /// Only safe when a reverse proxy overwrites that header.
    pub trust_proxy: bool,
    pub redis_url: Option<String>,
    pub redis_prefix: String,
    pub redis_timeout_ms: u64,
    pub enable_response_compression: bool,
    pub compression_min_bytes: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            site_name: "Ridgeline Adventures".to_string(),
            locales: LocaleSet::default(),
            content_root: PathBuf::from("content"),
            db_path: PathBuf::from("data/ridgeline.sqlite"),
            storage_mode: StorageMode::Dual,
            public_root: PathBuf::from("public"),
            admin_tokens: Vec::new(),
            session_secret: String::new(),
            session_ttl: Duration::from_secs(12 * 3600),
            revalidate_secret: None,
            enable_debug_dashboard: false,
            page_cache_ttl: Duration::from_secs(300),
            page_cache_max_entries: 512,
            max_body_bytes: 64 * 1024,
            max_upload_bytes: 8 * 1024 * 1024,
            upload: UploadBackendConfig::Local {
                public_root: PathBuf::from("public"),
            },
            image_hosts: ImageHosts::default(),
            contact_rate_limit: RateLimitConfig::default(),
            login_rate_limit: RateLimitConfig {
                capacity: 10.0,
                refill_per_sec: 0.2,
            },
            trust_proxy: false,
            redis_url: None,
            redis_prefix: "ridgeline".to_string(),
            redis_timeout_ms: 50,
            enable_response_compression: true,
            compression_min_bytes: 1024,
        }
    }
}

impl SiteConfig {
    #[must_use]
    pub fn default_locale(&self) -> &Locale {
        self.locales.default_locale()
    }

    /// Configuration as shown on the debug dashboard, secrets masked.
    #[must_use]
    pub fn redacted(&self) -> Value {
        json!({
            "schema_version": CONFIG_SCHEMA_VERSION,
            "bind_addr": self.bind_addr,
            "site_name": self.site_name,
            "default_locale": self.default_locale().as_str(),
            "supported_locales": self.locales.supported().iter().map(Locale::as_str).collect::<Vec<_>>(),
            "content_root": self.content_root.display().to_string(),
            "db_path": self.db_path.display().to_string(),
            "storage_mode": self.storage_mode.as_str(),
            "public_root": self.public_root.display().to_string(),
            "admin_tokens": format!("{} configured", self.admin_tokens.len()),
            "session_secret": REDACTED,
            "session_ttl_secs": self.session_ttl.as_secs(),
            "revalidate_secret": self.revalidate_secret.as_ref().map(|_| REDACTED),
            "enable_debug_dashboard": self.enable_debug_dashboard,
            "page_cache_ttl_secs": self.page_cache_ttl.as_secs(),
            "page_cache_max_entries": self.page_cache_max_entries,
            "max_body_bytes": self.max_body_bytes,
            "max_upload_bytes": self.max_upload_bytes,
            "upload": self.upload.redacted(),
            "contact_rate_limit": self.contact_rate_limit,
            "login_rate_limit": self.login_rate_limit,
            "trust_proxy": self.trust_proxy,
            "redis": self.redis_url.as_ref().map(|_| REDACTED),
            "enable_response_compression": self.enable_response_compression,
        })
    }
}

pub fn validate_startup_config(cfg: &SiteConfig) -> Result<(), String> {
    if cfg.admin_tokens.iter().all(|t| t.trim().is_empty()) {
        return Err("at least one non-empty admin token is required".to_string());
    }
    if cfg.session_secret.len() < 16 {
        return Err("session secret must be at least 16 bytes".to_string());
    }
    if !cfg.locales.supported().contains(cfg.default_locale()) {
        return Err("default locale must be one of the supported locales".to_string());
    }
    if cfg.max_body_bytes == 0 || cfg.max_upload_bytes == 0 {
        return Err("body and upload limits must be > 0".to_string());
    }
    if cfg.page_cache_max_entries == 0 || cfg.page_cache_ttl.is_zero() {
        return Err("page cache limits must be > 0".to_string());
    }
    if cfg.contact_rate_limit.capacity < 1.0 || cfg.login_rate_limit.capacity < 1.0 {
        return Err("rate limit capacity must be >= 1".to_string());
    }
    if cfg
        .revalidate_secret
        .as_deref()
        .is_some_and(|s| s.trim().is_empty())
    {
        return Err("revalidate secret, when set, must be non-empty".to_string());
    }
    match &cfg.upload {
        UploadBackendConfig::Local { .. } => {}
        UploadBackendConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
            ..
        } => {
            if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
                return Err(
                    "cloudinary uploads require cloud name, api key and api secret".to_string(),
                );
            }
        }
        UploadBackendConfig::R2 {
            account_id,
            access_key_id,
            secret_access_key,
            bucket,
            public_base_url,
        } => {
            if [account_id, access_key_id, secret_access_key, bucket, public_base_url]
                .iter()
                .any(|v| v.is_empty())
            {
                return Err(
                    "r2 uploads require account id, credentials, bucket and public base url"
                        .to_string(),
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SiteConfig {
        SiteConfig {
            admin_tokens: vec!["token-1".to_string()],
            session_secret: "0123456789abcdef0123".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn default_config_needs_credentials() {
        let err = validate_startup_config(&SiteConfig::default()).expect_err("no tokens");
        assert!(err.contains("admin token"));
        validate_startup_config(&valid()).expect("valid");
    }

    #[test]
    fn upload_backends_require_credentials() {
        let cfg = SiteConfig {
            upload: UploadBackendConfig::R2 {
                account_id: "acct".to_string(),
                access_key_id: String::new(),
                secret_access_key: "s".to_string(),
                bucket: "media".to_string(),
                public_base_url: "https://media.example.com".to_string(),
            },
            ..valid()
        };
        assert!(validate_startup_config(&cfg).is_err());
    }

    #[test]
    fn redacted_view_hides_secrets() {
        let cfg = SiteConfig {
            upload: UploadBackendConfig::Cloudinary {
                cloud_name: "demo".to_string(),
                api_key: "key-123".to_string(),
                api_secret: "shh".to_string(),
                api_base_url: "https://api.cloudinary.com".to_string(),
                default_folder: "ridgeline".to_string(),
            },
            ..valid()
        };
        let text = cfg.redacted().to_string();
        assert!(!text.contains("shh"));
        assert!(!text.contains("key-123"));
        assert!(!text.contains("token-1"));
        assert!(text.contains("\"cloud_name\":\"demo\""));
    }
}
