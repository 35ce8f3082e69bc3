// SPDX-License-Identifier: Apache-2.0

//! Image reference normalization.
//!
//! Content editors paste image references in many shapes: absolute URLs,
//! paths copied from a checkout (`public/images/x.jpg`, `.\images\x.jpg`),
//! bare file names, or provider handles such as `cloudinary:tours/rafting`.
//! Everything rendered on the site goes through [`normalize_image_path`] so
//! templates only ever see a URL or a rooted local path.

pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.jpg";

const CLOUDINARY_PREFIX: &str = "cloudinary:";
const R2_PREFIX: &str = "r2:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageHosts {
    pub cloudinary_cloud_name: Option<String>,
    pub r2_public_base_url: Option<String>,
}

#[must_use]
pub fn normalize_image_path(raw: &str, hosts: &ImageHosts) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
    {
        return trimmed.to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if let Some(public_id) = trimmed.strip_prefix(CLOUDINARY_PREFIX) {
        return match hosts.cloudinary_cloud_name.as_deref() {
            Some(cloud) if !cloud.is_empty() && !public_id.trim().is_empty() => format!(
                "https://res.cloudinary.com/{cloud}/image/upload/{}",
                public_id.trim().trim_start_matches('/')
            ),
            _ => PLACEHOLDER_IMAGE.to_string(),
        };
    }
    if let Some(key) = trimmed.strip_prefix(R2_PREFIX) {
        return match hosts.r2_public_base_url.as_deref() {
            Some(base) if !base.is_empty() && !key.trim().is_empty() => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                key.trim().trim_start_matches('/')
            ),
            _ => PLACEHOLDER_IMAGE.to_string(),
        };
    }
    normalize_local_path(trimmed)
}

fn normalize_local_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.iter().any(|s| *s == "..") {
        return PLACEHOLDER_IMAGE.to_string();
    }
    let skip = segments.iter().take_while(|s| **s == "public").count();
    let segments = &segments[skip..];
    match segments.len() {
        0 => PLACEHOLDER_IMAGE.to_string(),
        1 => format!("/images/{}", segments[0]),
        _ => format!("/{}", segments.join("/")),
    }
}
