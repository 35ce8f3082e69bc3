// SPDX-License-Identifier: Apache-2.0

//! Maud layouts wrapping public and admin pages.

use maud::{html, Markup, DOCTYPE};
use ridgeline_core::{normalize_image_path, ImageHosts};
use ridgeline_model::{ui_labels, Locale, Settings, SettingsSection, UiLabels};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a public page needs besides its own content: locale, the
/// settings sections shown in header and footer, and where we are so the
/// language switcher can link to the same page in another locale.
#[derive(Debug, Clone)]
pub struct SiteChrome {
    pub locale: Locale,
    pub default_locale: Locale,
    pub supported: Vec<Locale>,
    pub site_name: String,
    pub site: Settings,
    pub contact: Settings,
    pub social: Settings,
    pub hosts: ImageHosts,
    /// Path after `/<locale>`, e.g. `/activities`.
    pub path_suffix: String,
}

impl SiteChrome {
    #[must_use]
    pub fn labels(&self) -> &'static UiLabels {
        ui_labels(&self.locale)
    }

    #[must_use]
    pub fn site_name(&self) -> &str {
        self.site.get("site_name").unwrap_or(&self.site_name)
    }

    #[must_use]
    pub fn image(&self, raw: &str) -> String {
        normalize_image_path(raw, &self.hosts)
    }

    #[must_use]
    pub fn href(&self, suffix: &str) -> String {
        format!("/{}{suffix}", self.locale)
    }
}

pub fn public_layout(chrome: &SiteChrome, title: &str, description: &str, content: Markup) -> Markup {
    let labels = chrome.labels();
    let site_name = chrome.site_name();
    let og_image = chrome.site.get("og_image").map(|img| chrome.image(img));
    html! {
        (DOCTYPE)
        html lang=(chrome.locale.as_str()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="generator" content=(format!("ridgeline v{VERSION}"));
                @if !description.is_empty() {
                    meta name="description" content=(description);
                }
                @if let Some(img) = &og_image {
                    meta property="og:image" content=(img);
                }
                @for alt in &chrome.supported {
                    link rel="alternate" hreflang=(alt.as_str()) href=(format!("/{alt}{}", chrome.path_suffix));
                }
                title {
                    @if title.is_empty() || title == site_name { (site_name) } @else { (title) " | " (site_name) }
                }
                link rel="stylesheet" href="/assets/site.css";
            }
            body {
                header class="site-header" {
                    a class="brand" href=(chrome.href("")) {
                        @if let Some(logo) = chrome.site.get("logo") {
                            img src=(chrome.image(logo)) alt=(site_name);
                        } @else {
                            (site_name)
                        }
                    }
                    nav {
                        a href=(chrome.href("")) { (labels.nav_home) }
                        a href=(chrome.href("/activities")) { (labels.nav_activities) }
                        a href=(chrome.href("/about")) { (labels.nav_about) }
                        a href=(chrome.href("/contact")) { (labels.nav_contact) }
                    }
                    @if chrome.supported.len() > 1 {
                        nav class="locales" aria-label=(labels.language) {
                            @for alt in &chrome.supported {
                                @if *alt == chrome.locale {
                                    span class="current" { (alt.as_str()) }
                                } @else {
                                    a href=(format!("/{alt}{}", chrome.path_suffix)) hreflang=(alt.as_str()) { (alt.as_str()) }
                                }
                            }
                        }
                    }
                }
                main { (content) }
                (footer(chrome))
            }
        }
    }
}

fn footer(chrome: &SiteChrome) -> Markup {
    html! {
        footer class="site-footer" {
            @if let Some(tagline) = chrome.site.get("tagline") {
                p class="tagline" { (tagline) }
            }
            ul class="contact" {
                @if let Some(email) = chrome.contact.get("email") {
                    li { a href=(format!("mailto:{email}")) { (email) } }
                }
                @if let Some(phone) = chrome.contact.get("phone") {
                    li { (phone) }
                }
                @if let Some(address) = chrome.contact.get("address") {
                    li { (address) }
                }
            }
            @if !chrome.social.values.is_empty() {
                ul class="social" {
                    @for (network, url) in &chrome.social.values {
                        li { a href=(url) rel="noopener" { (network) } }
                    }
                }
            }
            @if let Some(note) = chrome.site.get("footer_note") {
                p class="note" { (note) }
            }
        }
    }
}

/// Admin pages: no locale, no caching, minimal chrome.
pub fn admin_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="robots" content="noindex";
                title { (title) " | ridgeline admin" }
            }
            body class="admin" {
                header {
                    nav {
                        a href="/admin" { "Overview" }
                        @for section in SettingsSection::ALL {
                            a href=(format!("/admin/settings/{}", section.as_str())) { "Settings: " (section.as_str()) }
                        }
                        a href="/admin/debug" { "Debug" }
                    }
                }
                main { (content) }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn chrome(locale: &str) -> SiteChrome {
        let mut site = Settings::empty(SettingsSection::Site);
        site.values
            .insert("site_name".to_string(), "Ridgeline".to_string());
        let mut social = Settings::empty(SettingsSection::Social);
        social
            .values
            .insert("instagram".to_string(), "https://instagram.com/ridgeline".to_string());
        SiteChrome {
            locale: Locale::parse(locale).expect("locale"),
            default_locale: Locale::parse("es").expect("es"),
            supported: vec![
                Locale::parse("es").expect("es"),
                Locale::parse("en").expect("en"),
            ],
            site_name: "fallback".to_string(),
            site,
            contact: Settings::empty(SettingsSection::Contact),
            social,
            hosts: ImageHosts::default(),
            path_suffix: "/about".to_string(),
        }
    }

    #[test]
    fn public_layout_links_alternate_locales() {
        let html = public_layout(&chrome("en"), "About", "Who we are", html! { p { "hi" } })
            .into_string();
        assert!(html.contains("<html lang=\"en\">"));
        assert!(html.contains("About | Ridgeline"));
        assert!(html.contains("hreflang=\"es\" href=\"/es/about\""));
        assert!(html.contains("href=\"/en/activities\">Activities</a>"));
        assert!(html.contains("https://instagram.com/ridgeline"));
    }

    #[test]
    fn labels_follow_locale() {
        let html = public_layout(&chrome("es"), "", "", html! {}).into_string();
        assert!(html.contains(">Actividades</a>"));
        assert!(html.contains("<title>Ridgeline</title>"));
    }
}
