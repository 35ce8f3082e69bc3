use crate::debug::DebugSnapshot;
use crate::render::layouts::admin_layout;
use maud::{html, Markup};
use ridgeline_model::{Activity, Locale, Page, PageKind, Settings, SettingsSection};

pub fn login_page(error: Option<&str>) -> Markup {
    let content = html! {
        h1 { "Sign in" }
        @if let Some(error) = error {
            p class="notice error" role="alert" { (error) }
        }
        form method="post" action="/admin/login" {
            label { "Admin token" input type="password" name="token" required autocomplete="current-password"; }
            button type="submit" { "Sign in" }
        }
    };
    admin_layout("Sign in", content)
}

pub fn overview_page(
    activities: &[Activity],
    pages: &[Page],
    locales: &[Locale],
    default_locale: &Locale,
    inquiry_count: usize,
) -> Markup {
    let content = html! {
        h1 { "Content overview" }
        section {
            h2 { "Activities (" (activities.len()) ")" }
            table {
                thead { tr { th { "Slug" } th { "Title" } th { "Published" } th { "Featured" } th { "Updated" } } }
                tbody {
                    @for activity in activities {
                        tr {
                            td { code { (activity.slug.as_str()) } }
                            td {
                                @if let Some(t) = activity.translation(default_locale, default_locale) { (t.title) }
                            }
                            td { @if activity.published { "yes" } @else { "no" } }
                            td { @if activity.featured { "yes" } @else { "" } }
                            td { (activity.updated_at.format("%Y-%m-%d %H:%M").to_string()) }
                        }
                    }
                }
            }
        }
        section {
            h2 { "Pages" }
            table {
                thead {
                    tr {
                        th { "Page" }
                        @for locale in locales { th { (locale.as_str()) } }
                    }
                }
                tbody {
                    @for kind in PageKind::ALL {
                        tr {
                            td { (kind.as_str()) }
                            @for locale in locales {
                                td {
                                    @if let Some(page) = pages.iter().find(|p| p.kind == kind && &p.locale == locale) {
                                        a href=(kind.public_path(locale)) { (page.title) }
                                    } @else {
                                        span class="missing" { "missing" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        section {
            h2 { "Settings" }
            ul {
                @for section in SettingsSection::ALL {
                    li { a href=(format!("/admin/settings/{}", section.as_str())) { (section.as_str()) } }
                }
            }
        }
        p { "Inquiries received: " (inquiry_count) }
    };
    admin_layout("Overview", content)
}

/// One text input per allowed key of the section.
pub fn settings_form_page(settings: &Settings, saved: bool, error: Option<&str>) -> Markup {
    let section = settings.section;
    let content = html! {
        h1 { "Settings: " (section.as_str()) }
        @if saved {
            p class="notice success" role="status" { "Saved." }
        }
        @if let Some(error) = error {
            p class="notice error" role="alert" { (error) }
        }
        form method="post" action=(format!("/admin/settings/{}", section.as_str())) {
            @for key in section.allowed_keys() {
                label {
                    (key)
                    input type="text" name=(key) value=(settings.get(key).unwrap_or(""));
                }
            }
            button type="submit" { "Save" }
        }
    };
    admin_layout(&format!("Settings: {}", section.as_str()), content)
}

pub(crate) fn debug_page(snapshot: &DebugSnapshot) -> Markup {
    let w = &snapshot.writes;
    let content = html! {
        h1 { "Debug" }
        p { "Version " (snapshot.version) ", generated " (snapshot.generated_at.to_rfc3339()) }
        section {
            h2 { "Storage" }
            p { "Mode: " code { (snapshot.storage_mode.as_str()) } }
            table {
                thead { tr { th { "Backend" } th { "Healthy" } th { "Detail" } } }
                tbody {
                    @for h in &snapshot.backends {
                        tr {
                            td { (h.backend) }
                            td { @if h.healthy { "yes" } @else { strong { "no" } } }
                            td { (h.detail) }
                        }
                    }
                }
            }
            h3 { "Documents" }
            table {
                tbody {
                    @for (backend, counts) in &snapshot.document_counts {
                        tr {
                            th { (backend) }
                            @for (collection, n) in counts {
                                td { (collection.as_str()) ": " (n) }
                            }
                        }
                    }
                }
            }
            h3 { "Writes" }
            ul {
                li { "ok: " (w.writes_ok) }
                li { "degraded: " (w.writes_degraded) }
                li { "failed: " (w.writes_failed) }
                li { "db failures: " (w.db_failures) ", file failures: " (w.file_failures) }
                li { "read fallbacks: " (w.read_fallbacks) }
            }
            @if !w.recent_degraded.is_empty() {
                table class="degraded" {
                    thead { tr { th { "At" } th { "Operation" } th { "Document" } th { "Failed backend" } th { "Error" } } }
                    tbody {
                        @for d in w.recent_degraded.iter().rev() {
                            tr {
                                td { (d.at.to_rfc3339()) }
                                td { (d.operation) }
                                td { (d.collection.as_str()) "/" (d.id) }
                                td { (d.failed_backend) }
                                td { (d.error) }
                            }
                        }
                    }
                }
            }
        }
        section {
            h2 { "Drift" }
            @if let Some(drift) = &snapshot.drift {
                @if drift.is_clean() {
                    p { (drift.left) " and " (drift.right) " agree." }
                } @else {
                    p { (drift.drifted_count()) " documents differ between " (drift.left) " and " (drift.right) "." }
                    ul {
                        @for (collection, d) in &drift.collections {
                            @if !d.is_clean() {
                                li {
                                    (collection.as_str()) ": only in " (drift.left) " " (d.only_in_left.join(", "))
                                    "; only in " (drift.right) " " (d.only_in_right.join(", "))
                                    "; differing " (d.differing.join(", "))
                                }
                            }
                        }
                    }
                }
            }
            @if let Some(err) = &snapshot.drift_error {
                p class="notice error" { (err) }
            }
        }
        section {
            h2 { "Page cache" }
            p {
                (snapshot.cache.entries) " / " (snapshot.cache.max_entries) " entries, ttl "
                (snapshot.cache.ttl_secs) "s, hits " (snapshot.cache.hits) ", misses "
                (snapshot.cache.misses) ", invalidated " (snapshot.cache.invalidated)
            }
            @if !snapshot.cached_paths.is_empty() {
                ul { @for path in &snapshot.cached_paths { li { code { (path) } } } }
            }
        }
        section {
            h2 { "Uploads and limits" }
            p { "Upload backend: " code { (snapshot.upload_backend) } }
            p {
                "Rate-limit keys: contact " (snapshot.rate_limits.contact_tracked_keys)
                ", login " (snapshot.rate_limits.login_tracked_keys)
                @if let Some(redis) = &snapshot.rate_limits.redis {
                    ", redis fallbacks " (redis.fallbacks_total)
                }
            }
            p { "Requests served: " (snapshot.requests_total) }
        }
        section {
            h2 { "Configuration" }
            pre { (serde_json::to_string_pretty(&snapshot.config).unwrap_or_default()) }
        }
    };
    admin_layout("Debug", content)
}
