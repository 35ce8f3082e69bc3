use crate::render::layouts::{public_layout, SiteChrome};
use crate::render::markdown::render_markdown;
use maud::{html, Markup, PreEscaped};
use ridgeline_api::InquirySubmission;
use ridgeline_model::{Activity, ActivityTranslation, Page};

/// State of the contact form between a failed POST and its re-render.
#[derive(Debug, Clone, Default)]
pub struct ContactFormView {
    pub values: InquirySubmission,
    pub error: Option<String>,
    pub sent: bool,
}

fn markdown(chrome: &SiteChrome, body: &str) -> Markup {
    PreEscaped(render_markdown(body, &chrome.hosts))
}

fn translation<'a>(chrome: &SiteChrome, activity: &'a Activity) -> Option<&'a ActivityTranslation> {
    activity.translation(&chrome.locale, &chrome.default_locale)
}

fn hero(chrome: &SiteChrome, page: &Page) -> Markup {
    html! {
        section class="hero" {
            @if !page.hero_image.is_empty() {
                img class="hero-image" src=(chrome.image(&page.hero_image)) alt=(page.title);
            }
            h1 { (page.title) }
            @if !page.subtitle.is_empty() {
                p class="subtitle" { (page.subtitle) }
            }
        }
    }
}

fn activity_card(chrome: &SiteChrome, activity: &Activity) -> Markup {
    let labels = chrome.labels();
    let Some(t) = translation(chrome, activity) else {
        return html! {};
    };
    html! {
        article class="activity-card" {
            a href=(chrome.href(&format!("/activities/{}", activity.slug))) {
                img src=(chrome.image(&activity.cover_image)) alt=(t.title) loading="lazy";
                h3 { (t.title) }
            }
            @if !t.summary.is_empty() {
                p { (t.summary) }
            }
            ul class="facts" {
                li { (labels.difficulty) ": " (labels.difficulty_label(activity.difficulty)) }
                li { (labels.duration) ": " (activity.duration_label()) }
                @if let Some(price) = &activity.price {
                    li { (labels.price) ": " (price.display()) }
                }
            }
            a class="more" href=(chrome.href(&format!("/activities/{}", activity.slug))) { (labels.view_details) }
        }
    }
}

fn activity_grid(chrome: &SiteChrome, activities: &[Activity]) -> Markup {
    html! {
        @if activities.is_empty() {
            p class="empty" { (chrome.labels().no_activities) }
        } @else {
            div class="activity-grid" {
                @for activity in activities { (activity_card(chrome, activity)) }
            }
        }
    }
}

pub fn home_page(chrome: &SiteChrome, page: Option<&Page>, featured: &[Activity]) -> Markup {
    let labels = chrome.labels();
    let title = page.map_or_else(|| chrome.site_name().to_string(), |p| p.title.clone());
    let description = page.map_or("", |p| p.meta_description.as_str());
    let content = html! {
        @if let Some(page) = page {
            (hero(chrome, page))
            div class="page-body" { (markdown(chrome, &page.body)) }
        } @else {
            section class="hero" { h1 { (chrome.site_name()) } }
        }
        section class="featured" {
            h2 { (labels.featured_heading) }
            (activity_grid(chrome, featured))
        }
    };
    public_layout(chrome, &title, description, content)
}

pub fn activities_page(chrome: &SiteChrome, activities: &[Activity]) -> Markup {
    let labels = chrome.labels();
    let content = html! {
        h1 { (labels.activities_heading) }
        (activity_grid(chrome, activities))
    };
    public_layout(chrome, labels.activities_heading, "", content)
}

pub fn activity_page(chrome: &SiteChrome, activity: &Activity) -> Markup {
    let labels = chrome.labels();
    let Some(t) = translation(chrome, activity) else {
        return not_found_page(chrome);
    };
    let content = html! {
        article class="activity" {
            img class="cover" src=(chrome.image(&activity.cover_image)) alt=(t.title);
            h1 { (t.title) }
            @if !t.summary.is_empty() {
                p class="summary" { (t.summary) }
            }
            dl class="facts" {
                dt { (labels.difficulty) } dd { (labels.difficulty_label(activity.difficulty)) }
                dt { (labels.duration) } dd { (activity.duration_label()) }
                @if let Some(price) = &activity.price {
                    dt { (labels.price) } dd { (price.display()) }
                }
                @if let Some(age) = activity.min_age {
                    dt { (labels.min_age) } dd { (age) }
                }
                @if let Some(size) = activity.max_group_size {
                    dt { (labels.group_size) } dd { (size) }
                }
            }
            div class="body" { (markdown(chrome, &t.body)) }
            @if !t.highlights.is_empty() {
                h2 { (labels.highlights) }
                ul { @for h in &t.highlights { li { (h) } } }
            }
            @if !t.includes.is_empty() {
                h2 { (labels.includes) }
                ul { @for i in &t.includes { li { (i) } } }
            }
            @if !activity.gallery.is_empty() {
                div class="gallery" {
                    @for img in &activity.gallery {
                        img src=(chrome.image(img)) alt=(t.title) loading="lazy";
                    }
                }
            }
            a class="cta" href=(format!("{}?activity={}", chrome.href("/contact"), activity.slug)) { (labels.book_now) }
        }
    };
    public_layout(chrome, &t.title, &t.summary, content)
}

/// About and other prose pages.
pub fn text_page(chrome: &SiteChrome, page: Option<&Page>, fallback_title: &str) -> Markup {
    match page {
        Some(page) => {
            let content = html! {
                (hero(chrome, page))
                div class="page-body" { (markdown(chrome, &page.body)) }
            };
            public_layout(chrome, &page.title, &page.meta_description, content)
        }
        None => public_layout(chrome, fallback_title, "", html! { h1 { (fallback_title) } }),
    }
}

pub fn contact_page(
    chrome: &SiteChrome,
    page: Option<&Page>,
    activities: &[Activity],
    form: &ContactFormView,
) -> Markup {
    let labels = chrome.labels();
    let title = page.map_or(labels.nav_contact, |p| p.title.as_str());
    let selected = form.values.activity.as_deref().unwrap_or("");
    let content = html! {
        @if let Some(page) = page {
            (hero(chrome, page))
            div class="page-body" { (markdown(chrome, &page.body)) }
        } @else {
            h1 { (title) }
        }
        @if form.sent {
            p class="notice success" role="status" { (labels.form_sent) }
        }
        @if let Some(error) = &form.error {
            p class="notice error" role="alert" { (error) }
        }
        form method="post" action=(chrome.href("/contact")) class="contact-form" {
            label { (labels.form_name) input type="text" name="name" required value=(form.values.name); }
            label { (labels.form_email) input type="email" name="email" required value=(form.values.email); }
            label { (labels.form_phone) input type="tel" name="phone" value=(form.values.phone); }
            label {
                (labels.form_activity)
                select name="activity" {
                    option value="" { "-" }
                    @for activity in activities {
                        @if let Some(t) = translation(chrome, activity) {
                            option value=(activity.slug.as_str()) selected[selected == activity.slug.as_str()] { (t.title) }
                        }
                    }
                }
            }
            label { (labels.form_message) textarea name="message" required rows="6" { (form.values.message) } }
            div class="hp" aria-hidden="true" {
                input type="text" name="website" tabindex="-1" autocomplete="off";
            }
            button type="submit" { (labels.form_submit) }
        }
    };
    let description = page.map_or("", |p| p.meta_description.as_str());
    public_layout(chrome, title, description, content)
}

pub fn not_found_page(chrome: &SiteChrome) -> Markup {
    let labels = chrome.labels();
    let content = html! {
        section class="not-found" {
            h1 { (labels.not_found) }
            p { a href=(chrome.href("")) { (labels.nav_home) } }
        }
    };
    public_layout(chrome, labels.not_found, "", content)
}
