// SPDX-License-Identifier: Apache-2.0

//! Markdown bodies of activities and pages.
//!
//! Tables and strikethrough are enabled, headings get `id` anchors, image
//! sources go through the same normalization as every other image on the
//! site, and raw HTML is escaped rather than passed through.

use pulldown_cmark::{html::push_html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ridgeline_core::{normalize_image_path, slugify, ImageHosts};

#[must_use]
pub fn render_markdown(content: &str, hosts: &ImageHosts) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: normalize_image_path(&dest_url, hosts).into(),
            title,
            id,
        }),
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let events = inject_heading_anchors(parser);
    let mut html = String::with_capacity(content.len() * 2);
    push_html(&mut html, events.into_iter());
    html
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Replace each heading's start tag with `<hN id="slug">`; h2 and deeper also
/// get a trailing `#` link.
fn inject_heading_anchors<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out: Vec<Event<'a>> = Vec::new();
    let mut in_heading: Option<HeadingLevel> = None;
    let mut heading_text = String::new();
    let mut buffered: Vec<Event<'a>> = Vec::new();

    for event in events {
        match &event {
            Event::Start(Tag::Heading { level, .. }) => {
                in_heading = Some(*level);
                heading_text.clear();
                buffered.clear();
                buffered.push(event);
            }
            Event::End(TagEnd::Heading(level)) if in_heading == Some(*level) => {
                let slug = slugify(&heading_text);
                let n = level_number(*level);
                if slug.is_empty() {
                    out.append(&mut buffered);
                    out.push(event);
                } else {
                    out.push(Event::Html(format!("<h{n} id=\"{slug}\">").into()));
                    out.extend(buffered.drain(..).skip(1));
                    if n >= 2 {
                        out.push(Event::Html(
                            format!(" <a class=\"anchor\" href=\"#{slug}\" aria-hidden=\"true\">#</a>")
                                .into(),
                        ));
                    }
                    out.push(Event::Html(format!("</h{n}>").into()));
                }
                in_heading = None;
            }
            Event::Text(text) | Event::Code(text) if in_heading.is_some() => {
                heading_text.push_str(text);
                buffered.push(event);
            }
            _ if in_heading.is_some() => buffered.push(event),
            _ => out.push(event),
        }
    }
    out
}
