// SPDX-License-Identifier: Apache-2.0

//! HTML rendering with maud.

pub mod admin;
pub mod layouts;
pub mod markdown;
pub mod pages;

pub use layouts::{admin_layout, public_layout, SiteChrome};
pub use markdown::render_markdown;
pub use pages::ContactFormView;
