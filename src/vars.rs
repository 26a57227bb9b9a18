// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Variables merged into templates.
//!
//! Templates see a single object with two members:
//!
//! ```json
//! { "page": { "title": "...", "content": "..." }, "site": { "title": "..." } }
//! ```
//!
//! so `{{ page.title }}` and `{{ site.baseUrl }}` address these fields.

use std::path::{Component, Path};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::content::Page;
use crate::core::config::{Author, SiteConfig};

/// A link to another page of the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    /// Page title.
    pub title: String,
    /// Short title, falling back to the title.
    pub link_title: String,
    /// Site-relative URL.
    pub url: String,
}

/// Site-wide variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteVars {
    /// Base URL the site is published under.
    pub base_url: String,
    /// Site title.
    pub title: String,
    /// The site author.
    pub author: Author,
    /// True when drafts are part of this build.
    pub build_drafts: bool,
    /// Every page of this build, ordered by URL.
    pub pages: Vec<PageLink>,
    /// The root index page, when there is one.
    pub home: Option<PageLink>,
}

impl SiteVars {
    /// Builds the site variables for a set of pages.
    pub fn new(config: &SiteConfig, mut pages: Vec<PageLink>) -> Self {
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        let home = pages
            .iter()
            .find(|link| is_home_url(&link.url))
            .cloned();

        Self {
            base_url: config.base_url.clone(),
            title: config.title.clone(),
            author: config.author.clone(),
            build_drafts: config.build.drafts,
            pages,
            home,
        }
    }
}

/// Per-page variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVars {
    /// Page title.
    pub title: String,
    /// Short title, falling back to the title.
    pub link_title: String,
    /// Date as written in the front matter.
    pub date: String,
    /// Summary, if any.
    pub summary: String,
    /// Series name, if any.
    pub series: String,
    /// Body converted to HTML.
    pub content: String,
    /// Body as written.
    pub raw_content: String,
    /// Site-relative URL.
    pub url: String,
    /// Absolute URL, when the site has a base URL.
    pub permalink: String,
    /// True for the root index page.
    pub is_home_page: bool,
}

impl PageVars {
    /// Builds the variables for `page`.
    ///
    /// # Arguments
    ///
    /// * `page` - The page being rendered
    /// * `html_path` - The page's HTML output path, relative to the output folder
    /// * `content` - The body already converted to HTML
    /// * `base_url` - The site's base URL, possibly empty
    pub fn new(
        page: &Page,
        html_path: &Path,
        content: String,
        base_url: &str,
    ) -> Self {
        let fm = page.front_matter();
        let url = fm.url.clone().unwrap_or_else(|| url_for(html_path));

        Self {
            title: fm.title.clone(),
            link_title: fm.link_title.clone().unwrap_or_else(|| fm.title.clone()),
            date: fm.date.clone(),
            summary: fm.summary.clone().unwrap_or_default(),
            series: fm.series.clone().unwrap_or_default(),
            content,
            raw_content: page.content().to_string(),
            permalink: permalink(base_url, &url),
            is_home_page: is_home_url(&url),
            url,
        }
    }

    /// The link other pages use to point here.
    pub fn link(&self) -> PageLink {
        PageLink {
            title: self.title.clone(),
            link_title: self.link_title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Builds the object templates are merged with.
pub fn context(
    page: &PageVars,
    site: &SiteVars,
) -> Result<JsonValue, serde_json::Error> {
    Ok(json!({
        "page": serde_json::to_value(page)?,
        "site": serde_json::to_value(site)?,
    }))
}

/// Site-relative URL of an output file, always with forward slashes.
pub fn url_for(relative: &Path) -> String {
    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Joins `base_url` and a site-relative URL. Empty when there is no base.
pub fn permalink(base_url: &str, url: &str) -> String {
    if base_url.is_empty() {
        return String::new();
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

fn is_home_url(url: &str) -> bool {
    matches!(url, "/" | "/index.html" | "/index.htm")
}
