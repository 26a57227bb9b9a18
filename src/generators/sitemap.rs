// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `sitemap.xml` generation.
//!
//! Every HTML page written by a build gets one `<url>` entry with a
//! `monthly` change frequency and a priority of `0.5`.

use chrono::{DateTime, NaiveDate};

use crate::vars::permalink;

/// File name of the sitemap inside the output folder.
pub const SITEMAP_FILE: &str = "sitemap.xml";

const CHANGE_FREQUENCY: &str = "monthly";
const PRIORITY: &str = "0.5";

/// One page listed in the sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Site-relative URL.
    pub url: String,
    /// Last modification time, seconds since the epoch.
    pub last_modified: Option<i64>,
}

/// Renders the sitemap for `entries`, sorted by URL.
pub fn generate(base_url: &str, entries: &[SitemapEntry]) -> String {
    let mut entries: Vec<&SitemapEntry> = entries.iter().collect();
    entries.sort_by(|a, b| a.url.cmp(&b.url));

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str("    <loc>");
        xml.push_str(&escape_xml(&permalink(base_url, &entry.url)));
        xml.push_str("</loc>\n");

        if let Some(date) = entry
            .last_modified
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            xml.push_str("    <lastmod>");
            xml.push_str(&date.format("%Y-%m-%d").to_string());
            xml.push_str("</lastmod>\n");
        }

        xml.push_str("    <changefreq>");
        xml.push_str(CHANGE_FREQUENCY);
        xml.push_str("</changefreq>\n");
        xml.push_str("    <priority>");
        xml.push_str(PRIORITY);
        xml.push_str("</priority>\n");
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Parses a front-matter date (RFC 3339 or `YYYY-MM-DD`) into epoch seconds.
pub fn date_to_epoch(date: &str) -> Option<i64> {
    let date = date.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(parsed.timestamp());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_entries() {
        let xml = generate(
            "https://example.com/",
            &[
                SitemapEntry {
                    url: "/posts/b.html".to_string(),
                    last_modified: None,
                },
                SitemapEntry {
                    url: "/a.html?x=1&y=2".to_string(),
                    last_modified: Some(86_400),
                },
            ],
        );

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains(
            "<loc>https://example.com/a.html?x=1&amp;y=2</loc>\n    <lastmod>1970-01-02</lastmod>"
        ));
        assert!(xml.contains(
            "<loc>https://example.com/posts/b.html</loc>\n    <changefreq>monthly</changefreq>"
        ));
        assert_eq!(xml.matches("<priority>0.5</priority>").count(), 2);
        assert!(xml.find("a.html").unwrap() < xml.find("b.html").unwrap());
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn test_date_to_epoch() {
        assert_eq!(date_to_epoch("1970-01-02"), Some(86_400));
        assert_eq!(date_to_epoch("1970-01-01T00:01:00Z"), Some(60));
        assert_eq!(date_to_epoch("last tuesday"), None);
        assert_eq!(date_to_epoch(""), None);
    }

    #[test]
    fn test_empty_sitemap() {
        let xml = generate("https://example.com", &[]);
        assert!(!xml.contains("<url>"));
    }
}
