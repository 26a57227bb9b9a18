// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Pages
//!
//! A [`Page`] is one content file: its absolute path, its parsed front
//! matter and the raw body text that follows the closing delimiter.
//!
//! Bodies are turned into HTML by a [`MarkdownConverter`] when a page is
//! rendered:
//!
//! - Markdown is converted with `pulldown-cmark`
//! - HTML passes through unchanged
//! - reStructuredText is escaped into a `<pre>` block

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pulldown_cmark::{html, Options as MarkdownOptions, Parser};

use crate::core::error::FrontMatterError;
use crate::document::escape_text;
use crate::frontmatter::{self, PageFrontMatter, PageMarkup};

/// A parsed content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    path: PathBuf,
    front_matter: PageFrontMatter,
    content: String,
}

impl Page {
    /// Creates a page from already-parsed parts.
    pub fn new(
        path: PathBuf,
        front_matter: PageFrontMatter,
        content: String,
    ) -> Self {
        Self {
            path,
            front_matter,
            content,
        }
    }

    /// Parses a page from the full text of its file.
    ///
    /// # Returns
    ///
    /// The page, plus a warning when the front matter was malformed.
    pub fn parse(
        path: PathBuf,
        text: &str,
    ) -> (Self, Option<FrontMatterError>) {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let lines: Vec<&str> = text.lines().collect();
        let parsed = frontmatter::parse(&path, &lines);
        let content = lines
            .get(parsed.body_start..)
            .map(|body| body.join("\n"))
            .unwrap_or_default();

        (
            Self::new(path, parsed.front_matter, content),
            parsed.warning,
        )
    }

    /// Reads and parses the page file at `path`.
    pub fn load(path: &Path) -> io::Result<(Self, Option<FrontMatterError>)> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(path.to_path_buf(), &text))
    }

    /// Absolute path of the page file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The page's metadata.
    pub fn front_matter(&self) -> &PageFrontMatter {
        &self.front_matter
    }

    /// The raw body text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Converts the body to HTML according to the page's markup.
    pub fn html_content(&self, converter: &MarkdownConverter) -> String {
        match self.front_matter.markup {
            PageMarkup::Html => self.content.clone(),
            PageMarkup::Markdown => converter.to_html(&self.content),
            PageMarkup::Restructured => {
                format!("<pre>{}</pre>", escape_text(&self.content))
            }
        }
    }
}

/// Markdown to HTML conversion with configurable extensions.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownConverter {
    options: MarkdownOptions,
}

impl MarkdownConverter {
    /// Creates a converter with no extensions enabled.
    pub fn new() -> Self {
        Self {
            options: MarkdownOptions::empty(),
        }
    }

    /// Enables or disables tables.
    pub fn with_tables(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_TABLES, enable);
        self
    }

    /// Enables or disables strikethrough.
    pub fn with_strikethrough(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_STRIKETHROUGH, enable);
        self
    }

    /// Enables or disables footnotes.
    pub fn with_footnotes(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_FOOTNOTES, enable);
        self
    }

    /// Enables or disables task lists.
    pub fn with_tasklists(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_TASKLISTS, enable);
        self
    }

    /// Converts Markdown text to an HTML fragment.
    pub fn to_html(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}

impl Default for MarkdownConverter {
    /// Tables, strikethrough, footnotes and task lists enabled.
    fn default() -> Self {
        Self::new()
            .with_tables(true)
            .with_strikethrough(true)
            .with_footnotes(true)
            .with_tasklists(true)
    }
}
