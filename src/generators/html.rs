// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # HTML Output
//!
//! Final processing of merged HTML before it is written: optional
//! minification with the `minify-html` crate.

use std::path::Path;

use minify_html::{minify, Cfg};

use crate::core::error::RenderError;

/// Post-processes rendered HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtmlGenerator {
    minify: bool,
}

impl HtmlGenerator {
    /// Creates a generator that leaves HTML untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables HTML minification.
    pub fn with_minification(mut self, enable: bool) -> Self {
        self.minify = enable;
        self
    }

    /// True if output is minified.
    pub fn minifies(&self) -> bool {
        self.minify
    }

    /// Applies the configured processing to the HTML of the page at `source`.
    pub fn finish(
        &self,
        html: String,
        source: &Path,
    ) -> Result<String, RenderError> {
        if self.minify {
            minify_html(&html, source)
        } else {
            Ok(html)
        }
    }
}

/// Minifies HTML content, CSS and JS included.
pub fn minify_html(content: &str, source: &Path) -> Result<String, RenderError> {
    let cfg = Cfg {
        minify_css: true,
        minify_js: true,
        ..Cfg::default()
    };
    String::from_utf8(minify(content.as_bytes(), &cfg)).map_err(|e| {
        RenderError::Minify {
            path: source.to_path_buf(),
            message: e.to_string(),
        }
    })
}
