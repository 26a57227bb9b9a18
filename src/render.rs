// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Rendering
//!
//! Turns one (page, build type) pair into a [`RenderedArtifact`]. Each call
//! is independent and owns its output buffer, so pairs render in parallel
//! and a failure affects only its own pair.
//!
//! - **HTML**: page and site variables are merged into the resolved template
//! - **JSON**: the page's front matter and converted content as an object
//! - **PDF**: the HTML rendering handed to a [`PdfBackend`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::build_type::BuildType;
use crate::content::{MarkdownConverter, Page};
use crate::core::error::RenderError;
use crate::core::logging::StdLogger;
use crate::core::traits::{BuildLogger, NoPdfBackend, PdfBackend};
use crate::frontmatter::PageFrontMatter;
use crate::generators::html::HtmlGenerator;
use crate::template::{Template, TemplateContent};
use crate::vars::{self, PageVars, SiteVars};

/// The output of one (page, build type) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// The source page.
    pub page: PathBuf,
    /// The format produced.
    pub build_type: BuildType,
    /// Destination, relative to the output folder.
    pub relative_path: PathBuf,
    /// The rendered bytes.
    pub bytes: Vec<u8>,
}

/// Output path of `page` for `build_type`, relative to the output folder.
///
/// The page's location below `content_root` is kept and its extension is
/// replaced by the build type's.
pub fn artifact_path(
    page: &Path,
    content_root: &Path,
    build_type: BuildType,
) -> PathBuf {
    let relative = page
        .strip_prefix(content_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| {
            page.file_name().map(PathBuf::from).unwrap_or_default()
        });
    relative.with_extension(build_type.extension())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonArtifact<'a> {
    front_matter: &'a PageFrontMatter,
    content: &'a str,
}

/// Renders pages against their bound templates.
#[derive(Debug, Clone)]
pub struct Renderer {
    content_root: PathBuf,
    html: HtmlGenerator,
    converter: MarkdownConverter,
    pdf_backend: Arc<dyn PdfBackend>,
    logger: Arc<dyn BuildLogger>,
}

impl Renderer {
    /// Creates a renderer for pages below `content_root`.
    pub fn new<P: Into<PathBuf>>(content_root: P) -> Self {
        Self {
            content_root: content_root.into(),
            html: HtmlGenerator::new(),
            converter: MarkdownConverter::default(),
            pdf_backend: Arc::new(NoPdfBackend),
            logger: Arc::new(StdLogger),
        }
    }

    /// Enables or disables HTML minification.
    pub fn with_minification(mut self, enable: bool) -> Self {
        self.html = self.html.with_minification(enable);
        self
    }

    /// Sets the PDF backend.
    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf_backend = backend;
        self
    }

    /// Sets the logger for merge warnings.
    pub fn with_logger(mut self, logger: Arc<dyn BuildLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Builds the page variables for `page`, converting its body to HTML.
    pub fn page_vars(&self, page: &Page, base_url: &str) -> PageVars {
        let html_path =
            artifact_path(page.path(), &self.content_root, BuildType::Html);
        PageVars::new(
            page,
            &html_path,
            page.html_content(&self.converter),
            base_url,
        )
    }

    /// Renders `page` as `build_type`.
    ///
    /// # Arguments
    ///
    /// * `page` - The page to render
    /// * `template` - The template the page is bound to
    /// * `build_type` - The format to produce
    /// * `site_vars` - Site-wide variables
    /// * `page_vars` - The page's variables, from [`Renderer::page_vars`]
    ///
    /// # Returns
    ///
    /// The artifact, or a `RenderError` for this pair only.
    pub fn render(
        &self,
        page: &Page,
        template: &Template,
        build_type: BuildType,
        site_vars: &SiteVars,
        page_vars: &PageVars,
    ) -> Result<RenderedArtifact, RenderError> {
        let bytes = match build_type {
            BuildType::Html => {
                let html = self.merge(page, template, site_vars, page_vars)?;
                self.html.finish(html, page.path())?.into_bytes()
            }
            BuildType::Json => self.render_json(page, page_vars)?,
            BuildType::Pdf => {
                let html = self.merge(page, template, site_vars, page_vars)?;
                self.pdf_backend.render_pdf(&html, page.path())?
            }
        };

        Ok(RenderedArtifact {
            page: page.path().to_path_buf(),
            build_type,
            relative_path: artifact_path(
                page.path(),
                &self.content_root,
                build_type,
            ),
            bytes,
        })
    }

    fn merge(
        &self,
        page: &Page,
        template: &Template,
        site_vars: &SiteVars,
        page_vars: &PageVars,
    ) -> Result<String, RenderError> {
        let content = template.content().ok_or_else(|| {
            RenderError::Unresolved {
                template_id: template.id().to_string(),
            }
        })?;

        if let TemplateContent::Unknown(_) = content {
            return Err(RenderError::UnsupportedMarkup {
                template_id: template.id().to_string(),
                markup: template.markup().to_string(),
            });
        }

        let context = vars::context(page_vars, site_vars).map_err(|source| {
            RenderError::Serialization {
                path: page.path().to_path_buf(),
                source,
            }
        })?;

        let merged = content.merge_data(&context);
        for reference in &merged.unbound {
            self.logger.warn(&format!(
                "Unbound variable `{}` in template `{}` for {}",
                reference,
                template.id(),
                page.path().display()
            ));
        }
        Ok(merged.output)
    }

    fn render_json(
        &self,
        page: &Page,
        page_vars: &PageVars,
    ) -> Result<Vec<u8>, RenderError> {
        let artifact = JsonArtifact {
            front_matter: page.front_matter(),
            content: &page_vars.content,
        };
        serde_json::to_vec_pretty(&artifact).map_err(|source| {
            RenderError::Serialization {
                path: page.path().to_path_buf(),
                source,
            }
        })
    }
}
