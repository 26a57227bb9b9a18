// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Shire Library
//!
//! Shire builds a static site from a folder of content pages and a set of
//! templates. Pages carry a front-matter block in JSON, YAML or TOML;
//! templates are HTML documents assembled from `<shire:include>` directives.
//! Each page is bound to one template and rendered to HTML, JSON or PDF.
//!
//! The entry point is [`build::BuildOrchestrator`].

#![doc = include_str!("../README.md")]
#![crate_name = "shire"]
#![crate_type = "lib"]

/// Module containing core utilities: configuration, errors, logging and the
/// pipeline's trait seams.
pub mod core;

/// Page to template binding.
pub mod binder;

/// The build orchestrator and its report.
pub mod build;

/// Output formats and their selection.
pub mod build_type;

/// Provides command-line interface utilities.
pub mod cli;

/// Content pages and Markdown conversion.
pub mod content;

/// A small HTML document tree.
pub mod document;

/// File discovery.
pub mod fs;

/// Front-matter parsing.
pub mod frontmatter;

/// Provides output generation utilities.
pub mod generators;

/// Rendering of (page, build type) pairs.
pub mod render;

/// Site scanning and parsing stages.
pub mod site;

/// Template loading and include resolution.
pub mod template;

/// Variables merged into templates.
pub mod vars;

pub use crate::build::{BuildOrchestrator, BuildReport, BuildStage};
pub use crate::build_type::BuildType;
pub use crate::content::Page;
pub use crate::core::config::{ConfigLoader, SiteConfig};
pub use crate::core::error::{ErrorKind, ReportedError, Result, ShireError};
pub use crate::core::traits::{ArtifactSink, BuildLogger, PdfBackend};
pub use crate::frontmatter::PageFrontMatter;
pub use crate::template::Template;
