// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for Shire
//!
//! This module defines the error types used across the build pipeline. The
//! `thiserror` crate is used to derive `Display` and `Error` so every failure
//! carries the path or identifier it relates to.
//!
//! Errors fall in two groups:
//!
//! - [`ShireError`] is returned from operations that abort the whole build
//!   (configuration problems, an unreadable content root or template folder).
//! - The component errors ([`FrontMatterError`], [`ResolutionError`],
//!   [`BindError`], [`RenderError`]) are recoverable. The orchestrator records
//!   them in the build report and moves on to the next page or format.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::build_type::BuildType;

/// A unified result type for fatal Shire operations.
pub type Result<T> = std::result::Result<T, ShireError>;

/// Classification of every error the build can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Missing or malformed configuration.
    Config,
    /// Filesystem failures.
    Io,
    /// Malformed front matter.
    Parse,
    /// Template include resolution failures, cycles included.
    Resolution,
    /// A page could not be bound to a template.
    Bind,
    /// A single (page, format) render failed.
    Render,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Parse => "parse",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Bind => "bind",
            ErrorKind::Render => "render",
        };
        f.write_str(name)
    }
}

/// A recoverable error recorded in the build report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportedError {
    /// Classification.
    pub kind: ErrorKind,
    /// The page, template or file the error is about.
    pub subject: String,
    /// Human-readable description.
    pub message: String,
}

impl ReportedError {
    /// Creates a reported error.
    pub fn new<S, M>(kind: ErrorKind, subject: S, message: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// The fatal error type for Shire.
///
/// Only configuration and I/O failures that make every later stage
/// meaningless end up here.
#[derive(Error, Debug)]
pub enum ShireError {
    /// Error related to loading or validating the site configuration.
    #[error("Configuration error: {message}.")]
    ConfigError {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the configuration file that caused the error.
        path: Option<PathBuf>,
    },

    /// IO error encountered while reading a folder the build depends on.
    #[error("File IO error at `{path:?}`: {source}")]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// General internal error, such as a worker pool that failed to start.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ShireError {
    /// Converts a standard IO error into a `ShireError::IOError` with an empty path.
    fn from(source: std::io::Error) -> Self {
        ShireError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl ShireError {
    /// Creates a `ConfigError` with a specific message.
    ///
    /// # Parameters
    /// - `message`: A description of the configuration error.
    /// - `path`: Optional path of the configuration file causing the error.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        ShireError::ConfigError {
            message: message.into(),
            path,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        ShireError::IOError { path, source }
    }

    /// Creates a general internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        ShireError::InternalError(message.into())
    }

    /// Returns the report classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShireError::ConfigError { .. } => ErrorKind::Config,
            ShireError::IOError { .. } | ShireError::InternalError(_) => {
                ErrorKind::Io
            }
        }
    }
}

/// A front-matter block that could not be parsed.
///
/// The page still builds with default metadata; this error is only reported.
#[derive(Error, Debug)]
#[error("Malformed {syntax} front matter in `{path:?}`: {message}")]
pub struct FrontMatterError {
    /// The page file holding the block.
    pub path: PathBuf,
    /// Name of the syntax the block was parsed as.
    pub syntax: String,
    /// Parser diagnostic.
    pub message: String,
}

/// Failures while loading a template and expanding its includes.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The template's index file, or an included file, could not be read.
    #[error("Unable to read template file `{path:?}`: {source}")]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An include directive points at a file that does not exist.
    #[error("Include target `{target:?}` referenced from `{included_from:?}` does not exist")]
    MissingInclude {
        /// The resolved include target.
        target: PathBuf,
        /// The file holding the directive.
        included_from: PathBuf,
    },

    /// An include chain loops back on itself.
    #[error("Include cycle detected: {}", format_chain(.chain))]
    Cycle {
        /// Every file on the resolution path, ending with the repeated one.
        chain: Vec<PathBuf>,
    },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Failures while binding a page to a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// Neither the page nor the site names a template.
    #[error("Page `{page:?}` has no template and no default template is configured")]
    NoTemplate {
        /// The page being bound.
        page: PathBuf,
    },

    /// The template id names no configured template.
    #[error("Template `{template_id}` requested by `{page:?}` does not exist")]
    TemplateNotFound {
        /// The unknown template id.
        template_id: String,
        /// The page being bound.
        page: PathBuf,
    },

    /// The template exists but failed to resolve during the read phase.
    #[error("Template `{template_id}` requested by `{page:?}` failed to resolve")]
    TemplateUnresolved {
        /// The template id.
        template_id: String,
        /// The page being bound.
        page: PathBuf,
    },
}

/// Failures while rendering a single (page, build type) pair.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template's markup kind cannot produce HTML.
    #[error("Template `{template_id}` uses unsupported markup `{markup}`")]
    UnsupportedMarkup {
        /// The template id.
        template_id: String,
        /// The markup kind name.
        markup: String,
    },

    /// The template has not been read yet.
    #[error("Template `{template_id}` has no resolved content")]
    Unresolved {
        /// The template id.
        template_id: String,
    },

    /// JSON serialization failed.
    #[error("Failed to serialize `{path:?}` as JSON: {source}")]
    Serialization {
        /// The page being rendered.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// HTML minification failed.
    #[error("Failed to minify `{path:?}`: {message}")]
    Minify {
        /// The page being rendered.
        path: PathBuf,
        /// Diagnostic from the minifier.
        message: String,
    },

    /// The PDF backend failed or is not available.
    #[error("PDF rendering failed for `{path:?}`: {message}")]
    Pdf {
        /// The page being rendered.
        path: PathBuf,
        /// Diagnostic from the backend.
        message: String,
    },

    /// Writing the artifact to its destination failed.
    #[error("Failed to write {build_type} output `{path:?}`: {source}")]
    Write {
        /// The destination path.
        path: PathBuf,
        /// The format being written.
        build_type: BuildType,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Creates a `Pdf` error with a specific message.
    pub fn pdf<S: Into<String>>(path: PathBuf, message: S) -> Self {
        RenderError::Pdf {
            path,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_every_file() {
        let err = ResolutionError::Cycle {
            chain: vec![
                PathBuf::from("/t/a.html"),
                PathBuf::from("/t/b.html"),
                PathBuf::from("/t/a.html"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Include cycle detected: /t/a.html -> /t/b.html -> /t/a.html"
        );
    }

    #[test]
    fn test_shire_error_kinds() {
        let config = ShireError::config_error("bad", None);
        assert_eq!(config.kind(), ErrorKind::Config);

        let io = ShireError::io_error(
            PathBuf::from("content"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("content"));
    }

    #[test]
    fn test_reported_error_display() {
        let err = ReportedError::new(
            ErrorKind::Bind,
            "/site/a.md",
            "Template `x` does not exist",
        );
        assert_eq!(
            err.to_string(),
            "[bind] /site/a.md: Template `x` does not exist"
        );
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Resolution.to_string(), "resolution");
        assert_eq!(ErrorKind::Bind.to_string(), "bind");
    }
}
