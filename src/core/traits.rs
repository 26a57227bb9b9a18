// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Core Traits Module
//!
//! The seams between the build pipeline and the outside world. Every
//! collaborator the orchestrator talks to during a build is passed in as a
//! trait object, so tests can swap in in-memory versions.
//!
//! ## Key Traits
//!
//! - [`BuildLogger`]: Sink for the build's diagnostic messages
//! - [`ArtifactSink`]: Destination for rendered artifacts
//! - [`PdfBackend`]: Converts rendered HTML into PDF bytes

use std::fmt::Debug;
use std::io;
use std::path::Path;

use log::Level;

use crate::core::error::RenderError;

/// Logging capability handed to every stage of a build.
///
/// Implementors only provide [`BuildLogger::log`]; the level helpers
/// forward to it.
pub trait BuildLogger: Send + Sync + Debug {
    /// Records a message at the given level.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the message
    /// * `message` - The formatted message
    fn log(&self, level: Level, message: &str);

    /// Records a debug message.
    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    /// Records an informational message.
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Records a warning.
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    /// Records an error.
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Destination for rendered artifacts.
///
/// Paths are relative to the output folder.
pub trait ArtifactSink: Send + Sync + Debug {
    /// Writes `bytes` to `relative_path`, replacing any previous content.
    ///
    /// # Returns
    ///
    /// The underlying IO error if the write fails.
    fn write(&self, relative_path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Converts rendered HTML into a PDF document.
pub trait PdfBackend: Send + Sync + Debug {
    /// Renders `html` for the page at `source`.
    ///
    /// # Arguments
    ///
    /// * `html` - The fully merged HTML of the page
    /// * `source` - The page file, for diagnostics
    ///
    /// # Returns
    ///
    /// The PDF bytes, or a `RenderError` describing the failure.
    fn render_pdf(
        &self,
        html: &str,
        source: &Path,
    ) -> Result<Vec<u8>, RenderError>;
}

/// The PDF backend used when none is configured.
///
/// Every call fails, so PDF requests show up in the build report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPdfBackend;

impl PdfBackend for NoPdfBackend {
    fn render_pdf(
        &self,
        _html: &str,
        source: &Path,
    ) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::pdf(
            source.to_path_buf(),
            "no PDF backend is configured",
        ))
    }
}
