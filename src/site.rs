// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Site Data
//!
//! [`SiteData`] owns every template and page of one build. It is filled by
//! the scan stages in order:
//!
//! 1. [`SiteData::scan_templates`] registers each configured template
//! 2. [`SiteData::scan_pages`] finds content folders and page files
//! 3. [`SiteData::parse_pages`] reads front matter and bodies in parallel
//! 4. [`SiteData::read_templates`] resolves every template in parallel
//!
//! Template folders, the output folder and hidden folders are never
//! scanned for content.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::build::StopSignal;
use crate::content::Page;
use crate::core::config::SiteConfig;
use crate::core::error::{ErrorKind, ReportedError, Result, ShireError};
use crate::core::traits::BuildLogger;
use crate::fs::{self as site_fs, FileAsset, FileFilter};
use crate::template::Template;

/// Extensions of files treated as pages.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "markdown", "html", "htm", "rst"];

/// Everything discovered and parsed for one build.
#[derive(Debug, Default)]
pub struct SiteData {
    /// Templates by id.
    pub templates: HashMap<String, Template>,
    /// Absolute folders holding templates.
    pub template_folders: BTreeSet<PathBuf>,
    /// Folders scanned for pages, the content root first.
    pub page_folders: Vec<PathBuf>,
    /// Every page file found, in folder order.
    pub all_pages: Vec<FileAsset>,
    /// Parsed pages by absolute path.
    pub pages: HashMap<PathBuf, Page>,
}

impl SiteData {
    /// Creates empty site data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every template in `config`.
    ///
    /// A template folder that is missing or unreadable is fatal.
    pub fn scan_templates(
        &mut self,
        base_folder: &Path,
        config: &SiteConfig,
        logger: &dyn BuildLogger,
    ) -> Result<()> {
        for entry in &config.templates {
            let template = Template::from_config(base_folder, entry);
            logger.info(&format!(
                "Scanning for template `{}` in folder: {}",
                template.id(),
                template.folder().display()
            ));

            let _ = fs::read_dir(template.folder()).map_err(|e| {
                ShireError::io_error(template.folder().to_path_buf(), e)
            })?;

            let _ = self
                .template_folders
                .insert(template.folder().to_path_buf());
            let _ = self.templates.insert(template.id().to_string(), template);
        }
        Ok(())
    }

    /// True if `folder` is, or sits below, a template folder.
    pub fn is_template_folder(&self, folder: &Path) -> bool {
        self.template_folders
            .iter()
            .any(|template_folder| folder.starts_with(template_folder))
    }

    /// Finds content folders below `content_root` and the pages in them.
    ///
    /// # Arguments
    ///
    /// * `content_root` - Absolute content root. Failing to list it is fatal.
    /// * `output_folder` - Absolute output folder, excluded from scanning
    /// * `logger` - Build logger
    ///
    /// # Returns
    ///
    /// Errors for sub-folders that could not be listed; those are skipped.
    pub fn scan_pages(
        &mut self,
        content_root: &Path,
        output_folder: &Path,
        logger: &dyn BuildLogger,
    ) -> Result<Vec<ReportedError>> {
        logger.info(&format!(
            "Scanning for folders in content root: {}",
            content_root.display()
        ));

        let folders = site_fs::list(content_root, FileFilter::Folders, true)
            .map_err(|e| ShireError::io_error(content_root.to_path_buf(), e))?;

        let mut page_folders = vec![content_root.to_path_buf()];
        page_folders.extend(
            folders
                .into_iter()
                .map(|folder| folder.path)
                .filter(|folder| {
                    !self.is_template_folder(folder)
                        && !folder.starts_with(output_folder)
                }),
        );
        logger.info(&format!(
            "Total content folders found: {}",
            page_folders.len()
        ));

        let listings: Vec<_> = page_folders
            .par_iter()
            .map(|folder| {
                (
                    folder,
                    site_fs::list_files_with_extensions(
                        folder,
                        CONTENT_EXTENSIONS,
                    ),
                )
            })
            .collect();

        let mut errors = Vec::new();
        let mut all_pages = Vec::new();
        for (folder, listing) in listings {
            match listing {
                Ok(files) => {
                    logger.debug(&format!(
                        "{} page files in {}",
                        files.len(),
                        folder.display()
                    ));
                    all_pages.extend(files);
                }
                Err(e) if folder.as_path() == content_root => {
                    return Err(ShireError::io_error(folder.clone(), e));
                }
                Err(e) => {
                    logger.warn(&format!(
                        "Skipping unreadable folder {}: {}",
                        folder.display(),
                        e
                    ));
                    errors.push(ReportedError::new(
                        ErrorKind::Io,
                        folder.display().to_string(),
                        e.to_string(),
                    ));
                }
            }
        }

        self.page_folders = page_folders;
        self.all_pages = all_pages;
        Ok(errors)
    }

    /// Reads and parses every page file in parallel.
    ///
    /// Unreadable files are reported and skipped. Malformed front matter is
    /// reported, and the page is kept with default metadata.
    pub fn parse_pages(
        &mut self,
        logger: &dyn BuildLogger,
        stop: &StopSignal,
    ) -> Vec<ReportedError> {
        let results: Vec<_> = self
            .all_pages
            .par_iter()
            .filter_map(|asset| {
                if stop.should_stop() {
                    return None;
                }
                logger.debug(&format!(
                    "Reading file contents: {}",
                    asset.path.display()
                ));
                Some((asset.path.clone(), Page::load(&asset.path)))
            })
            .collect();

        let mut errors = Vec::new();
        for (path, result) in results {
            match result {
                Ok((page, warning)) => {
                    if let Some(warning) = warning {
                        logger.warn(&warning.to_string());
                        errors.push(ReportedError::new(
                            ErrorKind::Parse,
                            path.display().to_string(),
                            warning.to_string(),
                        ));
                    }
                    let _ = self.pages.insert(path, page);
                }
                Err(e) => {
                    logger.error(&format!(
                        "Unable to read page {}: {}",
                        path.display(),
                        e
                    ));
                    errors.push(ReportedError::new(
                        ErrorKind::Io,
                        path.display().to_string(),
                        e.to_string(),
                    ));
                }
            }
        }
        errors.sort();
        errors
    }

    /// Resolves every template, one task per template.
    ///
    /// A template that fails stays unresolved and its error is returned.
    pub fn read_templates(
        &mut self,
        logger: &dyn BuildLogger,
        stop: &StopSignal,
    ) -> Vec<ReportedError> {
        let mut errors: Vec<ReportedError> = self
            .templates
            .par_iter_mut()
            .filter_map(|(id, template)| {
                if stop.should_stop() {
                    return None;
                }
                template.read(logger).err().map(|e| {
                    logger.error(&format!(
                        "Template `{}` failed to resolve: {}",
                        id, e
                    ));
                    ReportedError::new(ErrorKind::Resolution, id.clone(), e.to_string())
                })
            })
            .collect();
        errors.sort();
        errors
    }

    /// Parsed pages sorted by path.
    pub fn sorted_pages(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.values().collect();
        pages.sort_by(|a, b| a.path().cmp(b.path()));
        pages
    }
}
