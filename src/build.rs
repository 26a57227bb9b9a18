// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Build Orchestration
//!
//! [`BuildOrchestrator`] drives a build through its stages:
//!
//! ```text
//! ScanTemplates -> ScanPages -> ParsePages -> ReadTemplates -> BindPages -> RenderAll -> Done
//! ```
//!
//! Only an unreadable content root or template folder stops a build early.
//! Every other failure is recorded in the [`BuildReport`] and the build moves
//! on. All work runs on a dedicated rayon pool.
//!
//! ## Example
//!
//! ```no_run
//! use shire::build::BuildOrchestrator;
//! use shire::core::config::ConfigLoader;
//!
//! # fn main() -> shire::core::error::Result<()> {
//! let config = ConfigLoader::new("my-site").load()?;
//! let report = BuildOrchestrator::new("my-site", config).run()?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::binder;
use crate::build_type::{select_types, BuildType};
use crate::content::Page;
use crate::core::config::{BuildOptions, SiteConfig};
use crate::core::error::{
    ErrorKind, RenderError, ReportedError, Result, ShireError,
};
use crate::core::logging::StdLogger;
use crate::core::traits::{
    ArtifactSink, BuildLogger, NoPdfBackend, PdfBackend,
};
use crate::frontmatter::PageFrontMatter;
use crate::fs;
use crate::generators::sink::FileSystemSink;
use crate::generators::sitemap::{self, SitemapEntry, SITEMAP_FILE};
use crate::render::Renderer;
use crate::site::SiteData;
use crate::template::Template;
use crate::vars::{PageVars, SiteVars};

/// Whole-build cancellation, shared by every task.
///
/// Tasks check [`StopSignal::should_stop`] before starting; work already in
/// flight finishes.
#[derive(Debug)]
pub struct StopSignal {
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
    timed_out: AtomicBool,
}

impl StopSignal {
    /// Creates a signal over a shared cancel flag and an optional deadline.
    pub fn new(cancel: Arc<AtomicBool>, deadline: Option<Instant>) -> Self {
        Self {
            cancel,
            deadline,
            timed_out: AtomicBool::new(false),
        }
    }

    /// A signal that only trips when [`StopSignal::cancel`] is called.
    pub fn never() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)), None)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// True once the build was cancelled or ran past its deadline.
    pub fn should_stop(&self) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.timed_out.store(true, Ordering::SeqCst);
                self.cancel();
                true
            }
            _ => false,
        }
    }

    /// True if the build was cancelled, by request or by the deadline.
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// True if the deadline tripped the cancellation.
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }
}

/// The stages of a build, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    /// Register the configured templates.
    ScanTemplates,
    /// Find content folders and page files.
    ScanPages,
    /// Parse every page.
    ParsePages,
    /// Resolve every template.
    ReadTemplates,
    /// Pair pages with templates and formats.
    BindPages,
    /// Render and write every (page, format) pair.
    RenderAll,
    /// The build finished.
    Done,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::ScanTemplates => "scan templates",
            BuildStage::ScanPages => "scan pages",
            BuildStage::ParsePages => "parse pages",
            BuildStage::ReadTemplates => "read templates",
            BuildStage::BindPages => "bind pages",
            BuildStage::RenderAll => "render",
            BuildStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Aggregate outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Page files found while scanning.
    pub pages_total: usize,
    /// Pages with at least one artifact written.
    pub pages_built: usize,
    /// Pages filtered out or that failed to bind.
    pub pages_skipped: usize,
    /// Artifacts written, the sitemap excluded.
    pub artifacts_written: usize,
    /// Every recoverable error, in a stable order.
    pub errors: Vec<ReportedError>,
    /// The last stage the build entered.
    pub stage: BuildStage,
    /// The build was cancelled before finishing.
    pub cancelled: bool,
    /// The cancellation came from the deadline.
    pub timed_out: bool,
}

impl Default for BuildReport {
    fn default() -> Self {
        Self {
            pages_total: 0,
            pages_built: 0,
            pages_skipped: 0,
            artifacts_written: 0,
            errors: Vec::new(),
            stage: BuildStage::ScanTemplates,
            cancelled: false,
            timed_out: false,
        }
    }
}

impl BuildReport {
    /// Number of errors of `kind`.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Error counts per kind.
    pub fn errors_by_kind(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for error in &self.errors {
            *counts.entry(error.kind).or_insert(0) += 1;
        }
        counts
    }

    /// True when the build ran to the end without recording errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Built {} of {} pages ({} artifacts written, {} pages skipped, {} errors)",
            self.pages_built,
            self.pages_total,
            self.artifacts_written,
            self.pages_skipped,
            self.errors.len()
        )?;
        if self.timed_out {
            write!(f, " [timed out during {}]", self.stage)?;
        } else if self.cancelled {
            write!(f, " [cancelled during {}]", self.stage)?;
        }
        Ok(())
    }
}

/// Why a page is left out of this build, if it is.
///
/// # Arguments
///
/// * `front_matter` - The page's metadata
/// * `options` - The site's build filters
/// * `now` - The current time in seconds since the epoch
pub fn publication_skip_reason(
    front_matter: &PageFrontMatter,
    options: &BuildOptions,
    now: i64,
) -> Option<&'static str> {
    if front_matter.draft && !options.drafts {
        return Some("draft");
    }
    if front_matter.expiry_epoch > 0
        && front_matter.expiry_epoch <= now
        && !options.expired
    {
        return Some("expired");
    }
    if front_matter.publish_epoch > now && !options.future {
        return Some("scheduled for the future");
    }
    None
}

struct BoundPage<'a> {
    page: &'a Page,
    template: &'a Template,
    types: BTreeSet<BuildType>,
}

/// Runs one build of a site.
#[derive(Debug)]
pub struct BuildOrchestrator {
    base_folder: PathBuf,
    config: SiteConfig,
    logger: Arc<dyn BuildLogger>,
    sink: Option<Arc<dyn ArtifactSink>>,
    pdf_backend: Arc<dyn PdfBackend>,
    concurrency: Option<usize>,
    deadline: Option<Duration>,
    clock: Option<i64>,
    cancel: Arc<AtomicBool>,
}

impl BuildOrchestrator {
    /// Creates an orchestrator for the site in `base_folder`.
    pub fn new<P: Into<PathBuf>>(base_folder: P, config: SiteConfig) -> Self {
        Self {
            base_folder: base_folder.into(),
            config,
            logger: Arc::new(StdLogger),
            sink: None,
            pdf_backend: Arc::new(NoPdfBackend),
            concurrency: None,
            deadline: None,
            clock: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the build logger.
    pub fn with_logger(mut self, logger: Arc<dyn BuildLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Sets where artifacts are written. Defaults to the output folder on disk.
    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the PDF backend.
    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf_backend = backend;
        self
    }

    /// Caps the worker pool, overriding `build.concurrency`.
    pub fn with_concurrency(mut self, threads: usize) -> Self {
        self.concurrency = Some(threads);
        self
    }

    /// Cancels the build once `timeout` has passed.
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(timeout);
        self
    }

    /// Fixes "now", in seconds since the epoch, for the publication filters.
    pub fn with_clock(mut self, now: i64) -> Self {
        self.clock = Some(now);
        self
    }

    /// A handle that cancels the build when set to `true`.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs the build.
    ///
    /// # Returns
    ///
    /// The aggregate report, or a `ShireError` when the content root or a
    /// template folder cannot be read.
    pub fn run(&self) -> Result<BuildReport> {
        self.config.validate()?;

        let threads = self
            .concurrency
            .or(self.config.build.concurrency)
            .unwrap_or(0);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("shire-worker-{}", index))
            .build()
            .map_err(|e| {
                ShireError::internal_error(format!(
                    "Failed to create thread pool: {}",
                    e
                ))
            })?;

        let stop = StopSignal::new(
            Arc::clone(&self.cancel),
            self.deadline.map(|timeout| Instant::now() + timeout),
        );
        let started = Instant::now();
        let report = pool.install(|| self.run_stages(&stop))?;
        self.logger.info(&format!(
            "{} in {:.2?}",
            report,
            started.elapsed()
        ));
        Ok(report)
    }

    fn enter(&self, report: &mut BuildReport, stage: BuildStage) {
        report.stage = stage;
        self.logger.info(&format!("Stage: {}", stage));
    }

    fn finish(&self, mut report: BuildReport, stop: &StopSignal) -> BuildReport {
        report.cancelled = stop.cancelled();
        report.timed_out = stop.timed_out();
        if report.cancelled {
            self.logger.warn(&format!(
                "Build stopped during {}{}",
                report.stage,
                if report.timed_out { " (deadline reached)" } else { "" }
            ));
        } else {
            self.enter(&mut report, BuildStage::Done);
        }
        report
    }

    fn run_stages(&self, stop: &StopSignal) -> Result<BuildReport> {
        let logger = self.logger.as_ref();
        let config = &self.config;
        let base = fs::absolute(&self.base_folder);
        let content_root = fs::absolute(&base.join(&config.content_root));
        let output_folder = base.join(&config.output.folder);
        let sink: Arc<dyn ArtifactSink> = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(FileSystemSink::new(&output_folder)),
        };

        let mut report = BuildReport::default();
        let mut site = SiteData::new();

        self.enter(&mut report, BuildStage::ScanTemplates);
        site.scan_templates(&base, config, logger)?;

        self.enter(&mut report, BuildStage::ScanPages);
        report
            .errors
            .extend(site.scan_pages(&content_root, &output_folder, logger)?);
        report.pages_total = site.all_pages.len();
        if stop.should_stop() {
            return Ok(self.finish(report, stop));
        }

        self.enter(&mut report, BuildStage::ParsePages);
        report.errors.extend(site.parse_pages(logger, stop));
        if stop.should_stop() {
            return Ok(self.finish(report, stop));
        }

        self.enter(&mut report, BuildStage::ReadTemplates);
        report.errors.extend(site.read_templates(logger, stop));
        if stop.should_stop() {
            return Ok(self.finish(report, stop));
        }

        self.enter(&mut report, BuildStage::BindPages);
        let bound = self.bind_pages(&site, &mut report);
        if stop.should_stop() {
            return Ok(self.finish(report, stop));
        }

        self.enter(&mut report, BuildStage::RenderAll);
        self.render_all(&bound, &content_root, sink.as_ref(), stop, &mut report);

        Ok(self.finish(report, stop))
    }

    fn bind_pages<'a>(
        &self,
        site: &'a SiteData,
        report: &mut BuildReport,
    ) -> Vec<BoundPage<'a>> {
        let now = self
            .clock
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let mut bound = Vec::new();

        for page in site.sorted_pages() {
            if let Some(reason) = publication_skip_reason(
                page.front_matter(),
                &self.config.build,
                now,
            ) {
                self.logger.info(&format!(
                    "Skipping {} ({})",
                    page.path().display(),
                    reason
                ));
                report.pages_skipped += 1;
                continue;
            }

            let template = match binder::bind(
                page,
                &site.templates,
                &self.config.default_template,
            ) {
                Ok(template) => template,
                Err(e) => {
                    self.logger.warn(&e.to_string());
                    report.pages_skipped += 1;
                    report.errors.push(ReportedError::new(
                        ErrorKind::Bind,
                        page.path().display().to_string(),
                        e.to_string(),
                    ));
                    continue;
                }
            };

            let types = select_types(page, &self.config);
            if types.is_empty() {
                self.logger.info(&format!(
                    "No output formats selected for {}",
                    page.path().display()
                ));
                report.pages_skipped += 1;
                continue;
            }

            self.logger.debug(&format!(
                "Bound {} to template `{}`",
                page.path().display(),
                template.id()
            ));
            bound.push(BoundPage {
                page,
                template,
                types,
            });
        }
        bound
    }

    fn render_all(
        &self,
        bound: &[BoundPage<'_>],
        content_root: &Path,
        sink: &dyn ArtifactSink,
        stop: &StopSignal,
        report: &mut BuildReport,
    ) {
        let config = &self.config;
        let renderer = Renderer::new(content_root)
            .with_minification(config.output.minify)
            .with_pdf_backend(Arc::clone(&self.pdf_backend))
            .with_logger(Arc::clone(&self.logger));

        let page_vars: Vec<PageVars> = bound
            .par_iter()
            .map(|entry| renderer.page_vars(entry.page, &config.base_url))
            .collect();
        let site_vars =
            SiteVars::new(config, page_vars.iter().map(PageVars::link).collect());

        let jobs: Vec<(usize, BuildType)> = bound
            .iter()
            .enumerate()
            .flat_map(|(index, entry)| {
                entry.types.iter().map(move |build_type| (index, *build_type))
            })
            .collect();

        let outcomes: Vec<(usize, BuildType, std::result::Result<PathBuf, RenderError>)> = jobs
            .par_iter()
            .filter_map(|&(index, build_type)| {
                if stop.should_stop() {
                    return None;
                }
                let entry = &bound[index];
                let outcome = renderer
                    .render(
                        entry.page,
                        entry.template,
                        build_type,
                        &site_vars,
                        &page_vars[index],
                    )
                    .and_then(|artifact| {
                        match sink.write(&artifact.relative_path, &artifact.bytes) {
                            Ok(()) => Ok(artifact.relative_path),
                            Err(source) => Err(RenderError::Write {
                                path: artifact.relative_path,
                                build_type,
                                source,
                            }),
                        }
                    });
                Some((index, build_type, outcome))
            })
            .collect();

        let mut built = BTreeSet::new();
        let mut sitemap_entries = Vec::new();
        let mut render_errors = Vec::new();
        for (index, build_type, outcome) in outcomes {
            let page = bound[index].page;
            match outcome {
                Ok(path) => {
                    self.logger.debug(&format!(
                        "Wrote {} for {}",
                        path.display(),
                        page.path().display()
                    ));
                    report.artifacts_written += 1;
                    let _ = built.insert(index);
                    if build_type == BuildType::Html {
                        sitemap_entries.push(SitemapEntry {
                            url: page_vars[index].url.clone(),
                            last_modified: sitemap::date_to_epoch(
                                &page.front_matter().date,
                            ),
                        });
                    }
                }
                Err(e) => {
                    self.logger.error(&e.to_string());
                    render_errors.push(ReportedError::new(
                        ErrorKind::Render,
                        page.path().display().to_string(),
                        e.to_string(),
                    ));
                }
            }
        }
        render_errors.sort();
        report.errors.extend(render_errors);
        report.pages_built = built.len();

        if config.base_url.is_empty()
            || sitemap_entries.is_empty()
            || stop.should_stop()
        {
            return;
        }
        let xml = sitemap::generate(&config.base_url, &sitemap_entries);
        match sink.write(Path::new(SITEMAP_FILE), xml.as_bytes()) {
            Ok(()) => self.logger.info(&format!(
                "Wrote {} with {} pages",
                SITEMAP_FILE,
                sitemap_entries.len()
            )),
            Err(source) => {
                let e = RenderError::Write {
                    path: PathBuf::from(SITEMAP_FILE),
                    build_type: BuildType::Html,
                    source,
                };
                self.logger.error(&e.to_string());
                report.errors.push(ReportedError::new(
                    ErrorKind::Render,
                    SITEMAP_FILE,
                    e.to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn front_matter() -> PageFrontMatter {
        PageFrontMatter::for_file("post.md")
    }

    #[test]
    fn test_drafts_skipped_unless_enabled() {
        let mut fm = front_matter();
        fm.draft = true;
        let mut options = BuildOptions::default();
        assert_eq!(publication_skip_reason(&fm, &options, 100), Some("draft"));

        options.drafts = true;
        assert_eq!(publication_skip_reason(&fm, &options, 100), None);
    }

    #[test]
    fn test_expired_and_future_pages() {
        let options = BuildOptions::default();

        let mut expired = front_matter();
        expired.expiry_epoch = 50;
        assert_eq!(
            publication_skip_reason(&expired, &options, 100),
            Some("expired")
        );
        assert_eq!(publication_skip_reason(&expired, &options, 10), None);

        let mut future = front_matter();
        future.publish_epoch = 200;
        assert!(publication_skip_reason(&future, &options, 100).is_some());
        let allow_future = BuildOptions {
            future: true,
            ..BuildOptions::default()
        };
        assert_eq!(publication_skip_reason(&future, &allow_future, 100), None);
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let fm = front_matter();
        assert_eq!(
            publication_skip_reason(&fm, &BuildOptions::default(), i64::MAX),
            None
        );
    }

    #[test]
    fn test_stop_signal_deadline() {
        let signal = StopSignal::new(
            Arc::new(AtomicBool::new(false)),
            Some(Instant::now()),
        );
        thread::sleep(Duration::from_millis(1));
        assert!(signal.should_stop());
        assert!(signal.cancelled());
        assert!(signal.timed_out());
    }

    #[test]
    fn test_stop_signal_cancel() {
        let signal = StopSignal::never();
        assert!(!signal.should_stop());
        signal.cancel();
        assert!(signal.should_stop());
        assert!(!signal.timed_out());
    }

    #[test]
    fn test_report_display_and_counts() {
        let report = BuildReport {
            pages_total: 3,
            pages_built: 1,
            pages_skipped: 1,
            artifacts_written: 2,
            errors: vec![
                ReportedError::new(ErrorKind::Bind, "a.md", "x"),
                ReportedError::new(ErrorKind::Render, "b.md", "y"),
                ReportedError::new(ErrorKind::Render, "b.md", "z"),
            ],
            stage: BuildStage::Done,
            cancelled: false,
            timed_out: false,
        };
        assert_eq!(report.count(ErrorKind::Render), 2);
        assert_eq!(report.errors_by_kind()[&ErrorKind::Bind], 1);
        assert!(!report.is_clean());
        assert_eq!(
            report.to_string(),
            "Built 1 of 3 pages (2 artifacts written, 1 pages skipped, 3 errors)"
        );
    }

    #[test]
    fn test_stage_order() {
        assert!(BuildStage::ScanTemplates < BuildStage::ScanPages);
        assert!(BuildStage::BindPages < BuildStage::RenderAll);
        assert_eq!(BuildStage::RenderAll.to_string(), "render");
    }
}
