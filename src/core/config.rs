// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Loads the site configuration from `<base>/shire.config.json` and layers
//! overrides on top of it.
//!
//! ## Features
//!
//! - Case-insensitive keys: `baseUrl`, `BaseUrl` and `baseurl` all match
//! - Defaults for every missing field, unknown fields ignored
//! - Environment overrides (`SHIRE_OUTPUT__FOLDER=public`)
//! - Programmatic overrides with dotted keys (`build.drafts=true`)
//! - Validation of template ids and output settings
//!
//! ## Example
//!
//! ```rust,no_run
//! use shire::core::config::ConfigLoader;
//!
//! let config = ConfigLoader::new("my-site")
//!     .with_env_prefix("SHIRE_")
//!     .with_override("build.drafts", "true")
//!     .load()
//!     .unwrap();
//!
//! assert!(config.build.drafts);
//! ```

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{Result, ShireError};

/// Name of the configuration file inside the site's base folder.
pub const CONFIG_FILE_NAME: &str = "shire.config.json";

/// Prefix of environment variables that override configuration values.
pub const DEFAULT_ENV_PREFIX: &str = "SHIRE_";

/// Index file used when a template does not name one.
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Information about the site author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    /// Author name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Author homepage.
    pub url: String,
}

/// A template registered for the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Unique template id that pages refer to.
    #[serde(alias = "templateid")]
    pub id: String,
    /// Template folder, relative to the base folder.
    pub folder: String,
    /// Index file inside the folder. Defaults to `index.html`.
    #[serde(rename = "indexfile")]
    pub index_file: Option<String>,
}

impl TemplateConfig {
    /// Returns the configured index file or the default one.
    pub fn index_file(&self) -> &str {
        self.index_file.as_deref().unwrap_or(DEFAULT_INDEX_FILE)
    }
}

/// Where output goes and which formats are produced by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Output folder, relative to the base folder.
    pub folder: String,
    /// Produce HTML files.
    pub html: bool,
    /// Produce JSON files.
    pub json: bool,
    /// Produce PDF files.
    pub pdf: bool,
    /// Minify HTML output.
    pub minify: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            folder: "site".to_string(),
            html: true,
            json: false,
            pdf: false,
            minify: false,
        }
    }
}

/// Which pages are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Build pages marked as drafts.
    pub drafts: bool,
    /// Build pages whose expiry time has passed.
    pub expired: bool,
    /// Build pages whose publish time is in the future.
    pub future: bool,
    /// Upper bound on worker threads. `None` uses the available parallelism.
    pub concurrency: Option<usize>,
}

/// Publishing settings, carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Raw publish settings keyed by (normalised) name.
    #[serde(flatten)]
    pub settings: Map<String, JsonValue>,
}

/// The site configuration read from `shire.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// The base URL the site is published under.
    #[serde(rename = "baseurl")]
    pub base_url: String,
    /// Site-wide title.
    pub title: String,
    /// Folder scanned for pages, relative to the base folder.
    #[serde(rename = "contentroot")]
    pub content_root: String,
    /// The site author.
    pub author: Author,
    /// Template id used by pages that do not name one.
    #[serde(rename = "defaulttemplate")]
    pub default_template: String,
    /// Templates available to pages.
    pub templates: Vec<TemplateConfig>,
    /// Output settings.
    pub output: OutputOptions,
    /// Build filters and limits.
    pub build: BuildOptions,
    /// Publishing settings.
    pub publish: PublishOptions,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            title: String::new(),
            content_root: String::new(),
            author: Author::default(),
            default_template: "template".to_string(),
            templates: Vec::new(),
            output: OutputOptions::default(),
            build: BuildOptions::default(),
            publish: PublishOptions::default(),
        }
    }
}

impl SiteConfig {
    /// Parses a configuration from JSON text.
    ///
    /// Keys are matched case-insensitively, ignoring `_` and `-`.
    pub fn from_json_str(text: &str, path: Option<&Path>) -> Result<Self> {
        let raw: JsonValue = serde_json::from_str(text).map_err(|e| {
            ShireError::config_error(
                format!("Failed to parse config file: {}", e),
                path.map(Path::to_path_buf),
            )
        })?;

        if !raw.is_object() {
            return Err(ShireError::config_error(
                "Config file must hold a JSON object",
                path.map(Path::to_path_buf),
            ));
        }

        serde_json::from_value(normalize_keys(raw)).map_err(|e| {
            ShireError::config_error(
                format!("Invalid config value: {}", e),
                path.map(Path::to_path_buf),
            )
        })
    }

    /// Validates invariants the rest of the build relies on.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for template in &self.templates {
            if template.id.trim().is_empty() {
                return Err(ShireError::config_error(
                    "Template entry without an id",
                    None,
                ));
            }
            if template.folder.trim().is_empty() {
                return Err(ShireError::config_error(
                    format!("Template `{}` has no folder", template.id),
                    None,
                ));
            }
            if !seen.insert(template.id.as_str()) {
                return Err(ShireError::config_error(
                    format!("Duplicate template id `{}`", template.id),
                    None,
                ));
            }
        }

        if self.output.folder.trim().is_empty() {
            return Err(ShireError::config_error(
                "Output folder cannot be empty",
                None,
            ));
        }

        if self.build.concurrency == Some(0) {
            return Err(ShireError::config_error(
                "build.concurrency must be at least 1",
                None,
            ));
        }

        Ok(())
    }

    /// Sets a single value addressed by a dotted key such as `output.folder`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim().trim_matches('"');
        match normalize_key(key).as_str() {
            "baseurl" => self.base_url = value.to_string(),
            "title" => self.title = value.to_string(),
            "contentroot" => self.content_root = value.to_string(),
            "defaulttemplate" => self.default_template = value.to_string(),
            "author.name" => self.author.name = value.to_string(),
            "author.email" => self.author.email = value.to_string(),
            "author.url" => self.author.url = value.to_string(),
            "output.folder" => self.output.folder = value.to_string(),
            "output.html" => self.output.html = parse_flag(key, value)?,
            "output.json" => self.output.json = parse_flag(key, value)?,
            "output.pdf" => self.output.pdf = parse_flag(key, value)?,
            "output.minify" => self.output.minify = parse_flag(key, value)?,
            "build.drafts" => self.build.drafts = parse_flag(key, value)?,
            "build.expired" => self.build.expired = parse_flag(key, value)?,
            "build.future" => self.build.future = parse_flag(key, value)?,
            "build.concurrency" => {
                let limit = value.parse::<usize>().map_err(|e| {
                    ShireError::config_error(
                        format!("Invalid {} value '{}': {}", key, value, e),
                        None,
                    )
                })?;
                self.build.concurrency = Some(limit);
            }
            _ => {
                return Err(ShireError::config_error(
                    format!("Unknown configuration key: {}", key),
                    None,
                ));
            }
        }
        Ok(())
    }
}

/// Builds a `SiteConfig` from the config file, environment and overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    base_folder: PathBuf,
    env_prefix: Option<String>,
    overrides: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Creates a loader for the site rooted at `base_folder`.
    pub fn new<P: AsRef<Path>>(base_folder: P) -> Self {
        Self {
            base_folder: base_folder.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Reads overrides from environment variables starting with `prefix`.
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Adds an explicit override, applied after the environment.
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Path of the configuration file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        self.base_folder.join(CONFIG_FILE_NAME)
    }

    /// Loads, overrides and validates the configuration.
    pub fn load(self) -> Result<SiteConfig> {
        let path = self.config_path();
        log::info!("Reading config file: {}", path.display());

        let text = fs::read_to_string(&path).map_err(|e| {
            ShireError::config_error(
                format!("Failed to read config file: {}", e),
                Some(path.clone()),
            )
        })?;
        let mut config = SiteConfig::from_json_str(&text, Some(&path))?;

        if let Some(prefix) = &self.env_prefix {
            apply_env_overrides(&mut config, prefix)?;
        }

        for (key, value) in &self.overrides {
            config.set(key, value)?;
        }

        config.validate().map_err(|e| match e {
            ShireError::ConfigError { message, .. } => {
                ShireError::config_error(message, Some(path.clone()))
            }
            other => other,
        })?;

        Ok(config)
    }
}

/// Every key accepted by [`SiteConfig::set`], normalised.
const SETTABLE_KEYS: &[&str] = &[
    "baseurl",
    "title",
    "contentroot",
    "defaulttemplate",
    "author.name",
    "author.email",
    "author.url",
    "output.folder",
    "output.html",
    "output.json",
    "output.pdf",
    "output.minify",
    "build.drafts",
    "build.expired",
    "build.future",
    "build.concurrency",
];

/// True if [`SiteConfig::set`] accepts `key`.
pub fn is_known_key(key: &str) -> bool {
    SETTABLE_KEYS.contains(&normalize_key(key).as_str())
}

fn apply_env_overrides(config: &mut SiteConfig, prefix: &str) -> Result<()> {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(prefix) {
            let config_key = stripped
                .trim_start_matches('_')
                .to_lowercase()
                .replace("__", ".");
            if !is_known_key(&config_key) {
                log::debug!("Ignoring unrelated variable {}", key);
                continue;
            }
            config.set(&config_key, &value)?;
            log::debug!("Applied override {} from environment", key);
        }
    }
    Ok(())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    value.to_ascii_lowercase().parse().map_err(|e| {
        ShireError::config_error(
            format!("Invalid {} value '{}': {}", key, value, e),
            None,
        )
    })
}

/// Lowercases a dotted key and drops `_`/`-` inside each segment.
fn normalize_key(key: &str) -> String {
    key.split('.')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| *c != '_' && *c != '-')
                .collect::<String>()
                .to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn normalize_keys(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (normalize_key(&k), normalize_keys(v)))
                .collect(),
        ),
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(normalize_keys).collect())
        }
        other => other,
    }
}
