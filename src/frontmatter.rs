// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Front Matter
//!
//! Detects and parses the metadata block at the top of a page file.
//!
//! A block starts only when the very first line begins with `---` and ends
//! at the next line that also begins with `---`. The block may be written in
//! JSON, YAML or TOML. The syntax is taken, in order, from a `syntax` field
//! inside the block, from the opening delimiter (`---json`, `---yaml`,
//! `---toml`), or from the shape of the block itself.
//!
//! ```rust
//! use shire::frontmatter::{parse, FrontMatterSyntax};
//! use std::path::Path;
//!
//! let lines = ["---toml", "title = \"Hello\"", "draft = true", "---", "Body"];
//! let parsed = parse(Path::new("posts/hello.md"), &lines);
//!
//! assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Toml);
//! assert_eq!(parsed.front_matter.title, "Hello");
//! assert!(parsed.front_matter.draft);
//! assert_eq!(parsed.body_start, 4);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::build_type::BuildType;
use crate::core::error::{FrontMatterError, Result, ShireError};

/// Prefix of a front-matter delimiter line.
pub const DELIMITER: &str = "---";

/// Syntax of a front-matter block.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FrontMatterSyntax {
    /// A JSON object.
    Json,
    /// A YAML mapping.
    #[default]
    Yaml,
    /// A TOML table.
    Toml,
}

impl FrontMatterSyntax {
    /// Looks up a syntax by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// The canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }
}

impl fmt::Display for FrontMatterSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Markup language of a page body.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PageMarkup {
    /// HTML, passed through as-is.
    #[default]
    Html,
    /// Markdown, converted to HTML when rendered.
    Markdown,
    /// reStructuredText, shown preformatted.
    Restructured,
}

impl PageMarkup {
    /// Looks up a markup kind by name or file extension.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "markdown" | "md" => Some(Self::Markdown),
            "restructured" | "restructuredtext" | "rst" => {
                Some(Self::Restructured)
            }
            _ => None,
        }
    }

    /// Infers the markup from a page file's extension. Defaults to HTML.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| Self::from_name(&ext.to_string_lossy()))
            .unwrap_or_default()
    }

    /// The canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
            Self::Restructured => "restructured",
        }
    }
}

/// Metadata of a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFrontMatter {
    /// Syntax the block was written in.
    pub syntax: FrontMatterSyntax,
    /// Page title. Defaults to the file name without extension.
    pub title: String,
    /// Free-form date as written in the block.
    pub date: String,
    /// Template to render with. Empty means the site default.
    pub template_id: String,
    /// Drafts are only built when the site allows them.
    pub draft: bool,
    /// Seconds since the epoch before which the page is not published.
    pub publish_epoch: i64,
    /// Seconds since the epoch after which the page expires. 0 never expires.
    pub expiry_epoch: i64,
    /// Markup of the page body.
    pub markup: PageMarkup,
    /// Short title for navigation links.
    pub link_title: Option<String>,
    /// Series the page belongs to.
    pub series: Option<String>,
    /// One-paragraph summary.
    pub summary: Option<String>,
    /// Explicit target URL.
    pub url: Option<String>,
    /// Output formats replacing the site's defaults for this page.
    pub build_types: Option<BTreeSet<BuildType>>,
}

impl PageFrontMatter {
    /// Returns the all-defaults record for the page file at `path`.
    pub fn for_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self {
            title: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            markup: PageMarkup::from_path(path),
            ..Self::default()
        }
    }

    /// Writes the record back as a delimited block in its own syntax.
    ///
    /// Parsing the returned block yields an equal record.
    pub fn to_block(&self) -> Result<String> {
        let record = BlockRecord::from(self);
        let body = match self.syntax {
            FrontMatterSyntax::Json => serde_json::to_string_pretty(&record)
                .map_err(|e| ShireError::internal_error(e.to_string()))?,
            FrontMatterSyntax::Yaml => serde_yml::to_string(&record)
                .map_err(|e| ShireError::internal_error(e.to_string()))?,
            FrontMatterSyntax::Toml => toml::to_string(&record)
                .map_err(|e| ShireError::internal_error(e.to_string()))?,
        };

        let body = body
            .strip_prefix("---\n")
            .unwrap_or(&body)
            .trim_end()
            .to_string();

        Ok(format!(
            "{}{}\n{}\n{}\n",
            DELIMITER,
            self.syntax.name(),
            body,
            DELIMITER
        ))
    }
}

/// The serialized shape of a block, using the keys the parser reads back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockRecord<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    date: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    template_id: &'a str,
    #[serde(skip_serializing_if = "is_false")]
    draft: bool,
    #[serde(skip_serializing_if = "is_zero")]
    publish_epoch: i64,
    #[serde(skip_serializing_if = "is_zero")]
    expiry_epoch: i64,
    markup: PageMarkup,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<&'a BTreeSet<BuildType>>,
}

impl<'a> From<&'a PageFrontMatter> for BlockRecord<'a> {
    fn from(fm: &'a PageFrontMatter) -> Self {
        Self {
            title: &fm.title,
            date: &fm.date,
            template_id: &fm.template_id,
            draft: fm.draft,
            publish_epoch: fm.publish_epoch,
            expiry_epoch: fm.expiry_epoch,
            markup: fm.markup,
            link_title: fm.link_title.as_deref(),
            series: fm.series.as_deref(),
            summary: fm.summary.as_deref(),
            url: fm.url.as_deref(),
            outputs: fm.build_types.as_ref(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// The result of scanning a page for front matter.
#[derive(Debug)]
pub struct ParsedFrontMatter {
    /// The page metadata, defaulted where the block is silent or malformed.
    pub front_matter: PageFrontMatter,
    /// Index of the first body line.
    pub body_start: usize,
    /// Set when the block could not be parsed.
    pub warning: Option<FrontMatterError>,
}

/// Parses the front matter of the page at `path` from its lines.
///
/// # Arguments
///
/// * `path` - The page file, used for the default title and diagnostics
/// * `lines` - The full content of the file split into lines
///
/// # Returns
///
/// The parsed metadata and the index of the line where the body starts.
/// This never fails; a malformed block yields defaults plus a warning.
pub fn parse<S: AsRef<str>>(path: &Path, lines: &[S]) -> ParsedFrontMatter {
    let mut front_matter = PageFrontMatter::for_file(path);

    let Some(first) = lines.first().map(|l| strip_bom(l.as_ref())) else {
        return ParsedFrontMatter {
            front_matter,
            body_start: 0,
            warning: None,
        };
    };
    if !first.starts_with(DELIMITER) {
        return ParsedFrontMatter {
            front_matter,
            body_start: 0,
            warning: None,
        };
    }

    let Some(close) = lines
        .iter()
        .skip(1)
        .position(|l| l.as_ref().starts_with(DELIMITER))
        .map(|offset| offset + 1)
    else {
        return ParsedFrontMatter {
            front_matter,
            body_start: 0,
            warning: None,
        };
    };

    let block = lines[1..close]
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<&str>>()
        .join("\n");
    let (syntax, fields) = parse_detected(&block, &first[DELIMITER.len()..]);
    front_matter.syntax = syntax;

    let warning = match fields {
        Ok(fields) => {
            apply_fields(&mut front_matter, &fields);
            None
        }
        Err(message) => Some(FrontMatterError {
            path: path.to_path_buf(),
            syntax: syntax.name().to_string(),
            message,
        }),
    };

    ParsedFrontMatter {
        front_matter,
        body_start: close + 1,
        warning,
    }
}

fn strip_bom(line: &str) -> &str {
    line.strip_prefix('\u{feff}').unwrap_or(line)
}

type Fields = std::result::Result<Map<String, JsonValue>, String>;

/// Parses the block and picks its syntax.
///
/// The delimiter suffix, or the block's shape, gives a first guess. A
/// top-level `syntax` field naming another syntax then takes over, provided
/// the block parses in it.
fn parse_detected(
    block: &str,
    delimiter_suffix: &str,
) -> (FrontMatterSyntax, Fields) {
    let inferred = FrontMatterSyntax::from_name(delimiter_suffix)
        .unwrap_or_else(|| sniff_syntax(block));

    match parse_block(block, inferred) {
        Ok(fields) => match declared_field(&fields) {
            Some(declared) if declared != inferred => {
                match parse_block(block, declared) {
                    Ok(redeclared) => (declared, Ok(redeclared)),
                    Err(_) => (inferred, Ok(fields)),
                }
            }
            _ => (inferred, Ok(fields)),
        },
        Err(message) => match declared_line(block) {
            Some(declared) if declared != inferred => {
                (declared, parse_block(block, declared))
            }
            _ => (inferred, Err(message)),
        },
    }
}

/// The `syntax` entry of an already parsed top-level map.
fn declared_field(fields: &Map<String, JsonValue>) -> Option<FrontMatterSyntax> {
    fields
        .iter()
        .find(|(key, _)| normalize_key(key) == "syntax")
        .and_then(|(_, value)| value.as_str())
        .and_then(FrontMatterSyntax::from_name)
}

/// Finds a top-level `syntax` line in a block that failed to parse.
///
/// Indented lines belong to nested values, and lines after a TOML table
/// header belong to that table.
fn declared_line(block: &str) -> Option<FrontMatterSyntax> {
    block
        .lines()
        .take_while(|line| !line.trim_start().starts_with('['))
        .filter(|line| !line.starts_with(char::is_whitespace))
        .find_map(|line| {
            let line = line.trim_start_matches(['{', ',']).trim_start();
            let rest = line.trim_start_matches('"');
            let key = rest.get(..6)?;
            if !key.eq_ignore_ascii_case("syntax") {
                return None;
            }
            let rest = rest[6..].trim_start_matches('"').trim_start();
            let value =
                rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))?;
            let value = value.trim().trim_end_matches([',', '}']).trim();
            FrontMatterSyntax::from_name(value.trim_matches(['"', '\'']))
        })
}

fn sniff_syntax(block: &str) -> FrontMatterSyntax {
    let first = block
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'));

    match first {
        Some(line) if line.starts_with('{') => FrontMatterSyntax::Json,
        Some(line) if looks_like_toml(line) => FrontMatterSyntax::Toml,
        _ => FrontMatterSyntax::Yaml,
    }
}

fn looks_like_toml(line: &str) -> bool {
    if line.starts_with('[') && line.ends_with(']') {
        return true;
    }
    match line.split_once('=') {
        Some((key, _)) => {
            let key = key.trim();
            !key.is_empty()
                && key.chars().all(|c| {
                    c.is_ascii_alphanumeric()
                        || matches!(c, '_' | '-' | '.' | '"')
                })
        }
        None => false,
    }
}

fn parse_block(
    block: &str,
    syntax: FrontMatterSyntax,
) -> std::result::Result<Map<String, JsonValue>, String> {
    if block.trim().is_empty() {
        return Ok(Map::new());
    }

    let value = match syntax {
        FrontMatterSyntax::Json => {
            serde_json::from_str::<JsonValue>(block).map_err(|e| e.to_string())?
        }
        FrontMatterSyntax::Yaml => {
            serde_yml::from_str::<JsonValue>(block).map_err(|e| e.to_string())?
        }
        FrontMatterSyntax::Toml => toml::from_str::<toml::Table>(block)
            .map(|table| toml_to_json(toml::Value::Table(table)))
            .map_err(|e| e.to_string())?,
    };

    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(Map::new()),
        other => Err(format!(
            "expected a mapping of fields, found `{}`",
            other
        )),
    }
}

fn toml_to_json(value: toml::Value) -> JsonValue {
    match value {
        toml::Value::String(s) => JsonValue::String(s),
        toml::Value::Integer(i) => JsonValue::from(i),
        toml::Value::Float(f) => JsonValue::from(f),
        toml::Value::Boolean(b) => JsonValue::Bool(b),
        toml::Value::Datetime(dt) => JsonValue::String(dt.to_string()),
        toml::Value::Array(items) => {
            JsonValue::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => JsonValue::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Lowercases a key and drops `_` and `-`.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

fn apply_fields(fm: &mut PageFrontMatter, fields: &Map<String, JsonValue>) {
    for (key, value) in fields {
        match normalize_key(key).as_str() {
            "title" => {
                if let Some(title) = non_empty_string(value) {
                    fm.title = title;
                }
            }
            "date" => fm.date = scalar_string(value).unwrap_or_default(),
            "template" | "templateid" | "layout" => {
                fm.template_id = scalar_string(value).unwrap_or_default()
            }
            "draft" => {
                if let Some(draft) = as_flag(value) {
                    fm.draft = draft;
                }
            }
            "publish" | "publishdate" | "publishepoch" => {
                if let Some(epoch) = parse_epoch(value) {
                    fm.publish_epoch = epoch;
                }
            }
            "expiry" | "expirydate" | "expiryepoch" | "expires" => {
                if let Some(epoch) = parse_epoch(value) {
                    fm.expiry_epoch = epoch;
                }
            }
            "format" | "markup" | "pageformat" => {
                if let Some(markup) = value.as_str().and_then(PageMarkup::from_name)
                {
                    fm.markup = markup;
                }
            }
            "linktitle" => fm.link_title = non_empty_string(value),
            "series" => fm.series = non_empty_string(value),
            "summary" => fm.summary = non_empty_string(value),
            "url" => fm.url = non_empty_string(value),
            "outputs" | "buildtypes" => {
                if let Some(types) = parse_build_types(value) {
                    fm.build_types = Some(types);
                }
            }
            _ => {}
        }
    }
}

fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty_string(value: &JsonValue) -> Option<String> {
    scalar_string(value).filter(|s| !s.is_empty())
}

fn as_flag(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
        JsonValue::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn parse_build_types(value: &JsonValue) -> Option<BTreeSet<BuildType>> {
    let names: Vec<String> = match value {
        JsonValue::Array(items) => {
            items.iter().filter_map(scalar_string).collect()
        }
        JsonValue::String(s) => s.split(',').map(str::to_string).collect(),
        _ => return None,
    };
    Some(
        names
            .iter()
            .filter(|name| !name.trim().is_empty())
            .filter_map(|name| name.parse().ok())
            .collect(),
    )
}

/// Reads an epoch timestamp from an integer or a date string.
pub fn parse_epoch(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => parse_epoch_str(s),
        _ => None,
    }
}

/// Parses integers, RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`.
pub fn parse_epoch_str(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(seconds) = text.parse::<i64>() {
        return Some(seconds);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_text(path: &str, text: &str) -> ParsedFrontMatter {
        let lines: Vec<&str> = text.lines().collect();
        parse(Path::new(path), &lines)
    }

    #[test]
    fn test_yaml_block() {
        let parsed = parse_text(
            "posts/hello.md",
            "---\ntitle: Hello\ntemplate: post\ndraft: true\nseries: intro\n---\n# Body\n",
        );
        let fm = &parsed.front_matter;
        assert_eq!(fm.syntax, FrontMatterSyntax::Yaml);
        assert_eq!(fm.title, "Hello");
        assert_eq!(fm.template_id, "post");
        assert!(fm.draft);
        assert_eq!(fm.series.as_deref(), Some("intro"));
        assert_eq!(fm.markup, PageMarkup::Markdown);
        assert_eq!(parsed.body_start, 6);
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn test_json_sniffed_from_brace() {
        let parsed = parse_text(
            "index.html",
            "---\n{\n  \"Title\": \"Home\",\n  \"templateId\": \"base\"\n}\n---\n<p>hi</p>",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Json);
        assert_eq!(parsed.front_matter.title, "Home");
        assert_eq!(parsed.front_matter.template_id, "base");
        assert_eq!(parsed.body_start, 6);
    }

    #[test]
    fn test_toml_sniffed_from_key_line() {
        let parsed = parse_text(
            "a.md",
            "---\ntitle = \"T\"\noutputs = [\"json\", \"pdf\"]\n---\n",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Toml);
        assert_eq!(
            parsed.front_matter.build_types,
            Some(BTreeSet::from([BuildType::Json, BuildType::Pdf]))
        );
    }

    #[test]
    fn test_delimiter_variant_selects_syntax() {
        let parsed =
            parse_text("a.md", "---json\n{ \"title\": \"From JSON\" }\n---\n");
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Json);
        assert_eq!(parsed.front_matter.title, "From JSON");
    }

    #[test]
    fn test_declared_syntax_wins_over_delimiter() {
        let parsed = parse_text(
            "a.md",
            "---yaml\nsyntax = \"toml\"\ntitle = \"Declared\"\n---\n",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Toml);
        assert_eq!(parsed.front_matter.title, "Declared");
    }

    #[test]
    fn test_nested_syntax_key_is_not_a_declaration() {
        let parsed = parse_text(
            "posts/code.md",
            "---\ntitle: Highlight\ntemplate: post\nhighlight:\n  syntax: toml\n---\nBody",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Yaml);
        assert_eq!(parsed.front_matter.title, "Highlight");
        assert_eq!(parsed.front_matter.template_id, "post");
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn test_syntax_line_inside_block_string_is_ignored() {
        let parsed = parse_text(
            "posts/snippet.md",
            "---\ntitle: Snippet\nsummary: |\n  syntax = \"toml\"\n  shown as code\n---\n",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Yaml);
        assert_eq!(parsed.front_matter.title, "Snippet");
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn test_declared_field_in_parsed_map() {
        let parsed = parse_text(
            "a.md",
            "---json\n{ \"syntax\": \"yaml\", \"title\": \"Flow\" }\n---\n",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Yaml);
        assert_eq!(parsed.front_matter.title, "Flow");
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn test_toml_sniffed_from_table_header() {
        let parsed = parse_text(
            "a.md",
            "---\n[page]\nnote = \"x\"\n---\n",
        );
        assert_eq!(parsed.front_matter.syntax, FrontMatterSyntax::Toml);
        assert_eq!(parsed.front_matter.title, "a");
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn test_title_defaults_to_base_name() {
        let parsed = parse_text("notes/my-page.md", "---\ndraft: false\n---\n");
        assert_eq!(parsed.front_matter.title, "my-page");
    }

    #[test]
    fn test_missing_closing_delimiter_means_all_body() {
        let parsed =
            parse_text("notes/open.md", "---\ntitle: Never closed\nbody\n");
        assert_eq!(parsed.body_start, 0);
        assert_eq!(
            parsed.front_matter,
            PageFrontMatter::for_file("notes/open.md")
        );
        assert!(parsed.warning.is_none());
    }

    #[test]
    fn test_no_front_matter() {
        let parsed = parse_text("plain.md", "# Just a heading\n---\nmore");
        assert_eq!(parsed.body_start, 0);
        assert_eq!(parsed.front_matter.title, "plain");
    }

    #[test]
    fn test_malformed_block_defaults_with_warning() {
        let parsed = parse_text("bad.md", "---json\n{ \"title\": \n---\nBody");
        assert_eq!(parsed.front_matter.title, "bad");
        assert_eq!(parsed.body_start, 3);
        let warning = parsed.warning.unwrap();
        assert_eq!(warning.syntax, "json");
        assert!(warning.to_string().contains("bad.md"));
    }

    #[test]
    fn test_bom_before_delimiter() {
        let parsed = parse_text("bom.md", "\u{feff}---\ntitle: BOM\n---\n");
        assert_eq!(parsed.front_matter.title, "BOM");
    }

    #[test]
    fn test_epoch_formats() {
        assert_eq!(parse_epoch_str("1700000000"), Some(1_700_000_000));
        assert_eq!(parse_epoch_str("1970-01-02"), Some(86_400));
        assert_eq!(parse_epoch_str("1970-01-01 00:01:00"), Some(60));
        assert_eq!(parse_epoch_str("1970-01-01T00:00:10Z"), Some(10));
        assert_eq!(parse_epoch_str("next tuesday"), None);

        let parsed = parse_text(
            "a.md",
            "---\npublishDate: 1970-01-02\nexpires: 100\n---\n",
        );
        assert_eq!(parsed.front_matter.publish_epoch, 86_400);
        assert_eq!(parsed.front_matter.expiry_epoch, 100);
    }

    #[test]
    fn test_unknown_and_malformed_fields_ignored() {
        let parsed = parse_text(
            "a.md",
            "---\ncolour: blue\ndraft: sometimes\nformat: asciidoc\n---\n",
        );
        let fm = parsed.front_matter;
        assert!(!fm.draft);
        assert_eq!(fm.markup, PageMarkup::Markdown);
        assert!(parsed.warning.is_none());
    }

    fn sample(syntax: FrontMatterSyntax) -> PageFrontMatter {
        PageFrontMatter {
            syntax,
            title: "Round Trip".to_string(),
            date: "2024-03-01".to_string(),
            template_id: "post".to_string(),
            draft: true,
            publish_epoch: 1_700_000_000,
            expiry_epoch: 0,
            markup: PageMarkup::Markdown,
            link_title: Some("Trip".to_string()),
            series: None,
            summary: Some("A summary".to_string()),
            url: Some("/trip/".to_string()),
            build_types: Some(BTreeSet::from([BuildType::Html, BuildType::Json])),
        }
    }

    #[test]
    fn test_to_block_is_idempotent_for_every_syntax() {
        for syntax in [
            FrontMatterSyntax::Json,
            FrontMatterSyntax::Yaml,
            FrontMatterSyntax::Toml,
        ] {
            let original = sample(syntax);
            let block = original.to_block().unwrap();
            let parsed = parse_text("posts/trip.md", &block);

            assert!(parsed.warning.is_none(), "{}: {}", syntax, block);
            assert_eq!(parsed.front_matter, original, "{}", block);

            let again = parsed.front_matter.to_block().unwrap();
            assert_eq!(again, block);
        }
    }

    #[test]
    fn test_to_block_keeps_empty_output_override() {
        let mut fm = PageFrontMatter::for_file("a.md");
        fm.build_types = Some(BTreeSet::new());
        let block = fm.to_block().unwrap();
        let parsed = parse_text("a.md", &block);
        assert_eq!(parsed.front_matter.build_types, Some(BTreeSet::new()));
    }
}
