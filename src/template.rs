// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Templates
//!
//! A [`Template`] is created during the template scan with only its id,
//! folder and index file. The read phase loads the index file and, for HTML
//! templates, expands every include directive:
//!
//! ```html
//! <shire:include src="partials/header.html"></shire:include>
//! ```
//!
//! The directive is replaced by the body children of the included file,
//! resolved relative to the file holding the directive. Includes nest to
//! any depth. The chain of files on the current resolution path is tracked
//! and an include that loops back onto it fails with
//! [`ResolutionError::Cycle`].
//!
//! After the read phase a template is immutable. Rendering merges page and
//! site variables into its content through [`TemplateContent::merge_data`].

use std::fmt;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::core::config::{TemplateConfig, DEFAULT_INDEX_FILE};
use crate::core::error::ResolutionError;
use crate::core::traits::BuildLogger;
use crate::document::{Document, Node};

/// Element name of the include directive.
pub const INCLUDE_ELEMENT: &str = "shire:include";

/// Attribute naming the included file.
pub const INCLUDE_SRC: &str = "src";

/// Markup language of a template, inferred from its index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateMarkup {
    /// `.html` / `.htm`
    Html,
    /// `.vm` / `.vtl`
    Velocity,
    /// Anything else.
    Unknown,
}

impl TemplateMarkup {
    /// Infers the markup from a file name.
    pub fn from_path(path: &Path) -> Self {
        match crate::fs::extension_of(path).as_deref() {
            Some("html" | "htm") => Self::Html,
            Some("vm" | "vtl") => Self::Velocity,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for TemplateMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Html => "html",
            Self::Velocity => "velocity",
            Self::Unknown => "unknown",
        })
    }
}

/// The loaded content of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateContent {
    /// An HTML document with every include expanded.
    Html {
        /// The merged document tree.
        document: Document,
        /// The tree serialized once, used for every merge.
        markup: String,
    },
    /// Raw Velocity template text.
    Velocity(String),
    /// Raw text of an unsupported template kind.
    Unknown(String),
}

/// Result of merging variables into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merged {
    /// The merged text.
    pub output: String,
    /// References that had no bound value, in order of first use.
    pub unbound: Vec<String>,
}

impl TemplateContent {
    /// Builds HTML content from a resolved document.
    pub fn html(document: Document) -> Self {
        let markup = document.to_html();
        TemplateContent::Html { document, markup }
    }

    /// The markup kind of this content.
    pub fn markup(&self) -> TemplateMarkup {
        match self {
            TemplateContent::Html { .. } => TemplateMarkup::Html,
            TemplateContent::Velocity(_) => TemplateMarkup::Velocity,
            TemplateContent::Unknown(_) => TemplateMarkup::Unknown,
        }
    }

    /// Replaces every variable reference with its value from `vars`.
    ///
    /// HTML templates use `{{ path }}` (escaped) and `{{{ path }}}` (raw).
    /// Velocity templates use `$path`, `${path}` and `$!{path}`. A reference
    /// without a value is left as written and listed in
    /// [`Merged::unbound`]. Unknown templates are returned unchanged.
    pub fn merge_data(&self, vars: &JsonValue) -> Merged {
        let mut unbound = Vec::new();
        let output = match self {
            TemplateContent::Html { markup, .. } => {
                merge_braces(markup, vars, &mut unbound)
            }
            TemplateContent::Velocity(text) => {
                merge_velocity(text, vars, &mut unbound)
            }
            TemplateContent::Unknown(text) => text.clone(),
        };
        Merged { output, unbound }
    }
}

/// A template registered for the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id: String,
    folder: PathBuf,
    index_file: String,
    markup: TemplateMarkup,
    content: Option<TemplateContent>,
}

impl Template {
    /// Creates an unread template.
    pub fn new<S, P>(id: S, folder: P, index_file: &str) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            id: id.into(),
            folder: folder.into(),
            index_file: index_file.to_string(),
            markup: TemplateMarkup::from_path(Path::new(index_file)),
            content: None,
        }
    }

    /// Creates an unread template from its configuration entry.
    pub fn from_config(base_folder: &Path, config: &TemplateConfig) -> Self {
        Self::new(
            config.id.clone(),
            crate::fs::absolute(&base_folder.join(&config.folder)),
            config.index_file(),
        )
    }

    /// The template id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute path of the template folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Name of the index file inside the folder.
    pub fn index_file(&self) -> &str {
        &self.index_file
    }

    /// Full path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.folder.join(&self.index_file)
    }

    /// The markup kind, inferred from the index file.
    pub fn markup(&self) -> TemplateMarkup {
        self.markup
    }

    /// The loaded content, once the read phase succeeded.
    pub fn content(&self) -> Option<&TemplateContent> {
        self.content.as_ref()
    }

    /// True once the read phase succeeded.
    pub fn is_resolved(&self) -> bool {
        self.content.is_some()
    }

    /// Loads the index file and expands its includes.
    ///
    /// On failure the template stays unresolved.
    pub fn read(
        &mut self,
        logger: &dyn BuildLogger,
    ) -> Result<(), ResolutionError> {
        let index_path = self.index_path();
        logger.debug(&format!(
            "Reading template `{}` from {}",
            self.id,
            index_path.display()
        ));

        let text = read_file(&index_path)?;
        let content = match self.markup {
            TemplateMarkup::Html => {
                let root = fs::canonicalize(&index_path).map_err(|source| {
                    ResolutionError::Io {
                        path: index_path.clone(),
                        source,
                    }
                })?;
                let mut stack = vec![root.clone()];
                let document = Document::parse(&text);
                let nodes =
                    expand_includes(document.nodes, &root, &mut stack, logger)?;
                TemplateContent::html(Document { nodes })
            }
            TemplateMarkup::Velocity => TemplateContent::Velocity(text),
            TemplateMarkup::Unknown => TemplateContent::Unknown(text),
        };

        self.content = Some(content);
        Ok(())
    }
}

/// Resolves the template `template_id` whose index file is `index.html`
/// inside `folder`.
pub fn resolve(
    template_id: &str,
    folder: &Path,
    logger: &dyn BuildLogger,
) -> Result<Template, ResolutionError> {
    let mut template = Template::new(template_id, folder, DEFAULT_INDEX_FILE);
    template.read(logger)?;
    Ok(template)
}

fn read_file(path: &Path) -> Result<String, ResolutionError> {
    fs::read_to_string(path).map_err(|source| ResolutionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Expands include directives in `nodes`, which belong to `current_file`.
///
/// `stack` holds the canonical path of every file on the current
/// resolution path, `current_file` last.
fn expand_includes(
    nodes: Vec<Node>,
    current_file: &Path,
    stack: &mut Vec<PathBuf>,
    logger: &dyn BuildLogger,
) -> Result<Vec<Node>, ResolutionError> {
    let mut out = Vec::with_capacity(nodes.len());

    for node in nodes {
        let Node::Element(mut element) = node else {
            out.push(node);
            continue;
        };

        let children = mem::take(&mut element.children);
        let children = expand_includes(children, current_file, stack, logger)?;

        if element.name != INCLUDE_ELEMENT {
            element.children = children;
            out.push(Node::Element(element));
            continue;
        }

        let src = element
            .attr(INCLUDE_SRC)
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string);

        match src {
            Some(src) => {
                out.extend(include(&src, current_file, stack, logger)?);
                // Content the parser nested inside a self-closed directive.
                out.extend(children);
            }
            None => {
                logger.warn(&format!(
                    "Include directive without `{}` in {}; left unexpanded",
                    INCLUDE_SRC,
                    current_file.display()
                ));
                element.children = children;
                out.push(Node::Element(element));
            }
        }
    }

    Ok(out)
}

fn include(
    src: &str,
    included_from: &Path,
    stack: &mut Vec<PathBuf>,
    logger: &dyn BuildLogger,
) -> Result<Vec<Node>, ResolutionError> {
    let joined = included_from
        .parent()
        .map_or_else(|| PathBuf::from(src), |dir| dir.join(src));

    if !joined.is_file() {
        return Err(ResolutionError::MissingInclude {
            target: joined,
            included_from: included_from.to_path_buf(),
        });
    }

    let target = fs::canonicalize(&joined).map_err(|source| {
        ResolutionError::Io {
            path: joined.clone(),
            source,
        }
    })?;

    if stack.contains(&target) {
        let mut chain = stack.clone();
        chain.push(target);
        return Err(ResolutionError::Cycle { chain });
    }

    logger.debug(&format!(
        "Including {} into {}",
        target.display(),
        included_from.display()
    ));

    let text = read_file(&target)?;
    let body = Document::parse(&text).into_body_children();

    stack.push(target.clone());
    let expanded = expand_includes(body, &target, stack, logger);
    let _ = stack.pop();
    expanded
}

/// Looks up a dot-separated path such as `page.title` in `vars`.
pub fn lookup<'a>(vars: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(vars, |value, segment| match value {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => {
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    })
}

/// Renders a bound value as text.
pub fn value_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn is_reference(expr: &str) -> bool {
    !expr.is_empty()
        && !expr.starts_with('.')
        && !expr.ends_with('.')
        && !expr.contains("..")
        && expr
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape_value(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn note_unbound(unbound: &mut Vec<String>, reference: &str) {
    if !unbound.iter().any(|r| r == reference) {
        unbound.push(reference.to_string());
    }
}

fn merge_braces(
    template: &str,
    vars: &JsonValue,
    unbound: &mut Vec<String>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let (raw, open, close) = if tail.starts_with("{{{") {
            (true, 3, "}}}")
        } else {
            (false, 2, "}}")
        };

        let Some(len) = tail[open..].find(close) else {
            out.push_str(tail);
            return out;
        };
        let end = open + len + close.len();
        let whole = &tail[..end];
        let expr = tail[open..open + len].trim();

        if !is_reference(expr) {
            out.push_str(whole);
        } else if let Some(value) = lookup(vars, expr) {
            let text = value_to_text(value);
            if raw {
                out.push_str(&text);
            } else {
                out.push_str(&escape_value(&text));
            }
        } else {
            note_unbound(unbound, expr);
            out.push_str(whole);
        }

        rest = &tail[end..];
    }

    out.push_str(rest);
    out
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Length of a bare `a.b.c` reference at the start of `text`.
fn bare_reference_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = char::from(bytes[i]);
        if is_ident_char(c) {
            i += 1;
            end = i;
        } else if c == '.'
            && bytes.get(i + 1).map_or(false, |b| is_ident_char(char::from(*b)))
        {
            i += 1;
        } else {
            break;
        }
    }
    end
}

fn merge_velocity(
    template: &str,
    vars: &JsonValue,
    unbound: &mut Vec<String>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let after = &tail[1..];

        let quiet = after.starts_with("!{");
        let braced = quiet || after.starts_with('{');

        if braced {
            let open = if quiet { 2 } else { 1 };
            if let Some(len) = after[open..].find('}') {
                let expr = after[open..open + len].trim();
                let end = 1 + open + len + 1;
                if is_reference(expr) {
                    match lookup(vars, expr) {
                        Some(value) => out.push_str(&value_to_text(value)),
                        None if quiet => {}
                        None => {
                            note_unbound(unbound, expr);
                            out.push_str(&tail[..end]);
                        }
                    }
                } else {
                    out.push_str(&tail[..end]);
                }
                rest = &tail[end..];
                continue;
            }
        } else if after.chars().next().map_or(false, is_ident_start) {
            let len = bare_reference_len(after);
            let expr = &after[..len];
            match lookup(vars, expr) {
                Some(value) => out.push_str(&value_to_text(value)),
                None => {
                    note_unbound(unbound, expr);
                    out.push_str(&tail[..=len]);
                }
            }
            rest = &tail[1 + len..];
            continue;
        }

        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging::MemoryLogger;
    use log::Level;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn body_html(template: &Template) -> String {
        match template.content().unwrap() {
            TemplateContent::Html { document, .. } => {
                crate::document::serialize(&document.body().unwrap().children)
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_markup_from_extension() {
        assert_eq!(
            TemplateMarkup::from_path(Path::new("index.HTML")),
            TemplateMarkup::Html
        );
        assert_eq!(
            TemplateMarkup::from_path(Path::new("page.vm")),
            TemplateMarkup::Velocity
        );
        assert_eq!(
            TemplateMarkup::from_path(Path::new("page.hbs")),
            TemplateMarkup::Unknown
        );
    }

    #[test]
    fn test_include_splices_in_order() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<html><body><p>a</p><shire:include src=\"b.html\"></shire:include><p>c</p></body></html>",
        );
        write(dir.path(), "b.html", "<p>x</p><p>y</p>");

        let logger = MemoryLogger::new();
        let template = resolve("base", dir.path(), &logger).unwrap();

        assert_eq!(
            body_html(&template),
            "<p>a</p><p>x</p><p>y</p><p>c</p>"
        );
    }

    #[test]
    fn test_nested_includes_resolve_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><shire:include src=\"parts/outer.html\"></shire:include></body>",
        );
        write(
            dir.path(),
            "parts/outer.html",
            "<div><shire:include src=\"inner.html\"></shire:include></div>",
        );
        write(dir.path(), "parts/inner.html", "<span>deep</span>");

        let template = resolve("base", dir.path(), &MemoryLogger::new()).unwrap();
        assert_eq!(body_html(&template), "<div><span>deep</span></div>");
    }

    #[test]
    fn test_self_closing_directive_keeps_following_siblings() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><p>a</p><shire:include src=\"b.html\"/><p>c</p></body>",
        );
        write(dir.path(), "b.html", "<p>b</p>");

        let template = resolve("base", dir.path(), &MemoryLogger::new()).unwrap();
        assert_eq!(body_html(&template), "<p>a</p><p>b</p><p>c</p>");
    }

    #[test]
    fn test_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><shire:include src=\"a.html\"></shire:include></body>",
        );
        write(
            dir.path(),
            "a.html",
            "<shire:include src=\"b.html\"></shire:include>",
        );
        write(
            dir.path(),
            "b.html",
            "<shire:include src=\"a.html\"></shire:include>",
        );

        let err = resolve("base", dir.path(), &MemoryLogger::new()).unwrap_err();
        match err {
            ResolutionError::Cycle { chain } => {
                let names: Vec<_> = chain
                    .iter()
                    .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                    .collect();
                assert_eq!(names, vec!["index.html", "a.html", "b.html", "a.html"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_include_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><shire:include src=\"index.html\"></shire:include></body>",
        );
        let err = resolve("base", dir.path(), &MemoryLogger::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::Cycle { ref chain } if chain.len() == 2));
    }

    #[test]
    fn test_same_file_included_twice_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><shire:include src=\"hr.html\"></shire:include><shire:include src=\"hr.html\"></shire:include></body>",
        );
        write(dir.path(), "hr.html", "<hr>");

        let template = resolve("base", dir.path(), &MemoryLogger::new()).unwrap();
        assert_eq!(body_html(&template), "<hr><hr>");
    }

    #[test]
    fn test_missing_include_fails_the_template() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><shire:include src=\"gone.html\"></shire:include></body>",
        );
        let err = resolve("base", dir.path(), &MemoryLogger::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingInclude { .. }));
    }

    #[test]
    fn test_directive_without_src_is_left_with_a_warning() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "index.html",
            "<body><shire:include></shire:include><p>after</p></body>",
        );
        let logger = MemoryLogger::new();
        let template = resolve("base", dir.path(), &logger).unwrap();

        assert_eq!(
            body_html(&template),
            "<shire:include></shire:include><p>after</p>"
        );
        assert!(logger.contains(Level::Warn, "without `src`"));
    }

    #[test]
    fn test_missing_index_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = resolve("base", dir.path(), &MemoryLogger::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::Io { .. }));
    }

    #[test]
    fn test_velocity_template_is_read_raw() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "page.vm", "<h1>$page.title</h1>");
        let mut template = Template::new("vm", dir.path(), "page.vm");
        template.read(&MemoryLogger::new()).unwrap();

        assert_eq!(
            template.content(),
            Some(&TemplateContent::Velocity("<h1>$page.title</h1>".to_string()))
        );
    }

    #[test]
    fn test_merge_braces() {
        let content = TemplateContent::html(Document::parse(
            "<body><h1 title=\"{{ page.title }}\">{{ page.title }}</h1><div>{{{ page.content }}}</div><p>{{ page.missing }}</p></body>",
        ));
        let vars = json!({
            "page": { "title": "Fish & \"Chips\"", "content": "<em>raw</em>" }
        });

        let merged = content.merge_data(&vars);
        assert!(merged.output.contains(
            "<h1 title=\"Fish &amp; &quot;Chips&quot;\">Fish &amp; &quot;Chips&quot;</h1>"
        ));
        assert!(merged.output.contains("<div><em>raw</em></div>"));
        assert!(merged.output.contains("<p>{{ page.missing }}</p>"));
        assert_eq!(merged.unbound, vec!["page.missing".to_string()]);
    }

    #[test]
    fn test_merge_value_conversions() {
        let content = TemplateContent::Velocity(
            "$n $flag [$!{nothing}] ${list} $arr.1 $$ 5$ ${not a ref}".to_string(),
        );
        let vars = json!({
            "n": 3, "flag": true, "nothing": null, "list": [1, 2], "arr": ["a", "b"]
        });

        let merged = content.merge_data(&vars);
        assert_eq!(merged.output, "3 true [] [1,2] b $$ 5$ ${not a ref}");
        assert!(merged.unbound.is_empty());
    }

    #[test]
    fn test_merge_velocity_forms() {
        let content = TemplateContent::Velocity(
            "<title>${site.title}</title><h1>$page.title.</h1>$!{page.gone}${page.gone}"
                .to_string(),
        );
        let vars = json!({
            "page": { "title": "Hello" },
            "site": { "title": "Shire" }
        });

        let merged = content.merge_data(&vars);
        assert_eq!(
            merged.output,
            "<title>Shire</title><h1>Hello.</h1>${page.gone}"
        );
        assert_eq!(merged.unbound, vec!["page.gone".to_string()]);
    }

    #[test]
    fn test_unknown_content_is_unchanged() {
        let content = TemplateContent::Unknown("{{ page.title }}".to_string());
        let merged = content.merge_data(&json!({}));
        assert_eq!(merged.output, "{{ page.title }}");
        assert!(merged.unbound.is_empty());
    }
}
