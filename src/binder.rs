// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page to template binding.
//!
//! A page uses the template named in its front matter, or the site default
//! when it names none. An id that matches no template is an error; there is
//! no fallback from a bad page-level id to the default.

use std::collections::HashMap;

use crate::content::Page;
use crate::core::error::BindError;
use crate::template::Template;

/// Returns the id of the template `page` should use.
pub fn template_id_for<'a>(
    page: &'a Page,
    default_template_id: &'a str,
) -> Result<&'a str, BindError> {
    let requested = page.front_matter().template_id.trim();
    if !requested.is_empty() {
        return Ok(requested);
    }

    let default = default_template_id.trim();
    if !default.is_empty() {
        return Ok(default);
    }

    Err(BindError::NoTemplate {
        page: page.path().to_path_buf(),
    })
}

/// Picks the resolved template for `page`.
///
/// # Arguments
///
/// * `page` - The page to bind
/// * `templates` - Every template of the site, keyed by id
/// * `default_template_id` - The site's default template id
///
/// # Returns
///
/// The template, or a `BindError` when none is named, the id is unknown,
/// or the template failed to resolve.
pub fn bind<'t>(
    page: &Page,
    templates: &'t HashMap<String, Template>,
    default_template_id: &str,
) -> Result<&'t Template, BindError> {
    let template_id = template_id_for(page, default_template_id)?;

    let template = templates.get(template_id).ok_or_else(|| {
        BindError::TemplateNotFound {
            template_id: template_id.to_string(),
            page: page.path().to_path_buf(),
        }
    })?;

    if !template.is_resolved() {
        return Err(BindError::TemplateUnresolved {
            template_id: template_id.to_string(),
            page: page.path().to_path_buf(),
        });
    }

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging::MemoryLogger;
    use crate::frontmatter::PageFrontMatter;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn page(template_id: &str) -> Page {
        let mut fm = PageFrontMatter::for_file("a.md");
        fm.template_id = template_id.to_string();
        Page::new(PathBuf::from("/content/a.md"), fm, String::new())
    }

    fn templates(dir: &TempDir, ids: &[&str]) -> HashMap<String, Template> {
        ids.iter()
            .map(|id| {
                let folder = dir.path().join(id);
                fs::create_dir_all(&folder).unwrap();
                fs::write(folder.join("index.html"), "<body></body>").unwrap();
                let mut template = Template::new(*id, folder, "index.html");
                template.read(&MemoryLogger::new()).unwrap();
                (id.to_string(), template)
            })
            .collect()
    }

    #[test]
    fn test_empty_id_uses_default() {
        let dir = TempDir::new().unwrap();
        let templates = templates(&dir, &["base", "post"]);
        let bound = bind(&page(""), &templates, "base").unwrap();
        assert_eq!(bound.id(), "base");
    }

    #[test]
    fn test_page_id_wins() {
        let dir = TempDir::new().unwrap();
        let templates = templates(&dir, &["base", "post"]);
        let bound = bind(&page("post"), &templates, "base").unwrap();
        assert_eq!(bound.id(), "post");
    }

    #[test]
    fn test_missing_default_is_template_not_found() {
        let dir = TempDir::new().unwrap();
        let templates = templates(&dir, &["post"]);
        let err = bind(&page(""), &templates, "base").unwrap_err();
        assert_eq!(
            err,
            BindError::TemplateNotFound {
                template_id: "base".to_string(),
                page: PathBuf::from("/content/a.md"),
            }
        );
    }

    #[test]
    fn test_unknown_page_id_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let templates = templates(&dir, &["base"]);
        let err = bind(&page("nope"), &templates, "base").unwrap_err();
        assert!(matches!(err, BindError::TemplateNotFound { ref template_id, .. } if template_id == "nope"));
    }

    #[test]
    fn test_no_template_at_all() {
        let err = bind(&page(""), &HashMap::new(), "  ").unwrap_err();
        assert!(matches!(err, BindError::NoTemplate { .. }));
    }

    #[test]
    fn test_unresolved_template() {
        let mut templates = HashMap::new();
        let _ = templates.insert(
            "base".to_string(),
            Template::new("base", "/nowhere", "index.html"),
        );
        let err = bind(&page(""), &templates, "base").unwrap_err();
        assert!(matches!(err, BindError::TemplateUnresolved { .. }));
    }
}
