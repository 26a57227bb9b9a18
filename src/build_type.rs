// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output formats and the per-page format selection.
//!
//! A page's effective build types are always computed from the current
//! configuration and front matter, never stored on the page.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::content::Page;
use crate::core::config::SiteConfig;

/// A requested output format.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Rendered HTML page.
    Html,
    /// Front matter plus rendered content as JSON.
    Json,
    /// PDF produced from the rendered HTML.
    Pdf,
}

impl BuildType {
    /// All build types, in dispatch order.
    pub const ALL: [BuildType; 3] =
        [BuildType::Html, BuildType::Json, BuildType::Pdf];

    /// File extension used for artifacts of this type.
    pub fn extension(self) -> &'static str {
        match self {
            BuildType::Html => "html",
            BuildType::Json => "json",
            BuildType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(BuildType::Html),
            "json" => Ok(BuildType::Json),
            "pdf" => Ok(BuildType::Pdf),
            other => Err(format!("unknown build type `{}`", other)),
        }
    }
}

/// Computes the set of formats to render for `page`.
///
/// The site's enabled formats apply unless the page carries its own list,
/// which replaces them outright. An empty result means the page is skipped.
pub fn select_types(page: &Page, config: &SiteConfig) -> BTreeSet<BuildType> {
    if let Some(overrides) = &page.front_matter().build_types {
        return overrides.clone();
    }

    let output = &config.output;
    BuildType::ALL
        .into_iter()
        .filter(|build_type| match build_type {
            BuildType::Html => output.html,
            BuildType::Json => output.json,
            BuildType::Pdf => output.pdf,
        })
        .collect()
}
