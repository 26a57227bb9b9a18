// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output generation: HTML post-processing, artifact sinks and the sitemap.

/// HTML post-processing.
pub mod html;
/// Artifact sinks.
pub mod sink;
/// Sitemap generation.
pub mod sitemap;
