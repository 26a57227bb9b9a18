// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core building blocks shared by every stage of the build: configuration,
//! errors, logging and the collaborator traits.

/// Site configuration loading and overrides.
pub mod config;
/// Error types and the report classification.
pub mod error;
/// Build logger implementations.
pub mod logging;
/// Collaborator traits.
pub mod traits;
