// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line interface for Shire
//!
//! This module parses the command line and runs a build with the options it
//! names.
//!
//! # Examples
//!
//! ```
//! use shire::cli;
//!
//! let matches = cli::build().get_matches_from(vec![
//!     "shire",
//!     "build",
//!     "--base",
//!     "my-site",
//!     "--set",
//!     "output.minify=true",
//! ]);
//!
//! let args = cli::BuildArgs::from_matches(
//!     matches.subcommand_matches("build").unwrap(),
//! );
//! assert_eq!(args.overrides, vec![("output.minify".to_string(), "true".to_string())]);
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, info};

use crate::build::{BuildOrchestrator, BuildReport};
use crate::core::config::{ConfigLoader, DEFAULT_ENV_PREFIX};
use crate::core::logging::StdLogger;

/// The current version of Shire, as defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base folder used when `--base` is not given.
pub const DEFAULT_BASE_DIR: &str = ".";

/// Builds and configures the Shire command-line interface.
pub fn build() -> Command {
    Command::new("shire")
        .author("Shire Contributors")
        .about("Builds static sites from front-matter pages and include-based templates.")
        .version(VERSION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log output (-v, -vv, -vvv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("build")
                .about("Build the site")
                .arg(
                    Arg::new("base")
                        .short('b')
                        .long("base")
                        .help("Site folder holding shire.config.json")
                        .value_parser(value_parser!(PathBuf))
                        .default_value(DEFAULT_BASE_DIR),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Maximum number of worker threads")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .help("Cancel the build after this many seconds")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("drafts")
                        .short('d')
                        .long("drafts")
                        .help("Include draft pages")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .value_name("KEY=VALUE")
                        .help("Override a configuration value, e.g. output.folder=public")
                        .value_parser(parse_override)
                        .action(ArgAction::Append),
                ),
        )
        .after_help(
            "Configuration values can also be set through SHIRE_* environment \
             variables, with __ between sections (SHIRE_OUTPUT__FOLDER=public).",
        )
}

/// Splits a `KEY=VALUE` override.
pub fn parse_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{}`", raw)),
    }
}

/// Number of `-v` flags given.
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose")
}

/// Options of the `build` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    /// Site folder.
    pub base: PathBuf,
    /// Worker thread cap.
    pub jobs: Option<usize>,
    /// Overall deadline.
    pub timeout: Option<Duration>,
    /// Build drafts.
    pub drafts: bool,
    /// `key=value` configuration overrides, in order.
    pub overrides: Vec<(String, String)>,
}

impl BuildArgs {
    /// Reads the options from the `build` subcommand's matches.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            base: matches
                .get_one::<PathBuf>("base")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR)),
            jobs: matches.get_one::<usize>("jobs").copied(),
            timeout: matches
                .get_one::<u64>("timeout")
                .map(|secs| Duration::from_secs(*secs)),
            drafts: matches.get_flag("drafts"),
            overrides: matches
                .get_many::<(String, String)>("set")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Loads the configuration and runs one build.
pub fn run_build(args: &BuildArgs) -> anyhow::Result<BuildReport> {
    info!("Building site in {}", args.base.display());

    let mut loader =
        ConfigLoader::new(&args.base).with_env_prefix(DEFAULT_ENV_PREFIX);
    let config_path = loader.config_path();
    if args.drafts {
        loader = loader.with_override("build.drafts", "true");
    }
    for (key, value) in &args.overrides {
        loader = loader.with_override(key.as_str(), value.as_str());
    }
    let config = loader.load().with_context(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })?;
    debug!("Loaded configuration: {:?}", config);

    let mut orchestrator = BuildOrchestrator::new(&args.base, config)
        .with_logger(Arc::new(StdLogger));
    if let Some(jobs) = args.jobs {
        orchestrator = orchestrator.with_concurrency(jobs);
    }
    if let Some(timeout) = args.timeout {
        orchestrator = orchestrator.with_deadline(timeout);
    }

    orchestrator
        .run()
        .with_context(|| format!("Build of {} failed", args.base.display()))
}

/// Executes the parsed command line.
pub fn execute(matches: &ArgMatches) -> anyhow::Result<BuildReport> {
    match matches.subcommand() {
        Some(("build", sub_matches)) => {
            run_build(&BuildArgs::from_matches(sub_matches))
        }
        Some((name, _)) => anyhow::bail!("Unknown command `{}`", name),
        None => anyhow::bail!("No command given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_matches(args: Vec<&str>) -> ArgMatches {
        build().get_matches_from(args)
    }

    #[test]
    fn test_build_command_defaults() {
        let matches = get_matches(vec!["shire", "build"]);
        let args =
            BuildArgs::from_matches(matches.subcommand_matches("build").unwrap());

        assert_eq!(args.base, PathBuf::from("."));
        assert_eq!(args.jobs, None);
        assert_eq!(args.timeout, None);
        assert!(!args.drafts);
        assert!(args.overrides.is_empty());
        assert_eq!(verbosity(&matches), 0);
    }

    #[test]
    fn test_build_command_options() {
        let matches = get_matches(vec![
            "shire",
            "build",
            "--base",
            "site",
            "--jobs",
            "4",
            "--timeout",
            "30",
            "--drafts",
            "--set",
            "output.folder=public",
            "--set",
            "title=My Site",
            "-vv",
        ]);
        let args =
            BuildArgs::from_matches(matches.subcommand_matches("build").unwrap());

        assert_eq!(args.base, PathBuf::from("site"));
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.timeout, Some(Duration::from_secs(30)));
        assert!(args.drafts);
        assert_eq!(
            args.overrides,
            vec![
                ("output.folder".to_string(), "public".to_string()),
                ("title".to_string(), "My Site".to_string()),
            ]
        );
        assert_eq!(verbosity(&matches), 2);
    }

    #[test]
    fn test_override_parser() {
        assert_eq!(
            parse_override("a.b=c=d"),
            Ok(("a.b".to_string(), "c=d".to_string()))
        );
        assert_eq!(parse_override("a="), Ok(("a".to_string(), String::new())));
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result =
            build().try_get_matches_from(vec!["shire", "build", "--set", "oops"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = BuildArgs {
            base: dir.path().to_path_buf(),
            jobs: None,
            timeout: None,
            drafts: false,
            overrides: Vec::new(),
        };
        let err = run_build(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load configuration"));
    }
}
