// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Shire CLI
//!
//! This is the main entry point for the Shire command-line interface.
//! It initializes the logger, runs the requested command and prints the
//! build report.

use log::info;
use shire::cli;

/// Installs `env_logger`. `RUST_LOG` takes precedence over `-v`.
fn init_logger(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .format_timestamp(None)
    .init();
}

/// The main entry point for the Shire CLI.
fn main() {
    let matches = cli::build().get_matches();
    init_logger(cli::verbosity(&matches));
    info!("Starting Shire v{}", cli::VERSION);

    match cli::execute(&matches) {
        Ok(report) => {
            println!("{}", report);
            for error in &report.errors {
                eprintln!("  {}", error);
            }
            if report.cancelled {
                eprintln!("Error: build stopped before finishing");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
