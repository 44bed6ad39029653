//! # sbx — Snapbox CLI
//!
//! Minimal container engine over btrfs snapshots, kernel namespaces,
//! and cgroups v2. Single binary for managing images and containers.

#![allow(
    clippy::unnecessary_wraps,
    clippy::needless_pass_by_value,
    clippy::print_stdout,
    clippy::print_stderr
)]

mod commands;

use clap::Parser;

use snapbox_common::error::SnapboxError;

use crate::commands::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = commands::execute(cli) {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<SnapboxError>()
            .map_or(1, SnapboxError::exit_code);
        std::process::exit(code);
    }
}
