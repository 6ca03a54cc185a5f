//! # faultline-cli
//!
//! The main entry point for the faultline binary. Parses command-line
//! arguments, installs the tracing subscriber and dispatches to the
//! subcommand handlers.

#![forbid(unsafe_code)]

use crate::args::{Cli, Command};
use anyhow::Result;
use clap::Parser;

mod args;
mod commands;
mod netlist_file;

fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match args.command {
        Command::Run(opts) => commands::run::exec(opts),
        Command::Validate { netlist } => commands::validate::exec(netlist),
        Command::Simulate(opts) => commands::simulate::exec(opts),
    }
}
