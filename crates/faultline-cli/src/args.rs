//! # faultline-cli::args
//!
//! Defines the command-line argument structure using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate test patterns for a netlist.
    Run(RunOpts),
    /// Check a netlist file and print its structure summary.
    Validate {
        #[arg(value_name = "NETLIST_PATH")]
        netlist: PathBuf,
    },
    /// Fault-simulate a pattern file against a netlist.
    Simulate(SimOpts),
}

#[derive(Args, Debug)]
pub struct RunOpts {
    /// Path to the netlist file.
    pub netlist: PathBuf,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fault model to target (overrides the config file).
    #[arg(long)]
    pub fault_type: Option<FaultTypeArg>,

    /// Override the RNG seed of the random phase.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the worker thread count (0 = hardware concurrency).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Write the generated patterns, one bin-form vector per line.
    #[arg(long)]
    pub dump_patterns: Option<PathBuf>,

    /// Print the run statistics as JSON on stdout.
    #[arg(long)]
    pub stats_json: bool,
}

#[derive(Args, Debug)]
pub struct SimOpts {
    /// Path to the netlist file.
    pub netlist: PathBuf,

    /// Pattern file: one bin-form vector per line.
    pub patterns: PathBuf,

    /// Fault model to simulate.
    #[arg(long, default_value = "stuck-at")]
    pub fault_type: FaultTypeArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTypeArg {
    StuckAt,
    TransitionDelay,
}

impl From<FaultTypeArg> for faultline_types::FaultType {
    fn from(v: FaultTypeArg) -> Self {
        match v {
            FaultTypeArg::StuckAt => faultline_types::FaultType::StuckAt,
            FaultTypeArg::TransitionDelay => faultline_types::FaultType::TransitionDelay,
        }
    }
}
