//! # faultline-cli::commands::run
//!
//! Implements the `run` subcommand: load a netlist, build the fault
//! model, run the ATPG flow and report per-fault status plus the
//! generated vectors.

use crate::args::RunOpts;
use crate::netlist_file;
use anyhow::{Context, Result};
use faultline_dtpg::run_atpg;
use faultline_net::FaultModel;
use faultline_types::config::AtpgConfig;
use faultline_types::FaultStatus;
use std::fs;
use std::io::Write;

pub fn exec(opts: RunOpts) -> Result<()> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            AtpgConfig::from_toml(&text)?
        }
        None => AtpgConfig::default(),
    };
    if let Some(ft) = opts.fault_type {
        config.fault_type = ft.into();
    }
    if let Some(seed) = opts.seed {
        config.seed = seed;
    }
    if let Some(threads) = opts.threads {
        config.threads = threads;
    }

    let net = netlist_file::load(&opts.netlist)?;
    let fm = FaultModel::new(&net, config.fault_type);
    println!(
        "{}: {} nodes, {} FFRs, {} MFFCs, {} faults (seed {})",
        opts.netlist.display(),
        net.node_num(),
        net.ffr_list().len(),
        net.mffc_list().len(),
        fm.fault_num(),
        config.seed,
    );

    let stats_json = opts.stats_json;
    let (status, patterns, stats) = run_atpg(&net, &fm, config)?;

    let detected = status.count(FaultStatus::Detected);
    let untestable = status.count(FaultStatus::Untestable);
    let aborted = status.count(FaultStatus::Aborted);
    let undetected = status.count(FaultStatus::Undetected);
    println!(
        "detected {} / untestable {} / aborted {} / undetected {}",
        detected, untestable, aborted, undetected
    );
    let testable = fm.fault_num() - untestable;
    if testable > 0 {
        println!(
            "fault coverage: {:.2}% ({} patterns)",
            100.0 * detected as f64 / testable as f64,
            patterns.len()
        );
    }

    for (fid, st) in status.iter() {
        if st != FaultStatus::Detected {
            println!("  {:<10} {}", st.to_string(), fm.fault_name(&net, fid));
        }
    }

    if let Some(path) = &opts.dump_patterns {
        let mut file = fs::File::create(path)
            .with_context(|| format!("creating pattern file {}", path.display()))?;
        for tv in &patterns {
            writeln!(file, "{}", tv.bin_str())?;
        }
        println!("wrote {} patterns to {}", patterns.len(), path.display());
    }

    if stats_json {
        let json = serde_json::json!({
            "faults": fm.fault_num(),
            "detected": detected,
            "untestable": untestable,
            "aborted": aborted,
            "undetected": undetected,
            "patterns": patterns.len(),
            "rtpg_detected": stats.rtpg_detected,
            "drop_detected": stats.drop_detected,
            "cnf_count": stats.cnf_count,
            "sat_solves": stats.sat.solve_count,
            "sat_clauses": stats.sat.clause_count,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    Ok(())
}
