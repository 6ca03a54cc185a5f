//! # faultline-cli::commands::simulate
//!
//! Implements the `simulate` subcommand: run a pattern file against the
//! full fault list and report coverage, dropping each fault at its first
//! detection.

use crate::args::SimOpts;
use crate::netlist_file;
use anyhow::{Context, Result};
use faultline_fsim::Fsim;
use faultline_net::FaultModel;
use faultline_types::TestVector;
use std::fs;

pub fn exec(opts: SimOpts) -> Result<()> {
    let net = netlist_file::load(&opts.netlist)?;
    let fault_type = opts.fault_type.into();
    let fm = FaultModel::new(&net, fault_type);
    let mut fsim = Fsim::new(&net, &fm);

    let text = fs::read_to_string(&opts.patterns)
        .with_context(|| format!("reading patterns {}", opts.patterns.display()))?;
    let mut patterns = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tv = TestVector::from_bin_str(net.input_num(), net.dff_num(), fault_type, line)
            .with_context(|| format!("pattern on line {}", lineno + 1))?;
        patterns.push(tv);
    }

    let mut detected = 0usize;
    for (i, tv) in patterns.iter().enumerate() {
        let mut newly = Vec::new();
        fsim.sppfp(tv, |fid, _| newly.push(fid));
        for &fid in &newly {
            fsim.set_skip(fid);
        }
        detected += newly.len();
        println!("pattern {:>4}: {} new faults", i, newly.len());
    }

    println!(
        "{} patterns detect {} of {} faults ({:.2}%)",
        patterns.len(),
        detected,
        fm.fault_num(),
        100.0 * detected as f64 / fm.fault_num() as f64
    );
    Ok(())
}
