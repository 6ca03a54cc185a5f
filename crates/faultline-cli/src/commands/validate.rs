//! # faultline-cli::commands::validate
//!
//! Implements the `validate` subcommand: parse and elaborate a netlist,
//! then print its structural summary.

use crate::netlist_file;
use anyhow::Result;
use faultline_net::FaultModel;
use faultline_types::FaultType;
use std::path::PathBuf;

pub fn exec(netlist: PathBuf) -> Result<()> {
    let net = netlist_file::load(&netlist)?;
    let fm = FaultModel::new(&net, FaultType::StuckAt);

    println!("{}: OK", netlist.display());
    println!("  inputs    : {}", net.input_num());
    println!("  outputs   : {}", net.output_num());
    println!("  dffs      : {}", net.dff_num());
    println!("  nodes     : {}", net.node_num());
    println!("  max level : {}", net.max_level());
    println!("  FFRs      : {}", net.ffr_list().len());
    println!("  MFFCs     : {}", net.mffc_list().len());
    println!("  faults    : {} (stuck-at, collapsed)", fm.fault_num());
    Ok(())
}
