//! # faultline-fsim::network
//!
//! The simulation-oriented mirror of the circuit graph. Node ids are
//! identical to the netlist's, so faults and assignments translate
//! without a map. The network itself is immutable and shared; all
//! per-simulation state lives in the engines.

use crate::node::{SimFunc, SimNode};
use faultline_net::{Netlist, NodeKind};
use faultline_types::FaultId;

/// One fan-out-free region, with the faults whose origin lies inside it.
#[derive(Debug, Clone)]
pub struct SimFfr {
    pub root: u32,
    pub faults: Vec<FaultId>,
}

/// Immutable simulation mirror of a `Netlist`.
#[derive(Debug)]
pub struct SimNetwork {
    nodes: Vec<SimNode>,
    /// PPI node ids: true inputs first, then DFF outputs.
    ppi_nodes: Vec<u32>,
    /// PPO node ids: true outputs first, then DFF inputs.
    ppo_nodes: Vec<u32>,
    /// Non-PPI nodes in topological order.
    logic_order: Vec<u32>,
    input_num: usize,
    output_num: usize,
    dff_num: usize,
    max_level: u32,
}

impl SimNetwork {
    pub fn new(net: &Netlist) -> Self {
        let output_num = net.output_num() as u32;
        let nodes: Vec<SimNode> = net
            .nodes()
            .map(|cn| {
                let func = match cn.kind {
                    NodeKind::PrimaryInput { .. } | NodeKind::DffOutput { .. } => SimFunc::Input,
                    _ => SimFunc::Gate(cn.gate_type().expect("non-PPI node has a function")),
                };
                let fanout_ipos = if cn.fanouts.len() == 1 {
                    let fo = net.node(cn.fanouts[0]);
                    fo.fanins.iter().position(|&f| f == cn.id).unwrap() as u32
                } else {
                    0
                };
                SimNode {
                    id: cn.id,
                    func,
                    fanins: cn.fanins.clone(),
                    level: cn.level,
                    fanouts: cn.fanouts.clone(),
                    fanout_ipos,
                    ffr_root: cn.is_ffr_root(),
                    output_id: cn.output_id(output_num),
                }
            })
            .collect();

        let logic_order = nodes
            .iter()
            .filter(|n| n.func != SimFunc::Input)
            .map(|n| n.id)
            .collect();

        SimNetwork {
            nodes,
            ppi_nodes: net.ppi_list().to_vec(),
            ppo_nodes: net.ppo_list().to_vec(),
            logic_order,
            input_num: net.input_num(),
            output_num: net.output_num(),
            dff_num: net.dff_num(),
            max_level: net.max_level(),
        }
    }

    pub fn node_num(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: u32) -> &SimNode {
        &self.nodes[id as usize]
    }

    pub fn ppi_nodes(&self) -> &[u32] {
        &self.ppi_nodes
    }

    pub fn ppo_nodes(&self) -> &[u32] {
        &self.ppo_nodes
    }

    /// Non-PPI nodes in evaluation order.
    pub fn logic_order(&self) -> &[u32] {
        &self.logic_order
    }

    pub fn input_num(&self) -> usize {
        self.input_num
    }

    pub fn output_num(&self) -> usize {
        self.output_num
    }

    pub fn dff_num(&self) -> usize {
        self.dff_num
    }

    pub fn ppi_num(&self) -> usize {
        self.input_num + self.dff_num
    }

    pub fn ppo_num(&self) -> usize {
        self.output_num + self.dff_num
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// The DFF-input (capture side) node of DFF `i`.
    pub fn dff_input_node(&self, i: usize) -> u32 {
        self.ppo_nodes[self.output_num + i]
    }

    /// The DFF-output (launch side) node of DFF `i`.
    pub fn dff_output_node(&self, i: usize) -> u32 {
        self.ppi_nodes[self.input_num + i]
    }

    /// Walks single-fanout edges from `node` up to its FFR root.
    pub fn ffr_root_of(&self, mut node: u32) -> u32 {
        while !self.nodes[node as usize].ffr_root {
            node = self.nodes[node as usize].fanouts[0];
        }
        node
    }
}
