//! # faultline-net::netlist
//!
//! The frozen circuit graph. Nothing here mutates after construction;
//! every downstream structure relies on stable ids and the precomputed
//! levels, dominators and FFR/MFFC partitions.

use crate::node::{CircuitNode, NodeKind};
use faultline_types::NodeId;

pub type FfrId = u32;
pub type MffcId = u32;

/// A maximal cone of single-fanout nodes terminating at a fanout branch
/// or PPO.
#[derive(Debug, Clone)]
pub struct Ffr {
    pub id: FfrId,
    pub root: NodeId,
    /// Member nodes in topological order; the root comes last.
    pub nodes: Vec<NodeId>,
    /// Boundary fanins outside the region, in first-encounter order.
    pub inputs: Vec<NodeId>,
}

/// The set of FFRs dominated by a single root.
#[derive(Debug, Clone)]
pub struct Mffc {
    pub id: MffcId,
    pub root: NodeId,
    /// Constituent FFRs in dependency (topological) order; the root FFR
    /// comes last.
    pub ffrs: Vec<FfrId>,
}

impl Mffc {
    pub fn ffr_num(&self) -> usize {
        self.ffrs.len()
    }
}

/// The immutable post-elaboration logic graph.
#[derive(Debug)]
pub struct Netlist {
    pub(crate) nodes: Vec<CircuitNode>,
    pub(crate) input_num: u32,
    pub(crate) output_num: u32,
    pub(crate) dff_num: u32,
    pub(crate) ppi_list: Vec<NodeId>,
    pub(crate) ppo_list: Vec<NodeId>,
    pub(crate) ffr_list: Vec<Ffr>,
    pub(crate) mffc_list: Vec<Mffc>,
    pub(crate) ffr_of: Vec<FfrId>,
    pub(crate) max_level: u32,
}

impl Netlist {
    pub fn node_num(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &CircuitNode {
        &self.nodes[id as usize]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CircuitNode> {
        self.nodes.iter()
    }

    /// Number of true primary inputs.
    pub fn input_num(&self) -> usize {
        self.input_num as usize
    }

    /// Number of true primary outputs.
    pub fn output_num(&self) -> usize {
        self.output_num as usize
    }

    pub fn dff_num(&self) -> usize {
        self.dff_num as usize
    }

    pub fn ppi_num(&self) -> usize {
        self.ppi_list.len()
    }

    pub fn ppo_num(&self) -> usize {
        self.ppo_list.len()
    }

    /// PPI nodes: true inputs first, then DFF outputs.
    pub fn ppi_list(&self) -> &[NodeId] {
        &self.ppi_list
    }

    /// PPO nodes: true outputs first, then DFF inputs.
    pub fn ppo_list(&self) -> &[NodeId] {
        &self.ppo_list
    }

    /// The DFF-input node feeding DFF `dff_id`.
    pub fn dff_input(&self, dff_id: u32) -> NodeId {
        self.ppo_list[self.output_num as usize + dff_id as usize]
    }

    /// The DFF-output node of DFF `dff_id`.
    pub fn dff_output(&self, dff_id: u32) -> NodeId {
        self.ppi_list[self.input_num as usize + dff_id as usize]
    }

    pub fn ffr_list(&self) -> &[Ffr] {
        &self.ffr_list
    }

    pub fn ffr(&self, id: FfrId) -> &Ffr {
        &self.ffr_list[id as usize]
    }

    /// The FFR containing a node.
    pub fn ffr_of(&self, node: NodeId) -> FfrId {
        self.ffr_of[node as usize]
    }

    pub fn mffc_list(&self) -> &[Mffc] {
        &self.mffc_list
    }

    pub fn mffc(&self, id: MffcId) -> &Mffc {
        &self.mffc_list[id as usize]
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// PPO position of a node, if it is a PPO.
    pub fn output_id(&self, node: NodeId) -> Option<u32> {
        self.node(node).output_id(self.output_num)
    }

    /// PPI position of a node, if it is a PPI.
    pub fn ppi_id(&self, node: NodeId) -> Option<u32> {
        match self.node(node).kind {
            NodeKind::PrimaryInput { input_id } => Some(input_id),
            NodeKind::DffOutput { dff_id } => Some(self.input_num + dff_id),
            _ => None,
        }
    }
}
