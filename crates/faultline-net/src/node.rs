//! # faultline-net::node
//!
//! One node of the circuit graph. Nodes refer to each other by dense
//! integer ids into the netlist's node vector; fanin/fanout arrays hold
//! ids, not references, so the graph is cycle-free by construction and
//! trivially shareable across threads.

use crate::gate::GateType;
use faultline_types::NodeId;

/// What a node is. Pseudo-primary inputs are `PrimaryInput` and
/// `DffOutput`; pseudo-primary outputs are `PrimaryOutput` and `DffInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    PrimaryInput { input_id: u32 },
    DffOutput { dff_id: u32 },
    PrimaryOutput { output_id: u32 },
    DffInput { dff_id: u32 },
    Logic { gate: GateType },
}

/// An immutable node of the elaborated circuit graph.
#[derive(Debug, Clone)]
pub struct CircuitNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Ordered fanin ids; length matches the gate arity.
    pub fanins: Vec<NodeId>,
    /// Fanout ids, ascending.
    pub fanouts: Vec<NodeId>,
    /// Longest path from any PPI; 0 for PPIs.
    pub level: u32,
    /// Immediate dominator toward the outputs, `None` when only the
    /// virtual sink dominates.
    pub imm_dom: Option<NodeId>,
    /// Root of the fan-out-free region containing this node.
    pub ffr_root: NodeId,
    /// Root of the maximal fan-out-free cone containing this node.
    pub mffc_root: NodeId,
}

impl CircuitNode {
    pub fn is_ppi(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::PrimaryInput { .. } | NodeKind::DffOutput { .. }
        )
    }

    pub fn is_ppo(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::PrimaryOutput { .. } | NodeKind::DffInput { .. }
        )
    }

    pub fn is_logic(&self) -> bool {
        matches!(self.kind, NodeKind::Logic { .. })
    }

    /// The gate primitive this node computes. PPO and DFF-input nodes act
    /// as buffers of their single fanin; PPIs compute nothing.
    pub fn gate_type(&self) -> Option<GateType> {
        match self.kind {
            NodeKind::Logic { gate } => Some(gate),
            NodeKind::PrimaryOutput { .. } | NodeKind::DffInput { .. } => Some(GateType::Buf),
            _ => None,
        }
    }

    /// Position of this node in the PPO list, if it is one.
    pub fn output_id(&self, output_num: u32) -> Option<u32> {
        match self.kind {
            NodeKind::PrimaryOutput { output_id } => Some(output_id),
            NodeKind::DffInput { dff_id } => Some(output_num + dff_id),
            _ => None,
        }
    }

    pub fn fanin_num(&self) -> usize {
        self.fanins.len()
    }

    pub fn fanout_num(&self) -> usize {
        self.fanouts.len()
    }

    /// True when this node roots a fan-out-free region.
    pub fn is_ffr_root(&self) -> bool {
        self.ffr_root == self.id
    }
}
