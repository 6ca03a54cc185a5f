//! # faultline-net::builder
//!
//! Programmatic construction of a `Netlist`. Nodes are appended in
//! creation order and may only reference already-created nodes, so the
//! node vector is topologically ordered and acyclic by construction.
//! `finish()` validates the structure and freezes levels, dominators and
//! the FFR/MFFC partitions.

use crate::errors::NetlistError;
use crate::gate::GateType;
use crate::netlist::{Ffr, Mffc, Netlist};
use crate::node::{CircuitNode, NodeKind};
use faultline_types::NodeId;
use tracing::debug;

struct ProtoNode {
    name: String,
    kind: NodeKind,
    fanins: Vec<NodeId>,
}

/// Incremental netlist builder.
#[derive(Default)]
pub struct NetlistBuilder {
    nodes: Vec<ProtoNode>,
    input_num: u32,
    output_num: u32,
    /// (dff output node, name, source node once connected)
    dffs: Vec<(NodeId, String, Option<NodeId>)>,
}

impl NetlistBuilder {
    pub fn new() -> Self {
        NetlistBuilder::default()
    }

    /// Adds a primary input.
    pub fn add_input(&mut self, name: impl Into<String>) -> NodeId {
        let input_id = self.input_num;
        self.input_num += 1;
        self.push(ProtoNode {
            name: name.into(),
            kind: NodeKind::PrimaryInput { input_id },
            fanins: Vec::new(),
        })
    }

    /// Adds a DFF and returns its output node (usable as a fanin).
    /// The data input is wired later with `connect_dff`.
    pub fn add_dff(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let dff_id = self.dffs.len() as u32;
        let id = self.push(ProtoNode {
            name: name.clone(),
            kind: NodeKind::DffOutput { dff_id },
            fanins: Vec::new(),
        });
        self.dffs.push((id, name, None));
        id
    }

    /// Connects the data input of a DFF created with `add_dff`.
    pub fn connect_dff(&mut self, dff: NodeId, src: NodeId) -> Result<(), NetlistError> {
        self.check_node(src)?;
        let entry = self
            .dffs
            .iter_mut()
            .find(|(out, _, _)| *out == dff)
            .ok_or(NetlistError::UnknownNode(dff))?;
        entry.2 = Some(src);
        Ok(())
    }

    /// Adds a logic gate.
    pub fn add_gate(
        &mut self,
        name: impl Into<String>,
        gate: GateType,
        fanins: &[NodeId],
    ) -> Result<NodeId, NetlistError> {
        let name = name.into();
        for &f in fanins {
            self.check_node(f)?;
        }
        if !gate.arity_ok(fanins.len()) {
            return Err(NetlistError::ArityMismatch {
                name,
                gate: match gate {
                    GateType::Buf => "buf",
                    GateType::Not => "not",
                    GateType::And => "and",
                    GateType::Nand => "nand",
                    GateType::Or => "or",
                    GateType::Nor => "nor",
                    GateType::Xor => "xor",
                    GateType::Xnor => "xnor",
                },
                found: fanins.len(),
            });
        }
        Ok(self.push(ProtoNode {
            name,
            kind: NodeKind::Logic { gate },
            fanins: fanins.to_vec(),
        }))
    }

    /// Adds a primary output driven by `src`.
    pub fn add_output(&mut self, name: impl Into<String>, src: NodeId) -> Result<NodeId, NetlistError> {
        self.check_node(src)?;
        let output_id = self.output_num;
        self.output_num += 1;
        Ok(self.push(ProtoNode {
            name: name.into(),
            kind: NodeKind::PrimaryOutput { output_id },
            fanins: vec![src],
        }))
    }

    /// Validates the structure and produces the frozen netlist.
    pub fn finish(mut self) -> Result<Netlist, NetlistError> {
        // materialize the DFF input nodes last; their sources always have
        // smaller ids, so creation order stays topological
        for i in 0..self.dffs.len() {
            let (_, name, src) = self.dffs[i].clone();
            let src = src.ok_or_else(|| NetlistError::UnconnectedDff(name.clone()))?;
            self.push(ProtoNode {
                name: format!("{}.d", name),
                kind: NodeKind::DffInput { dff_id: i as u32 },
                fanins: vec![src],
            });
        }

        if self.output_num == 0 && self.dffs.is_empty() {
            return Err(NetlistError::NoOutputs);
        }

        let n = self.nodes.len();
        let mut fanouts: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for (id, pn) in self.nodes.iter().enumerate() {
            for &f in &pn.fanins {
                fanouts[f as usize].push(id as NodeId);
            }
        }

        let mut nodes: Vec<CircuitNode> = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(id, pn)| CircuitNode {
                id: id as NodeId,
                name: pn.name,
                kind: pn.kind,
                fanins: pn.fanins,
                fanouts: std::mem::take(&mut fanouts[id]),
                level: 0,
                imm_dom: None,
                ffr_root: id as NodeId,
                mffc_root: id as NodeId,
            })
            .collect();

        // levels
        let mut max_level = 0;
        for id in 0..n {
            let level = if nodes[id].is_ppi() {
                0
            } else {
                1 + nodes[id]
                    .fanins
                    .iter()
                    .map(|&f| nodes[f as usize].level)
                    .max()
                    .unwrap_or(0)
            };
            nodes[id].level = level;
            max_level = max_level.max(level);
        }

        // every non-PPO node must drive something
        for node in &nodes {
            if node.fanouts.is_empty() && !node.is_ppo() {
                return Err(NetlistError::DanglingNode(node.name.clone()));
            }
        }

        // FFR roots: a node roots its region iff it is a PPO or its fanout
        // count differs from 1; other nodes inherit from their sole fanout
        for id in (0..n).rev() {
            if nodes[id].is_ppo() || nodes[id].fanout_num() != 1 {
                nodes[id].ffr_root = id as NodeId;
            } else {
                let fo = nodes[id].fanouts[0];
                nodes[id].ffr_root = nodes[fo as usize].ffr_root;
            }
        }

        // immediate dominators toward a virtual sink over all PPOs
        // (Cooper/Harvey/Kennedy intersection; fanout ids are always
        // larger, so one reverse pass suffices on the DAG)
        let mut idom: Vec<Option<NodeId>> = vec![None; n];
        for id in (0..n).rev() {
            if nodes[id].is_ppo() {
                idom[id] = None;
                continue;
            }
            let fos = &nodes[id].fanouts;
            let mut cur = Some(fos[0]);
            for &fo in &fos[1..] {
                cur = intersect(cur, Some(fo), &idom);
                if cur.is_none() {
                    break;
                }
            }
            idom[id] = cur;
        }
        for id in 0..n {
            nodes[id].imm_dom = idom[id];
        }

        // MFFC root: topmost node of the dominator chain
        for id in (0..n).rev() {
            nodes[id].mffc_root = match idom[id] {
                None => id as NodeId,
                Some(d) => nodes[d as usize].mffc_root,
            };
        }

        // PPI / PPO lists
        let mut ppi_list = vec![0; self.input_num as usize + self.dffs.len()];
        let mut ppo_list = vec![0; self.output_num as usize + self.dffs.len()];
        for node in &nodes {
            match node.kind {
                NodeKind::PrimaryInput { input_id } => ppi_list[input_id as usize] = node.id,
                NodeKind::DffOutput { dff_id } => {
                    ppi_list[self.input_num as usize + dff_id as usize] = node.id
                }
                NodeKind::PrimaryOutput { output_id } => ppo_list[output_id as usize] = node.id,
                NodeKind::DffInput { dff_id } => {
                    ppo_list[self.output_num as usize + dff_id as usize] = node.id
                }
                NodeKind::Logic { .. } => {}
            }
        }

        // FFR membership, in topological order per region
        let mut ffr_list: Vec<Ffr> = Vec::new();
        let mut ffr_of = vec![0u32; n];
        let mut ffr_id_of_root = vec![u32::MAX; n];
        for node in &nodes {
            if node.is_ffr_root() {
                let id = ffr_list.len() as u32;
                ffr_id_of_root[node.id as usize] = id;
                ffr_list.push(Ffr {
                    id,
                    root: node.id,
                    nodes: Vec::new(),
                    inputs: Vec::new(),
                });
            }
        }
        for node in &nodes {
            let fid = ffr_id_of_root[node.ffr_root as usize];
            ffr_of[node.id as usize] = fid;
            ffr_list[fid as usize].nodes.push(node.id);
        }
        for ffr in &mut ffr_list {
            for &m in &ffr.nodes {
                for &f in &nodes[m as usize].fanins {
                    if nodes[f as usize].ffr_root != ffr.root && !ffr.inputs.contains(&f) {
                        ffr.inputs.push(f);
                    }
                }
            }
        }

        // MFFCs: group FFRs under the topmost dominator of their root
        let mut mffc_list: Vec<Mffc> = Vec::new();
        let mut mffc_id_of_root = vec![u32::MAX; n];
        for node in &nodes {
            if node.is_ffr_root() && node.mffc_root == node.id {
                let id = mffc_list.len() as u32;
                mffc_id_of_root[node.id as usize] = id;
                mffc_list.push(Mffc {
                    id,
                    root: node.id,
                    ffrs: Vec::new(),
                });
            }
        }
        for ffr in &ffr_list {
            let mroot = nodes[ffr.root as usize].mffc_root;
            let mid = mffc_id_of_root[mroot as usize];
            mffc_list[mid as usize].ffrs.push(ffr.id);
        }

        debug!(
            nodes = n,
            ffrs = ffr_list.len(),
            mffcs = mffc_list.len(),
            max_level,
            "netlist elaborated"
        );

        Ok(Netlist {
            nodes,
            input_num: self.input_num,
            output_num: self.output_num,
            dff_num: self.dffs.len() as u32,
            ppi_list,
            ppo_list,
            ffr_list,
            mffc_list,
            ffr_of,
            max_level,
        })
    }

    fn push(&mut self, pn: ProtoNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(pn);
        id
    }

    fn check_node(&self, id: NodeId) -> Result<(), NetlistError> {
        if (id as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(NetlistError::UnknownNode(id))
        }
    }
}

/// Walks the dominator chains of `a` and `b` up toward the virtual sink
/// until they meet. `None` stands for the sink itself.
fn intersect(
    a: Option<NodeId>,
    b: Option<NodeId>,
    idom: &[Option<NodeId>],
) -> Option<NodeId> {
    let (mut a, mut b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return None,
    };
    while a != b {
        // dominators always have larger ids; advance the smaller side
        if a < b {
            a = idom[a as usize]?;
        } else {
            b = idom[b as usize]?;
        }
    }
    Some(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2-to-1 mux: out = (d0 & !s) | (d1 & s)
    fn mux() -> Netlist {
        let mut b = NetlistBuilder::new();
        let s = b.add_input("s");
        let d0 = b.add_input("d0");
        let d1 = b.add_input("d1");
        let ns = b.add_gate("ns", GateType::Not, &[s]).unwrap();
        let a0 = b.add_gate("a0", GateType::And, &[d0, ns]).unwrap();
        let a1 = b.add_gate("a1", GateType::And, &[d1, s]).unwrap();
        let o = b.add_gate("o", GateType::Or, &[a0, a1]).unwrap();
        b.add_output("out", o).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn levels_follow_longest_path() {
        let net = mux();
        for node in net.nodes() {
            if node.is_ppi() {
                assert_eq!(node.level, 0);
            } else {
                let expect = 1 + node
                    .fanins
                    .iter()
                    .map(|&f| net.node(f).level)
                    .max()
                    .unwrap();
                assert_eq!(node.level, expect, "node {}", node.name);
            }
        }
    }

    #[test]
    fn ffr_roots_are_branches_or_ppos() {
        let net = mux();
        for node in net.nodes() {
            let root = net.node(node.ffr_root);
            assert!(root.is_ppo() || root.fanout_num() != 1);
            // the root is reachable through single-fanout edges
            let mut cur = node.id;
            while cur != node.ffr_root {
                let c = net.node(cur);
                assert_eq!(c.fanout_num(), 1);
                cur = c.fanouts[0];
            }
        }
    }

    #[test]
    fn mux_select_is_dominated_by_the_or() {
        let net = mux();
        // node ids: s=0 d0=1 d1=2 ns=3 a0=4 a1=5 o=6 out=7
        // s fans out to ns and a1; every path rejoins at the OR
        assert_eq!(net.node(0).imm_dom, Some(6));
        // single-fanout nodes are dominated by their fanout
        assert_eq!(net.node(3).imm_dom, Some(4));
        // the output port node is dominated only by the sink
        assert_eq!(net.node(7).imm_dom, None);
    }

    #[test]
    fn mux_is_one_mffc() {
        let net = mux();
        // everything is dominated by the single output port
        assert_eq!(net.mffc_list().len(), 1);
        let mffc = &net.mffc_list()[0];
        assert_eq!(net.node(mffc.root).name, "out");
        // FFRs: the OR cone and the three input stems (s, d0, d1 have
        // fanout != 1 only for s; d0/d1 have fanout 1 and join cones)
        assert!(mffc.ffr_num() >= 2);
    }

    #[test]
    fn arity_is_checked() {
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        assert!(matches!(
            b.add_gate("g", GateType::And, &[a]),
            Err(NetlistError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn unconnected_dff_is_rejected() {
        let mut b = NetlistBuilder::new();
        let _q = b.add_dff("q");
        assert!(matches!(
            b.finish(),
            Err(NetlistError::UnconnectedDff(_))
        ));
    }

    #[test]
    fn dangling_node_is_rejected() {
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        let x = b.add_input("x");
        let g = b.add_gate("g", GateType::Not, &[a]).unwrap();
        b.add_output("o", g).unwrap();
        let _ = x;
        assert!(matches!(b.finish(), Err(NetlistError::DanglingNode(_))));
    }
}
