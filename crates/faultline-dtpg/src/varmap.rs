//! # faultline-dtpg::varmap
//!
//! Node-to-literal maps. Node ids are dense after graph finalization, so
//! a plain vector beats a hash map; one map exists per variable family
//! (previous-time, good, faulty, difference), each sized to the whole
//! graph but populated only over the engine's cone.

use faultline_types::NodeId;
use rustsat::types::Lit;

/// Map from node id to the SAT literal of one variable family.
#[derive(Debug, Clone)]
pub struct VarMap {
    map: Vec<Option<Lit>>,
}

impl VarMap {
    pub fn new(node_num: usize) -> Self {
        VarMap {
            map: vec![None; node_num],
        }
    }

    pub fn set(&mut self, node: NodeId, lit: Lit) {
        self.map[node as usize] = Some(lit);
    }

    /// Literal of `node`. Panics when the node lies outside the cone the
    /// engine allocated variables for, which is a programming error.
    pub fn get(&self, node: NodeId) -> Lit {
        self.map[node as usize].expect("node outside the allocated cone")
    }

    pub fn try_get(&self, node: NodeId) -> Option<Lit> {
        self.map[node as usize]
    }

    /// Clears every entry for engine reuse.
    pub fn clear(&mut self) {
        self.map.iter_mut().for_each(|e| *e = None);
    }
}
