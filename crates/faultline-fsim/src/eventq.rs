//! # faultline-fsim::eventq
//!
//! Level-ordered event-driven propagation. Pending nodes sit in one
//! singly-linked bucket per topological level; draining always takes the
//! lowest non-empty bucket, so every node is evaluated at most once per
//! run. Value changes are recorded in an undo log and rolled back after
//! the run, leaving the good values intact for the next call.

use crate::network::SimNetwork;
use faultline_types::{diff, DiffBitsArray, PackedVal, PackedVal3, PV_ALL0};

const NIL: u32 = u32::MAX;

/// The event queue plus the per-node flip masks and the undo log.
#[derive(Debug)]
pub struct EventQueue {
    /// Head of the pending list per level.
    levels: Vec<u32>,
    /// Next pointers of the intrusive pending lists.
    link: Vec<u32>,
    in_queue: Vec<bool>,
    /// Per-node pending flip mask, consumed when the node is evaluated.
    flip_mask: Vec<PackedVal>,
    /// Lowest level that may hold a pending node.
    cur_level: usize,
    /// Number of pending nodes.
    num: usize,
    /// (node, previous value) log for rollback.
    clear_list: Vec<(u32, PackedVal3)>,
}

impl EventQueue {
    pub fn new(max_level: u32, node_num: usize) -> Self {
        EventQueue {
            levels: vec![NIL; max_level as usize + 1],
            link: vec![NIL; node_num],
            in_queue: vec![false; node_num],
            flip_mask: vec![PV_ALL0; node_num],
            cur_level: 0,
            num: 0,
            clear_list: Vec::with_capacity(node_num),
        }
    }

    /// Registers a flip event on `node`: the named pattern slots will be
    /// inverted on top of the recomputed value. Idempotent; masks of
    /// repeated calls accumulate by OR.
    pub fn put_event(&mut self, net: &SimNetwork, node: u32, mask: PackedVal) {
        self.flip_mask[node as usize] |= mask;
        self.put(node, net.node(node).level);
    }

    /// Drains the queue, propagating value changes level by level, and
    /// reports which outputs saw a difference in which pattern slots.
    /// On return all node values are restored.
    pub fn simulate(&mut self, net: &SimNetwork, vals: &mut [PackedVal3]) -> DiffBitsArray {
        let mut dbits_array = DiffBitsArray::new();

        while let Some(node_id) = self.get() {
            let node = net.node(node_id);
            let old_val = vals[node_id as usize];
            let mut new_val = node.calc_val(vals);
            let flip = std::mem::replace(&mut self.flip_mask[node_id as usize], PV_ALL0);
            if flip != PV_ALL0 {
                new_val = new_val.xor_mask(flip);
            }
            if new_val != old_val {
                vals[node_id as usize] = new_val;
                self.clear_list.push((node_id, old_val));
                if let Some(output_id) = node.output_id {
                    let dbits = diff(new_val, old_val);
                    if dbits != PV_ALL0 {
                        dbits_array.add_output(output_id, dbits);
                    }
                } else {
                    for &fo in &node.fanouts {
                        self.put(fo, net.node(fo).level);
                    }
                }
            }
        }

        // roll the faulty values back to the good state
        for &(node, val) in self.clear_list.iter().rev() {
            vals[node as usize] = val;
        }
        self.clear_list.clear();

        dbits_array
    }

    fn put(&mut self, node: u32, level: u32) {
        if !self.in_queue[node as usize] {
            self.in_queue[node as usize] = true;
            let level = level as usize;
            self.link[node as usize] = self.levels[level];
            self.levels[level] = node;
            if self.num == 0 || self.cur_level > level {
                self.cur_level = level;
            }
            self.num += 1;
        }
    }

    fn get(&mut self) -> Option<u32> {
        if self.num == 0 {
            return None;
        }
        loop {
            let head = self.levels[self.cur_level];
            if head != NIL {
                self.levels[self.cur_level] = self.link[head as usize];
                self.in_queue[head as usize] = false;
                self.num -= 1;
                return Some(head);
            }
            self.cur_level += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_net::{GateType, NetlistBuilder};
    use faultline_types::Val3;

    /// a -> not -> not -> out
    fn chain() -> SimNetwork {
        let mut b = NetlistBuilder::new();
        let a = b.add_input("a");
        let n1 = b.add_gate("n1", GateType::Not, &[a]).unwrap();
        let n2 = b.add_gate("n2", GateType::Not, &[n1]).unwrap();
        b.add_output("out", n2).unwrap();
        SimNetwork::new(&b.finish().unwrap())
    }

    #[test]
    fn flip_propagates_to_output_and_rolls_back() {
        let net = chain();
        let mut vals = vec![PackedVal3::splat(Val3::_0); net.node_num()];
        // good values for a = 0
        vals[1] = PackedVal3::splat(Val3::_1); // n1
        vals[2] = PackedVal3::splat(Val3::_0); // n2
        vals[3] = PackedVal3::splat(Val3::_0); // out
        let saved = vals.clone();

        let mut q = EventQueue::new(net.max_level(), net.node_num());
        q.put_event(&net, 1, 0b101);
        let dba = q.simulate(&net, &mut vals);

        assert_eq!(dba.elem_num(), 1);
        assert_eq!(dba.output(0), 0);
        assert_eq!(dba.dbits(0), 0b101);
        assert_eq!(dba.dbits_union(), 0b101);
        // rollback restored every node value
        assert_eq!(vals, saved);
    }

    #[test]
    fn masked_event_does_not_fire() {
        let net = chain();
        let mut vals = vec![PackedVal3::splat(Val3::_1); net.node_num()];
        vals[0] = PackedVal3::splat(Val3::_0);
        vals[1] = PackedVal3::splat(Val3::_1);
        vals[2] = PackedVal3::splat(Val3::_0);
        vals[3] = PackedVal3::splat(Val3::_0);

        let mut q = EventQueue::new(net.max_level(), net.node_num());
        q.put_event(&net, 2, PV_ALL0);
        let dba = q.simulate(&net, &mut vals);
        assert!(dba.is_empty());
        assert_eq!(dba.dbits_union(), PV_ALL0);
    }
}
