//! # faultline-dtpg::extract
//!
//! Sufficient-assignment extraction from a SAT model. Starting at the
//! fault's FFR root, the extractor walks the fault cone toward the
//! outputs where the good and faulty values differ, recording the
//! side-input values that keep those paths sensitized. The multi
//! strategy returns a disjunction over every sensitized path; the simple
//! strategy takes one cube of it.

use crate::sat::SatModel;
use crate::varmap::VarMap;
use faultline_net::Netlist;
use faultline_types::{Assign, AssignList, NodeId};
use fxhash::{FxHashMap, FxHashSet};

/// A positive boolean combination of line assignments.
#[derive(Debug, Clone)]
pub enum Expr {
    True,
    Lit(Assign),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

/// Collapses an expression to one of its cubes (first choice at every
/// disjunction).
pub fn pick_cube(expr: &Expr) -> AssignList {
    let mut cube = AssignList::new();
    collect_cube(expr, &mut cube);
    cube
}

fn collect_cube(expr: &Expr, cube: &mut AssignList) {
    match expr {
        Expr::True => {}
        Expr::Lit(a) => cube.push(*a),
        Expr::And(children) => {
            for c in children {
                collect_cube(c, cube);
            }
        }
        Expr::Or(children) => {
            if let Some(first) = children.first() {
                collect_cube(first, cube);
            }
        }
    }
}

/// Walks a model of the miter and assembles sufficient assignments.
pub struct Extractor<'a> {
    net: &'a Netlist,
    gvar: &'a VarMap,
    fvar: &'a VarMap,
    model: &'a SatModel,
}

impl<'a> Extractor<'a> {
    pub fn new(
        net: &'a Netlist,
        gvar: &'a VarMap,
        fvar: &'a VarMap,
        model: &'a SatModel,
    ) -> Self {
        Extractor {
            net,
            gvar,
            fvar,
            model,
        }
    }

    /// One sufficient assignment (the simple strategy).
    pub fn sufficient_condition(&self, root: NodeId) -> AssignList {
        pick_cube(&self.sufficient_conditions(root))
    }

    /// The disjunction over all sensitized propagation paths.
    pub fn sufficient_conditions(&self, root: NodeId) -> Expr {
        let mut walk = ConeWalk {
            ex: self,
            fcone: FxHashSet::default(),
            spo_list: Vec::new(),
            expr_map: FxHashMap::default(),
        };
        walk.mark_tfo(root);
        debug_assert!(
            !walk.spo_list.is_empty(),
            "a satisfiable miter must show a difference at some output"
        );

        let exprs: Vec<Expr> = walk
            .spo_list
            .clone()
            .iter()
            .map(|&spo| walk.record_sensitized(spo))
            .collect();
        if exprs.len() == 1 {
            exprs.into_iter().next().unwrap()
        } else {
            Expr::Or(exprs)
        }
    }

    fn gval(&self, node: NodeId) -> bool {
        self.model.value_or_false(self.gvar.get(node))
    }

    fn fval(&self, node: NodeId) -> bool {
        self.model.value_or_false(self.fvar.get(node))
    }

    fn is_diff(&self, node: NodeId) -> bool {
        self.gval(node) != self.fval(node)
    }
}

struct ConeWalk<'a, 'b> {
    ex: &'b Extractor<'a>,
    /// Fanout cone of the start node (nodes carrying a faulty value).
    fcone: FxHashSet<NodeId>,
    /// Cone outputs at which the difference is visible.
    spo_list: Vec<NodeId>,
    expr_map: FxHashMap<NodeId, Expr>,
}

impl ConeWalk<'_, '_> {
    fn mark_tfo(&mut self, node: NodeId) {
        if !self.fcone.insert(node) {
            return;
        }
        if self.ex.net.node(node).is_ppo() && self.ex.is_diff(node) {
            self.spo_list.push(node);
        }
        for &onode in &self.ex.net.node(node).fanouts {
            self.mark_tfo(onode);
        }
    }

    /// Conditions that keep the difference at `node` alive, assuming the
    /// difference has arrived there.
    fn record_sensitized(&mut self, node: NodeId) -> Expr {
        debug_assert!(self.ex.is_diff(node));
        if let Some(e) = self.expr_map.get(&node) {
            return e.clone();
        }
        let mut children = Vec::new();
        for &inode in &self.ex.net.node(node).fanins {
            let child = if self.fcone.contains(&inode) {
                if self.ex.is_diff(inode) {
                    self.record_sensitized(inode)
                } else {
                    self.record_masking(inode)
                }
            } else {
                self.side_input(inode)
            };
            children.push(child);
        }
        let expr = and_expr(children);
        self.expr_map.insert(node, expr.clone());
        expr
    }

    /// Conditions that keep a fault-cone node whose good and faulty
    /// values agree at its current value.
    fn record_masking(&mut self, node: NodeId) -> Expr {
        debug_assert!(!self.ex.is_diff(node));
        if let Some(e) = self.expr_map.get(&node) {
            return e.clone();
        }
        let n = self.ex.net.node(node);
        let cval = n.gate_type().and_then(|g| g.cval());

        // controlling inputs pin the node's value outright; otherwise
        // every fanin has to stay put
        let mut cone_cnodes = Vec::new();
        let mut side_cnodes = Vec::new();
        if let Some(cval) = cval {
            for &inode in &n.fanins {
                if self.fcone.contains(&inode) {
                    if !self.ex.is_diff(inode) && self.ex.gval(inode) == cval {
                        cone_cnodes.push(inode);
                    }
                } else if self.ex.gval(inode) == cval {
                    side_cnodes.push(inode);
                }
            }
        }

        let expr = if !cone_cnodes.is_empty() || !side_cnodes.is_empty() {
            let mut choices = Vec::new();
            for cnode in cone_cnodes {
                choices.push(self.record_masking(cnode));
            }
            for cnode in side_cnodes {
                choices.push(self.side_input(cnode));
            }
            or_expr(choices)
        } else {
            // either nothing differs below, or several differences
            // cancel; recurse into every fanin
            let mut children = Vec::new();
            for &inode in &n.fanins {
                let child = if self.fcone.contains(&inode) {
                    if self.ex.is_diff(inode) {
                        self.record_sensitized(inode)
                    } else {
                        self.record_masking(inode)
                    }
                } else {
                    self.side_input(inode)
                };
                children.push(child);
            }
            and_expr(children)
        };
        self.expr_map.insert(node, expr.clone());
        expr
    }

    /// A fanin outside the fault cone: record its good value.
    fn side_input(&self, node: NodeId) -> Expr {
        Expr::Lit(Assign::new(node, 1, self.ex.gval(node)))
    }
}

fn and_expr(mut children: Vec<Expr>) -> Expr {
    children.retain(|c| !matches!(c, Expr::True));
    match children.len() {
        0 => Expr::True,
        1 => children.into_iter().next().unwrap(),
        _ => Expr::And(children),
    }
}

fn or_expr(children: Vec<Expr>) -> Expr {
    match children.len() {
        0 => Expr::True,
        1 => children.into_iter().next().unwrap(),
        _ => Expr::Or(children),
    }
}
