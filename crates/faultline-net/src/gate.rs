//! # faultline-net::gate
//!
//! Gate primitives and their algebraic properties. Everything downstream
//! (simulation, observability, CNF encoding) dispatches on this enum
//! rather than on per-type objects.

use faultline_types::Val3;
use std::fmt;

/// The logic primitives of the netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateType {
    Buf,
    Not,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Xnor,
}

impl GateType {
    /// Whether the fanin count is legal for this primitive.
    pub fn arity_ok(self, n: usize) -> bool {
        match self {
            GateType::Buf | GateType::Not => n == 1,
            _ => n >= 2,
        }
    }

    /// The controlling input value, if the primitive has one: an input at
    /// this value fixes the output regardless of the other inputs.
    pub fn cval(self) -> Option<bool> {
        match self {
            GateType::And | GateType::Nand => Some(false),
            GateType::Or | GateType::Nor => Some(true),
            _ => None,
        }
    }

    /// The non-controlling value side inputs must hold for a change on one
    /// input to reach the output. `None` for parity gates and inverters,
    /// whose side inputs never block.
    pub fn side_val(self) -> Option<bool> {
        self.cval().map(|c| !c)
    }

    /// True when the output is the complement of the underlying
    /// AND/OR/XOR/identity function.
    pub fn inverted(self) -> bool {
        matches!(
            self,
            GateType::Not | GateType::Nand | GateType::Nor | GateType::Xnor
        )
    }

    /// Evaluates the gate on scalar 3-valued inputs (left-associative for
    /// the n-ary parity gates).
    pub fn eval(self, inputs: &[Val3]) -> Val3 {
        debug_assert!(self.arity_ok(inputs.len()));
        match self {
            GateType::Buf => inputs[0],
            GateType::Not => !inputs[0],
            GateType::And => inputs.iter().copied().fold(Val3::_1, |a, b| a & b),
            GateType::Nand => !inputs.iter().copied().fold(Val3::_1, |a, b| a & b),
            GateType::Or => inputs.iter().copied().fold(Val3::_0, |a, b| a | b),
            GateType::Nor => !inputs.iter().copied().fold(Val3::_0, |a, b| a | b),
            GateType::Xor => inputs.iter().copied().fold(Val3::_0, |a, b| a ^ b),
            GateType::Xnor => !inputs.iter().copied().fold(Val3::_0, |a, b| a ^ b),
        }
    }
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateType::Buf => "buf",
            GateType::Not => "not",
            GateType::And => "and",
            GateType::Nand => "nand",
            GateType::Or => "or",
            GateType::Nor => "nor",
            GateType::Xor => "xor",
            GateType::Xnor => "xnor",
        };
        f.write_str(s)
    }
}
