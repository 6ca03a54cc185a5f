//! # faultline-types::id
//!
//! Defines the core identifier types used throughout the workspace.
//! Nodes, faults and outputs all get dense ids starting at 0, assigned at
//! netlist construction and frozen afterwards; every downstream structure
//! indexes plain vectors with them.

/// A unique identifier for a node in the circuit graph.
/// Invariant: ids are contiguous from 0 to N-1 in topological order.
pub type NodeId = u32;

/// A unique identifier for a fault. Contiguous from 0.
pub type FaultId = u32;

/// The position of a pseudo-primary output (true POs first, then DFF inputs).
pub type OutputId = u32;
