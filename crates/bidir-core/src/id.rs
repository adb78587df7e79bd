//! Stable ID newtypes for graph entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `ValueId` cannot be accidentally used where a `StepId` is
//! expected. `ValueId`s double as the stable insertion-order indices the
//! external harness addresses value nodes by.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable value-node identifier: position in the graph's insertion-ordered
/// value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Stable program-node (hyperedge) identifier: position in the graph's
/// program table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub u32);

/// The environment step counter at which a hyperedge was inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ProgramId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl StepId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// Bridge between ValueId and petgraph's NodeIndex<u32> for the bipartite
// encoding. Only the value side needs a public bridge; program vertices are
// internal to the graph.

impl From<NodeIndex<u32>> for ValueId {
    fn from(idx: NodeIndex<u32>) -> Self {
        ValueId(idx.index() as u32)
    }
}
