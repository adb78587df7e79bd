//! Node records for the search graph.
//!
//! [`ValueNode`] is the atomic unit of the graph: an immutable
//! one-value-per-example tuple with a single type tag. Two value nodes are
//! the same node iff their tuples are element-wise equal and share a type --
//! the graph deduplicates on that identity.
//!
//! [`ProgramNode`] is the hyperedge: one concrete application of an
//! operation. Inputs and outputs are always recorded in *forward*
//! orientation (inputs = the forward function's arguments), regardless of
//! whether the application ran forward or inverse; [`Provenance`] records
//! which direction it was, which drives groundedness propagation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ContractError;
use crate::id::{StepId, ValueId};
use crate::types::ValType;
use crate::value::Val;

/// An immutable per-example value tuple with its semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueNode {
    examples: Vec<Val>,
    vtype: ValType,
}

impl ValueNode {
    /// Builds a value node, rejecting empty or mixed-type example tuples.
    pub fn new(examples: Vec<Val>) -> Result<ValueNode, ContractError> {
        let first = match examples.first() {
            Some(v) => v.val_type(),
            None => return Err(ContractError::EmptyNode),
        };
        for v in &examples[1..] {
            if v.val_type() != first {
                return Err(ContractError::MixedExampleTypes {
                    first,
                    other: v.val_type(),
                });
            }
        }
        Ok(ValueNode {
            examples,
            vtype: first,
        })
    }

    pub fn vtype(&self) -> ValType {
        self.vtype
    }

    pub fn examples(&self) -> &[Val] {
        &self.examples
    }

    pub fn num_examples(&self) -> usize {
        self.examples.len()
    }
}

/// How a hyperedge was applied, and therefore which grounding rules it
/// supports beyond the plain forward rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Forward evaluation of a function over grounded arguments.
    Forward,
    /// Introduction of a literal, broadcast across examples.
    Constant,
    /// Exact inverse applied to a grounded output; the recorded inputs were
    /// derived from it and are grounded by the exactness proof.
    Inverse,
    /// Conditional inverse: `cond_mask[i]` is true for the forward argument
    /// slots that were supplied as conditioning values. The remaining slots
    /// were derived and ground only once the output and all conditioning
    /// nodes are grounded.
    CondInverse { cond_mask: Vec<bool> },
}

/// A hyperedge: one operation application connecting input value nodes to
/// output value nodes, tagged with the step at which it was inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramNode {
    pub op_name: String,
    pub step: StepId,
    /// Forward-orientation argument nodes.
    pub inputs: SmallVec<[ValueId; 2]>,
    /// Forward-orientation result nodes.
    pub outputs: SmallVec<[ValueId; 1]>,
    pub provenance: Provenance,
}
