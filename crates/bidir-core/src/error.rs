//! The two error classes of the search core.
//!
//! [`SynthError`] covers every *recoverable* rejection of an attempted
//! operation: the harness treats it as a negative signal and the graph is
//! left untouched. [`ContractError`] covers caller-contract violations
//! (out-of-range indices, malformed construction input) -- these indicate
//! bugs in the driving code, not failed search steps, and are kept as a
//! separate type so tests can assert on the precise failure class.

use thiserror::Error;

use crate::id::ValueId;
use crate::types::ValType;

/// Recoverable domain/synthesis error: the attempted step is rejected and
/// the graph is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// The operation was given the wrong number of argument nodes.
    #[error("op '{op}': expected {expected} arguments, got {got}")]
    Arity {
        op: String,
        expected: usize,
        got: usize,
    },

    /// An argument node's type does not match the operation signature.
    #[error("op '{op}' argument {arg}: expected {expected}, got {got}")]
    TypeMismatch {
        op: String,
        arg: usize,
        expected: ValType,
        got: ValType,
    },

    /// The operation requires a grounded node and was given an ungrounded one.
    #[error("op '{op}': node {node} is not grounded")]
    NotGrounded { op: String, node: ValueId },

    /// An inverse or conditional inverse failed its exactness check: the
    /// reconstructed inputs do not forward-map to the given output.
    #[error("op '{op}': inverse consistency check failed: {detail}")]
    InverseCheck { op: String, detail: String },

    /// A primitive was given a structurally invalid value (ragged rows,
    /// incompatible shapes, empty stack list, oversized output, ...).
    #[error("invalid value: {detail}")]
    BadValue { detail: String },

    /// The operation's output would be (transitively) derived from itself.
    #[error("op '{op}': output would be derived from itself")]
    Cycle { op: String },
}

impl SynthError {
    /// Shorthand for [`SynthError::BadValue`].
    pub fn bad_value(detail: impl Into<String>) -> SynthError {
        SynthError::BadValue {
            detail: detail.into(),
        }
    }
}

/// Caller-contract violation: a bug in the driving code rather than a failed
/// synthesis step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A value-node index addressed a node that does not exist.
    #[error("value index {index} out of range ({count} nodes)")]
    ValueIndexOutOfRange { index: usize, count: usize },

    /// An op index addressed an op that does not exist in the registry.
    #[error("op index {index} out of range ({count} ops)")]
    OpIndexOutOfRange { index: usize, count: usize },

    /// Two ops with the same name were handed to `OpRegistry::build`.
    #[error("duplicate op name: '{name}'")]
    DuplicateOpName { name: String },

    /// A value node must hold at least one example.
    #[error("value node must hold at least one example")]
    EmptyNode,

    /// A value node's examples must all share one type.
    #[error("value node mixes example types: {first} and {other}")]
    MixedExampleTypes { first: ValType, other: ValType },

    /// A task's input slots and target must agree on the example count.
    #[error("task example counts disagree: expected {expected}, got {got}")]
    ExampleCountMismatch { expected: usize, got: usize },
}
