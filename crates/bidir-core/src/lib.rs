pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod ops;
pub mod task;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use error::{ContractError, SynthError};
pub use graph::{Grounding, ProgramSearchGraph};
pub use id::{ProgramId, StepId, ValueId};
pub use node::{ProgramNode, Provenance, ValueNode};
pub use ops::{
    CondInvFn, CondInverseOp, ConstantOp, FnDef, ForwardFn, ForwardOp, InvFn, InverseOp, Op,
    OpRegistry,
};
pub use task::Task;
pub use types::{Color, ValType};
pub use value::{Grid, Val, MAX_GRID_CELLS};
