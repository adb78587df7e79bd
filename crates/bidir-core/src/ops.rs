//! The operation contract: a closed sum type over the four ways the graph
//! can grow.
//!
//! The four variants form a single [`Op`] enum so dispatch is exhaustive at
//! compile time when a variant is added. Concrete behavior is supplied by
//! plain `fn` pointers (deterministic, comparable, `Copy`), grouped into a
//! [`FnDef`] signature record.
//!
//! Named ops live in an [`OpRegistry`] built once at startup; duplicate
//! names are a build-time [`ContractError`], not a load-time panic.

use indexmap::IndexMap;

use crate::error::{ContractError, SynthError};
use crate::graph::ProgramSearchGraph;
use crate::id::{StepId, ValueId};
use crate::types::ValType;
use crate::value::Val;

/// A primitive forward function evaluated independently per example: takes
/// one value per argument slot, returns the result value.
pub type ForwardFn = fn(&[Val]) -> Result<Val, SynthError>;

/// An exact inverse: takes the forward function's output and reconstructs
/// the unique argument tuple that produces it, or fails.
pub type InvFn = fn(&Val) -> Result<Vec<Val>, SynthError>;

/// A conditional inverse: takes the output plus the conditioning arguments
/// (slots aligned with the forward argument list, `None` marking the slots
/// to recover) and returns the recovered values in slot order, or fails if
/// output and conditioning are mutually inconsistent.
pub type CondInvFn = fn(&Val, &[Option<&Val>]) -> Result<Vec<Val>, SynthError>;

/// A named primitive function with its declared signature.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub name: &'static str,
    pub arg_types: Vec<ValType>,
    pub ret_type: ValType,
    pub func: ForwardFn,
}

impl FnDef {
    pub fn new(
        name: &'static str,
        arg_types: Vec<ValType>,
        ret_type: ValType,
        func: ForwardFn,
    ) -> FnDef {
        FnDef {
            name,
            arg_types,
            ret_type,
            func,
        }
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }
}

/// Forward application: evaluate a function over grounded argument nodes.
#[derive(Debug, Clone)]
pub struct ForwardOp {
    pub fn_def: FnDef,
}

/// Introduction of a literal value, broadcast identically across examples.
#[derive(Debug, Clone)]
pub struct ConstantOp {
    pub name: String,
    pub value: Val,
}

/// Exact-inverse application: from a grounded output node, derive the
/// argument nodes that produce it under `forward`.
#[derive(Debug, Clone)]
pub struct InverseOp {
    pub name: &'static str,
    pub forward: FnDef,
    pub inverse: InvFn,
}

/// Conditional-inverse application: from a grounded output node plus
/// conditioning argument nodes, derive the remaining argument nodes.
/// `expects_cond[i]` is true for the forward argument slots supplied as
/// conditioning values.
#[derive(Debug, Clone)]
pub struct CondInverseOp {
    pub name: &'static str,
    pub forward: FnDef,
    pub cond_inverse: CondInvFn,
    pub expects_cond: Vec<bool>,
}

impl CondInverseOp {
    /// Number of conditioning argument nodes this op consumes.
    pub fn num_cond(&self) -> usize {
        self.expects_cond.iter().filter(|&&b| b).count()
    }
}

/// The four ways a program-search graph can grow.
#[derive(Debug, Clone)]
pub enum Op {
    Forward(ForwardOp),
    Constant(ConstantOp),
    Inverse(InverseOp),
    CondInverse(CondInverseOp),
}

impl Op {
    /// Convenience constructor for a forward op over a [`FnDef`].
    pub fn forward(fn_def: FnDef) -> Op {
        Op::Forward(ForwardOp { fn_def })
    }

    /// Convenience constructor for a constant op.
    pub fn constant(name: impl Into<String>, value: Val) -> Op {
        Op::Constant(ConstantOp {
            name: name.into(),
            value,
        })
    }

    /// Unique registry name of this op.
    pub fn name(&self) -> &str {
        match self {
            Op::Forward(f) => f.fn_def.name,
            Op::Constant(c) => &c.name,
            Op::Inverse(i) => i.name,
            Op::CondInverse(ci) => ci.name,
        }
    }

    /// Number of value-node arguments consumed from the harness. For the
    /// inverse variants this counts the output node (and conditioning nodes),
    /// since those are what the caller supplies.
    pub fn arity(&self) -> usize {
        match self {
            Op::Forward(f) => f.fn_def.arity(),
            Op::Constant(_) => 0,
            Op::Inverse(_) => 1,
            Op::CondInverse(ci) => 1 + ci.num_cond(),
        }
    }

    /// Applies this op to the graph. Atomic: on error the graph is
    /// unmodified.
    pub fn apply(
        &self,
        psg: &mut ProgramSearchGraph,
        args: &[ValueId],
        step: StepId,
    ) -> Result<(), SynthError> {
        let expected = self.arity();
        if args.len() != expected {
            return Err(SynthError::Arity {
                op: self.name().to_string(),
                expected,
                got: args.len(),
            });
        }
        match self {
            Op::Forward(f) => {
                psg.add_forward(f, args, step)?;
            }
            Op::Constant(c) => {
                psg.add_constant(c, step)?;
            }
            Op::Inverse(i) => {
                psg.add_inverse(i, args[0], step)?;
            }
            Op::CondInverse(ci) => {
                psg.add_cond_inverse(ci, args[0], &args[1..], step)?;
            }
        }
        Ok(())
    }
}

/// Insertion-ordered registry of named ops. The position of an op doubles
/// as its integer action index for the environment.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    ops: IndexMap<String, Op>,
}

impl OpRegistry {
    /// Builds a registry, rejecting duplicate op names.
    pub fn build(ops: Vec<Op>) -> Result<OpRegistry, ContractError> {
        let mut map = IndexMap::with_capacity(ops.len());
        for op in ops {
            let name = op.name().to_string();
            if map.insert(name.clone(), op).is_some() {
                return Err(ContractError::DuplicateOpName { name });
            }
        }
        Ok(OpRegistry { ops: map })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Op by registry position (the environment's action index).
    pub fn get_index(&self, index: usize) -> Option<&Op> {
        self.ops.get_index(index).map(|(_, op)| op)
    }

    /// Op by name (for manual drivers and tests).
    pub fn get(&self, name: &str) -> Option<&Op> {
        self.ops.get(name)
    }

    /// Registry position of a named op.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.ops.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(args: &[Val]) -> Result<Val, SynthError> {
        Ok(args[0].clone())
    }

    fn dummy_fn_def(name: &'static str) -> FnDef {
        FnDef::new(name, vec![ValType::Int], ValType::Int, identity)
    }

    #[test]
    fn registry_preserves_insertion_order() {
        let reg = OpRegistry::build(vec![
            Op::forward(dummy_fn_def("b")),
            Op::forward(dummy_fn_def("a")),
            Op::constant("2", Val::Int(2)),
        ])
        .unwrap();

        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["b", "a", "2"]);
        assert_eq!(reg.index_of("a"), Some(1));
        assert_eq!(reg.get_index(2).unwrap().name(), "2");
    }

    #[test]
    fn duplicate_names_rejected_at_build() {
        let result = OpRegistry::build(vec![
            Op::forward(dummy_fn_def("rot")),
            Op::forward(dummy_fn_def("rot")),
        ]);
        assert!(matches!(
            result,
            Err(ContractError::DuplicateOpName { name }) if name == "rot"
        ));
    }

    #[test]
    fn arity_counts_conditioning() {
        let op = Op::CondInverse(CondInverseOp {
            name: "pair_cond_inv",
            forward: FnDef::new(
                "pair",
                vec![ValType::Grid, ValType::Grid],
                ValType::Grid,
                identity,
            ),
            cond_inverse: |_, _| Ok(vec![]),
            expects_cond: vec![true, false],
        });
        // output node + one conditioning node
        assert_eq!(op.arity(), 2);
        assert_eq!(Op::constant("true", Val::Bool(true)).arity(), 0);
    }
}
