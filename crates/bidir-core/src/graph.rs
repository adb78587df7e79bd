//! ProgramSearchGraph: the hyper-graph connecting task inputs to the target.
//!
//! [`ProgramSearchGraph`] is the single entry point for growing and querying
//! one task attempt. The hyper-graph is encoded bipartite in a `StableGraph`:
//! value vertices and program (hyperedge) vertices, with edges oriented in
//! the *derivation* direction -- from the nodes a hyperedge consumed to the
//! nodes it produced. Under that orientation the graph is a DAG, and the
//! acyclicity invariant ("no node may be derived from itself, directly or
//! transitively") is a plain reachability check.
//!
//! # Groundedness
//!
//! A node is grounded once its value is derivable by forward computation
//! from the task's actual inputs. Groundedness is never revoked. Each
//! grounded node carries the [`Grounding`] that first established it (which
//! hyperedge, from which dependency nodes); since a dependency is always
//! grounded strictly before its dependents, the records form a well-founded
//! trace that [`actions_in_program`](ProgramSearchGraph::actions_in_program)
//! walks backward from the target.
//!
//! # Atomicity
//!
//! Every `add_*` method validates and evaluates everything fallible before
//! touching any field: a rejected step leaves the graph bit-for-bit
//! unchanged.

use indexmap::IndexMap;
use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::Directed;
use smallvec::{smallvec, SmallVec};

use crate::error::{ContractError, SynthError};
use crate::id::{ProgramId, StepId, ValueId};
use crate::node::{ProgramNode, Provenance, ValueNode};
use crate::ops::{CondInverseOp, ConstantOp, FnDef, ForwardOp, InverseOp};
use crate::task::Task;
use crate::value::Val;

/// A vertex of the bipartite encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchVertex {
    Value(ValueId),
    Program(ProgramId),
}

/// Edge role in the derivation orientation: `Source(k)` runs from the k-th
/// consumed node into the hyperedge, `Derived(k)` from the hyperedge to its
/// k-th produced node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeriveEdge {
    Source(u16),
    Derived(u16),
}

/// The record of how a node first became grounded: the hyperedge that
/// grounded it (`None` for task inputs) and the dependency nodes that rule
/// consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grounding {
    pub program: Option<ProgramId>,
    pub deps: SmallVec<[ValueId; 2]>,
}

/// A directed multi-hypergraph over value nodes, owned by exactly one
/// in-progress task attempt.
#[derive(Debug, Clone)]
pub struct ProgramSearchGraph {
    graph: StableGraph<SearchVertex, DeriveEdge, Directed, u32>,
    /// Dedup table; insertion order defines the stable [`ValueId`] indexing
    /// the harness addresses.
    values: IndexMap<ValueNode, NodeIndex<u32>>,
    programs: Vec<ProgramNode>,
    program_vertices: Vec<NodeIndex<u32>>,
    /// Parallel to `values`; `Some` once grounded, never cleared.
    grounded: Vec<Option<Grounding>>,
    inputs: Vec<ValueId>,
    target: ValueId,
    num_examples: usize,
}

impl ProgramSearchGraph {
    /// Creates a fresh attempt for `task`: one grounded seed node per input
    /// slot and the ungrounded target node. If the target equals an input
    /// the attempt starts solved.
    pub fn new(task: &Task) -> Result<ProgramSearchGraph, ContractError> {
        let mut psg = ProgramSearchGraph {
            graph: StableGraph::default(),
            values: IndexMap::new(),
            programs: Vec::new(),
            program_vertices: Vec::new(),
            grounded: Vec::new(),
            inputs: Vec::new(),
            target: ValueId(0),
            num_examples: task.num_examples(),
        };
        for slot in task.inputs() {
            let node = ValueNode::new(slot.clone())?;
            let id = psg.insert_value(node);
            psg.inputs.push(id);
            if psg.grounded[id.index()].is_none() {
                psg.grounded[id.index()] = Some(Grounding {
                    program: None,
                    deps: smallvec![],
                });
            }
        }
        let target_node = ValueNode::new(task.target().to_vec())?;
        psg.target = psg.insert_value(target_node);
        Ok(psg)
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// All value nodes in insertion order. Positions are stable: the harness
    /// addresses nodes by index into this sequence.
    pub fn get_value_nodes(&self) -> Vec<&ValueNode> {
        self.values.keys().collect()
    }

    /// The value node behind `id`. Panics on a dangling id -- ids only come
    /// from this graph, so that is a caller bug, not a synthesis failure.
    pub fn value(&self, id: ValueId) -> &ValueNode {
        self.values
            .get_index(id.index())
            .map(|(node, _)| node)
            .expect("dangling ValueId")
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn num_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn program(&self, id: ProgramId) -> &ProgramNode {
        &self.programs[id.index()]
    }

    pub fn programs(&self) -> &[ProgramNode] {
        &self.programs
    }

    /// The task input seed nodes.
    pub fn input_ids(&self) -> &[ValueId] {
        &self.inputs
    }

    /// The task target node.
    pub fn target_id(&self) -> ValueId {
        self.target
    }

    pub fn num_examples(&self) -> usize {
        self.num_examples
    }

    pub fn is_grounded(&self, id: ValueId) -> bool {
        self.grounded[id.index()].is_some()
    }

    /// The grounding record of `id`, if grounded.
    pub fn grounding(&self, id: ValueId) -> Option<&Grounding> {
        self.grounded[id.index()].as_ref()
    }

    /// True iff the target node has become grounded.
    pub fn solved(&self) -> bool {
        self.is_grounded(self.target)
    }

    /// When solved, the ordered step indices of the hyperedges on the
    /// grounded derivation of the target (a backward walk over grounding
    /// records); `None` while unsolved.
    pub fn actions_in_program(&self) -> Option<Vec<StepId>> {
        if !self.solved() {
            return None;
        }
        let mut steps = std::collections::BTreeSet::new();
        let mut visited = vec![false; self.values.len()];
        let mut stack = vec![self.target];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            // Solved graph: every node on the trace is grounded.
            let grounding = self.grounded[id.index()].as_ref()?;
            if let Some(pid) = grounding.program {
                steps.insert(self.programs[pid.index()].step);
                stack.extend(grounding.deps.iter().copied());
            }
        }
        Some(steps.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Operation application
    // -----------------------------------------------------------------------

    /// Forward application: evaluates `op` elementwise over grounded
    /// argument nodes and inserts the (possibly deduplicated) output node.
    pub fn add_forward(
        &mut self,
        op: &ForwardOp,
        args: &[ValueId],
        step: StepId,
    ) -> Result<ValueId, SynthError> {
        let def = &op.fn_def;
        self.check_arity(def.name, def.arity(), args.len())?;
        self.check_arg_types(def.name, &def.arg_types, args)?;
        self.check_all_grounded(def.name, args)?;
        let outputs = self.eval_forward(def, args)?;
        let out_node = Self::typed_node(def.name, outputs)?;
        self.check_acyclic(def.name, std::slice::from_ref(&out_node), args)?;

        let out_id = self.insert_value(out_node);
        self.insert_program(ProgramNode {
            op_name: def.name.to_string(),
            step,
            inputs: args.iter().copied().collect(),
            outputs: smallvec![out_id],
            provenance: Provenance::Forward,
        });
        self.propagate();
        #[cfg(debug_assertions)]
        self.assert_invariants();
        Ok(out_id)
    }

    /// Constant introduction: broadcasts a literal across all examples.
    /// Always grounded; cannot cycle (no sources).
    pub fn add_constant(&mut self, op: &ConstantOp, step: StepId) -> Result<ValueId, SynthError> {
        let examples = vec![op.value.clone(); self.num_examples];
        let out_node = Self::typed_node(&op.name, examples)?;
        let out_id = self.insert_value(out_node);
        self.insert_program(ProgramNode {
            op_name: op.name.clone(),
            step,
            inputs: smallvec![],
            outputs: smallvec![out_id],
            provenance: Provenance::Constant,
        });
        self.propagate();
        #[cfg(debug_assertions)]
        self.assert_invariants();
        Ok(out_id)
    }

    /// Exact-inverse application to a grounded output node: derives the
    /// argument nodes that produce it under `op.forward`, re-validating by
    /// forward recomputation. Derived nodes are grounded immediately.
    pub fn add_inverse(
        &mut self,
        op: &InverseOp,
        out: ValueId,
        step: StepId,
    ) -> Result<Vec<ValueId>, SynthError> {
        let def = &op.forward;
        self.check_type(op.name, 0, def.ret_type, out)?;
        self.check_all_grounded(op.name, &[out])?;

        let arity = def.arity();
        let mut per_arg: Vec<Vec<Val>> = vec![Vec::with_capacity(self.num_examples); arity];
        for ex in 0..self.num_examples {
            let out_val = &self.value(out).examples()[ex];
            let derived = (op.inverse)(out_val)?;
            if derived.len() != arity {
                return Err(SynthError::InverseCheck {
                    op: op.name.to_string(),
                    detail: format!("reconstructed {} arguments, expected {arity}", derived.len()),
                });
            }
            self.check_reconstruction(op.name, def, &derived, out_val)?;
            for (slot, v) in derived.into_iter().enumerate() {
                per_arg[slot].push(v);
            }
        }
        let derived_nodes = per_arg
            .into_iter()
            .map(|vals| Self::typed_node(op.name, vals))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_acyclic(op.name, &derived_nodes, &[out])?;

        let input_ids: SmallVec<[ValueId; 2]> = derived_nodes
            .into_iter()
            .map(|node| self.insert_value(node))
            .collect();
        let result = input_ids.to_vec();
        self.insert_program(ProgramNode {
            op_name: op.name.to_string(),
            step,
            inputs: input_ids,
            outputs: smallvec![out],
            provenance: Provenance::Inverse,
        });
        self.propagate();
        #[cfg(debug_assertions)]
        self.assert_invariants();
        Ok(result)
    }

    /// Conditional-inverse application: from a grounded output node and the
    /// conditioning argument nodes (which may themselves be ungrounded
    /// hypotheses), derives the remaining argument nodes. Derived nodes
    /// ground only once the output and every conditioning node are grounded.
    pub fn add_cond_inverse(
        &mut self,
        op: &CondInverseOp,
        out: ValueId,
        cond: &[ValueId],
        step: StepId,
    ) -> Result<Vec<ValueId>, SynthError> {
        let def = &op.forward;
        let mask = &op.expects_cond;
        if mask.len() != def.arity() || cond.len() != op.num_cond() {
            return Err(SynthError::Arity {
                op: op.name.to_string(),
                expected: 1 + op.num_cond(),
                got: 1 + cond.len(),
            });
        }
        self.check_type(op.name, 0, def.ret_type, out)?;
        self.check_all_grounded(op.name, &[out])?;

        // Forward argument slots: conditioning nodes where the mask is set,
        // holes to recover elsewhere.
        let cond_slots: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        let free_slots: Vec<usize> = (0..mask.len()).filter(|&i| !mask[i]).collect();
        for (k, &slot) in cond_slots.iter().enumerate() {
            self.check_type(op.name, 1 + k, def.arg_types[slot], cond[k])?;
        }

        let mut per_free: Vec<Vec<Val>> =
            vec![Vec::with_capacity(self.num_examples); free_slots.len()];
        for ex in 0..self.num_examples {
            let out_val = &self.value(out).examples()[ex];
            let mut slots: Vec<Option<&Val>> = vec![None; mask.len()];
            for (k, &slot) in cond_slots.iter().enumerate() {
                slots[slot] = Some(&self.value(cond[k]).examples()[ex]);
            }
            let derived = (op.cond_inverse)(out_val, &slots)?;
            if derived.len() != free_slots.len() {
                return Err(SynthError::InverseCheck {
                    op: op.name.to_string(),
                    detail: format!(
                        "reconstructed {} arguments, expected {}",
                        derived.len(),
                        free_slots.len()
                    ),
                });
            }
            // Assemble the full forward argument list and re-validate.
            let mut full: Vec<Val> = Vec::with_capacity(mask.len());
            let mut next_free = derived.iter();
            for slot in 0..mask.len() {
                match slots[slot] {
                    Some(v) => full.push(v.clone()),
                    None => full.push(next_free.next().cloned().ok_or_else(|| {
                        SynthError::bad_value("conditional inverse arity underflow")
                    })?),
                }
            }
            self.check_reconstruction(op.name, def, &full, out_val)?;
            for (j, v) in derived.into_iter().enumerate() {
                per_free[j].push(v);
            }
        }
        let derived_nodes = per_free
            .into_iter()
            .map(|vals| Self::typed_node(op.name, vals))
            .collect::<Result<Vec<_>, _>>()?;
        let mut sources: Vec<ValueId> = vec![out];
        sources.extend_from_slice(cond);
        self.check_acyclic(op.name, &derived_nodes, &sources)?;

        let derived_ids: Vec<ValueId> = derived_nodes
            .into_iter()
            .map(|node| self.insert_value(node))
            .collect();
        // Full forward argument list in slot order: conditioning ids where
        // the mask is set, derived ids elsewhere.
        let mut inputs: SmallVec<[ValueId; 2]> = smallvec![];
        let mut next_cond = cond.iter();
        let mut next_free = derived_ids.iter();
        for &is_cond in mask {
            let id = if is_cond {
                next_cond.next()
            } else {
                next_free.next()
            };
            if let Some(&id) = id {
                inputs.push(id);
            }
        }
        self.insert_program(ProgramNode {
            op_name: op.name.to_string(),
            step,
            inputs,
            outputs: smallvec![out],
            provenance: Provenance::CondInverse {
                cond_mask: mask.clone(),
            },
        });
        self.propagate();
        #[cfg(debug_assertions)]
        self.assert_invariants();
        Ok(derived_ids)
    }

    // -----------------------------------------------------------------------
    // Validation helpers
    // -----------------------------------------------------------------------

    fn check_arity(&self, op: &str, expected: usize, got: usize) -> Result<(), SynthError> {
        if expected != got {
            return Err(SynthError::Arity {
                op: op.to_string(),
                expected,
                got,
            });
        }
        Ok(())
    }

    fn check_type(
        &self,
        op: &str,
        arg: usize,
        expected: crate::types::ValType,
        id: ValueId,
    ) -> Result<(), SynthError> {
        let got = self.value(id).vtype();
        if got != expected {
            return Err(SynthError::TypeMismatch {
                op: op.to_string(),
                arg,
                expected,
                got,
            });
        }
        Ok(())
    }

    fn check_arg_types(
        &self,
        op: &str,
        types: &[crate::types::ValType],
        args: &[ValueId],
    ) -> Result<(), SynthError> {
        for (i, (&expected, &id)) in types.iter().zip(args).enumerate() {
            self.check_type(op, i, expected, id)?;
        }
        Ok(())
    }

    fn check_all_grounded(&self, op: &str, args: &[ValueId]) -> Result<(), SynthError> {
        for &id in args {
            if !self.is_grounded(id) {
                return Err(SynthError::NotGrounded {
                    op: op.to_string(),
                    node: id,
                });
            }
        }
        Ok(())
    }

    /// Evaluates a forward function elementwise over the argument nodes.
    fn eval_forward(&self, def: &FnDef, args: &[ValueId]) -> Result<Vec<Val>, SynthError> {
        let mut outputs = Vec::with_capacity(self.num_examples);
        for ex in 0..self.num_examples {
            let call_args: Vec<Val> = args
                .iter()
                .map(|&id| self.value(id).examples()[ex].clone())
                .collect();
            let out = (def.func)(&call_args)?;
            if out.val_type() != def.ret_type {
                return Err(SynthError::bad_value(format!(
                    "'{}' returned {}, declared {}",
                    def.name,
                    out.val_type(),
                    def.ret_type
                )));
            }
            outputs.push(out);
        }
        Ok(outputs)
    }

    /// Exactness gate for both inverse variants: the reconstructed argument
    /// tuple must forward-map to the original output value exactly.
    fn check_reconstruction(
        &self,
        op: &str,
        def: &FnDef,
        full_args: &[Val],
        out_val: &Val,
    ) -> Result<(), SynthError> {
        for (slot, (v, &expected)) in full_args.iter().zip(&def.arg_types).enumerate() {
            if v.val_type() != expected {
                return Err(SynthError::InverseCheck {
                    op: op.to_string(),
                    detail: format!(
                        "reconstructed argument {slot} has type {}, expected {expected}",
                        v.val_type()
                    ),
                });
            }
        }
        let recomputed = (def.func)(full_args).map_err(|e| SynthError::InverseCheck {
            op: op.to_string(),
            detail: format!("forward recomputation failed: {e}"),
        })?;
        if &recomputed != out_val {
            return Err(SynthError::InverseCheck {
                op: op.to_string(),
                detail: "reconstruction does not forward-map to the output".to_string(),
            });
        }
        Ok(())
    }

    /// Rejects a hyperedge that would derive a node from itself. `produced`
    /// are the nodes the hyperedge creates, `sources` the nodes it consumes;
    /// a produced node that already exists must be neither a source nor an
    /// ancestor of one in the derivation orientation.
    fn check_acyclic(
        &self,
        op: &str,
        produced: &[ValueNode],
        sources: &[ValueId],
    ) -> Result<(), SynthError> {
        for node in produced {
            if let Some(pos) = self.values.get_index_of(node) {
                let existing = ValueId(pos as u32);
                if sources.contains(&existing) {
                    return Err(SynthError::Cycle {
                        op: op.to_string(),
                    });
                }
                let from = self.vertex(existing);
                for &s in sources {
                    if has_path_connecting(&self.graph, from, self.vertex(s), None) {
                        return Err(SynthError::Cycle {
                            op: op.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn typed_node(op: &str, examples: Vec<Val>) -> Result<ValueNode, SynthError> {
        ValueNode::new(examples)
            .map_err(|e| SynthError::bad_value(format!("'{op}' produced an invalid node: {e}")))
    }

    // -----------------------------------------------------------------------
    // Mutation helpers (infallible; only reached after all checks pass)
    // -----------------------------------------------------------------------

    fn vertex(&self, id: ValueId) -> NodeIndex<u32> {
        *self
            .values
            .get_index(id.index())
            .map(|(_, idx)| idx)
            .expect("dangling ValueId")
    }

    /// Inserts a value node, deduplicating by identity. Returns the stable
    /// id of the (possibly pre-existing) node.
    fn insert_value(&mut self, node: ValueNode) -> ValueId {
        if let Some(pos) = self.values.get_index_of(&node) {
            return ValueId(pos as u32);
        }
        let id = ValueId(self.values.len() as u32);
        let idx = self.graph.add_node(SearchVertex::Value(id));
        self.values.insert(node, idx);
        self.grounded.push(None);
        id
    }

    fn insert_program(&mut self, node: ProgramNode) -> ProgramId {
        let pid = ProgramId(self.programs.len() as u32);
        let idx = self.graph.add_node(SearchVertex::Program(pid));
        let (deps, results) = Self::grounding_rule(&node);
        for (k, &dep) in deps.iter().enumerate() {
            self.graph
                .add_edge(self.vertex(dep), idx, DeriveEdge::Source(k as u16));
        }
        for (k, &res) in results.iter().enumerate() {
            self.graph
                .add_edge(idx, self.vertex(res), DeriveEdge::Derived(k as u16));
        }
        self.programs.push(node);
        self.program_vertices.push(idx);
        pid
    }

    /// The grounding rule of a hyperedge in derivation orientation:
    /// `(consumed, produced)`.
    fn grounding_rule(node: &ProgramNode) -> (SmallVec<[ValueId; 2]>, SmallVec<[ValueId; 2]>) {
        match &node.provenance {
            Provenance::Forward | Provenance::Constant => {
                (node.inputs.clone(), node.outputs.iter().copied().collect())
            }
            Provenance::Inverse => {
                (node.outputs.iter().copied().collect(), node.inputs.clone())
            }
            Provenance::CondInverse { cond_mask } => {
                let mut deps: SmallVec<[ValueId; 2]> = node.outputs.iter().copied().collect();
                let mut results: SmallVec<[ValueId; 2]> = smallvec![];
                for (slot, &id) in node.inputs.iter().enumerate() {
                    if cond_mask[slot] {
                        deps.push(id);
                    } else {
                        results.push(id);
                    }
                }
                (deps, results)
            }
        }
    }

    /// Fixpoint groundedness propagation: fires every hyperedge whose
    /// consumed nodes are all grounded, grounding its produced nodes.
    /// First-wins: an already-grounded node keeps its original record.
    fn propagate(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for pid in 0..self.programs.len() {
                let (deps, results) = Self::grounding_rule(&self.programs[pid]);
                if results.iter().all(|&r| self.is_grounded(r)) {
                    continue;
                }
                if !deps.iter().all(|&d| self.is_grounded(d)) {
                    continue;
                }
                for &r in &results {
                    if self.grounded[r.index()].is_none() {
                        self.grounded[r.index()] = Some(Grounding {
                            program: Some(ProgramId(pid as u32)),
                            deps: deps.clone(),
                        });
                        changed = true;
                    }
                }
            }
        }
    }

    /// Structural self-check, debug builds only.
    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        assert!(
            !petgraph::algo::is_cyclic_directed(&self.graph),
            "derivation graph must stay acyclic"
        );
        assert_eq!(self.values.len(), self.grounded.len());
        assert_eq!(self.programs.len(), self.program_vertices.len());
        for g in self.grounded.iter().flatten() {
            for &dep in &g.deps {
                assert!(
                    self.is_grounded(dep),
                    "grounding record references ungrounded dependency {dep}"
                );
            }
        }
    }
}
