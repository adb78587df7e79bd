//! Task representation: what the search is asked to connect.
//!
//! A [`Task`] is handed in by external collaborators as already-parsed
//! in-memory tuples: one value tuple per input slot plus one target tuple,
//! all with the same example count.

use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::value::{Grid, Val};

/// A synthesis task: per-slot input example tuples and a target example
/// tuple. One graph attempt is constructed per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    inputs: Vec<Vec<Val>>,
    target: Vec<Val>,
}

impl Task {
    /// Builds a task, validating that every input slot has exactly as many
    /// examples as the target and that there is at least one example.
    pub fn new(inputs: Vec<Vec<Val>>, target: Vec<Val>) -> Result<Task, ContractError> {
        if target.is_empty() {
            return Err(ContractError::EmptyNode);
        }
        for slot in &inputs {
            if slot.len() != target.len() {
                return Err(ContractError::ExampleCountMismatch {
                    expected: target.len(),
                    got: slot.len(),
                });
            }
        }
        Ok(Task { inputs, target })
    }

    /// Single-input-slot grid task: one (input grid, output grid) pair per
    /// training example.
    pub fn from_grid_pairs(pairs: Vec<(Grid, Grid)>) -> Result<Task, ContractError> {
        let (inputs, targets): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .map(|(i, o)| (Val::Grid(i), Val::Grid(o)))
            .unzip();
        Task::new(vec![inputs], targets)
    }

    pub fn inputs(&self) -> &[Vec<Val>] {
        &self.inputs
    }

    pub fn target(&self) -> &[Val] {
        &self.target
    }

    pub fn num_examples(&self) -> usize {
        self.target.len()
    }
}
