//! The synthesis environment: a step-driven harness over one
//! [`ProgramSearchGraph`] attempt at a time.
//!
//! An external policy repeatedly proposes a [`SynthEnvAction`] (an op index
//! into the registry plus value-node indices into `get_value_nodes()` order)
//! and observes a [`StepOutcome`]. Domain rejections are part of the game:
//! they cost `synth_error_penalty` and leave the graph untouched. Only
//! out-of-range indices and malformed tasks are caller bugs.

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use bidir_core::{ContractError, OpRegistry, ProgramSearchGraph, StepId, SynthError, Task};

/// One proposed step: which op, and which value nodes to feed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthEnvAction {
    pub op_idx: usize,
    pub arg_idxs: SmallVec<[usize; 3]>,
}

impl SynthEnvAction {
    pub fn new(op_idx: usize, arg_idxs: impl IntoIterator<Item = usize>) -> SynthEnvAction {
        SynthEnvAction {
            op_idx,
            arg_idxs: arg_idxs.into_iter().collect(),
        }
    }
}

/// Where episode tasks come from: a single fixed task replayed every
/// episode, or a sampler drawing a fresh task from the environment's
/// seeded RNG.
pub enum TaskSource {
    Fixed(Task),
    Sampler(Box<dyn FnMut(&mut ChaCha8Rng) -> Task + Send>),
}

impl TaskSource {
    fn next(&mut self, rng: &mut ChaCha8Rng) -> Task {
        match self {
            TaskSource::Fixed(task) => task.clone(),
            TaskSource::Sampler(sample) => sample(rng),
        }
    }
}

/// Episode policy knobs. `max_actions: None` means an unbounded episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub max_actions: Option<u32>,
    pub solve_reward: f64,
    pub synth_error_penalty: f64,
    pub timeout_penalty: f64,
    pub seed: u64,
}

impl Default for EnvConfig {
    fn default() -> EnvConfig {
        EnvConfig {
            max_actions: Some(100),
            solve_reward: 100.0,
            synth_error_penalty: -1.0,
            timeout_penalty: 0.0,
            seed: 0,
        }
    }
}

/// What one step produced. `error` carries the domain rejection when the
/// step was refused.
#[derive(Debug)]
pub struct StepOutcome {
    pub reward: f64,
    pub done: bool,
    pub solved: bool,
    pub error: Option<SynthError>,
}

/// A synthesis episode driver owning the live graph.
pub struct SynthEnv {
    registry: OpRegistry,
    source: TaskSource,
    config: EnvConfig,
    rng: ChaCha8Rng,
    psg: ProgramSearchGraph,
    action_count: u32,
    error_steps: HashSet<u32>,
}

impl SynthEnv {
    /// Builds the environment and starts the first episode.
    pub fn new(
        registry: OpRegistry,
        mut source: TaskSource,
        config: EnvConfig,
    ) -> Result<SynthEnv, ContractError> {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let task = source.next(&mut rng);
        let psg = ProgramSearchGraph::new(&task)?;
        Ok(SynthEnv {
            registry,
            source,
            config,
            rng,
            psg,
            action_count: 0,
            error_steps: HashSet::new(),
        })
    }

    /// Starts a fresh episode: next task, new graph, cleared bookkeeping.
    pub fn reset(&mut self) -> Result<(), ContractError> {
        let task = self.source.next(&mut self.rng);
        self.psg = ProgramSearchGraph::new(&task)?;
        self.action_count = 0;
        self.error_steps.clear();
        tracing::debug!(
            nodes = self.psg.num_values(),
            examples = self.psg.num_examples(),
            "episode reset"
        );
        Ok(())
    }

    /// The live graph for this episode.
    pub fn psg(&self) -> &ProgramSearchGraph {
        &self.psg
    }

    pub fn registry(&self) -> &OpRegistry {
        &self.registry
    }

    pub fn action_count(&self) -> u32 {
        self.action_count
    }

    pub fn is_solved(&self) -> bool {
        self.psg.solved()
    }

    /// Episode over: solved, or the action budget is spent.
    pub fn done(&self) -> bool {
        if let Some(max) = self.config.max_actions {
            if self.action_count >= max {
                return true;
            }
        }
        self.psg.solved()
    }

    /// Applies one action. Out-of-range op or node indices are contract
    /// errors; a domain rejection is a normal (penalized) outcome.
    pub fn step(&mut self, action: &SynthEnvAction) -> Result<StepOutcome, ContractError> {
        let op = self.registry.get_index(action.op_idx).ok_or_else(|| {
            ContractError::OpIndexOutOfRange {
                index: action.op_idx,
                count: self.registry.len(),
            }
        })?;
        let num_values = self.psg.num_values();
        let args = action
            .arg_idxs
            .iter()
            .map(|&idx| {
                if idx < num_values {
                    Ok(bidir_core::ValueId(idx as u32))
                } else {
                    Err(ContractError::ValueIndexOutOfRange {
                        index: idx,
                        count: num_values,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let step = StepId(self.action_count);
        let mut reward = 0.0;
        let error = match op.apply(&mut self.psg, &args, step) {
            Ok(()) => {
                tracing::debug!(op = op.name(), step = self.action_count, "step applied");
                None
            }
            Err(e) => {
                tracing::debug!(
                    op = op.name(),
                    step = self.action_count,
                    error = %e,
                    "step rejected"
                );
                reward = self.config.synth_error_penalty;
                self.error_steps.insert(self.action_count);
                Some(e)
            }
        };
        self.action_count += 1;

        let solved = self.psg.solved();
        if solved {
            reward = self.config.solve_reward;
            tracing::debug!(actions = self.action_count, "task solved");
        } else if self.done() {
            reward = self.config.timeout_penalty;
        }
        Ok(StepOutcome {
            reward,
            done: self.done(),
            solved,
            error,
        })
    }

    /// Per-action reward attribution for a finished episode: the solve
    /// bonus split evenly across the actions on the grounded derivation of
    /// the target, the error penalty on rejected steps, zero elsewhere.
    /// `None` while the episode is still running.
    pub fn episode_rewards(&self) -> Option<Vec<f64>> {
        if !self.done() {
            return None;
        }
        let mut rewards: Vec<f64> = (0..self.action_count)
            .map(|i| {
                if self.error_steps.contains(&i) {
                    self.config.synth_error_penalty
                } else {
                    0.0
                }
            })
            .collect();
        if self.psg.solved() {
            let steps = self.psg.actions_in_program()?;
            let share = self.config.solve_reward / steps.len() as f64;
            for step in steps {
                rewards[step.index()] = share;
            }
        }
        Some(rewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidir_core::{Op, Val, ValType};

    fn negate(args: &[Val]) -> Result<Val, SynthError> {
        Ok(Val::Int(-args[0].as_int()?))
    }

    fn tiny_registry() -> OpRegistry {
        OpRegistry::build(vec![
            Op::forward(bidir_core::FnDef::new(
                "negate",
                vec![ValType::Int],
                ValType::Int,
                negate,
            )),
            Op::constant("7", Val::Int(7)),
        ])
        .unwrap()
    }

    fn int_task(input: i64, target: i64) -> Task {
        Task::new(vec![vec![Val::Int(input)]], vec![Val::Int(target)]).unwrap()
    }

    #[test]
    fn out_of_range_indices_are_contract_errors() {
        let mut env = SynthEnv::new(
            tiny_registry(),
            TaskSource::Fixed(int_task(3, -3)),
            EnvConfig::default(),
        )
        .unwrap();
        let err = env.step(&SynthEnvAction::new(99, [0])).unwrap_err();
        assert!(matches!(err, ContractError::OpIndexOutOfRange { index: 99, .. }));
        let err = env.step(&SynthEnvAction::new(0, [99])).unwrap_err();
        assert!(matches!(
            err,
            ContractError::ValueIndexOutOfRange { index: 99, .. }
        ));
        // Contract errors do not consume budget.
        assert_eq!(env.action_count(), 0);
    }

    #[test]
    fn domain_rejection_is_penalized_not_fatal() {
        let mut env = SynthEnv::new(
            tiny_registry(),
            TaskSource::Fixed(int_task(3, -3)),
            EnvConfig::default(),
        )
        .unwrap();
        // negate on the ungrounded target node: rejected.
        let out = env.step(&SynthEnvAction::new(0, [1])).unwrap();
        assert_eq!(out.reward, -1.0);
        assert!(out.error.is_some());
        assert!(!out.done);
        // The same env keeps playing and can still solve.
        let out = env.step(&SynthEnvAction::new(0, [0])).unwrap();
        assert!(out.solved);
        assert_eq!(out.reward, 100.0);
        assert_eq!(env.episode_rewards(), Some(vec![-1.0, 100.0]));
    }

    #[test]
    fn budget_exhaustion_ends_the_episode() {
        let config = EnvConfig {
            max_actions: Some(2),
            timeout_penalty: -5.0,
            ..EnvConfig::default()
        };
        let mut env = SynthEnv::new(
            tiny_registry(),
            TaskSource::Fixed(int_task(3, 4)),
            config,
        )
        .unwrap();
        let out = env.step(&SynthEnvAction::new(1, [])).unwrap();
        assert!(!out.done);
        assert_eq!(env.episode_rewards(), None);
        let out = env.step(&SynthEnvAction::new(1, [])).unwrap();
        assert!(out.done);
        assert!(!out.solved);
        assert_eq!(out.reward, -5.0);
        assert_eq!(env.episode_rewards(), Some(vec![0.0, 0.0]));
    }

    #[test]
    fn reset_replaces_the_graph_wholesale() {
        let mut env = SynthEnv::new(
            tiny_registry(),
            TaskSource::Fixed(int_task(3, -3)),
            EnvConfig::default(),
        )
        .unwrap();
        env.step(&SynthEnvAction::new(0, [0])).unwrap();
        assert!(env.is_solved());
        env.reset().unwrap();
        assert!(!env.is_solved());
        assert_eq!(env.action_count(), 0);
        assert_eq!(env.psg().num_values(), 2);
        assert_eq!(env.psg().num_programs(), 0);
    }

    #[test]
    fn sampler_tasks_are_seed_deterministic() {
        use rand::Rng;
        let sampler = || {
            TaskSource::Sampler(Box::new(|rng: &mut ChaCha8Rng| {
                let n: i64 = rng.gen_range(-50..50);
                int_task(n, -n)
            }))
        };
        let mut a = SynthEnv::new(tiny_registry(), sampler(), EnvConfig::default()).unwrap();
        let mut b = SynthEnv::new(tiny_registry(), sampler(), EnvConfig::default()).unwrap();
        for _ in 0..5 {
            assert_eq!(
                a.psg().value(a.psg().input_ids()[0]),
                b.psg().value(b.psg().input_ids()[0])
            );
            a.reset().unwrap();
            b.reset().unwrap();
        }
    }
}
