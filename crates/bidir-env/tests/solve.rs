//! End-to-end episodes over the standard op table.

use bidir_core::{Grid, Task, Val};
use bidir_env::{EnvConfig, SynthEnv, SynthEnvAction, TaskSource};
use bidir_prims::standard_ops;

fn g(rows: &[Vec<u8>]) -> Grid {
    Grid::from_rows(rows).unwrap()
}

fn fixed_env(task: Task) -> SynthEnv {
    SynthEnv::new(
        standard_ops().unwrap(),
        TaskSource::Fixed(task),
        EnvConfig::default(),
    )
    .unwrap()
}

fn op_idx(env: &SynthEnv, name: &str) -> usize {
    env.registry().index_of(name).unwrap()
}

#[test]
fn rotation_task_solves_in_one_action() {
    let task = Task::from_grid_pairs(vec![(
        g(&[vec![0, 0], vec![1, 1]]),
        g(&[vec![1, 0], vec![1, 0]]),
    )])
    .unwrap();
    let mut env = fixed_env(task);
    let rotate = op_idx(&env, "rotate_cw");

    let out = env.step(&SynthEnvAction::new(rotate, [0])).unwrap();
    assert!(out.solved);
    assert!(out.done);
    assert_eq!(env.psg().actions_in_program().map(|s| s.len()), Some(1));
    assert_eq!(env.episode_rewards(), Some(vec![100.0]));
}

#[test]
fn vstack_pair_combines_two_grounded_halves() {
    let top = g(&[vec![1, 1]]);
    let bottom = g(&[vec![2, 2]]);
    let stacked = g(&[vec![1, 1], vec![2, 2]]);
    let task = Task::new(
        vec![vec![Val::Grid(top)], vec![Val::Grid(bottom)]],
        vec![Val::Grid(stacked)],
    )
    .unwrap();
    let mut env = fixed_env(task);
    let vstack_pair = op_idx(&env, "vstack_pair");

    // Nodes: 0 = top input, 1 = bottom input, 2 = target.
    let out = env.step(&SynthEnvAction::new(vstack_pair, [0, 1])).unwrap();
    assert!(out.solved);
}

#[test]
fn cond_inverse_recovers_the_missing_half() {
    // Given the stacked grid and its top half, derive the bottom half.
    let stacked = g(&[vec![1, 1], vec![2, 2], vec![3, 3]]);
    let top = g(&[vec![1, 1]]);
    let bottom = g(&[vec![2, 2], vec![3, 3]]);
    let task = Task::new(
        vec![vec![Val::Grid(stacked)], vec![Val::Grid(top)]],
        vec![Val::Grid(bottom)],
    )
    .unwrap();
    let mut env = fixed_env(task);
    let cond_inv = op_idx(&env, "vstack_pair_cond_inv_top");

    // Nodes: 0 = stacked, 1 = top, 2 = target. Output node first, then the
    // conditioning node.
    let out = env.step(&SynthEnvAction::new(cond_inv, [0, 1])).unwrap();
    assert!(out.solved, "derived bottom half should ground immediately");
    assert_eq!(env.episode_rewards(), Some(vec![100.0]));
}

#[test]
fn cond_inverse_rejects_a_top_that_is_not_a_prefix() {
    let stacked = g(&[vec![1, 1], vec![2, 2]]);
    let wrong_top = g(&[vec![9, 9]]);
    let task = Task::new(
        vec![vec![Val::Grid(stacked)], vec![Val::Grid(wrong_top)]],
        vec![Val::Grid(g(&[vec![2, 2]]))],
    )
    .unwrap();
    let mut env = fixed_env(task);
    let cond_inv = op_idx(&env, "vstack_pair_cond_inv_top");

    let before = env.psg().num_values();
    let out = env.step(&SynthEnvAction::new(cond_inv, [0, 1])).unwrap();
    assert!(out.error.is_some());
    assert_eq!(out.reward, -1.0);
    assert!(!out.done);
    assert_eq!(env.psg().num_values(), before);
    assert_eq!(env.psg().num_programs(), 0);
}

#[test]
fn solve_reward_splits_evenly_across_program_steps() {
    let input = g(&[vec![1, 2], vec![3, 4]]);
    let target = g(&[vec![4, 3], vec![2, 1]]);
    let task = Task::from_grid_pairs(vec![(input, target)]).unwrap();
    let mut env = fixed_env(task);
    let rotate = op_idx(&env, "rotate_cw");
    let one = op_idx(&env, "1");

    // A constant irrelevant to the solution, then two rotations.
    env.step(&SynthEnvAction::new(one, [])).unwrap();
    env.step(&SynthEnvAction::new(rotate, [0])).unwrap();
    let out = env.step(&SynthEnvAction::new(rotate, [3])).unwrap();
    assert!(out.solved);
    assert_eq!(env.episode_rewards(), Some(vec![0.0, 50.0, 50.0]));
}

#[test]
fn identical_action_sequences_replay_identically() {
    let task = Task::from_grid_pairs(vec![(
        g(&[vec![1, 2], vec![3, 4]]),
        g(&[vec![4, 3], vec![2, 1]]),
    )])
    .unwrap();
    let actions = |env: &SynthEnv| {
        vec![
            SynthEnvAction::new(op_idx(env, "hflip"), [0]),
            SynthEnvAction::new(op_idx(env, "rotate_cw"), [0]),
            // A rejected step (ungrounded argument) is part of the replay too.
            SynthEnvAction::new(op_idx(env, "rotate_cw"), [1]),
            SynthEnvAction::new(op_idx(env, "rotate_cw"), [3]),
        ]
    };

    let mut a = fixed_env(task.clone());
    let mut b = fixed_env(task);
    let mut rewards_a = Vec::new();
    let mut rewards_b = Vec::new();
    for action in actions(&a) {
        rewards_a.push(a.step(&action).unwrap().reward);
    }
    for action in actions(&b) {
        rewards_b.push(b.step(&action).unwrap().reward);
    }
    assert_eq!(rewards_a, rewards_b);
    assert_eq!(a.psg().num_values(), b.psg().num_values());
    assert_eq!(a.psg().num_programs(), b.psg().num_programs());
    for i in 0..a.psg().num_values() {
        let id = bidir_core::ValueId(i as u32);
        assert_eq!(a.psg().value(id), b.psg().value(id));
        assert_eq!(a.psg().is_grounded(id), b.psg().is_grounded(id));
    }
    assert_eq!(a.is_solved(), b.is_solved());
}

mod determinism {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Arbitrary action streams (valid or rejected) must replay to
        // identical graphs and rewards under the same task.
        #[test]
        fn arbitrary_action_streams_replay_identically(
            raw in proptest::collection::vec((0usize..51, proptest::collection::vec(0usize..8, 0..3)), 1..12)
        ) {
            let task = Task::from_grid_pairs(vec![(
                g(&[vec![1, 2], vec![3, 4]]),
                g(&[vec![4, 3], vec![2, 1]]),
            )])
            .unwrap();
            let mut a = fixed_env(task.clone());
            let mut b = fixed_env(task);
            for (op, idxs) in &raw {
                // Clamp node indices into range so every step honors the
                // caller contract; domain rejections are still free to occur.
                let run = |env: &mut SynthEnv| {
                    let n = env.psg().num_values();
                    let op = op % env.registry().len();
                    let args: Vec<usize> = idxs.iter().map(|i| i % n).collect();
                    env.step(&SynthEnvAction::new(op, args)).unwrap().reward
                };
                let ra = run(&mut a);
                let rb = run(&mut b);
                prop_assert_eq!(ra, rb);
            }
            prop_assert_eq!(a.psg().num_values(), b.psg().num_values());
            prop_assert_eq!(a.is_solved(), b.is_solved());
        }
    }
}

#[test]
fn inverse_op_works_backward_from_the_target_side() {
    // Solving hflip(x) = y backward: invert hflip on the grounded input to
    // reach the target. The task is input = hflip(target), so applying the
    // exact inverse of hflip to the input derives the target directly.
    let target = g(&[vec![1, 2, 3]]);
    let input = g(&[vec![3, 2, 1]]);
    let task = Task::from_grid_pairs(vec![(input, target)]).unwrap();
    let mut env = fixed_env(task);
    let hflip_inv = op_idx(&env, "hflip_inv");

    let out = env.step(&SynthEnvAction::new(hflip_inv, [0])).unwrap();
    assert!(out.solved);
}

#[test]
fn multi_example_task_requires_all_examples_to_agree() {
    // rotate_cw matches the first pair but not the second; the op applies
    // fine yet the produced node is not the target, so nothing solves.
    let task = Task::from_grid_pairs(vec![
        (g(&[vec![0, 0], vec![1, 1]]), g(&[vec![1, 0], vec![1, 0]])),
        (g(&[vec![1, 0], vec![0, 0]]), g(&[vec![1, 1], vec![0, 0]])),
    ])
    .unwrap();
    let mut env = fixed_env(task);
    let rotate = op_idx(&env, "rotate_cw");

    let out = env.step(&SynthEnvAction::new(rotate, [0])).unwrap();
    assert!(out.error.is_none());
    assert!(!out.solved, "a per-example mismatch must not count as solved");
    assert_eq!(env.psg().num_values(), 3);
    assert!(!env.psg().is_grounded(env.psg().target_id()));
}
