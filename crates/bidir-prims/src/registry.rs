//! The standard op table: every grid primitive as a forward op, the literal
//! constants, and the inverse/conditional-inverse pairings.

use bidir_core::{
    CondInvFn, CondInverseOp, ContractError, FnDef, InvFn, InverseOp, Op, OpRegistry, Val,
    ValType,
};
use bidir_core::Color;

use crate::{grids, inverse};

/// Largest integer constant in the table.
pub const MAX_INT: i64 = 3;

use ValType::{Grid, GridList, Int};

fn def_get_color() -> FnDef {
    FnDef::new("get_color", vec![Grid], ValType::Color, grids::get_color)
}

fn def_hstack_pair() -> FnDef {
    FnDef::new("hstack_pair", vec![Grid, Grid], Grid, grids::hstack_pair)
}

fn def_hflip() -> FnDef {
    FnDef::new("hflip", vec![Grid], Grid, grids::hflip)
}

fn def_vflip() -> FnDef {
    FnDef::new("vflip", vec![Grid], Grid, grids::vflip)
}

fn def_vstack_pair() -> FnDef {
    FnDef::new("vstack_pair", vec![Grid, Grid], Grid, grids::vstack_pair)
}

fn def_rotate_cw() -> FnDef {
    FnDef::new("rotate_cw", vec![Grid], Grid, grids::rotate_cw)
}

fn def_rotate_ccw() -> FnDef {
    FnDef::new("rotate_ccw", vec![Grid], Grid, grids::rotate_ccw)
}

fn def_rows() -> FnDef {
    FnDef::new("rows", vec![Grid], GridList, grids::rows)
}

fn def_columns() -> FnDef {
    FnDef::new("columns", vec![Grid], GridList, grids::columns)
}

fn def_hstack() -> FnDef {
    FnDef::new("hstack", vec![GridList], Grid, grids::hstack)
}

fn def_vstack() -> FnDef {
    FnDef::new("vstack", vec![GridList], Grid, grids::vstack)
}

fn def_block() -> FnDef {
    FnDef::new("block", vec![Int, Int, ValType::Color], Grid, grids::block)
}

fn def_set_bg() -> FnDef {
    FnDef::new("set_bg", vec![Grid, ValType::Color], Grid, grids::set_bg)
}

fn def_unset_bg() -> FnDef {
    FnDef::new("unset_bg", vec![Grid, ValType::Color], Grid, grids::unset_bg)
}

fn def_crop() -> FnDef {
    FnDef::new("crop", vec![Grid], Grid, grids::crop)
}

fn def_kronecker() -> FnDef {
    FnDef::new("kronecker", vec![Grid, Grid], Grid, grids::kronecker)
}

fn def_top_half() -> FnDef {
    FnDef::new("top_half", vec![Grid], Grid, grids::top_half)
}

fn def_overlay_pair() -> FnDef {
    FnDef::new("overlay_pair", vec![Grid, Grid], Grid, grids::overlay_pair)
}

fn def_inflate() -> FnDef {
    FnDef::new("inflate", vec![Grid, Int], Grid, grids::inflate)
}

fn def_deflate() -> FnDef {
    FnDef::new("deflate", vec![Grid, Int], Grid, grids::deflate)
}

fn forward_ops() -> Vec<Op> {
    [
        def_get_color(),
        def_hstack_pair(),
        def_hflip(),
        def_vflip(),
        def_vstack_pair(),
        def_rotate_cw(),
        def_rotate_ccw(),
        def_rows(),
        def_columns(),
        def_hstack(),
        def_vstack(),
        def_block(),
        def_set_bg(),
        def_unset_bg(),
        def_crop(),
        def_kronecker(),
        def_top_half(),
        def_overlay_pair(),
        def_inflate(),
        def_deflate(),
    ]
    .into_iter()
    .map(Op::forward)
    .collect()
}

fn constant_ops() -> Vec<Op> {
    let mut ops = Vec::new();
    for i in 0..Color::COUNT {
        ops.push(Op::constant(Color(i).name(), Val::Color(Color(i))));
    }
    ops.push(Op::constant("true", Val::Bool(true)));
    ops.push(Op::constant("false", Val::Bool(false)));
    for i in 0..=MAX_INT {
        ops.push(Op::constant(i.to_string(), Val::Int(i)));
    }
    ops
}

fn inverse_ops() -> Vec<Op> {
    let pairs: [(&'static str, FnDef, InvFn); 7] = [
        ("rotate_ccw_inv", def_rotate_ccw(), inverse::rotate_ccw_inv),
        ("rotate_cw_inv", def_rotate_cw(), inverse::rotate_cw_inv),
        ("vflip_inv", def_vflip(), inverse::vflip_inv),
        ("hflip_inv", def_hflip(), inverse::hflip_inv),
        ("rows_inv", def_rows(), inverse::rows_inv),
        ("columns_inv", def_columns(), inverse::columns_inv),
        ("block_inv", def_block(), inverse::block_inv),
    ];
    pairs
        .into_iter()
        .map(|(name, forward, inverse)| {
            Op::Inverse(InverseOp {
                name,
                forward,
                inverse,
            })
        })
        .collect()
}

fn cond_inverse_ops() -> Vec<Op> {
    let triples: [(&'static str, FnDef, CondInvFn, Vec<bool>); 8] = [
        (
            "vstack_pair_cond_inv_top",
            def_vstack_pair(),
            inverse::vstack_pair_cond_inv_top,
            vec![true, false],
        ),
        (
            "vstack_pair_cond_inv_bottom",
            def_vstack_pair(),
            inverse::vstack_pair_cond_inv_bottom,
            vec![false, true],
        ),
        (
            "hstack_pair_cond_inv_left",
            def_hstack_pair(),
            inverse::hstack_pair_cond_inv_left,
            vec![true, false],
        ),
        (
            "hstack_pair_cond_inv_right",
            def_hstack_pair(),
            inverse::hstack_pair_cond_inv_right,
            vec![false, true],
        ),
        (
            "overlay_pair_cond_inv_top",
            def_overlay_pair(),
            inverse::overlay_pair_cond_inv_top,
            vec![true, false],
        ),
        (
            "overlay_pair_cond_inv_bottom",
            def_overlay_pair(),
            inverse::overlay_pair_cond_inv_bottom,
            vec![false, true],
        ),
        (
            "kronecker_cond_inv",
            def_kronecker(),
            inverse::kronecker_cond_inv,
            vec![true, false],
        ),
        (
            "inflate_cond_inv",
            def_inflate(),
            inverse::inflate_cond_inv,
            vec![false, true],
        ),
    ];
    triples
        .into_iter()
        .map(|(name, forward, cond_inverse, expects_cond)| {
            Op::CondInverse(CondInverseOp {
                name,
                forward,
                cond_inverse,
                expects_cond,
            })
        })
        .collect()
}

/// The full standard registry: forward ops, constants, inverses, then
/// conditional inverses, in a fixed order so action indices are stable.
pub fn standard_ops() -> Result<OpRegistry, ContractError> {
    let mut ops = forward_ops();
    ops.extend(constant_ops());
    ops.extend(inverse_ops());
    ops.extend(cond_inverse_ops());
    OpRegistry::build(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidir_core::{ProgramSearchGraph, StepId, Task};

    #[test]
    fn registry_builds_with_unique_names() {
        let reg = standard_ops().unwrap();
        // 20 forward + 10 colors + 2 bools + 4 ints + 7 inverse + 8 cond.
        assert_eq!(reg.len(), 51);
        assert!(reg.get("rotate_cw").is_some());
        assert!(reg.get("rotate_cw_inv").is_some());
        assert!(reg.get("maroon").is_some());
        assert!(reg.get("3").is_some());
        assert!(reg.get("4").is_none());
    }

    #[test]
    fn action_indices_are_stable() {
        let a = standard_ops().unwrap();
        let b = standard_ops().unwrap();
        for (x, y) in a.names().zip(b.names()) {
            assert_eq!(x, y);
        }
        assert_eq!(a.index_of("get_color"), Some(0));
    }

    #[test]
    fn ops_apply_through_the_graph() {
        let input = bidir_core::Grid::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap();
        let target = bidir_core::Grid::from_rows(&[vec![3, 1], vec![4, 2]]).unwrap();
        let task = Task::from_grid_pairs(vec![(input, target)]).unwrap();
        let mut psg = ProgramSearchGraph::new(&task).unwrap();
        let input = psg.input_ids()[0];
        let reg = standard_ops().unwrap();
        let rot = reg.get("rotate_cw").unwrap();
        rot.apply(&mut psg, &[input], StepId(0)).unwrap();
        assert!(psg.solved());
    }
}
