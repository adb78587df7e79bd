//! Exact and conditional inverse primitives.
//!
//! Exact inverses reconstruct the unique forward argument tuple from an
//! output value. Conditional inverses additionally receive the conditioning
//! arguments (marked by the op's mask) through the slot array and derive
//! only the remaining arguments. Both reject structurally inconsistent
//! inputs with a domain error; the graph re-validates every reconstruction
//! by forward recomputation regardless.

use bidir_core::{Color, Grid, SynthError, Val};

use crate::grids;

fn cond_val<'a>(slots: &[Option<&'a Val>], idx: usize) -> Result<&'a Val, SynthError> {
    slots
        .get(idx)
        .copied()
        .flatten()
        .ok_or_else(|| SynthError::bad_value(format!("missing conditioning value in slot {idx}")))
}

// ---------------------------------------------------------------------------
// Exact inverses
// ---------------------------------------------------------------------------

pub fn rotate_cw_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    Ok(vec![Val::Grid(grids::rotate_ccw_grid(out.as_grid()?)?)])
}

pub fn rotate_ccw_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    Ok(vec![Val::Grid(grids::rotate_cw_grid(out.as_grid()?)?)])
}

pub fn hflip_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    Ok(vec![Val::Grid(grids::hflip_grid(out.as_grid()?)?)])
}

pub fn vflip_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    Ok(vec![Val::Grid(grids::vflip_grid(out.as_grid()?)?)])
}

/// Inverse of `rows`: stitches the row list back into the source grid.
pub fn rows_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    Ok(vec![Val::Grid(grids::vstack_grids(out.as_grid_list()?)?)])
}

/// Inverse of `columns`.
pub fn columns_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    Ok(vec![Val::Grid(grids::hstack_grids(out.as_grid_list()?)?)])
}

/// Inverse of `block`: only a uniform non-empty grid is a block.
pub fn block_inv(out: &Val) -> Result<Vec<Val>, SynthError> {
    let g = out.as_grid()?;
    let color = grids::uniform_color(g)
        .ok_or_else(|| SynthError::bad_value("grid is not a uniform block"))?;
    Ok(vec![
        Val::Int(g.height() as i64),
        Val::Int(g.width() as i64),
        Val::Color(color),
    ])
}

// ---------------------------------------------------------------------------
// Conditional inverses
// ---------------------------------------------------------------------------

fn check_dim(name: &str, got: usize, expected: usize) -> Result<(), SynthError> {
    if got != expected {
        return Err(SynthError::bad_value(format!(
            "{name} mismatch: {got} vs {expected}"
        )));
    }
    Ok(())
}

/// Given the stacked output and the top grid, recovers the bottom grid.
pub fn vstack_pair_cond_inv_top(
    out: &Val,
    slots: &[Option<&Val>],
) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let top = cond_val(slots, 0)?.as_grid()?;
    check_dim("width", top.width(), out.width())?;
    if top.height() > out.height() {
        return Err(SynthError::bad_value("top grid is taller than the output"));
    }
    let prefix = grids::subgrid(out, 0, top.height(), 0, out.width())?;
    if &prefix != top {
        return Err(SynthError::bad_value("top grid is not a prefix of the output"));
    }
    let bottom = grids::subgrid(out, top.height(), out.height(), 0, out.width())?;
    Ok(vec![Val::Grid(bottom)])
}

/// Given the stacked output and the bottom grid, recovers the top grid.
pub fn vstack_pair_cond_inv_bottom(
    out: &Val,
    slots: &[Option<&Val>],
) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let bottom = cond_val(slots, 1)?.as_grid()?;
    check_dim("width", bottom.width(), out.width())?;
    if bottom.height() > out.height() {
        return Err(SynthError::bad_value("bottom grid is taller than the output"));
    }
    let split = out.height() - bottom.height();
    let suffix = grids::subgrid(out, split, out.height(), 0, out.width())?;
    if &suffix != bottom {
        return Err(SynthError::bad_value(
            "bottom grid is not a suffix of the output",
        ));
    }
    let top = grids::subgrid(out, 0, split, 0, out.width())?;
    Ok(vec![Val::Grid(top)])
}

/// Given the stacked output and the left grid, recovers the right grid.
pub fn hstack_pair_cond_inv_left(
    out: &Val,
    slots: &[Option<&Val>],
) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let left = cond_val(slots, 0)?.as_grid()?;
    check_dim("height", left.height(), out.height())?;
    if left.width() > out.width() {
        return Err(SynthError::bad_value("left grid is wider than the output"));
    }
    let prefix = grids::subgrid(out, 0, out.height(), 0, left.width())?;
    if &prefix != left {
        return Err(SynthError::bad_value("left grid is not a prefix of the output"));
    }
    let right = grids::subgrid(out, 0, out.height(), left.width(), out.width())?;
    Ok(vec![Val::Grid(right)])
}

/// Given the stacked output and the right grid, recovers the left grid.
pub fn hstack_pair_cond_inv_right(
    out: &Val,
    slots: &[Option<&Val>],
) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let right = cond_val(slots, 1)?.as_grid()?;
    check_dim("height", right.height(), out.height())?;
    if right.width() > out.width() {
        return Err(SynthError::bad_value("right grid is wider than the output"));
    }
    let split = out.width() - right.width();
    let suffix = grids::subgrid(out, 0, out.height(), split, out.width())?;
    if &suffix != right {
        return Err(SynthError::bad_value(
            "right grid is not a suffix of the output",
        ));
    }
    let left = grids::subgrid(out, 0, out.height(), 0, split)?;
    Ok(vec![Val::Grid(left)])
}

/// Given the overlay output and the top grid, recovers the bottom grid by
/// clearing every cell the top grid accounts for. Requires at least one
/// agreeing cell after padding; where both layers held the same color the
/// bottom cell is unrecoverable and comes back as background (the top layer
/// wins ties in the forward direction).
pub fn overlay_pair_cond_inv_top(
    out: &Val,
    slots: &[Option<&Val>],
) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let top = cond_val(slots, 0)?.as_grid()?;
    overlay_residual(out, top)
}

/// Given the overlay output and the bottom grid, recovers the top grid.
pub fn overlay_pair_cond_inv_bottom(
    out: &Val,
    slots: &[Option<&Val>],
) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let bottom = cond_val(slots, 1)?.as_grid()?;
    overlay_residual(out, bottom)
}

fn overlay_residual(out: &Grid, known: &Grid) -> Result<Vec<Val>, SynthError> {
    let padded = grids::pad_to(known, out.height(), out.width())?;
    let mut overlap = 0usize;
    let mut cells = Vec::with_capacity(out.height() * out.width());
    for r in 0..out.height() {
        for c in 0..out.width() {
            if padded.get(r, c) == out.get(r, c) {
                overlap += 1;
                cells.push(Color::BACKGROUND);
            } else {
                cells.push(out.get(r, c));
            }
        }
    }
    if overlap == 0 {
        return Err(SynthError::bad_value(
            "known overlay layer shares no cells with the output",
        ));
    }
    Ok(vec![Val::Grid(Grid::new(out.height(), out.width(), cells)?)])
}

/// Given the kronecker output and the template, recovers the foreground
/// mask: every template-shaped block must be either an exact copy of the
/// template (foreground) or all background.
pub fn kronecker_cond_inv(out: &Val, slots: &[Option<&Val>]) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let template = cond_val(slots, 0)?.as_grid()?;
    let (th, tw) = (template.height(), template.width());
    if th == 0 || tw == 0 {
        return Err(SynthError::bad_value("kronecker template must be non-empty"));
    }
    if out.height() % th != 0 || out.width() % tw != 0 {
        return Err(SynthError::bad_value(format!(
            "{}x{} output is not tiled by a {th}x{tw} template",
            out.height(),
            out.width()
        )));
    }
    let (mh, mw) = (out.height() / th, out.width() / tw);
    let mut cells = Vec::with_capacity(mh * mw);
    for r in 0..mh {
        for c in 0..mw {
            let block = grids::subgrid(out, r * th, (r + 1) * th, c * tw, (c + 1) * tw)?;
            if &block == template {
                cells.push(Color(1));
            } else if block.cells().iter().all(|c| c.is_background()) {
                cells.push(Color::BACKGROUND);
            } else {
                return Err(SynthError::bad_value(format!(
                    "block ({r}, {c}) is neither the template nor background",
                )));
            }
        }
    }
    Ok(vec![Val::Grid(Grid::new(mh, mw, cells)?)])
}

/// Given the inflated output and the scale, recovers the source grid.
pub fn inflate_cond_inv(out: &Val, slots: &[Option<&Val>]) -> Result<Vec<Val>, SynthError> {
    let out = out.as_grid()?;
    let scale = cond_val(slots, 1)?.as_int()?;
    let scale = usize::try_from(scale)
        .map_err(|_| SynthError::bad_value(format!("inflate scale must be non-negative, got {scale}")))?;
    Ok(vec![Val::Grid(grids::deflate_grid(out, scale)?)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(rows: &[Vec<u8>]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    fn gv(rows: &[Vec<u8>]) -> Val {
        Val::Grid(g(rows))
    }

    #[test]
    fn rotation_inverses_undo() {
        let grid = gv(&[vec![1, 2], vec![3, 4]]);
        let turned = crate::grids::rotate_cw(&[grid.clone()]).unwrap();
        assert_eq!(rotate_cw_inv(&turned).unwrap(), vec![grid.clone()]);
        let turned = crate::grids::rotate_ccw(&[grid.clone()]).unwrap();
        assert_eq!(rotate_ccw_inv(&turned).unwrap(), vec![grid]);
    }

    #[test]
    fn block_inv_requires_uniformity() {
        let uniform = gv(&[vec![6, 6, 6], vec![6, 6, 6]]);
        assert_eq!(
            block_inv(&uniform).unwrap(),
            vec![Val::Int(2), Val::Int(3), Val::Color(Color(6))]
        );
        assert!(block_inv(&gv(&[vec![6, 1]])).is_err());
    }

    #[test]
    fn vstack_cond_inverses_split_the_output() {
        let out = gv(&[vec![1, 1], vec![2, 2], vec![3, 3]]);
        let top = gv(&[vec![1, 1]]);
        let bottom = gv(&[vec![2, 2], vec![3, 3]]);
        assert_eq!(
            vstack_pair_cond_inv_top(&out, &[Some(&top), None]).unwrap(),
            vec![bottom.clone()]
        );
        assert_eq!(
            vstack_pair_cond_inv_bottom(&out, &[None, Some(&bottom)]).unwrap(),
            vec![top]
        );
    }

    #[test]
    fn vstack_cond_inv_rejects_mismatched_prefix() {
        let out = gv(&[vec![1, 1], vec![2, 2]]);
        let wrong = gv(&[vec![9, 9]]);
        assert!(vstack_pair_cond_inv_top(&out, &[Some(&wrong), None]).is_err());
        // Wrong width is structural, not just content, mismatch.
        let narrow = gv(&[vec![1]]);
        assert!(vstack_pair_cond_inv_top(&out, &[Some(&narrow), None]).is_err());
    }

    #[test]
    fn hstack_cond_inverses_split_the_output() {
        let out = gv(&[vec![1, 2, 3]]);
        let left = gv(&[vec![1]]);
        let right = gv(&[vec![2, 3]]);
        assert_eq!(
            hstack_pair_cond_inv_left(&out, &[Some(&left), None]).unwrap(),
            vec![right.clone()]
        );
        assert_eq!(
            hstack_pair_cond_inv_right(&out, &[None, Some(&right)]).unwrap(),
            vec![left]
        );
    }

    #[test]
    fn overlay_cond_inv_clears_known_layer() {
        let out = gv(&[vec![1, 2], vec![3, 0]]);
        let top = gv(&[vec![1, 0]]);
        assert_eq!(
            overlay_pair_cond_inv_top(&out, &[Some(&top), None]).unwrap(),
            // Cell (0,0) agreed with the top layer and is cleared; the
            // padded top row 1 is background, where the output is kept.
            vec![gv(&[vec![0, 2], vec![3, 0]])]
        );
    }

    #[test]
    fn overlay_cond_inv_rejects_zero_overlap() {
        let out = gv(&[vec![1, 2]]);
        let top = gv(&[vec![3, 4]]);
        assert!(overlay_pair_cond_inv_top(&out, &[Some(&top), None]).is_err());
    }

    #[test]
    fn kronecker_cond_inv_recovers_mask() {
        let template = gv(&[vec![5, 0], vec![0, 5]]);
        let out = gv(&[
            vec![5, 0, 0, 0],
            vec![0, 5, 0, 0],
            vec![0, 0, 5, 0],
            vec![0, 0, 0, 5],
        ]);
        let mask = kronecker_cond_inv(&out, &[Some(&template), None]).unwrap();
        assert_eq!(mask, vec![gv(&[vec![1, 0], vec![0, 1]])]);
        // A block that is neither template nor background is inconsistent.
        let bad = gv(&[vec![5, 0, 9, 9], vec![0, 5, 9, 9]]);
        assert!(kronecker_cond_inv(&bad, &[Some(&template), None]).is_err());
        // Dimensions must tile evenly.
        let ragged = gv(&[vec![5, 0, 0], vec![0, 5, 0]]);
        assert!(kronecker_cond_inv(&ragged, &[Some(&template), None]).is_err());
    }

    #[test]
    fn inflate_cond_inv_deflates_by_scale() {
        let out = gv(&[vec![7, 7], vec![7, 7]]);
        assert_eq!(
            inflate_cond_inv(&out, &[None, Some(&Val::Int(2))]).unwrap(),
            vec![gv(&[vec![7]])]
        );
        assert!(inflate_cond_inv(&out, &[None, Some(&Val::Int(3))]).is_err());
    }
}
