//! Forward grid primitives.
//!
//! Every public function here matches the `ForwardFn` calling convention:
//! it receives the per-example argument values (already arity- and
//! type-checked against the declared signature) and computes one output,
//! rejecting structurally impossible inputs with a domain error. Output
//! grid area is bounded by `MAX_GRID_CELLS`, which keeps the blow-up
//! primitives (`inflate`, `kronecker`) from exploding a search.

use bidir_core::{Color, Grid, SynthError, Val, MAX_GRID_CELLS};

fn build(
    height: usize,
    width: usize,
    f: impl Fn(usize, usize) -> Color,
) -> Result<Grid, SynthError> {
    // Reject oversized outputs before materializing the cell buffer.
    if height * width > MAX_GRID_CELLS {
        return Err(SynthError::bad_value(format!(
            "grid {height}x{width} exceeds {MAX_GRID_CELLS} cells"
        )));
    }
    let mut cells = Vec::with_capacity(height * width);
    for r in 0..height {
        for c in 0..width {
            cells.push(f(r, c));
        }
    }
    Grid::new(height, width, cells)
}

fn usize_arg(name: &str, v: i64) -> Result<usize, SynthError> {
    usize::try_from(v).map_err(|_| {
        SynthError::bad_value(format!(
            "'{name}' requires a non-negative integer, got {v}"
        ))
    })
}

/// Rectangular region copy, bounds already validated by the caller.
pub(crate) fn subgrid(
    g: &Grid,
    r0: usize,
    r1: usize,
    c0: usize,
    c1: usize,
) -> Result<Grid, SynthError> {
    build(r1 - r0, c1 - c0, |r, c| g.get(r0 + r, c0 + c))
}

/// Pads on the bottom/right with background up to `height` x `width`.
/// Fails if the grid is already larger in either dimension.
pub(crate) fn pad_to(g: &Grid, height: usize, width: usize) -> Result<Grid, SynthError> {
    if g.height() > height || g.width() > width {
        return Err(SynthError::bad_value(format!(
            "cannot pad {}x{} grid to {height}x{width}",
            g.height(),
            g.width()
        )));
    }
    build(height, width, |r, c| {
        if r < g.height() && c < g.width() {
            g.get(r, c)
        } else {
            Color::BACKGROUND
        }
    })
}

/// The single color filling `g`, if it is uniform and non-empty.
pub(crate) fn uniform_color(g: &Grid) -> Option<Color> {
    let first = *g.cells().first()?;
    g.cells().iter().all(|&c| c == first).then_some(first)
}

pub(crate) fn rotate_cw_grid(g: &Grid) -> Result<Grid, SynthError> {
    let h = g.height();
    build(g.width(), h, |r, c| g.get(h - 1 - c, r))
}

pub(crate) fn rotate_ccw_grid(g: &Grid) -> Result<Grid, SynthError> {
    let w = g.width();
    build(w, g.height(), |r, c| g.get(c, w - 1 - r))
}

pub(crate) fn hflip_grid(g: &Grid) -> Result<Grid, SynthError> {
    let w = g.width();
    build(g.height(), w, |r, c| g.get(r, w - 1 - c))
}

pub(crate) fn vflip_grid(g: &Grid) -> Result<Grid, SynthError> {
    let h = g.height();
    build(h, g.width(), |r, c| g.get(h - 1 - r, c))
}

pub(crate) fn vstack_grids(grids: &[Grid]) -> Result<Grid, SynthError> {
    let first = grids
        .first()
        .ok_or_else(|| SynthError::bad_value("cannot vstack an empty list"))?;
    let width = first.width();
    let mut cells = Vec::new();
    for g in grids {
        if g.width() != width {
            return Err(SynthError::bad_value(format!(
                "vstack width mismatch: {} vs {width}",
                g.width()
            )));
        }
        cells.extend_from_slice(g.cells());
    }
    Grid::new(grids.iter().map(Grid::height).sum(), width, cells)
}

pub(crate) fn hstack_grids(grids: &[Grid]) -> Result<Grid, SynthError> {
    let first = grids
        .first()
        .ok_or_else(|| SynthError::bad_value("cannot hstack an empty list"))?;
    let height = first.height();
    let width = grids.iter().map(Grid::width).sum();
    for g in grids {
        if g.height() != height {
            return Err(SynthError::bad_value(format!(
                "hstack height mismatch: {} vs {height}",
                g.height()
            )));
        }
    }
    let mut offsets = Vec::with_capacity(grids.len());
    let mut acc = 0;
    for g in grids {
        offsets.push(acc);
        acc += g.width();
    }
    build(height, width, |r, c| {
        let i = offsets.partition_point(|&o| o <= c) - 1;
        grids[i].get(r, c - offsets[i])
    })
}

pub(crate) fn vstack_pair_grids(top: &Grid, bottom: &Grid) -> Result<Grid, SynthError> {
    vstack_grids(&[top.clone(), bottom.clone()])
}

pub(crate) fn hstack_pair_grids(left: &Grid, right: &Grid) -> Result<Grid, SynthError> {
    hstack_grids(&[left.clone(), right.clone()])
}

/// Overlay with the top grid winning on non-background cells; both grids
/// are padded bottom/right with background to the common bounding shape.
pub(crate) fn overlay_pair_grids(top: &Grid, bottom: &Grid) -> Result<Grid, SynthError> {
    let height = top.height().max(bottom.height());
    let width = top.width().max(bottom.width());
    let top = pad_to(top, height, width)?;
    let bottom = pad_to(bottom, height, width)?;
    build(height, width, |r, c| {
        let t = top.get(r, c);
        if t.is_background() {
            bottom.get(r, c)
        } else {
            t
        }
    })
}

pub(crate) fn inflate_grid(g: &Grid, scale: usize) -> Result<Grid, SynthError> {
    if scale == 0 {
        return Err(SynthError::bad_value("inflate scale must be positive"));
    }
    build(g.height() * scale, g.width() * scale, |r, c| {
        g.get(r / scale, c / scale)
    })
}

/// Inverse of `inflate`: every `scale` x `scale` block must be uniform.
pub(crate) fn deflate_grid(g: &Grid, scale: usize) -> Result<Grid, SynthError> {
    if scale == 0 {
        return Err(SynthError::bad_value("deflate scale must be positive"));
    }
    if g.height() % scale != 0 || g.width() % scale != 0 {
        return Err(SynthError::bad_value(format!(
            "deflate scale {scale} does not divide a {}x{} grid",
            g.height(),
            g.width()
        )));
    }
    let (h, w) = (g.height() / scale, g.width() / scale);
    for r in 0..h {
        for c in 0..w {
            let color = g.get(r * scale, c * scale);
            for dr in 0..scale {
                for dc in 0..scale {
                    if g.get(r * scale + dr, c * scale + dc) != color {
                        return Err(SynthError::bad_value(format!(
                            "deflate block ({r}, {c}) is not uniform"
                        )));
                    }
                }
            }
        }
    }
    build(h, w, |r, c| g.get(r * scale, c * scale))
}

/// Tiles `template` into every cell of `mask` that holds a non-background
/// color; background mask cells become background blocks.
pub(crate) fn kronecker_grids(template: &Grid, mask: &Grid) -> Result<Grid, SynthError> {
    let (th, tw) = (template.height(), template.width());
    if th == 0 || tw == 0 {
        return Err(SynthError::bad_value("kronecker template must be non-empty"));
    }
    build(mask.height() * th, mask.width() * tw, |r, c| {
        if mask.get(r / th, c / tw).is_background() {
            Color::BACKGROUND
        } else {
            template.get(r % th, c % tw)
        }
    })
}

// ---------------------------------------------------------------------------
// ForwardFn wrappers
// ---------------------------------------------------------------------------

pub fn rotate_cw(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(rotate_cw_grid(args[0].as_grid()?)?))
}

pub fn rotate_ccw(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(rotate_ccw_grid(args[0].as_grid()?)?))
}

pub fn hflip(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(hflip_grid(args[0].as_grid()?)?))
}

pub fn vflip(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(vflip_grid(args[0].as_grid()?)?))
}

/// The first `height / 2` rows. Needs at least two rows to be meaningful.
pub fn top_half(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    if g.height() < 2 {
        return Err(SynthError::bad_value(format!(
            "top_half needs at least 2 rows, got {}",
            g.height()
        )));
    }
    Ok(Val::Grid(subgrid(g, 0, g.height() / 2, 0, g.width())?))
}

/// Splits a grid into its rows, top to bottom, each a `1 x width` grid.
pub fn rows(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    let out = (0..g.height())
        .map(|r| subgrid(g, r, r + 1, 0, g.width()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Val::GridList(out))
}

/// Splits a grid into its columns, left to right, each a `height x 1` grid.
pub fn columns(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    let out = (0..g.width())
        .map(|c| subgrid(g, 0, g.height(), c, c + 1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Val::GridList(out))
}

pub fn vstack(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(vstack_grids(args[0].as_grid_list()?)?))
}

pub fn hstack(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(hstack_grids(args[0].as_grid_list()?)?))
}

pub fn vstack_pair(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(vstack_pair_grids(
        args[0].as_grid()?,
        args[1].as_grid()?,
    )?))
}

pub fn hstack_pair(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(hstack_pair_grids(
        args[0].as_grid()?,
        args[1].as_grid()?,
    )?))
}

pub fn overlay_pair(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(overlay_pair_grids(
        args[0].as_grid()?,
        args[1].as_grid()?,
    )?))
}

/// A uniform `height x width` grid of one color.
pub fn block(args: &[Val]) -> Result<Val, SynthError> {
    let height = usize_arg("block", args[0].as_int()?)?;
    let width = usize_arg("block", args[1].as_int()?)?;
    if height == 0 || width == 0 {
        return Err(SynthError::bad_value("block dimensions must be positive"));
    }
    Ok(Val::Grid(Grid::filled(height, width, args[2].as_color()?)?))
}

/// Tightest subgrid containing every non-background cell. An all-background
/// grid crops to the empty grid.
pub fn crop(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for r in 0..g.height() {
        for c in 0..g.width() {
            if !g.get(r, c).is_background() {
                bounds = Some(match bounds {
                    None => (r, r, c, c),
                    Some((r0, r1, c0, c1)) => (r0.min(r), r1.max(r), c0.min(c), c1.max(c)),
                });
            }
        }
    }
    let cropped = match bounds {
        Some((r0, r1, c0, c1)) => subgrid(g, r0, r1 + 1, c0, c1 + 1)?,
        None => Grid::new(0, 0, Vec::new())?,
    };
    Ok(Val::Grid(cropped))
}

/// Replaces every cell of the given color with background.
pub fn set_bg(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    let color = args[1].as_color()?;
    Ok(Val::Grid(g.map(|c| {
        if c == color {
            Color::BACKGROUND
        } else {
            c
        }
    })))
}

/// Replaces every background cell with the given color.
pub fn unset_bg(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    let color = args[1].as_color()?;
    Ok(Val::Grid(g.map(|c| {
        if c.is_background() {
            color
        } else {
            c
        }
    })))
}

/// The most frequent non-background color; ties break toward the lower
/// color index. Fails on a grid with no foreground cells.
pub fn get_color(args: &[Val]) -> Result<Val, SynthError> {
    let g = args[0].as_grid()?;
    let mut counts = [0usize; Color::COUNT as usize];
    for &c in g.cells() {
        if !c.is_background() {
            counts[c.0 as usize] += 1;
        }
    }
    let best = (0..counts.len()).max_by_key(|&i| (counts[i], usize::MAX - i));
    match best {
        Some(i) if counts[i] > 0 => Ok(Val::Color(Color(i as u8))),
        _ => Err(SynthError::bad_value("get_color on an all-background grid")),
    }
}

pub fn inflate(args: &[Val]) -> Result<Val, SynthError> {
    let scale = usize_arg("inflate", args[1].as_int()?)?;
    Ok(Val::Grid(inflate_grid(args[0].as_grid()?, scale)?))
}

pub fn deflate(args: &[Val]) -> Result<Val, SynthError> {
    let scale = usize_arg("deflate", args[1].as_int()?)?;
    Ok(Val::Grid(deflate_grid(args[0].as_grid()?, scale)?))
}

pub fn kronecker(args: &[Val]) -> Result<Val, SynthError> {
    Ok(Val::Grid(kronecker_grids(
        args[0].as_grid()?,
        args[1].as_grid()?,
    )?))
}
