//! Runtime value representation.
//!
//! [`Val`] is the dynamic counterpart to the [`ValType`] tag system. Every
//! cell of a value node's per-example tuple is a `Val`. All variants are
//! `Eq + Hash` so the graph can deduplicate nodes by value identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;
use crate::types::{Color, ValType};

/// Upper bound on grid cells, guarding `kronecker`/`inflate` against
/// producing grids that eat memory for nothing.
pub const MAX_GRID_CELLS: usize = 10_000;

/// A dense row-major color matrix.
///
/// Zero-size grids are representable: a conditional inverse may
/// legitimately derive an empty remainder (splitting a stack at its full
/// height). Construction rejects grids over [`MAX_GRID_CELLS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Color>,
}

impl Grid {
    /// Creates a grid from row-major cells. Fails if the cell count does not
    /// match the dimensions or the grid is oversized.
    pub fn new(height: usize, width: usize, cells: Vec<Color>) -> Result<Grid, SynthError> {
        if height * width > MAX_GRID_CELLS {
            return Err(SynthError::bad_value(format!(
                "grid {height}x{width} exceeds {MAX_GRID_CELLS} cells"
            )));
        }
        if cells.len() != height * width {
            return Err(SynthError::bad_value(format!(
                "grid {height}x{width} needs {} cells, got {}",
                height * width,
                cells.len()
            )));
        }
        if let Some(c) = cells.iter().find(|c| c.0 >= Color::COUNT) {
            return Err(SynthError::bad_value(format!("color {c} out of palette")));
        }
        Ok(Grid {
            height,
            width,
            cells,
        })
    }

    /// Creates a grid from nested rows of raw color values. Fails on ragged
    /// rows or out-of-palette cells.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Grid, SynthError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let mut cells = Vec::with_capacity(height * width);
        for row in rows {
            if row.len() != width {
                return Err(SynthError::bad_value("ragged grid rows"));
            }
            for &c in row {
                if c >= Color::COUNT {
                    return Err(SynthError::bad_value(format!("color {c} out of palette")));
                }
                cells.push(Color(c));
            }
        }
        Grid::new(height, width, cells)
    }

    /// Creates a `height` x `width` grid filled with one color.
    pub fn filled(height: usize, width: usize, color: Color) -> Result<Grid, SynthError> {
        if height * width > MAX_GRID_CELLS {
            return Err(SynthError::bad_value(format!(
                "grid {height}x{width} exceeds {MAX_GRID_CELLS} cells"
            )));
        }
        Grid::new(height, width, vec![color; height * width])
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `(row, col)`. Caller guarantees bounds; all primitives index
    /// within their own loops over `height()`/`width()`.
    pub fn get(&self, row: usize, col: usize) -> Color {
        self.cells[row * self.width + col]
    }

    pub fn cells(&self) -> &[Color] {
        &self.cells
    }

    /// Builds a grid of the same dimensions by mapping every cell.
    pub fn map(&self, f: impl Fn(Color) -> Color) -> Grid {
        Grid {
            height: self.height,
            width: self.width,
            cells: self.cells.iter().map(|&c| f(c)).collect(),
        }
    }

    /// The cells of row `r`.
    pub fn row(&self, r: usize) -> &[Color] {
        &self.cells[r * self.width..(r + 1) * self.width]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.height {
            for c in 0..self.width {
                write!(f, "{}", self.get(r, c))?;
            }
            if r + 1 < self.height {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// A runtime value held in one example slot of a value node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Val {
    Grid(Grid),
    GridList(Vec<Grid>),
    Int(i64),
    Color(Color),
    Bool(bool),
}

impl Val {
    /// Returns the [`ValType`] tag of this value.
    pub fn val_type(&self) -> ValType {
        match self {
            Val::Grid(_) => ValType::Grid,
            Val::GridList(_) => ValType::GridList,
            Val::Int(_) => ValType::Int,
            Val::Color(_) => ValType::Color,
            Val::Bool(_) => ValType::Bool,
        }
    }

    pub fn as_grid(&self) -> Result<&Grid, SynthError> {
        match self {
            Val::Grid(g) => Ok(g),
            other => Err(SynthError::bad_value(format!(
                "expected grid, got {}",
                other.val_type()
            ))),
        }
    }

    pub fn as_grid_list(&self) -> Result<&[Grid], SynthError> {
        match self {
            Val::GridList(gs) => Ok(gs),
            other => Err(SynthError::bad_value(format!(
                "expected grid list, got {}",
                other.val_type()
            ))),
        }
    }

    pub fn as_int(&self) -> Result<i64, SynthError> {
        match self {
            Val::Int(i) => Ok(*i),
            other => Err(SynthError::bad_value(format!(
                "expected int, got {}",
                other.val_type()
            ))),
        }
    }

    pub fn as_color(&self) -> Result<Color, SynthError> {
        match self {
            Val::Color(c) => Ok(*c),
            other => Err(SynthError::bad_value(format!(
                "expected color, got {}",
                other.val_type()
            ))),
        }
    }

    pub fn as_bool(&self) -> Result<bool, SynthError> {
        match self {
            Val::Bool(b) => Ok(*b),
            other => Err(SynthError::bad_value(format!(
                "expected bool, got {}",
                other.val_type()
            ))),
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Grid(g) => write!(f, "{g}"),
            Val::GridList(gs) => write!(f, "[{} grids]", gs.len()),
            Val::Int(i) => write!(f, "{i}"),
            Val::Color(c) => write!(f, "{}", c.name()),
            Val::Bool(b) => write!(f, "{b}"),
        }
    }
}
