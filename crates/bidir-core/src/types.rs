//! Semantic type tags for value nodes.
//!
//! Every value flowing through the search graph carries one of a small,
//! closed set of [`ValType`] tags. Operation signatures are declared in
//! terms of these tags, and the graph enforces them across all training
//! examples simultaneously.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a value node. One tag per [`Val`](crate::value::Val)
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValType {
    Grid,
    GridList,
    Int,
    Color,
    Bool,
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValType::Grid => "grid",
            ValType::GridList => "grid list",
            ValType::Int => "int",
            ValType::Color => "color",
            ValType::Bool => "bool",
        };
        write!(f, "{name}")
    }
}

/// A single cell color, 0 through 9 in the ARC palette.
///
/// Color 0 doubles as the background color: `crop`, `overlay_pair`, and the
/// bg-handling primitives all treat it as "empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color(pub u8);

impl Color {
    pub const BACKGROUND: Color = Color(0);

    /// Number of colors in the palette.
    pub const COUNT: u8 = 10;

    /// Conventional palette names, indexed by color value.
    pub const NAMES: [&'static str; 10] = [
        "black", "blue", "red", "green", "yellow", "grey", "pink", "orange", "cyan", "maroon",
    ];

    pub fn is_background(self) -> bool {
        self == Color::BACKGROUND
    }

    /// The palette name of this color ("black" through "maroon").
    pub fn name(self) -> &'static str {
        Color::NAMES[self.0 as usize % Color::NAMES.len()]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_color_zero() {
        assert_eq!(Color::BACKGROUND, Color(0));
        assert!(Color(0).is_background());
        assert!(!Color(3).is_background());
    }

    #[test]
    fn color_names() {
        assert_eq!(Color(0).name(), "black");
        assert_eq!(Color(9).name(), "maroon");
    }

    #[test]
    fn val_type_display() {
        assert_eq!(format!("{}", ValType::Grid), "grid");
        assert_eq!(format!("{}", ValType::GridList), "grid list");
    }

    #[test]
    fn serde_roundtrip() {
        let ty = ValType::Color;
        let json = serde_json::to_string(&ty).unwrap();
        let back: ValType = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, back);
    }
}
