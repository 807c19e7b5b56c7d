//! Turning text into glyph runs with the faces of [`crate::fonts`].

pub mod shaping;

pub use shaping::{ShapeText, ShapedGlyph, Shaper, shape_with_fallback};
