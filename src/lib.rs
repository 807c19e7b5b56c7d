//! Font faces behind one metrics and rendering interface.
//!
//! Every face kind implements [`FaceMetrics`] and [`FaceRenderer`], and with
//! them [`Face`]. Faces loaded from sfnt files additionally implement
//! [`FaceOpentype`], which exposes their advanced layout tables and variation
//! axes. Faces are immutable once loaded and can be shared across threads.

pub mod error;
pub mod fonts;
pub mod opentype;
pub mod text;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::Error;
pub use fonts::{
    DEFAULT_UPEM, Face, FaceMetrics, FaceRenderer, FontExtents, GlyphExtents, GlyphId, GlyphImage,
    GlyphSink, ImageFormat,
    bitmap::BitmapFace,
    builtin::AfmFace,
    truetype::{FaceOptions, OpentypeFace},
};
pub use opentype::{FaceOpentype, TableFvar, TablesLayout};
pub use ttf_parser::Tag;
