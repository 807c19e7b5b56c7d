pub mod bitmap;
pub mod builtin;
pub mod truetype;

use serde::{Deserialize, Serialize};

/// Units per em used by formats without an explicit value.
pub const DEFAULT_UPEM: u16 = 1000;

/// Identifies a glyph within one font.
///
/// Glyph ids are private to the font that produced them and are unrelated to
/// Unicode code points. Id 0 is the notdef glyph.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GlyphId(pub u32);

impl GlyphId {
    pub const NOTDEF: GlyphId = GlyphId(0);

    pub fn is_notdef(self) -> bool {
        self.0 == 0
    }

    /// sfnt based fonts only address 16 bit glyph ids.
    pub fn to_sfnt(self) -> Option<ttf_parser::GlyphId> {
        u16::try_from(self.0).ok().map(ttf_parser::GlyphId)
    }
}

impl From<ttf_parser::GlyphId> for GlyphId {
    fn from(id: ttf_parser::GlyphId) -> Self {
        GlyphId(id.0 as u32)
    }
}

impl From<u16> for GlyphId {
    fn from(id: u16) -> Self {
        GlyphId(id as u32)
    }
}

/// Font wide extents in font units, for one text direction.
///
/// With a y axis that grows upwards the ascender is usually positive and the
/// descender negative, but neither sign is guaranteed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FontExtents {
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

/// Ink extents of a single glyph in font units.
///
/// The height is usually negative, since it goes from the top edge down.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlyphExtents {
    /// Left side of the glyph from the origin.
    pub x_bearing: f32,
    /// Top side of the glyph from the origin.
    pub y_bearing: f32,
    pub width: f32,
    pub height: f32,
}

/// Metrics a layout engine needs from a font file.
///
/// Everything is expressed in unscaled font units. Methods taking `coords`
/// expect normalized variation coordinates (see
/// [`FaceMetrics::normalize_variations`]); they are ignored by non variable
/// fonts, and a sequence with the wrong number of axes is padded with defaults
/// or truncated.
pub trait FaceMetrics {
    /// Units per em, or [`DEFAULT_UPEM`] if the font doesn't say.
    fn upem(&self) -> u16;

    /// The glyph's name, or an empty string for unnamed or invalid glyphs.
    fn glyph_name(&self, glyph: GlyphId) -> &str;

    fn font_h_extents(&self, coords: &[f32]) -> Option<FontExtents>;

    fn font_v_extents(&self, coords: &[f32]) -> Option<FontExtents>;

    /// Maps a character to its default glyph.
    fn nominal_glyph(&self, ch: char) -> Option<GlyphId>;

    /// Horizontal advance. A valid glyph without advance data gets a default
    /// (usually the upem), an invalid glyph gets 0.
    fn horizontal_advance(&self, glyph: GlyphId, coords: &[f32]) -> f32;

    /// Same as [`FaceMetrics::horizontal_advance`] for vertical text.
    fn vertical_advance(&self, glyph: GlyphId, coords: &[f32]) -> f32;

    /// Origin of the glyph for horizontal text. Callers assume `(0, 0)` when
    /// this returns `None`.
    fn glyph_h_origin(&self, glyph: GlyphId, coords: &[f32]) -> Option<(i32, i32)>;

    fn glyph_v_origin(&self, glyph: GlyphId, coords: &[f32]) -> Option<(i32, i32)>;

    /// Ink extents of a glyph. Bitmap glyphs use the stored resolution closest
    /// to the requested ppem; outline glyphs ignore the ppem.
    fn glyph_extents(
        &self,
        glyph: GlyphId,
        coords: &[f32],
        x_ppem: u16,
        y_ppem: u16,
    ) -> Option<GlyphExtents>;

    /// Maps design space coordinates (one per axis) to normalized coordinates
    /// where the axis minimum, default and maximum become -1, 0 and 1.
    ///
    /// Returns the input unchanged for non variable fonts.
    fn normalize_variations(&self, coords: &[f32]) -> Vec<f32>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    /// Uncompressed rows, `bits_per_pixel` of 1, 2, 4 or 8. Unpacked rows are
    /// padded to a byte boundary.
    Bitmap { bits_per_pixel: u8, packed: bool },
    PremultipliedBgra,
}

/// A glyph stored as an image, positioned in pixels at `pixels_per_em`.
#[derive(Copy, Clone, Debug)]
pub struct GlyphImage<'a> {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub pixels_per_em: u16,
    pub format: ImageFormat,
    pub data: &'a [u8],
}

impl<'a> From<ttf_parser::RasterGlyphImage<'a>> for GlyphImage<'a> {
    fn from(image: ttf_parser::RasterGlyphImage<'a>) -> Self {
        use ttf_parser::RasterImageFormat as F;

        let format = match image.format {
            F::PNG => ImageFormat::Png,
            F::BitmapMono => ImageFormat::Bitmap { bits_per_pixel: 1, packed: false },
            F::BitmapMonoPacked => ImageFormat::Bitmap { bits_per_pixel: 1, packed: true },
            F::BitmapGray2 => ImageFormat::Bitmap { bits_per_pixel: 2, packed: false },
            F::BitmapGray2Packed => ImageFormat::Bitmap { bits_per_pixel: 2, packed: true },
            F::BitmapGray4 => ImageFormat::Bitmap { bits_per_pixel: 4, packed: false },
            F::BitmapGray4Packed => ImageFormat::Bitmap { bits_per_pixel: 4, packed: true },
            F::BitmapGray8 => ImageFormat::Bitmap { bits_per_pixel: 8, packed: false },
            F::BitmapPremulBgra32 => ImageFormat::PremultipliedBgra,
        };

        GlyphImage {
            x: image.x,
            y: image.y,
            width: image.width,
            height: image.height,
            pixels_per_em: image.pixels_per_em,
            format,
            data: image.data,
        }
    }
}

/// Destination for [`FaceRenderer::draw`]. Outline coordinates are in font
/// units.
pub trait GlyphSink {
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32);
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32);
    fn close(&mut self);
    fn image(&mut self, image: GlyphImage<'_>);
}

pub trait FaceRenderer {
    /// Streams the outline or image of `glyph` into `sink`.
    ///
    /// Accepts any glyph id, notdef included. Returns `false` if the face has
    /// nothing to draw for it.
    fn draw(&self, glyph: GlyphId, sink: &mut dyn GlyphSink) -> bool;
}

/// The minimal capability set every font format provides.
pub trait Face: FaceMetrics + FaceRenderer {}

impl<T: FaceMetrics + FaceRenderer + ?Sized> Face for T {}
