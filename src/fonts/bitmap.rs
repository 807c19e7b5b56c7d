use std::{cmp::Reverse, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use super::{
    DEFAULT_UPEM, FaceMetrics, FaceRenderer, FontExtents, GlyphExtents, GlyphId, GlyphImage,
    GlyphSink, ImageFormat,
};
use crate::error::Error;

/// Picks the strike closest to `ppem`. Ties go to the larger strike, and a
/// `ppem` of 0 asks for the largest one.
pub(crate) fn nearest_strike<T>(
    strikes: impl IntoIterator<Item = T>,
    ppem: u16,
    ppem_of: impl Fn(&T) -> u16,
) -> Option<T> {
    strikes.into_iter().min_by_key(|strike| {
        let size = ppem_of(strike);
        let distance = if ppem == 0 { 0 } else { size.abs_diff(ppem) };

        (distance, Reverse(size))
    })
}

/// One glyph of a strike. Positions are in pixels, `y` is the bottom edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapGlyph {
    pub advance: u16,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

/// All glyphs rendered at one size.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapStrike {
    pub ppem: u16,
    pub ascent: i16,
    pub descent: i16,
    pub line_gap: i16,
    pub bits_per_pixel: u8,
    pub glyphs: BTreeMap<GlyphId, BitmapGlyph>,
}

/// A font made only of prerendered bitmaps, like PCF or BDF fonts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapFace {
    pub units_per_em: Option<u16>,
    pub num_glyphs: u32,
    pub cmap: BTreeMap<char, GlyphId>,
    /// Indexed by glyph id.
    pub glyph_names: Vec<String>,
    pub strikes: Vec<BitmapStrike>,
}

impl BitmapFace {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let face: BitmapFace = serde_json::from_str(json)?;

        tracing::debug!(
            glyphs = face.num_glyphs,
            strikes = face.strikes.len(),
            "loaded bitmap face"
        );

        Ok(face)
    }

    fn is_valid(&self, glyph: GlyphId) -> bool {
        glyph.0 < self.num_glyphs
    }

    fn scale(&self, strike: &BitmapStrike) -> Option<f32> {
        (strike.ppem != 0).then(|| self.upem() as f32 / strike.ppem as f32)
    }

    fn largest_strike(&self) -> Option<&BitmapStrike> {
        nearest_strike(&self.strikes, 0, |strike| strike.ppem)
    }

    /// Strikes holding `glyph`, none for ids outside the face.
    fn strikes_with(&self, glyph: GlyphId) -> impl Iterator<Item = (&BitmapStrike, &BitmapGlyph)> {
        let valid = self.is_valid(glyph);

        self.strikes
            .iter()
            .filter(move |_| valid)
            .filter_map(move |strike| Some((strike, strike.glyphs.get(&glyph)?)))
    }
}

impl FaceMetrics for BitmapFace {
    fn upem(&self) -> u16 {
        self.units_per_em
            .filter(|&upem| upem != 0)
            .unwrap_or(DEFAULT_UPEM)
    }

    fn glyph_name(&self, glyph: GlyphId) -> &str {
        self.glyph_names
            .get(glyph.0 as usize)
            .filter(|_| self.is_valid(glyph))
            .map_or("", String::as_str)
    }

    fn font_h_extents(&self, _coords: &[f32]) -> Option<FontExtents> {
        let strike = self.largest_strike()?;
        let scale = self.scale(strike)?;

        Some(FontExtents {
            ascender: f32::from(strike.ascent) * scale,
            descender: f32::from(strike.descent) * scale,
            line_gap: f32::from(strike.line_gap) * scale,
        })
    }

    fn font_v_extents(&self, _coords: &[f32]) -> Option<FontExtents> {
        None
    }

    fn nominal_glyph(&self, ch: char) -> Option<GlyphId> {
        self.cmap.get(&ch).copied()
    }

    fn horizontal_advance(&self, glyph: GlyphId, _coords: &[f32]) -> f32 {
        if !self.is_valid(glyph) {
            return 0.;
        }

        nearest_strike(self.strikes_with(glyph), 0, |(strike, _)| strike.ppem)
            .and_then(|(strike, bitmap)| Some(f32::from(bitmap.advance) * self.scale(strike)?))
            .unwrap_or_else(|| {
                tracing::trace!(glyph = glyph.0, "no bitmap advance, using upem");
                self.upem() as f32
            })
    }

    fn vertical_advance(&self, glyph: GlyphId, _coords: &[f32]) -> f32 {
        if self.is_valid(glyph) {
            self.upem() as f32
        } else {
            0.
        }
    }

    fn glyph_h_origin(&self, glyph: GlyphId, _coords: &[f32]) -> Option<(i32, i32)> {
        self.is_valid(glyph).then_some((0, 0))
    }

    fn glyph_v_origin(&self, _glyph: GlyphId, _coords: &[f32]) -> Option<(i32, i32)> {
        None
    }

    fn glyph_extents(
        &self,
        glyph: GlyphId,
        _coords: &[f32],
        x_ppem: u16,
        y_ppem: u16,
    ) -> Option<GlyphExtents> {
        let (strike, bitmap) = nearest_strike(
            self.strikes_with(glyph),
            x_ppem.max(y_ppem),
            |(strike, _)| strike.ppem,
        )?;
        let scale = self.scale(strike)?;

        Some(GlyphExtents {
            x_bearing: f32::from(bitmap.x) * scale,
            y_bearing: (f32::from(bitmap.y) + f32::from(bitmap.height)) * scale,
            width: f32::from(bitmap.width) * scale,
            height: -f32::from(bitmap.height) * scale,
        })
    }

    fn normalize_variations(&self, coords: &[f32]) -> Vec<f32> {
        coords.to_vec()
    }
}

impl FaceRenderer for BitmapFace {
    fn draw(&self, glyph: GlyphId, sink: &mut dyn GlyphSink) -> bool {
        let Some((strike, bitmap)) =
            nearest_strike(self.strikes_with(glyph), 0, |(strike, _)| strike.ppem)
        else {
            return false;
        };

        sink.image(GlyphImage {
            x: bitmap.x,
            y: bitmap.y,
            width: bitmap.width,
            height: bitmap.height,
            pixels_per_em: strike.ppem,
            format: ImageFormat::Bitmap {
                bits_per_pixel: strike.bits_per_pixel.max(1),
                packed: false,
            },
            data: &bitmap.data,
        });

        true
    }
}
