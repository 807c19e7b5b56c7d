use std::{
    borrow::Cow,
    sync::{Arc, OnceLock},
};

use serde::{Deserialize, Serialize};
use ttf_parser::{RasterGlyphImage, Tag};

use super::{
    FaceMetrics, FaceRenderer, FontExtents, GlyphExtents, GlyphId, GlyphSink,
    bitmap::nearest_strike,
};
use crate::{
    error::Error,
    opentype::{FaceOpentype, TableAvar, TableFvar, TablesLayout},
};

const SILF: Tag = Tag::from_bytes(b"Silf");

/// How to open a font file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceOptions {
    /// Face index within a font collection. Plain font files only have face 0.
    pub index: u32,
    /// Set to `false` to hide Graphite tables from shaping engines.
    pub graphite: bool,
}

impl Default for FaceOptions {
    fn default() -> Self {
        FaceOptions {
            index: 0,
            graphite: true,
        }
    }
}

/// A TrueType, OpenType or AAT font (or one face of a collection).
pub struct OpentypeFace<'a> {
    face: ttf_parser::Face<'a>,
    fvar: TableFvar,
    avar: TableAvar,
    graphite: bool,
    layout: OnceLock<Arc<TablesLayout>>,
}

impl<'a> OpentypeFace<'a> {
    pub fn from_slice(data: &'a [u8], options: &FaceOptions) -> Result<Self, Error> {
        let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);

        if options.index >= count {
            return Err(Error::InvalidFaceIndex {
                index: options.index,
                count,
            });
        }

        let face = ttf_parser::Face::parse(data, options.index)?;

        Ok(Self::from_face(face, options))
    }

    pub fn from_face(face: ttf_parser::Face<'a>, options: &FaceOptions) -> Self {
        let fvar = TableFvar::from_sfnt(&face);
        let avar = TableAvar::from_sfnt(&face);

        tracing::debug!(
            index = options.index,
            glyphs = face.number_of_glyphs(),
            axes = fvar.axes.len(),
            "loaded sfnt face"
        );

        OpentypeFace {
            face,
            fvar,
            avar,
            graphite: options.graphite,
            layout: OnceLock::new(),
        }
    }

    /// The underlying decoder face at its default instance.
    pub fn sfnt(&self) -> &ttf_parser::Face<'a> {
        &self.face
    }

    fn valid_glyph(&self, glyph: GlyphId) -> Option<ttf_parser::GlyphId> {
        glyph
            .to_sfnt()
            .filter(|id| id.0 < self.face.number_of_glyphs())
    }

    /// Maps normalized coordinates back to one design space value per axis,
    /// the form font decoders and shapers take variations in.
    pub fn design_coords(&self, coords: &[f32]) -> Vec<(Tag, f32)> {
        let mut normalized: Vec<f32> = (0..self.fvar.axes.len())
            .map(|i| {
                coords
                    .get(i)
                    .copied()
                    .filter(|c| c.is_finite())
                    .map_or(0., |c| c.clamp(-1., 1.))
            })
            .collect();
        self.avar.unmap(&mut normalized);

        let values = self.fvar.denormalize(&normalized);
        self.fvar.axes.iter().map(|axis| axis.tag).zip(values).collect()
    }

    /// The decoder face set to the instance at the given normalized
    /// coordinates.
    fn instance(&self, coords: &[f32]) -> Cow<'_, ttf_parser::Face<'a>> {
        if self.fvar.is_empty() || coords.iter().all(|&c| c == 0.) {
            return Cow::Borrowed(&self.face);
        }

        let mut face = self.face.clone();
        for (tag, value) in self.design_coords(coords) {
            if face.set_variation(tag, value).is_none() {
                tracing::trace!(axis = ?tag, "variation not applied");
            }
        }

        Cow::Owned(face)
    }

    fn h_advance(&self, face: &ttf_parser::Face, id: ttf_parser::GlyphId) -> f32 {
        face.glyph_hor_advance(id).map_or_else(
            || {
                tracing::trace!(glyph = id.0, "no horizontal advance, using upem");
                self.upem() as f32
            },
            f32::from,
        )
    }

    /// Every raster strike holding `id`, from smallest to largest.
    fn raster_strikes(&self, id: ttf_parser::GlyphId) -> Vec<RasterGlyphImage<'_>> {
        let mut strikes = Vec::new();
        let mut request = 1;

        // The decoder picks the smallest strike at least as large as the
        // request, or the largest one.
        while let Some(image) = self.face.glyph_raster_image(id, request) {
            if image.pixels_per_em < request {
                break;
            }

            let next = image.pixels_per_em.checked_add(1);
            strikes.push(image);

            match next {
                Some(next) => request = next,
                None => break,
            }
        }

        strikes
    }
}

impl FaceMetrics for OpentypeFace<'_> {
    fn upem(&self) -> u16 {
        self.face.units_per_em()
    }

    fn glyph_name(&self, glyph: GlyphId) -> &str {
        self.valid_glyph(glyph)
            .and_then(|id| self.face.glyph_name(id))
            .unwrap_or("")
    }

    fn font_h_extents(&self, coords: &[f32]) -> Option<FontExtents> {
        let face = self.instance(coords);

        Some(FontExtents {
            ascender: face.ascender().into(),
            descender: face.descender().into(),
            line_gap: face.line_gap().into(),
        })
    }

    fn font_v_extents(&self, coords: &[f32]) -> Option<FontExtents> {
        let face = self.instance(coords);

        Some(FontExtents {
            ascender: face.vertical_ascender()?.into(),
            descender: face.vertical_descender()?.into(),
            line_gap: face.vertical_line_gap()?.into(),
        })
    }

    fn nominal_glyph(&self, ch: char) -> Option<GlyphId> {
        self.face.glyph_index(ch).map(GlyphId::from)
    }

    fn horizontal_advance(&self, glyph: GlyphId, coords: &[f32]) -> f32 {
        let Some(id) = self.valid_glyph(glyph) else {
            return 0.;
        };

        self.h_advance(&self.instance(coords), id)
    }

    fn vertical_advance(&self, glyph: GlyphId, coords: &[f32]) -> f32 {
        let Some(id) = self.valid_glyph(glyph) else {
            return 0.;
        };

        self.instance(coords).glyph_ver_advance(id).map_or_else(
            || {
                tracing::trace!(glyph = id.0, "no vertical advance, using upem");
                self.upem() as f32
            },
            f32::from,
        )
    }

    fn glyph_h_origin(&self, glyph: GlyphId, _coords: &[f32]) -> Option<(i32, i32)> {
        self.valid_glyph(glyph).map(|_| (0, 0))
    }

    fn glyph_v_origin(&self, glyph: GlyphId, coords: &[f32]) -> Option<(i32, i32)> {
        let id = self.valid_glyph(glyph)?;
        let face = self.instance(coords);

        let x = (self.h_advance(&face, id) / 2.) as i32;

        let y = face
            .glyph_y_origin(id)
            .map(i32::from)
            .or_else(|| {
                let bearing = face.glyph_ver_side_bearing(id)?;
                let bbox = face.glyph_bounding_box(id)?;

                Some(i32::from(bearing) + i32::from(bbox.y_max))
            })
            .unwrap_or_else(|| face.ascender().into());

        Some((x, y))
    }

    fn glyph_extents(
        &self,
        glyph: GlyphId,
        coords: &[f32],
        x_ppem: u16,
        y_ppem: u16,
    ) -> Option<GlyphExtents> {
        let id = self.valid_glyph(glyph)?;

        if let Some(bbox) = self.instance(coords).glyph_bounding_box(id) {
            return Some(GlyphExtents {
                x_bearing: bbox.x_min.into(),
                y_bearing: bbox.y_max.into(),
                width: f32::from(bbox.x_max) - f32::from(bbox.x_min),
                height: f32::from(bbox.y_min) - f32::from(bbox.y_max),
            });
        }

        let image = nearest_strike(self.raster_strikes(id), x_ppem.max(y_ppem), |image| {
            image.pixels_per_em
        })?;

        if image.pixels_per_em == 0 {
            return None;
        }

        let scale = self.upem() as f32 / image.pixels_per_em as f32;

        Some(GlyphExtents {
            x_bearing: f32::from(image.x) * scale,
            y_bearing: (f32::from(image.y) + f32::from(image.height)) * scale,
            width: f32::from(image.width) * scale,
            height: -f32::from(image.height) * scale,
        })
    }

    fn normalize_variations(&self, coords: &[f32]) -> Vec<f32> {
        if self.fvar.is_empty() {
            return coords.to_vec();
        }

        let mut normalized = self.fvar.normalize(coords);
        self.avar.map(&mut normalized);
        normalized
    }
}

struct OutlineAdapter<'s>(&'s mut dyn GlyphSink);

impl ttf_parser::OutlineBuilder for OutlineAdapter<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.curve_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

impl FaceRenderer for OpentypeFace<'_> {
    fn draw(&self, glyph: GlyphId, sink: &mut dyn GlyphSink) -> bool {
        let Some(id) = self.valid_glyph(glyph) else {
            return false;
        };

        if self
            .face
            .outline_glyph(id, &mut OutlineAdapter(&mut *sink))
            .is_some()
        {
            return true;
        }

        match self.face.glyph_raster_image(id, u16::MAX) {
            Some(image) => {
                sink.image(image.into());
                true
            }
            None => false,
        }
    }
}

impl FaceOpentype for OpentypeFace<'_> {
    fn tables_layout(&self) -> Arc<TablesLayout> {
        self.layout
            .get_or_init(|| Arc::new(TablesLayout::from_sfnt(&self.face)))
            .clone()
    }

    fn variations(&self) -> &TableFvar {
        &self.fvar
    }

    fn is_graphite(&self) -> Option<&dyn FaceOpentype> {
        (self.graphite && self.raw_table(SILF).is_some()).then_some(self as &dyn FaceOpentype)
    }

    fn raw_table(&self, tag: Tag) -> Option<&[u8]> {
        self.face.raw_face().table(tag)
    }
}
