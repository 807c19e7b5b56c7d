use std::{cell::Cell, mem::ManuallyDrop, ops::Range, rc::Rc};

use itertools::Itertools;
use rustybuzz::{Feature, GlyphBuffer, ShapePlan, UnicodeBuffer, Variation, shape_with_plan};

use crate::fonts::{GlyphId, truetype::OpentypeFace};

#[derive(Clone, Debug, PartialEq)]
pub struct ShapedGlyph {
    pub unsafe_to_break: bool,
    pub glyph_id: GlyphId,
    /// Byte range of the source text this glyph was shaped from.
    pub text_range: Range<usize>,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// Something that turns text into positioned glyphs, in font units.
pub trait ShapeText {
    type Shaped<'a>: Iterator<Item = ShapedGlyph>
    where
        Self: 'a;

    fn shape<'a>(&'a self, text: &'a str) -> Self::Shaped<'a>;
}

/// Shapes left-to-right Latin runs with a face set to one variation instance.
pub struct Shaper<'f> {
    face: rustybuzz::Face<'f>,
    plan: ShapePlan,
    /// Set when advances of glyphs without variation data need correcting.
    unvaried_advances: bool,
}

impl<'f> Shaper<'f> {
    pub fn new(face: &OpentypeFace<'f>, coords: &[f32]) -> Self {
        Self::with_features(face, coords, &[])
    }

    /// `coords` are normalized, as returned by
    /// [`FaceMetrics::normalize_variations`](crate::fonts::FaceMetrics::normalize_variations).
    pub fn with_features(face: &OpentypeFace<'f>, coords: &[f32], features: &[Feature]) -> Self {
        let mut rb_face = rustybuzz::Face::from_face(face.sfnt().clone());

        if coords.iter().any(|&c| c != 0.) {
            let variations: Vec<Variation> = face
                .design_coords(coords)
                .into_iter()
                .map(|(tag, value)| Variation { tag, value })
                .collect();

            rb_face.set_variations(&variations);
        }

        let plan = ShapePlan::new(
            &rb_face,
            rustybuzz::Direction::LeftToRight,
            Some(rustybuzz::script::LATIN),
            None,
            features,
        );

        let tables = rb_face.tables();
        let unvaried_advances = rb_face.is_variable()
            && rb_face.has_non_default_variation_coordinates()
            && tables.hvar.is_none()
            && tables.vvar.is_none();

        tracing::trace!(features = features.len(), unvaried_advances, "built shape plan");

        Shaper {
            face: rb_face,
            plan,
            unvaried_advances,
        }
    }
}

thread_local! {
    static UNICODE_BUFFER: Cell<UnicodeBuffer> = Cell::new(UnicodeBuffer::new());
}

impl<'f> ShapeText for Shaper<'f> {
    type Shaped<'b>
        = Shaped<'b, 'f>
    where
        Self: 'b;

    fn shape<'b>(&'b self, text: &'b str) -> Self::Shaped<'b> {
        // Normally the same buffer is taken and returned on every call, which
        // saves an allocation per run.
        let mut buffer = UNICODE_BUFFER.take();

        buffer.push_str(text);

        buffer.set_script(rustybuzz::script::LATIN);
        buffer.set_direction(rustybuzz::Direction::LeftToRight);

        let shaped = shape_with_plan(&self.face, &self.plan, buffer);

        Shaped {
            text,
            unvaried_advances: self.unvaried_advances.then_some(&*self.face),
            buffer: Rc::new(Buffer(ManuallyDrop::new(shaped))),
            i: 0,
        }
    }
}

struct Buffer(ManuallyDrop<GlyphBuffer>);

impl Drop for Buffer {
    fn drop(&mut self) {
        // Safety: Since we're in drop self.0 can not be used after this point.
        let unicode_buffer = unsafe { ManuallyDrop::take(&mut self.0) }.clear();

        UNICODE_BUFFER.set(unicode_buffer);
    }
}

/// How far the shaping engine's advance for `id` is from the `hmtx` one the
/// face metrics report. With a variation instance set and no `HVAR`, the
/// engine sizes glyphs that have no variation data by their bounding box.
fn unvaried_advance_delta(face: &ttf_parser::Face, id: ttf_parser::GlyphId) -> i32 {
    if face.glyph_phantom_points(id).is_some() {
        return 0;
    }

    let engine = face
        .glyph_bounding_box(id)
        .map_or(0, |bbox| i32::from(bbox.x_min) + i32::from(bbox.x_max));
    let metrics = face
        .glyph_hor_advance(id)
        .map_or(i32::from(face.units_per_em()), i32::from);

    metrics - engine
}

#[derive(Clone)]
pub struct Shaped<'a, 'f> {
    text: &'a str,
    unvaried_advances: Option<&'a ttf_parser::Face<'f>>,
    buffer: Rc<Buffer>,
    i: usize,
}

impl Iterator for Shaped<'_, '_> {
    type Item = ShapedGlyph;

    fn next(&mut self) -> Option<Self::Item> {
        let infos = self.buffer.0.glyph_infos();

        let info = *infos.get(self.i)?;
        let position = *self.buffer.0.glyph_positions().get(self.i)?;

        let start = info.cluster as usize;

        // first glyph of the next cluster
        let end = infos[self.i..]
            .iter()
            .find(|next| next.cluster != info.cluster)
            .map_or(self.text.len(), |next| next.cluster as usize);

        self.i += 1;

        let mut x_advance = position.x_advance;
        if let Some(face) = self.unvaried_advances
            && let Some(id) = GlyphId(info.glyph_id).to_sfnt()
        {
            x_advance += unvaried_advance_delta(face, id);
        }

        Some(ShapedGlyph {
            unsafe_to_break: info.unsafe_to_break(),
            glyph_id: GlyphId(info.glyph_id),
            text_range: start..end,
            x_advance,
            y_advance: position.y_advance,
            x_offset: position.x_offset,
            y_offset: position.y_offset,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.buffer.0.len().saturating_sub(self.i);
        (len, Some(len))
    }
}

/// Shapes `text` with `shaper`, handing every run of `.notdef` glyphs on to
/// the next face in `fallbacks`. Each glyph is tagged with the index of the
/// fallback that produced it, `None` meaning `shaper` itself.
pub fn shape_with_fallback<S: ShapeText>(
    shaper: &S,
    fallbacks: &[S],
    text: &str,
    buffer: &mut Vec<(Option<usize>, ShapedGlyph)>,
) {
    shape_run(shaper, fallbacks, None, text, buffer, 0);
}

fn shape_run<S: ShapeText>(
    shaper: &S,
    fallbacks: &[S],
    fallback_index: Option<usize>,
    text: &str,
    buffer: &mut Vec<(Option<usize>, ShapedGlyph)>,
    text_range_offset: usize,
) {
    let mut shaped = shaper.shape(text).peekable();

    buffer.reserve(shaped.size_hint().0);

    let next_shaper = fallbacks.first();

    while let Some(glyph) = shaped.next() {
        if glyph.glyph_id.is_notdef()
            && let Some(next_shaper) = next_shaper
        {
            let others = shaped.peeking_take_while(|g| g.glyph_id.is_notdef());

            let text_range = glyph.text_range.start
                ..others
                    .last()
                    .map_or(glyph.text_range.end, |g| g.text_range.end);

            shape_run(
                next_shaper,
                &fallbacks[1..],
                Some(fallback_index.map_or(0, |i| i + 1)),
                &text[text_range.clone()],
                buffer,
                text_range_offset + text_range.start,
            )
        } else {
            buffer.push((
                fallback_index,
                ShapedGlyph {
                    text_range: (glyph.text_range.start + text_range_offset)
                        ..(glyph.text_range.end + text_range_offset),
                    ..glyph
                },
            ));
        }
    }
}
