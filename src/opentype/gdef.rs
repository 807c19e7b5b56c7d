use std::collections::{BTreeMap, BTreeSet};

use crate::fonts::GlyphId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GlyphClass {
    Base,
    Ligature,
    Mark,
    Component,
}

impl From<ttf_parser::gdef::GlyphClass> for GlyphClass {
    fn from(class: ttf_parser::gdef::GlyphClass) -> Self {
        use ttf_parser::gdef::GlyphClass as C;

        match class {
            C::Base => GlyphClass::Base,
            C::Ligature => GlyphClass::Ligature,
            C::Mark => GlyphClass::Mark,
            C::Component => GlyphClass::Component,
        }
    }
}

/// Glyph definitions. A font without a glyph class definition has an empty
/// `glyph_classes` map and is treated as having no `GDEF` at all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableGdef {
    pub glyph_classes: BTreeMap<GlyphId, GlyphClass>,
    /// Glyphs in mark attachment class 0 are left out.
    pub mark_attachment_classes: BTreeMap<GlyphId, u16>,
    /// Mark glyph sets keyed by set index.
    pub mark_glyph_sets: BTreeMap<u16, BTreeSet<GlyphId>>,
}

impl TableGdef {
    /// Only the mark glyph sets listed in `mark_sets` are materialized, since
    /// the table doesn't record how many there are.
    pub(crate) fn from_sfnt(
        face: &ttf_parser::Face,
        mark_sets: impl IntoIterator<Item = u16>,
    ) -> Self {
        let Some(gdef) = face.tables().gdef else {
            return TableGdef::default();
        };

        let mark_sets: BTreeSet<u16> = mark_sets.into_iter().collect();
        let mut table = TableGdef::default();

        for id in 0..face.number_of_glyphs() {
            let glyph = ttf_parser::GlyphId(id);

            if let Some(class) = gdef.glyph_class(glyph) {
                table.glyph_classes.insert(glyph.into(), class.into());
            }

            let mark_class = gdef.glyph_mark_attachment_class(glyph);
            if mark_class != 0 {
                table.mark_attachment_classes.insert(glyph.into(), mark_class);
            }

            for &set in &mark_sets {
                if gdef.is_mark_glyph(glyph, Some(set)) {
                    table
                        .mark_glyph_sets
                        .entry(set)
                        .or_default()
                        .insert(glyph.into());
                }
            }
        }

        table
    }

    pub fn is_empty(&self) -> bool {
        self.glyph_classes.is_empty()
    }

    pub fn glyph_class(&self, glyph: GlyphId) -> Option<GlyphClass> {
        self.glyph_classes.get(&glyph).copied()
    }

    pub fn mark_attachment_class(&self, glyph: GlyphId) -> u16 {
        self.mark_attachment_classes.get(&glyph).copied().unwrap_or(0)
    }

    /// Without a set index this falls back to the glyph class.
    pub fn is_mark_glyph(&self, glyph: GlyphId, set: Option<u16>) -> bool {
        match set {
            Some(set) => self
                .mark_glyph_sets
                .get(&set)
                .is_some_and(|glyphs| glyphs.contains(&glyph)),
            None => self.glyph_class(glyph) == Some(GlyphClass::Mark),
        }
    }
}
