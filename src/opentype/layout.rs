//! OpenType `GSUB` and `GPOS` tables.
//!
//! Both share the script/feature/lookup structure and only differ in the kind
//! of their lookups, so they are one generic [`LayoutTable`].

use itertools::Itertools;
use ttf_parser::{
    Tag,
    gpos::PositioningSubtable,
    gsub::SubstitutionSubtable,
    opentype_layout::{self as ot, LookupSubtable},
};

use crate::fonts::GlyphId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubstitutionKind {
    Single,
    Multiple,
    Alternate,
    Ligature,
    Context,
    ChainContext,
    ReverseChainSingle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PositioningKind {
    Single,
    Pair,
    Cursive,
    MarkToBase,
    MarkToLigature,
    MarkToMark,
    Context,
    ChainContext,
}

pub type TableGsub = LayoutTable<SubstitutionKind>;
pub type TableGpos = LayoutTable<PositioningKind>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupFlags(pub u16);

impl LookupFlags {
    pub fn right_to_left(self) -> bool {
        self.0 & 0x0001 != 0
    }

    pub fn ignore_base_glyphs(self) -> bool {
        self.0 & 0x0002 != 0
    }

    pub fn ignore_ligatures(self) -> bool {
        self.0 & 0x0004 != 0
    }

    pub fn ignore_marks(self) -> bool {
        self.0 & 0x0008 != 0
    }

    pub fn use_mark_filtering_set(self) -> bool {
        self.0 & 0x0010 != 0
    }

    pub fn mark_attachment_type(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

/// Glyphs a subtable applies to, stored as sorted disjoint inclusive ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    ranges: Vec<(u16, u16)>,
}

impl Coverage {
    fn from_sfnt(coverage: ot::Coverage) -> Self {
        let mut ranges: Vec<(u16, u16)> = match coverage {
            ot::Coverage::Format1 { glyphs } => glyphs.into_iter().map(|g| (g.0, g.0)).collect(),
            ot::Coverage::Format2 { records } => records
                .into_iter()
                .filter(|r| r.start <= r.end)
                .map(|r| (r.start.0, r.end.0))
                .collect(),
        };

        ranges.sort_unstable();

        Coverage::from_sorted(ranges)
    }

    fn from_sorted(ranges: Vec<(u16, u16)>) -> Self {
        let ranges = ranges
            .into_iter()
            .coalesce(|a, b| {
                if b.0 as u32 <= a.1 as u32 + 1 {
                    Ok((a.0, a.1.max(b.1)))
                } else {
                    Err((a, b))
                }
            })
            .collect();

        Coverage { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, glyph: GlyphId) -> bool {
        let Ok(glyph) = u16::try_from(glyph.0) else {
            return false;
        };

        let i = self.ranges.partition_point(|&(_, end)| end < glyph);

        self.ranges.get(i).is_some_and(|&(start, _)| start <= glyph)
    }

    pub fn glyphs(&self) -> impl Iterator<Item = GlyphId> + '_ {
        self.ranges
            .iter()
            .flat_map(|&(start, end)| (start..=end).map(GlyphId::from))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LanguageSystem {
    pub tag: Tag,
    pub required_feature: Option<u16>,
    pub feature_indices: Vec<u16>,
}

impl LanguageSystem {
    fn from_sfnt(lang: ot::LanguageSystem) -> Self {
        LanguageSystem {
            tag: lang.tag,
            required_feature: lang.required_feature,
            feature_indices: lang.feature_indices.into_iter().collect(),
        }
    }

    /// Required feature first, then the rest in table order.
    pub fn features(&self) -> impl Iterator<Item = u16> + '_ {
        self.required_feature
            .into_iter()
            .chain(self.feature_indices.iter().copied())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    pub tag: Tag,
    pub default_language: Option<LanguageSystem>,
    pub languages: Vec<LanguageSystem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub tag: Tag,
    pub lookup_indices: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subtable<K> {
    pub kind: K,
    pub coverage: Coverage,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lookup<K> {
    /// `None` if no subtable could be decoded.
    pub kind: Option<K>,
    pub flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<Subtable<K>>,
}

impl<K> Lookup<K> {
    /// Whether any subtable may apply to `glyph`.
    pub fn covers(&self, glyph: GlyphId) -> bool {
        self.subtables.iter().any(|s| s.coverage.contains(glyph))
    }
}

/// A decoded `GSUB` or `GPOS` table. An absent table has no lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutTable<K> {
    pub scripts: Vec<Script>,
    pub features: Vec<Feature>,
    pub lookups: Vec<Lookup<K>>,
}

impl<K> Default for LayoutTable<K> {
    fn default() -> Self {
        LayoutTable {
            scripts: Vec::new(),
            features: Vec::new(),
            lookups: Vec::new(),
        }
    }
}

const DEFAULT_SCRIPTS: [Tag; 2] = [Tag::from_bytes(b"DFLT"), Tag::from_bytes(b"dflt")];

impl<K: Copy> LayoutTable<K> {
    fn from_sfnt<'a, T: LookupSubtable<'a>>(
        table: Option<ot::LayoutTable<'a>>,
        classify: impl Fn(&T) -> (K, ot::Coverage<'a>),
    ) -> Self {
        let Some(table) = table else {
            return LayoutTable::default();
        };

        let scripts = table
            .scripts
            .into_iter()
            .map(|script| Script {
                tag: script.tag,
                default_language: script.default_language.map(LanguageSystem::from_sfnt),
                languages: script
                    .languages
                    .into_iter()
                    .map(LanguageSystem::from_sfnt)
                    .collect(),
            })
            .collect();

        let features = table
            .features
            .into_iter()
            .map(|feature| Feature {
                tag: feature.tag,
                lookup_indices: feature.lookup_indices.into_iter().collect(),
            })
            .collect();

        let lookups = table
            .lookups
            .into_iter()
            .map(|lookup| {
                let subtables: Vec<Subtable<K>> = lookup
                    .subtables
                    .into_iter::<T>()
                    .map(|subtable| {
                        let (kind, coverage) = classify(&subtable);

                        Subtable {
                            kind,
                            coverage: Coverage::from_sfnt(coverage),
                        }
                    })
                    .collect();

                if subtables.len() < lookup.subtables.len() as usize {
                    tracing::debug!(
                        decoded = subtables.len(),
                        declared = lookup.subtables.len(),
                        "skipped undecodable lookup subtables",
                    );
                }

                Lookup {
                    kind: subtables.first().map(|s| s.kind),
                    flags: LookupFlags(lookup.flags.0),
                    mark_filtering_set: lookup.mark_filtering_set,
                    subtables,
                }
            })
            .collect();

        LayoutTable {
            scripts,
            features,
            lookups,
        }
    }
}

impl<K> LayoutTable<K> {
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    pub fn script(&self, tag: Tag) -> Option<&Script> {
        self.scripts.iter().find(|script| script.tag == tag)
    }

    /// Resolves the language system for a script and language, falling back
    /// to the default script and to the script's default language.
    pub fn language_system(&self, script: Tag, language: Option<Tag>) -> Option<&LanguageSystem> {
        let script = self
            .script(script)
            .or_else(|| DEFAULT_SCRIPTS.iter().find_map(|&tag| self.script(tag)))?;

        language
            .and_then(|language| script.languages.iter().find(|lang| lang.tag == language))
            .or(script.default_language.as_ref())
    }

    /// Lookup indices of the feature `tag` enabled by `language_system`.
    pub fn feature_lookups(&self, language_system: &LanguageSystem, tag: Tag) -> Option<&[u16]> {
        language_system
            .features()
            .filter_map(|index| self.features.get(index as usize))
            .find(|feature| feature.tag == tag)
            .map(|feature| feature.lookup_indices.as_slice())
    }

    pub fn lookup(&self, index: u16) -> Option<&Lookup<K>> {
        self.lookups.get(index as usize)
    }

    /// `GDEF` mark glyph set indices referenced by lookups.
    pub fn mark_filtering_sets(&self) -> impl Iterator<Item = u16> + '_ {
        self.lookups
            .iter()
            .filter_map(|lookup| lookup.mark_filtering_set)
            .unique()
    }
}

impl TableGsub {
    pub(crate) fn from_face(face: &ttf_parser::Face) -> Self {
        LayoutTable::from_sfnt(face.tables().gsub, classify_substitution)
    }
}

impl TableGpos {
    pub(crate) fn from_face(face: &ttf_parser::Face) -> Self {
        LayoutTable::from_sfnt(face.tables().gpos, classify_positioning)
    }
}

fn classify_substitution<'a>(
    subtable: &SubstitutionSubtable<'a>,
) -> (SubstitutionKind, ot::Coverage<'a>) {
    let kind = match subtable {
        SubstitutionSubtable::Single(_) => SubstitutionKind::Single,
        SubstitutionSubtable::Multiple(_) => SubstitutionKind::Multiple,
        SubstitutionSubtable::Alternate(_) => SubstitutionKind::Alternate,
        SubstitutionSubtable::Ligature(_) => SubstitutionKind::Ligature,
        SubstitutionSubtable::Context(_) => SubstitutionKind::Context,
        SubstitutionSubtable::ChainContext(_) => SubstitutionKind::ChainContext,
        SubstitutionSubtable::ReverseChainSingle(_) => SubstitutionKind::ReverseChainSingle,
    };

    (kind, subtable.coverage())
}

fn classify_positioning<'a>(
    subtable: &PositioningSubtable<'a>,
) -> (PositioningKind, ot::Coverage<'a>) {
    let kind = match subtable {
        PositioningSubtable::Single(_) => PositioningKind::Single,
        PositioningSubtable::Pair(_) => PositioningKind::Pair,
        PositioningSubtable::Cursive(_) => PositioningKind::Cursive,
        PositioningSubtable::MarkToBase(_) => PositioningKind::MarkToBase,
        PositioningSubtable::MarkToLigature(_) => PositioningKind::MarkToLigature,
        PositioningSubtable::MarkToMark(_) => PositioningKind::MarkToMark,
        PositioningSubtable::Context(_) => PositioningKind::Context,
        PositioningSubtable::ChainContext(_) => PositioningKind::ChainContext,
    };

    (kind, subtable.coverage())
}
