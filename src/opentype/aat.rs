//! Apple Advanced Typography tables: `morx`, `kern`/`kerx`, `trak`, `feat`
//! and `ankr`.

use std::collections::BTreeMap;

use crate::fonts::GlyphId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MorxSubtableKind {
    Rearrangement,
    Contextual,
    Ligature,
    NonContextual,
    Insertion,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MorxSubtable {
    pub kind: MorxSubtableKind,
    pub vertical: bool,
    pub backwards: bool,
    pub all_directions: bool,
    pub logical: bool,
    /// Subtable runs when this intersects the chain flags.
    pub feature_flags: u32,
}

impl MorxSubtable {
    /// Whether the subtable applies to text in the given direction.
    pub fn applies_to(&self, vertical: bool) -> bool {
        self.all_directions || self.vertical == vertical
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MorxFeature {
    pub kind: u16,
    pub setting: u16,
    pub enable_flags: u32,
    pub disable_flags: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MorxChain {
    pub default_flags: u32,
    pub features: Vec<MorxFeature>,
    pub subtables: Vec<MorxSubtable>,
}

impl MorxChain {
    /// Chain flags after applying the requested `(feature type, setting)`
    /// pairs to the default flags.
    pub fn flags(&self, settings: &[(u16, u16)]) -> u32 {
        self.features
            .iter()
            .filter(|feature| settings.contains(&(feature.kind, feature.setting)))
            .fold(self.default_flags, |flags, feature| {
                (flags & feature.disable_flags) | feature.enable_flags
            })
    }

    pub fn active_subtables(&self, flags: u32) -> impl Iterator<Item = &MorxSubtable> + '_ {
        self.subtables
            .iter()
            .filter(move |subtable| subtable.feature_flags & flags != 0)
    }
}

/// Extended glyph metamorphosis. An absent table has no chains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableMorx {
    pub chains: Vec<MorxChain>,
}

impl TableMorx {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        use ttf_parser::morx::SubtableKind as K;

        let Some(morx) = face.tables().morx.as_ref() else {
            return TableMorx::default();
        };

        let chains = morx
            .chains
            .into_iter()
            .map(|chain| MorxChain {
                default_flags: chain.default_flags,
                features: chain
                    .features
                    .into_iter()
                    .map(|feature| MorxFeature {
                        kind: feature.kind,
                        setting: feature.setting,
                        enable_flags: feature.enable_flags,
                        disable_flags: feature.disable_flags,
                    })
                    .collect(),
                subtables: chain
                    .subtables
                    .into_iter()
                    .map(|subtable| MorxSubtable {
                        kind: match subtable.kind {
                            K::Rearrangement(_) => MorxSubtableKind::Rearrangement,
                            K::Contextual(_) => MorxSubtableKind::Contextual,
                            K::Ligature(_) => MorxSubtableKind::Ligature,
                            K::NonContextual(_) => MorxSubtableKind::NonContextual,
                            K::Insertion(_) => MorxSubtableKind::Insertion,
                        },
                        vertical: subtable.coverage.is_vertical(),
                        backwards: subtable.coverage.is_backwards(),
                        all_directions: subtable.coverage.is_all_directions(),
                        logical: subtable.coverage.is_logical(),
                        feature_flags: subtable.feature_flags,
                    })
                    .collect(),
            })
            .collect();

        TableMorx { chains }
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernSubtable {
    pub horizontal: bool,
    pub variable: bool,
    pub cross_stream: bool,
    pub state_machine: bool,
    /// Always 0 for `kern` subtables.
    pub tuple_count: u32,
    pub format: u8,
    /// Format 0 pair values. Empty for the other formats.
    pub pairs: BTreeMap<(GlyphId, GlyphId), i16>,
}

impl KernSubtable {
    fn is_simple_horizontal(&self) -> bool {
        self.horizontal && !self.variable && !self.cross_stream && !self.state_machine
    }
}

/// `kern` or `kerx` table. An absent table has no subtables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableKernx {
    pub subtables: Vec<KernSubtable>,
}

fn collect_pairs(
    pairs: impl IntoIterator<Item = ttf_parser::kern::KerningPair>,
) -> BTreeMap<(GlyphId, GlyphId), i16> {
    pairs
        .into_iter()
        .map(|pair| ((pair.left().into(), pair.right().into()), pair.value))
        .collect()
}

impl TableKernx {
    pub(crate) fn from_kern(face: &ttf_parser::Face) -> Self {
        use ttf_parser::kern::Format;

        let Some(kern) = face.tables().kern else {
            return TableKernx::default();
        };

        let subtables = kern
            .subtables
            .into_iter()
            .map(|subtable| {
                let (format, pairs) = match &subtable.format {
                    Format::Format0(table) => (0, collect_pairs(table.pairs)),
                    Format::Format1(_) => (1, BTreeMap::new()),
                    Format::Format2(_) => (2, BTreeMap::new()),
                    Format::Format3(_) => (3, BTreeMap::new()),
                };

                KernSubtable {
                    horizontal: subtable.horizontal,
                    variable: subtable.variable,
                    cross_stream: subtable.has_cross_stream,
                    state_machine: subtable.has_state_machine,
                    tuple_count: 0,
                    format,
                    pairs,
                }
            })
            .collect();

        TableKernx { subtables }
    }

    pub(crate) fn from_kerx(face: &ttf_parser::Face) -> Self {
        use ttf_parser::kerx::Format;

        let Some(kerx) = face.tables().kerx.as_ref() else {
            return TableKernx::default();
        };

        let subtables = kerx
            .subtables
            .into_iter()
            .map(|subtable| {
                let (format, pairs) = match &subtable.format {
                    Format::Format0(table) => (0, collect_pairs(table.pairs)),
                    Format::Format1(_) => (1, BTreeMap::new()),
                    Format::Format2(_) => (2, BTreeMap::new()),
                    Format::Format4(_) => (4, BTreeMap::new()),
                    Format::Format6(_) => (6, BTreeMap::new()),
                };

                KernSubtable {
                    horizontal: subtable.horizontal,
                    variable: subtable.variable,
                    cross_stream: subtable.has_cross_stream,
                    state_machine: subtable.has_state_machine,
                    tuple_count: subtable.tuple_count,
                    format,
                    pairs,
                }
            })
            .collect();

        TableKernx { subtables }
    }

    pub fn is_empty(&self) -> bool {
        self.subtables.is_empty()
    }

    /// Sum of the format 0 pair adjustments of plain horizontal subtables, or
    /// `None` if no such subtable has the pair.
    pub fn pair_kerning(&self, left: GlyphId, right: GlyphId) -> Option<i32> {
        self.subtables
            .iter()
            .filter(|subtable| subtable.is_simple_horizontal())
            .filter_map(|subtable| subtable.pairs.get(&(left, right)))
            .map(|&value| value as i32)
            .reduce(|a, b| a + b)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub value: f32,
    pub name_index: u16,
    /// One value per entry of [`TrackData::sizes`].
    pub values: Vec<i16>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackData {
    pub tracks: Vec<Track>,
    /// Point sizes, ascending.
    pub sizes: Vec<f32>,
}

impl TrackData {
    fn from_sfnt(data: ttf_parser::trak::TrackData) -> Self {
        TrackData {
            tracks: data
                .tracks
                .into_iter()
                .map(|track| Track {
                    value: track.value,
                    name_index: track.name_index,
                    values: track.values.into_iter().collect(),
                })
                .collect(),
            sizes: data.sizes.into_iter().map(|size| size.0).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracking adjustment for the track `value` at `point_size`, linearly
    /// interpolated between the stored sizes and clamped outside them.
    pub fn tracking(&self, value: f32, point_size: f32) -> Option<f32> {
        let track = self.tracks.iter().find(|track| track.value == value)?;

        let entries = self.sizes.iter().copied().zip(track.values.iter().copied());
        let entries: Vec<(f32, i16)> = entries.collect();

        let (first, last) = (entries.first()?, entries.last()?);

        if point_size.is_nan() || point_size <= first.0 {
            return Some(first.1 as f32);
        }
        if point_size >= last.0 {
            return Some(last.1 as f32);
        }

        let i = entries.partition_point(|&(size, _)| size < point_size);
        let (Some(&(s0, v0)), Some(&(s1, v1))) =
            (i.checked_sub(1).and_then(|i| entries.get(i)), entries.get(i))
        else {
            return Some(first.1 as f32);
        };

        if s1 == s0 {
            return Some(v1 as f32);
        }

        let t = (point_size - s0) / (s1 - s0);

        Some(v0 as f32 + t * (v1 as f32 - v0 as f32))
    }
}

/// Tracking table. Absent means no tracks in either direction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableTrak {
    pub horizontal: TrackData,
    pub vertical: TrackData,
}

impl TableTrak {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        let Some(trak) = face.tables().trak else {
            return TableTrak::default();
        };

        TableTrak {
            horizontal: TrackData::from_sfnt(trak.horizontal),
            vertical: TrackData::from_sfnt(trak.vertical),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SettingName {
    pub setting: u16,
    pub name_index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureName {
    pub feature: u16,
    pub setting_names: Vec<SettingName>,
    pub default_setting_index: u8,
    /// Settings are mutually exclusive.
    pub exclusive: bool,
    pub name_index: u16,
}

impl FeatureName {
    pub fn default_setting(&self) -> Option<&SettingName> {
        self.setting_names.get(self.default_setting_index as usize)
    }
}

/// Feature name table, sorted by feature type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableFeat {
    pub names: Vec<FeatureName>,
}

impl TableFeat {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        let Some(feat) = face.tables().feat else {
            return TableFeat::default();
        };

        let mut names: Vec<FeatureName> = feat
            .names
            .into_iter()
            .map(|name| FeatureName {
                feature: name.feature,
                setting_names: name
                    .setting_names
                    .into_iter()
                    .map(|setting| SettingName {
                        setting: setting.setting,
                        name_index: setting.name_index,
                    })
                    .collect(),
                default_setting_index: name.default_setting_index,
                exclusive: name.exclusive,
                name_index: name.name_index,
            })
            .collect();

        names.sort_by_key(|name| name.feature);

        TableFeat { names }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn find(&self, feature: u16) -> Option<&FeatureName> {
        self.names
            .binary_search_by_key(&feature, |name| name.feature)
            .ok()
            .map(|i| &self.names[i])
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnchorPoint {
    pub x: i16,
    pub y: i16,
}

/// Anchor point table. Glyphs without points are left out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableAnkr {
    pub points: BTreeMap<GlyphId, Vec<AnchorPoint>>,
}

impl TableAnkr {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        let Some(ankr) = face.tables().ankr.as_ref() else {
            return TableAnkr::default();
        };

        let points = (0..face.number_of_glyphs())
            .filter_map(|id| {
                let points: Vec<AnchorPoint> = ankr
                    .points(ttf_parser::GlyphId(id))?
                    .into_iter()
                    .map(|point| AnchorPoint { x: point.x, y: point.y })
                    .collect();

                (!points.is_empty()).then(|| (GlyphId::from(id), points))
            })
            .collect();

        TableAnkr { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn anchor(&self, glyph: GlyphId, index: usize) -> Option<AnchorPoint> {
        self.points.get(&glyph)?.get(index).copied()
    }
}
