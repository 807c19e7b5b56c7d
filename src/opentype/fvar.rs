use ttf_parser::Tag;

/// One axis of the `fvar` table, in design space units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VariationAxis {
    pub tag: Tag,
    pub min: f32,
    pub default: f32,
    pub max: f32,
    /// `name` table id of the axis label.
    pub name_id: u16,
    pub hidden: bool,
}

impl VariationAxis {
    /// Default normalization: clamps to the axis range and maps the minimum,
    /// default and maximum to -1, 0 and 1.
    pub fn normalize(&self, value: f32) -> f32 {
        let value = value.max(self.min).min(self.max);

        if value < self.default {
            (value - self.default) / (self.default - self.min)
        } else if value > self.default {
            (value - self.default) / (self.max - self.default)
        } else {
            0.
        }
    }

    /// Inverse of [`VariationAxis::normalize`] for coordinates in `[-1, 1]`.
    pub fn denormalize(&self, coord: f32) -> f32 {
        let coord = coord.max(-1.).min(1.);

        if coord < 0. {
            self.default + coord * (self.default - self.min)
        } else {
            self.default + coord * (self.max - self.default)
        }
    }
}

impl From<ttf_parser::VariationAxis> for VariationAxis {
    fn from(axis: ttf_parser::VariationAxis) -> Self {
        VariationAxis {
            tag: axis.tag,
            min: axis.min_value,
            default: axis.def_value,
            max: axis.max_value,
            name_id: axis.name_id,
            hidden: axis.hidden,
        }
    }
}

/// The font variations table. Empty for non variable fonts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableFvar {
    pub axes: Vec<VariationAxis>,
}

impl TableFvar {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        TableFvar {
            axes: face.variation_axes().into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn axis(&self, tag: Tag) -> Option<&VariationAxis> {
        self.axes.iter().find(|axis| axis.tag == tag)
    }

    /// Normalizes one design space value per axis. Missing values are taken
    /// as the axis default and extra values are dropped.
    pub fn normalize(&self, coords: &[f32]) -> Vec<f32> {
        self.axes
            .iter()
            .enumerate()
            .map(|(i, axis)| coords.get(i).map_or(0., |&v| axis.normalize(v)))
            .collect()
    }

    /// Maps normalized coordinates back to design space, padding or truncating
    /// to the number of axes.
    pub fn denormalize(&self, coords: &[f32]) -> Vec<f32> {
        self.axes
            .iter()
            .enumerate()
            .map(|(i, axis)| axis.denormalize(coords.get(i).copied().unwrap_or(0.)))
            .collect()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisValueMap {
    pub from: f32,
    pub to: f32,
}

/// The axis variations table: per axis piecewise linear remapping applied
/// after default normalization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableAvar {
    pub segment_maps: Vec<Vec<AxisValueMap>>,
}

const F2DOT14: f32 = 16384.;

impl TableAvar {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        let Some(avar) = face.tables().avar else {
            return TableAvar::default();
        };

        TableAvar {
            segment_maps: avar
                .segment_maps
                .into_iter()
                .map(|maps| {
                    maps.into_iter()
                        .map(|map| AxisValueMap {
                            from: map.from_coordinate as f32 / F2DOT14,
                            to: map.to_coordinate as f32 / F2DOT14,
                        })
                        .collect()
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segment_maps.is_empty()
    }

    /// Applies the segment maps to normalized coordinates. Like the decoder
    /// this is skipped when the map count doesn't match the axis count.
    pub fn map(&self, coords: &mut [f32]) {
        if self.segment_maps.len() != coords.len() {
            return;
        }

        for (coord, maps) in coords.iter_mut().zip(&self.segment_maps) {
            *coord = piecewise(maps, *coord, |m| m.from, |m| m.to);
        }
    }

    /// Inverse of [`TableAvar::map`]. Exact for the monotonic maps the format
    /// requires.
    pub fn unmap(&self, coords: &mut [f32]) {
        if self.segment_maps.len() != coords.len() {
            return;
        }

        for (coord, maps) in coords.iter_mut().zip(&self.segment_maps) {
            *coord = piecewise(maps, *coord, |m| m.to, |m| m.from);
        }
    }
}

fn piecewise(
    maps: &[AxisValueMap],
    value: f32,
    input: impl Fn(&AxisValueMap) -> f32,
    output: impl Fn(&AxisValueMap) -> f32,
) -> f32 {
    let (Some(first), Some(last)) = (maps.first(), maps.last()) else {
        return value;
    };

    if maps.len() < 2 || value <= input(first) {
        return value - input(first) + output(first);
    }

    if value >= input(last) {
        return value - input(last) + output(last);
    }

    // NaN fails both bounds checks above
    let i = maps.partition_point(|m| input(m) < value);
    let (Some(before), Some(after)) = (i.checked_sub(1).and_then(|i| maps.get(i)), maps.get(i))
    else {
        return output(first);
    };

    let span = input(after) - input(before);
    if span == 0. {
        return output(after);
    }

    output(before) + (value - input(before)) * (output(after) - output(before)) / span
}
