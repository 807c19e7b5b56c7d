//! Synthetic sfnt fonts and recording sinks for unit tests.

use std::collections::BTreeMap;

use crate::fonts::{GlyphImage, GlyphSink};

fn u16be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn i16be(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn u32be(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn fixed(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&((value * 65536.) as i32).to_be_bytes());
}

fn f2dot14(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&((value * 16384.) as i16).to_be_bytes());
}

/// Coverage format 1.
fn coverage(out: &mut Vec<u8>, glyphs: &[u16]) {
    u16be(out, 1);
    u16be(out, glyphs.len() as u16);
    for &glyph in glyphs {
        u16be(out, glyph);
    }
}

/// `GSUB` or `GPOS` with one script whose default language system enables
/// one feature, which runs a single lookup made of `subtable`.
fn layout_table(script: &[u8; 4], feature: &[u8; 4], lookup_type: u16, subtable: &[u8]) -> Vec<u8> {
    let mut scripts = Vec::new();
    u16be(&mut scripts, 1);
    scripts.extend_from_slice(script);
    u16be(&mut scripts, 8);
    // script: default language system right after, no other languages
    u16be(&mut scripts, 4);
    u16be(&mut scripts, 0);
    // language system
    u16be(&mut scripts, 0);
    u16be(&mut scripts, 0xFFFF);
    u16be(&mut scripts, 1);
    u16be(&mut scripts, 0);

    let mut features = Vec::new();
    u16be(&mut features, 1);
    features.extend_from_slice(feature);
    u16be(&mut features, 8);
    u16be(&mut features, 0);
    u16be(&mut features, 1);
    u16be(&mut features, 0);

    let mut lookups = Vec::new();
    u16be(&mut lookups, 1);
    u16be(&mut lookups, 4);
    // lookup
    u16be(&mut lookups, lookup_type);
    u16be(&mut lookups, 0);
    u16be(&mut lookups, 1);
    u16be(&mut lookups, 8);
    lookups.extend_from_slice(subtable);

    let script_list = 10;
    let feature_list = script_list + scripts.len();
    let lookup_list = feature_list + features.len();

    let mut table = Vec::new();
    u32be(&mut table, 0x0001_0000);
    u16be(&mut table, script_list as u16);
    u16be(&mut table, feature_list as u16);
    u16be(&mut table, lookup_list as u16);
    table.extend(scripts);
    table.extend(features);
    table.extend(lookups);

    table
}

/// Builds a minimal TrueType font. Every glyph gets an advance of 500 and no
/// outline unless configured otherwise.
pub struct FontBuilder {
    num_glyphs: u16,
    upem: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    advances: Option<Vec<u16>>,
    tables: BTreeMap<[u8; 4], Vec<u8>>,
    cmap: Vec<(char, u16)>,
    names: Vec<(u16, String)>,
    outlines: BTreeMap<u16, [(i16, i16); 3]>,
    axes: Vec<([u8; 4], f32, f32, f32)>,
}

impl FontBuilder {
    pub fn new(num_glyphs: u16) -> Self {
        FontBuilder {
            num_glyphs,
            upem: 1000,
            ascender: 800,
            descender: -200,
            line_gap: 90,
            advances: Some(vec![500; num_glyphs as usize]),
            tables: BTreeMap::new(),
            cmap: Vec::new(),
            names: Vec::new(),
            outlines: BTreeMap::new(),
            axes: Vec::new(),
        }
    }

    pub fn upem(mut self, upem: u16) -> Self {
        self.upem = upem;
        self
    }

    pub fn advances(mut self, advances: &[u16]) -> Self {
        self.advances = Some(advances.to_vec());
        self
    }

    pub fn no_hmtx(mut self) -> Self {
        self.advances = None;
        self
    }

    pub fn cmap(mut self, mapping: &[(char, u16)]) -> Self {
        self.cmap = mapping.to_vec();
        self
    }

    pub fn glyph_names(mut self, names: &[(u16, &str)]) -> Self {
        self.names = names.iter().map(|&(g, n)| (g, n.to_string())).collect();
        self
    }

    pub fn triangle(mut self, glyph: u16, points: [(i16, i16); 3]) -> Self {
        self.outlines.insert(glyph, points);
        self
    }

    /// Adds `vhea` and `vmtx` with one `(advance, top side bearing)` pair per
    /// listed glyph.
    pub fn vertical(
        mut self,
        ascender: i16,
        descender: i16,
        line_gap: i16,
        metrics: &[(u16, i16)],
    ) -> Self {
        let mut vhea = Vec::new();
        u32be(&mut vhea, 0x0001_1000);
        i16be(&mut vhea, ascender);
        i16be(&mut vhea, descender);
        i16be(&mut vhea, line_gap);
        vhea.resize(34, 0);
        u16be(&mut vhea, metrics.len() as u16);

        let mut vmtx = Vec::new();
        for &(advance, bearing) in metrics {
            u16be(&mut vmtx, advance);
            i16be(&mut vmtx, bearing);
        }
        for _ in metrics.len()..self.num_glyphs as usize {
            i16be(&mut vmtx, 0);
        }

        self.tables.insert(*b"vhea", vhea);
        self.tables.insert(*b"vmtx", vmtx);
        self
    }

    /// `GDEF` with a glyph class definition made of `(start, end, class)`
    /// ranges.
    pub fn gdef_classes(mut self, ranges: &[(u16, u16, u16)]) -> Self {
        let mut gdef = Vec::new();
        u32be(&mut gdef, 0x0001_0000);
        u16be(&mut gdef, 12); // glyph class def
        u16be(&mut gdef, 0);
        u16be(&mut gdef, 0);
        u16be(&mut gdef, 0);

        u16be(&mut gdef, 2);
        u16be(&mut gdef, ranges.len() as u16);
        for &(start, end, class) in ranges {
            u16be(&mut gdef, start);
            u16be(&mut gdef, end);
            u16be(&mut gdef, class);
        }

        self.tables.insert(*b"GDEF", gdef);
        self
    }

    /// `GSUB` with one script, one feature and a single substitution lookup
    /// adding `delta` to every covered glyph.
    pub fn gsub_single(
        mut self,
        script: &[u8; 4],
        feature: &[u8; 4],
        glyphs: &[u16],
        delta: i16,
    ) -> Self {
        let mut subtable = Vec::new();
        // single substitution, format 1
        u16be(&mut subtable, 1);
        u16be(&mut subtable, 6);
        i16be(&mut subtable, delta);
        coverage(&mut subtable, glyphs);

        let gsub = layout_table(script, feature, 1, &subtable);
        self.tables.insert(*b"GSUB", gsub);
        self
    }

    /// `GPOS` with one script, one feature and a format 1 pair adjustment
    /// lookup changing the advance of the first glyph of each pair.
    pub fn gpos_pairs(
        mut self,
        script: &[u8; 4],
        feature: &[u8; 4],
        pairs: &[(u16, u16, i16)],
    ) -> Self {
        let mut firsts: Vec<u16> = pairs.iter().map(|&(first, _, _)| first).collect();
        firsts.sort_unstable();
        firsts.dedup();

        let header_len = 10 + 2 * firsts.len();
        let mut pair_sets = Vec::new();
        let mut offsets = Vec::new();
        for &first in &firsts {
            offsets.push(header_len + pair_sets.len());

            let mut seconds: Vec<(u16, i16)> = pairs
                .iter()
                .filter(|&&(f, _, _)| f == first)
                .map(|&(_, second, value)| (second, value))
                .collect();
            seconds.sort_unstable();

            u16be(&mut pair_sets, seconds.len() as u16);
            for (second, value) in seconds {
                u16be(&mut pair_sets, second);
                i16be(&mut pair_sets, value);
            }
        }

        let mut subtable = Vec::new();
        u16be(&mut subtable, 1);
        u16be(&mut subtable, (header_len + pair_sets.len()) as u16);
        u16be(&mut subtable, 0x0004); // x advance
        u16be(&mut subtable, 0);
        u16be(&mut subtable, firsts.len() as u16);
        for offset in offsets {
            u16be(&mut subtable, offset as u16);
        }
        subtable.extend(pair_sets);
        coverage(&mut subtable, &firsts);

        let gpos = layout_table(script, feature, 2, &subtable);
        self.tables.insert(*b"GPOS", gpos);
        self
    }

    /// OpenType `kern` with one horizontal format 0 subtable.
    pub fn kern_pairs(mut self, pairs: &[(u16, u16, i16)]) -> Self {
        let mut pairs = pairs.to_vec();
        pairs.sort_by_key(|&(left, right, _)| (left, right));

        let mut kern = Vec::new();
        u16be(&mut kern, 0);
        u16be(&mut kern, 1);

        u16be(&mut kern, 0);
        u16be(&mut kern, (6 + 8 + 6 * pairs.len()) as u16);
        kern.push(0); // format
        kern.push(0x01); // horizontal

        u16be(&mut kern, pairs.len() as u16);
        u16be(&mut kern, 0);
        u16be(&mut kern, 0);
        u16be(&mut kern, 0);
        for (left, right, value) in pairs {
            u16be(&mut kern, left);
            u16be(&mut kern, right);
            i16be(&mut kern, value);
        }

        self.tables.insert(*b"kern", kern);
        self
    }

    /// `kerx` with one horizontal format 0 subtable.
    pub fn kerx_pairs(mut self, pairs: &[(u16, u16, i16)]) -> Self {
        let mut pairs = pairs.to_vec();
        pairs.sort_by_key(|&(left, right, _)| (left, right));

        let mut kerx = Vec::new();
        u16be(&mut kerx, 2);
        u16be(&mut kerx, 0);
        u32be(&mut kerx, 1);

        u32be(&mut kerx, (12 + 16 + 6 * pairs.len()) as u32);
        kerx.push(0); // coverage: horizontal
        u16be(&mut kerx, 0);
        kerx.push(0); // format
        u32be(&mut kerx, 0); // tuple count

        u32be(&mut kerx, pairs.len() as u32);
        u32be(&mut kerx, 0);
        u32be(&mut kerx, 0);
        u32be(&mut kerx, 0);
        for (left, right, value) in pairs {
            u16be(&mut kerx, left);
            u16be(&mut kerx, right);
            i16be(&mut kerx, value);
        }

        self.tables.insert(*b"kerx", kerx);
        self
    }

    /// `trak` with horizontal tracks only. Each track is its value and one
    /// adjustment per size. Track `i` is named by `name` entry `256 + i`.
    pub fn trak(mut self, sizes: &[f32], tracks: &[(f32, &[i16])]) -> Self {
        let data_offset = 12;
        let sizes_offset = data_offset + 8 + 8 * tracks.len();
        let values_offset = sizes_offset + 4 * sizes.len();

        let mut trak = Vec::new();
        u32be(&mut trak, 0x0001_0000);
        u16be(&mut trak, 0);
        u16be(&mut trak, data_offset as u16);
        u16be(&mut trak, 0);
        u16be(&mut trak, 0);

        u16be(&mut trak, tracks.len() as u16);
        u16be(&mut trak, sizes.len() as u16);
        u32be(&mut trak, sizes_offset as u32);
        for (i, &(value, _)) in tracks.iter().enumerate() {
            fixed(&mut trak, value);
            u16be(&mut trak, 256 + i as u16);
            u16be(&mut trak, (values_offset + 2 * sizes.len() * i) as u16);
        }
        for &size in sizes {
            fixed(&mut trak, size);
        }
        for (_, values) in tracks {
            for &value in *values {
                i16be(&mut trak, value);
            }
        }

        self.tables.insert(*b"trak", trak);
        self
    }

    /// `feat` with exclusive features given as type, settings and default
    /// setting index. Feature `i` is named by `name` entry `256 + i`, its
    /// settings by `300 + j`.
    pub fn feat(mut self, features: &[(u16, &[u16], u8)]) -> Self {
        let mut settings_offset = 12 + 12 * features.len();

        let mut feat = Vec::new();
        u32be(&mut feat, 0x0001_0000);
        u16be(&mut feat, features.len() as u16);
        u16be(&mut feat, 0);
        u32be(&mut feat, 0);

        let mut settings = Vec::new();
        for (i, &(feature, values, default)) in features.iter().enumerate() {
            u16be(&mut feat, feature);
            u16be(&mut feat, values.len() as u16);
            u32be(&mut feat, settings_offset as u32);
            feat.push(0x80 | 0x40); // exclusive, explicit default
            feat.push(default);
            u16be(&mut feat, 256 + i as u16);

            for (j, &value) in values.iter().enumerate() {
                u16be(&mut settings, value);
                u16be(&mut settings, 300 + j as u16);
            }
            settings_offset += 4 * values.len();
        }
        feat.extend(settings);

        self.tables.insert(*b"feat", feat);
        self
    }

    pub fn axis(mut self, tag: &[u8; 4], min: f32, default: f32, max: f32) -> Self {
        self.axes.push((*tag, min, default, max));
        self
    }

    /// `avar` with one segment map per axis, each given as `(from, to)`
    /// pairs.
    pub fn avar(mut self, maps: &[&[(f32, f32)]]) -> Self {
        let mut avar = Vec::new();
        u32be(&mut avar, 0x0001_0000);
        u16be(&mut avar, 0);
        u16be(&mut avar, maps.len() as u16);
        for map in maps {
            u16be(&mut avar, map.len() as u16);
            for &(from, to) in *map {
                f2dot14(&mut avar, from);
                f2dot14(&mut avar, to);
            }
        }

        self.tables.insert(*b"avar", avar);
        self
    }

    /// `sbix` with one PNG per strike for every listed glyph. Images are 10
    /// pixels square and sit on the baseline.
    pub fn sbix(mut self, strikes: &[u16], glyphs: &[u16]) -> Self {
        let header_len = 8 + 4 * strikes.len();
        let mut strike_data = Vec::new();
        let mut offsets = Vec::new();

        for &ppem in strikes {
            offsets.push(header_len + strike_data.len());

            let mut strike = Vec::new();
            u16be(&mut strike, ppem);
            u16be(&mut strike, 72);

            let table_len = 4 + 4 * (self.num_glyphs as usize + 1);
            let mut images = Vec::new();
            for glyph in 0..=self.num_glyphs {
                u32be(&mut strike, (table_len + images.len()) as u32);
                if glyph < self.num_glyphs && glyphs.contains(&glyph) {
                    i16be(&mut images, 0);
                    i16be(&mut images, 0);
                    images.extend_from_slice(b"png ");
                    images.extend_from_slice(b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR");
                    u32be(&mut images, 10);
                    u32be(&mut images, 10);
                }
            }
            strike.extend(images);
            strike_data.extend(strike);
        }

        let mut sbix = Vec::new();
        u16be(&mut sbix, 1);
        u16be(&mut sbix, 1);
        u32be(&mut sbix, strikes.len() as u32);
        for offset in offsets {
            u32be(&mut sbix, offset as u32);
        }
        sbix.extend(strike_data);

        self.tables.insert(*b"sbix", sbix);
        self
    }

    pub fn table(mut self, tag: &[u8; 4], data: &[u8]) -> Self {
        self.tables.insert(*tag, data.to_vec());
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut head = Vec::new();
        u32be(&mut head, 0x0001_0000);
        u32be(&mut head, 0x0001_0000);
        u32be(&mut head, 0);
        u32be(&mut head, 0x5F0F_3CF5);
        u16be(&mut head, 0);
        u16be(&mut head, self.upem);
        head.resize(50, 0);
        i16be(&mut head, 1); // long loca offsets
        i16be(&mut head, 0);
        self.tables.insert(*b"head", head);

        let mut hhea = Vec::new();
        u32be(&mut hhea, 0x0001_0000);
        i16be(&mut hhea, self.ascender);
        i16be(&mut hhea, self.descender);
        i16be(&mut hhea, self.line_gap);
        hhea.resize(34, 0);
        u16be(&mut hhea, self.advances.as_ref().map_or(0, |a| a.len() as u16));
        self.tables.insert(*b"hhea", hhea);

        let mut maxp = Vec::new();
        u32be(&mut maxp, 0x0000_5000);
        u16be(&mut maxp, self.num_glyphs);
        self.tables.insert(*b"maxp", maxp);

        if let Some(advances) = &self.advances {
            let mut hmtx = Vec::new();
            for &advance in advances {
                u16be(&mut hmtx, advance);
                i16be(&mut hmtx, 0);
            }
            for _ in advances.len()..self.num_glyphs as usize {
                i16be(&mut hmtx, 0);
            }
            self.tables.insert(*b"hmtx", hmtx);
        }

        if !self.cmap.is_empty() {
            self.tables.insert(*b"cmap", self.build_cmap());
        }
        if !self.names.is_empty() {
            self.tables.insert(*b"post", self.build_post());
        }
        if !self.outlines.is_empty() {
            let (glyf, loca) = self.build_glyf();
            self.tables.insert(*b"glyf", glyf);
            self.tables.insert(*b"loca", loca);
        }
        if !self.axes.is_empty() {
            self.tables.insert(*b"fvar", self.build_fvar());
        }

        let count = self.tables.len();
        let mut out = Vec::new();
        u32be(&mut out, 0x0001_0000);
        u16be(&mut out, count as u16);
        u16be(&mut out, 0);
        u16be(&mut out, 0);
        u16be(&mut out, 0);

        let mut offset = 12 + 16 * count;
        let mut body = Vec::new();
        for (tag, data) in &self.tables {
            out.extend_from_slice(tag);
            u32be(&mut out, 0);
            u32be(&mut out, (offset + body.len()) as u32);
            u32be(&mut out, data.len() as u32);

            body.extend_from_slice(data);
            while body.len() % 4 != 0 {
                body.push(0);
            }
        }
        offset += body.len();
        out.extend(body);
        debug_assert_eq!(out.len(), offset);

        out
    }

    fn build_cmap(&self) -> Vec<u8> {
        let mut mapping = self.cmap.clone();
        mapping.sort();

        let mut cmap = Vec::new();
        u16be(&mut cmap, 0);
        u16be(&mut cmap, 1);
        u16be(&mut cmap, 3);
        u16be(&mut cmap, 10);
        u32be(&mut cmap, 12);

        u16be(&mut cmap, 12);
        u16be(&mut cmap, 0);
        u32be(&mut cmap, (16 + 12 * mapping.len()) as u32);
        u32be(&mut cmap, 0);
        u32be(&mut cmap, mapping.len() as u32);
        for (c, glyph) in mapping {
            u32be(&mut cmap, c as u32);
            u32be(&mut cmap, c as u32);
            u32be(&mut cmap, glyph as u32);
        }

        cmap
    }

    fn build_post(&self) -> Vec<u8> {
        let mut post = Vec::new();
        u32be(&mut post, 0x0002_0000);
        post.resize(32, 0);
        u16be(&mut post, self.num_glyphs);

        let mut custom = Vec::new();
        for glyph in 0..self.num_glyphs {
            match self.names.iter().find(|(g, _)| *g == glyph) {
                Some((_, name)) if name == ".notdef" => u16be(&mut post, 0),
                Some((_, name)) => {
                    u16be(&mut post, 258 + custom.len() as u16);
                    custom.push(name.as_str());
                }
                // index 0 is ".notdef" in the standard Macintosh order
                None => u16be(&mut post, 0),
            }
        }

        for name in custom {
            post.push(name.len() as u8);
            post.extend_from_slice(name.as_bytes());
        }

        post
    }

    fn build_glyf(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut loca = Vec::new();

        for glyph in 0..self.num_glyphs {
            u32be(&mut loca, glyf.len() as u32);

            let Some(points) = self.outlines.get(&glyph) else {
                continue;
            };

            let xs = points.map(|p| p.0);
            let ys = points.map(|p| p.1);

            i16be(&mut glyf, 1);
            for value in [
                xs.iter().min(),
                ys.iter().min(),
                xs.iter().max(),
                ys.iter().max(),
            ] {
                i16be(&mut glyf, value.copied().unwrap_or(0));
            }
            u16be(&mut glyf, 2); // end point of the only contour
            u16be(&mut glyf, 0); // no instructions
            glyf.extend_from_slice(&[0x01; 3]);

            let mut last = 0;
            for x in xs {
                i16be(&mut glyf, x - last);
                last = x;
            }
            let mut last = 0;
            for y in ys {
                i16be(&mut glyf, y - last);
                last = y;
            }

            while glyf.len() % 4 != 0 {
                glyf.push(0);
            }
        }
        u32be(&mut loca, glyf.len() as u32);

        (glyf, loca)
    }

    fn build_fvar(&self) -> Vec<u8> {
        let mut fvar = Vec::new();
        u32be(&mut fvar, 0x0001_0000);
        u16be(&mut fvar, 16);
        u16be(&mut fvar, 2);
        u16be(&mut fvar, self.axes.len() as u16);
        u16be(&mut fvar, 20);
        u16be(&mut fvar, 0);
        u16be(&mut fvar, 4 + 4 * self.axes.len() as u16);

        for (i, (tag, min, default, max)) in self.axes.iter().enumerate() {
            fvar.extend_from_slice(tag);
            fixed(&mut fvar, *min);
            fixed(&mut fvar, *default);
            fixed(&mut fvar, *max);
            u16be(&mut fvar, 0);
            u16be(&mut fvar, 256 + i as u16);
        }

        fvar
    }
}

/// Records every drawing command as text.
#[derive(Default)]
pub struct RecordingSink {
    pub commands: Vec<String>,
}

impl GlyphSink for RecordingSink {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(format!("M {x} {y}"));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(format!("L {x} {y}"));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.commands.push(format!("Q {x1} {y1} {x} {y}"));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands.push(format!("C {x1} {y1} {x2} {y2} {x} {y}"));
    }

    fn close(&mut self) {
        self.commands.push("Z".to_string());
    }

    fn image(&mut self, image: GlyphImage<'_>) {
        self.commands.push(format!(
            "I {}x{} @{} {:?}",
            image.width, image.height, image.pixels_per_em, image.format
        ));
    }
}
