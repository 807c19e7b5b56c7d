//! Faces described by Adobe Font Metrics files, such as the PDF base 14
//! fonts. AFM files carry metrics only, no glyph programs.

use std::{collections::HashMap, sync::LazyLock};

use pom::{
    DataInput,
    char_class::alphanum,
    parser::{Parser, end, is_a, none_of, one_of, seq, sym},
};

use super::{
    DEFAULT_UPEM, FaceMetrics, FaceRenderer, FontExtents, GlyphExtents, GlyphId, GlyphSink,
};
use crate::error::Error;

type Field = (String, Vec<String>);

enum Section {
    Entry(String, String),
    CharMetrics(Vec<Vec<Field>>),
}

fn space() -> Parser<'static, u8, ()> {
    one_of(b" \t").repeat(0..).discard()
}

fn line_end() -> Parser<'static, u8, ()> {
    (space() * sym(b'\r').opt() * sym(b'\n')).repeat(1..).discard() | end()
}

fn keyword() -> Parser<'static, u8, String> {
    is_a(|c: u8| alphanum(c) || c == b'_')
        .repeat(1..)
        .convert(String::from_utf8)
}

fn rest_of_line() -> Parser<'static, u8, String> {
    none_of(b"\r\n")
        .repeat(0..)
        .convert(String::from_utf8)
        .map(|line| line.trim().to_string())
}

fn token() -> Parser<'static, u8, String> {
    none_of(b" \t\r\n;")
        .repeat(1..)
        .convert(String::from_utf8)
}

/// `KEY value value ;`
fn field() -> Parser<'static, u8, Field> {
    space() * token() + (space() * token()).repeat(0..) - space() - sym(b';')
}

fn char_metrics() -> Parser<'static, u8, Vec<Vec<Field>>> {
    let start = seq(b"StartCharMetrics") * rest_of_line() * line_end();
    let entry = field().repeat(1..) - line_end();

    start * entry.repeat(0..) - space() - seq(b"EndCharMetrics")
}

fn entry() -> Parser<'static, u8, (String, String)> {
    space() * !seq(b"StartCharMetrics") * keyword() - space() + rest_of_line()
}

fn afm() -> Parser<'static, u8, Vec<Section>> {
    let section = char_metrics().map(Section::CharMetrics)
        | entry().map(|(key, value)| Section::Entry(key, value));

    line_end().opt() * (section - line_end()).repeat(0..) - end()
}

fn number(value: &str) -> Result<f32, Error> {
    value
        .parse()
        .map_err(|_| Error::Afm(format!("invalid number {value:?}")))
}

fn numbers<'s>(values: impl IntoIterator<Item = &'s str>) -> Result<Vec<f32>, Error> {
    values.into_iter().map(number).collect()
}

fn bbox<'s>(values: impl IntoIterator<Item = &'s str>) -> Result<[f32; 4], Error> {
    <[f32; 4]>::try_from(numbers(values)?)
        .map_err(|_| Error::Afm("a bounding box takes four numbers".to_string()))
}

/// Printable ASCII characters by their Adobe glyph names.
const ASCII_NAMES: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand", "quotesingle",
    "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen", "period", "slash", "zero",
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "colon", "semicolon",
    "less", "equal", "greater", "question", "at", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J",
    "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft",
    "backslash", "bracketright", "asciicircum", "underscore", "grave", "a", "b", "c", "d", "e", "f",
    "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y",
    "z", "braceleft", "bar", "braceright", "asciitilde",
];

/// U+00A0 to U+00FF by their Adobe glyph names.
const LATIN_1_NAMES: [&str; 96] = [
    "nbspace", "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section",
    "dieresis", "copyright", "ordfeminine", "guillemotleft", "logicalnot", "sfthyphen",
    "registered", "macron", "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu",
    "paragraph", "periodcentered", "cedilla", "onesuperior", "ordmasculine", "guillemotright",
    "onequarter", "onehalf", "threequarters", "questiondown", "Agrave", "Aacute", "Acircumflex",
    "Atilde", "Adieresis", "Aring", "AE", "Ccedilla", "Egrave", "Eacute", "Ecircumflex",
    "Edieresis", "Igrave", "Iacute", "Icircumflex", "Idieresis", "Eth", "Ntilde", "Ograve",
    "Oacute", "Ocircumflex", "Otilde", "Odieresis", "multiply", "Oslash", "Ugrave", "Uacute",
    "Ucircumflex", "Udieresis", "Yacute", "Thorn", "germandbls", "agrave", "aacute",
    "acircumflex", "atilde", "adieresis", "aring", "ae", "ccedilla", "egrave", "eacute",
    "ecircumflex", "edieresis", "igrave", "iacute", "icircumflex", "idieresis", "eth", "ntilde",
    "ograve", "oacute", "ocircumflex", "otilde", "odieresis", "divide", "oslash", "ugrave",
    "uacute", "ucircumflex", "udieresis", "yacute", "thorn", "ydieresis",
];

/// The rest of the standard and WinAnsi encodings.
const OTHER_NAMES: [(&str, char); 40] = [
    ("dotlessi", '\u{131}'),
    ("Lslash", '\u{141}'),
    ("lslash", '\u{142}'),
    ("OE", '\u{152}'),
    ("oe", '\u{153}'),
    ("Scaron", '\u{160}'),
    ("scaron", '\u{161}'),
    ("Ydieresis", '\u{178}'),
    ("Zcaron", '\u{17d}'),
    ("zcaron", '\u{17e}'),
    ("florin", '\u{192}'),
    ("circumflex", '\u{2c6}'),
    ("caron", '\u{2c7}'),
    ("breve", '\u{2d8}'),
    ("dotaccent", '\u{2d9}'),
    ("ring", '\u{2da}'),
    ("ogonek", '\u{2db}'),
    ("tilde", '\u{2dc}'),
    ("hungarumlaut", '\u{2dd}'),
    ("endash", '\u{2013}'),
    ("emdash", '\u{2014}'),
    ("quoteleft", '\u{2018}'),
    ("quoteright", '\u{2019}'),
    ("quotesinglbase", '\u{201a}'),
    ("quotedblleft", '\u{201c}'),
    ("quotedblright", '\u{201d}'),
    ("quotedblbase", '\u{201e}'),
    ("dagger", '\u{2020}'),
    ("daggerdbl", '\u{2021}'),
    ("bullet", '\u{2022}'),
    ("ellipsis", '\u{2026}'),
    ("perthousand", '\u{2030}'),
    ("guilsinglleft", '\u{2039}'),
    ("guilsinglright", '\u{203a}'),
    ("fraction", '\u{2044}'),
    ("Euro", '\u{20ac}'),
    ("trademark", '\u{2122}'),
    ("minus", '\u{2212}'),
    ("fi", '\u{fb01}'),
    ("fl", '\u{fb02}'),
];

static GLYPH_NAME_CHARS: LazyLock<HashMap<&'static str, char>> = LazyLock::new(|| {
    let ascii = ASCII_NAMES.into_iter().zip(' '..='~');
    let latin_1 = LATIN_1_NAMES.into_iter().zip('\u{a0}'..='\u{ff}');

    ascii.chain(latin_1).chain(OTHER_NAMES).collect()
});

/// The character a glyph name stands for: a standard name, `uniXXXX` or
/// `uXXXX[XX]`.
fn glyph_name_char(name: &str) -> Option<char> {
    if let Some(&ch) = GLYPH_NAME_CHARS.get(name) {
        return Some(ch);
    }

    let hex = name
        .strip_prefix("uni")
        .filter(|hex| hex.len() == 4)
        .or_else(|| name.strip_prefix('u').filter(|hex| (4..=6).contains(&hex.len())))?;

    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    char::from_u32(u32::from_str_radix(hex, 16).ok()?)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AfmGlyph {
    pub name: String,
    /// Code in the font's built in encoding.
    pub code: Option<u32>,
    pub advance: Option<f32>,
    pub vertical_advance: Option<f32>,
    /// `[llx, lly, urx, ury]`
    pub bbox: Option<[f32; 4]>,
}

#[derive(Clone, Debug, Default)]
pub struct AfmFace {
    pub font_name: String,
    pub font_bbox: Option<[f32; 4]>,
    pub ascender: Option<f32>,
    pub descender: Option<f32>,
    pub cap_height: Option<f32>,
    pub x_height: Option<f32>,
    /// `FontSpecific` for symbol fonts, whose codes are used as characters.
    pub encoding_scheme: String,
    /// Glyph `n` is at index `n - 1`; glyph 0 is an implicit notdef.
    glyphs: Vec<AfmGlyph>,
    glyphs_by_code: HashMap<u32, GlyphId>,
    glyphs_by_name: HashMap<String, GlyphId>,
    glyphs_by_char: HashMap<char, GlyphId>,
    ligatures: HashMap<(GlyphId, GlyphId), GlyphId>,
    kerning: HashMap<(GlyphId, GlyphId), f32>,
}

impl AfmFace {
    pub fn parse(afm_data: &[u8]) -> Result<Self, Error> {
        let sections = afm().parse(&mut DataInput::new(afm_data))?;

        let mut face = AfmFace::default();
        let mut ligatures = Vec::new();
        let mut kerning = Vec::new();

        for section in sections {
            match section {
                Section::Entry(key, value) => match key.as_str() {
                    "FontName" => face.font_name = value,
                    "EncodingScheme" => face.encoding_scheme = value,
                    "FontBBox" => face.font_bbox = Some(bbox(value.split_whitespace())?),
                    "Ascender" => face.ascender = Some(number(&value)?),
                    "Descender" => face.descender = Some(number(&value)?),
                    "CapHeight" => face.cap_height = Some(number(&value)?),
                    "XHeight" => face.x_height = Some(number(&value)?),
                    "KPX" => {
                        let [left, right, amount] = value.split_whitespace().collect::<Vec<_>>()[..]
                        else {
                            return Err(Error::Afm(format!("invalid kerning pair {value:?}")));
                        };
                        kerning.push((left.to_string(), right.to_string(), number(amount)?));
                    }
                    _ => {}
                },
                Section::CharMetrics(entries) => {
                    for fields in entries {
                        let id = GlyphId(face.glyphs.len() as u32 + 1);
                        let (glyph, successors) = face.char_metric(id, fields)?;

                        for (successor, ligature) in successors {
                            ligatures.push((glyph.name.clone(), successor, ligature));
                        }
                        face.glyphs.push(glyph);
                    }
                }
            }
        }

        for (i, glyph) in face.glyphs.iter().enumerate() {
            if let Some(ch) = glyph_name_char(&glyph.name) {
                face.glyphs_by_char.entry(ch).or_insert(GlyphId(i as u32 + 1));
            }
        }

        for (first, second, ligature) in ligatures {
            if let (Some(first), Some(second), Some(ligature)) = (
                face.glyph_by_name(&first),
                face.glyph_by_name(&second),
                face.glyph_by_name(&ligature),
            ) {
                face.ligatures.insert((first, second), ligature);
            }
        }

        for (left, right, amount) in kerning {
            match (face.glyph_by_name(&left), face.glyph_by_name(&right)) {
                (Some(left), Some(right)) => {
                    face.kerning.insert((left, right), amount);
                }
                _ => tracing::trace!(%left, %right, "kerning pair names an unknown glyph"),
            }
        }

        tracing::debug!(
            font_name = %face.font_name,
            glyphs = face.glyphs.len(),
            "loaded AFM face"
        );

        Ok(face)
    }

    fn char_metric(
        &mut self,
        id: GlyphId,
        fields: Vec<Field>,
    ) -> Result<(AfmGlyph, Vec<(String, String)>), Error> {
        let mut glyph = AfmGlyph::default();
        let mut ligatures = Vec::new();

        for (key, values) in fields {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();

            match (key.as_str(), &values[..]) {
                ("C", [code]) => {
                    glyph.code = u32::try_from(number(code)? as i32).ok();
                }
                ("CH", [code]) => {
                    let hex = code.trim_start_matches('<').trim_end_matches('>');
                    glyph.code = u32::from_str_radix(hex, 16).ok();
                }
                ("WX" | "W0X", [x]) => glyph.advance = Some(number(x)?),
                ("W1Y", [y]) => glyph.vertical_advance = Some(number(y)?.abs()),
                ("W" | "W0", [x, _]) => glyph.advance = Some(number(x)?),
                ("W1", [_, y]) => glyph.vertical_advance = Some(number(y)?.abs()),
                ("N", [name]) => glyph.name = name.to_string(),
                ("B", _) => glyph.bbox = Some(bbox(values.iter().copied())?),
                ("L", [successor, ligature]) => {
                    ligatures.push((successor.to_string(), ligature.to_string()));
                }
                _ => {}
            }
        }

        if let Some(code) = glyph.code {
            self.glyphs_by_code.entry(code).or_insert(id);
        }
        if !glyph.name.is_empty() {
            self.glyphs_by_name.entry(glyph.name.clone()).or_insert(id);
        }

        Ok((glyph, ligatures))
    }

    pub fn glyph(&self, glyph: GlyphId) -> Option<&AfmGlyph> {
        self.glyphs.get((glyph.0 as usize).checked_sub(1)?)
    }

    pub fn glyph_by_name(&self, name: &str) -> Option<GlyphId> {
        self.glyphs_by_name.get(name).copied()
    }

    /// The ligature replacing `first` followed by `second`.
    pub fn ligature(&self, first: GlyphId, second: GlyphId) -> Option<GlyphId> {
        self.ligatures.get(&(first, second)).copied()
    }

    pub fn pair_kerning(&self, left: GlyphId, right: GlyphId) -> Option<f32> {
        self.kerning.get(&(left, right)).copied()
    }

    fn is_valid(&self, glyph: GlyphId) -> bool {
        (glyph.0 as usize) <= self.glyphs.len()
    }
}

impl FaceMetrics for AfmFace {
    fn upem(&self) -> u16 {
        DEFAULT_UPEM
    }

    fn glyph_name(&self, glyph: GlyphId) -> &str {
        if glyph.is_notdef() {
            return ".notdef";
        }

        self.glyph(glyph).map_or("", |glyph| glyph.name.as_str())
    }

    fn font_h_extents(&self, _coords: &[f32]) -> Option<FontExtents> {
        let bbox = self.font_bbox;
        let ascender = self.ascender.or(bbox.map(|b| b[3]))?;
        let descender = self.descender.or(bbox.map(|b| b[1]))?;

        // Lines are as tall as the font bounding box.
        let line_gap = bbox.map_or(0., |b| ((b[3] - b[1]) - (ascender - descender)).max(0.));

        Some(FontExtents {
            ascender,
            descender,
            line_gap,
        })
    }

    fn font_v_extents(&self, _coords: &[f32]) -> Option<FontExtents> {
        None
    }

    fn nominal_glyph(&self, ch: char) -> Option<GlyphId> {
        if let Some(&glyph) = self.glyphs_by_char.get(&ch) {
            return Some(glyph);
        }

        if self.encoding_scheme != "FontSpecific" {
            return None;
        }

        // Symbol fonts are also addressed through the U+F0xx private use block.
        let code = ch as u32;
        let code = if (0xF000..=0xF0FF).contains(&code) { code - 0xF000 } else { code };

        self.glyphs_by_code.get(&code).copied()
    }

    fn horizontal_advance(&self, glyph: GlyphId, _coords: &[f32]) -> f32 {
        if !self.is_valid(glyph) {
            return 0.;
        }

        self.glyph(glyph)
            .and_then(|glyph| glyph.advance)
            .unwrap_or(DEFAULT_UPEM as f32)
    }

    fn vertical_advance(&self, glyph: GlyphId, _coords: &[f32]) -> f32 {
        if !self.is_valid(glyph) {
            return 0.;
        }

        self.glyph(glyph)
            .and_then(|glyph| glyph.vertical_advance)
            .unwrap_or(DEFAULT_UPEM as f32)
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
        _x_ppem: u16,
        _y_ppem: u16,
    ) -> Option<GlyphExtents> {
        let [llx, lly, urx, ury] = self.glyph(glyph)?.bbox?;

        Some(GlyphExtents {
            x_bearing: llx,
            y_bearing: ury,
            width: urx - llx,
            height: lly - ury,
        })
    }

    fn normalize_variations(&self, coords: &[f32]) -> Vec<f32> {
        coords.to_vec()
    }
}

impl FaceRenderer for AfmFace {
    fn draw(&self, _glyph: GlyphId, _sink: &mut dyn GlyphSink) -> bool {
        false
    }
}
