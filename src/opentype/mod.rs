//! Advanced layout surface of OpenType and AAT capable faces.

pub mod aat;
pub mod fvar;
pub mod gdef;
pub mod layout;

use std::sync::Arc;

use ttf_parser::Tag;

use crate::fonts::Face;

pub use aat::{TableAnkr, TableFeat, TableKernx, TableMorx, TableTrak};
pub use fvar::{TableAvar, TableFvar, VariationAxis};
pub use gdef::{GlyphClass, TableGdef};
pub use layout::{TableGpos, TableGsub};

/// Advanced layout tables of a face. Every table is optional; an absent table
/// is represented by its empty value, tested with its `is_empty` method.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TablesLayout {
    pub gdef: TableGdef,
    pub trak: TableTrak,
    pub ankr: TableAnkr,
    pub feat: TableFeat,
    pub morx: TableMorx,
    pub kern: TableKernx,
    pub kerx: TableKernx,
    pub gsub: TableGsub,
    pub gpos: TableGpos,
}

/// Which layout table families a face carries. A face may have both, in which
/// case the shaping engine decides which one to run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutFamilies {
    /// `GSUB` or `GPOS` lookups.
    pub opentype: bool,
    /// `morx`, `kerx` or `ankr` data.
    pub aat: bool,
}

impl TablesLayout {
    pub(crate) fn from_sfnt(face: &ttf_parser::Face) -> Self {
        let gsub = TableGsub::from_face(face);
        let gpos = TableGpos::from_face(face);

        let mark_sets: Vec<u16> = gsub
            .mark_filtering_sets()
            .chain(gpos.mark_filtering_sets())
            .collect();

        let layout = TablesLayout {
            gdef: TableGdef::from_sfnt(face, mark_sets),
            trak: TableTrak::from_sfnt(face),
            ankr: TableAnkr::from_sfnt(face),
            feat: TableFeat::from_sfnt(face),
            morx: TableMorx::from_sfnt(face),
            kern: TableKernx::from_kern(face),
            kerx: TableKernx::from_kerx(face),
            gsub,
            gpos,
        };

        tracing::debug!(families = ?layout.families(), "decoded layout tables");

        layout
    }

    pub fn is_empty(&self) -> bool {
        self.gdef.is_empty()
            && self.trak.is_empty()
            && self.ankr.is_empty()
            && self.feat.is_empty()
            && self.morx.is_empty()
            && self.kern.is_empty()
            && self.kerx.is_empty()
            && self.gsub.is_empty()
            && self.gpos.is_empty()
    }

    pub fn families(&self) -> LayoutFamilies {
        LayoutFamilies {
            opentype: !self.gsub.is_empty() || !self.gpos.is_empty(),
            aat: !self.morx.is_empty() || !self.kerx.is_empty() || !self.ankr.is_empty(),
        }
    }
}

/// A [`Face`] backed by an sfnt font file, exposing OpenType and AAT layout
/// data.
pub trait FaceOpentype: Face {
    /// The advanced layout tables, decoded once and shared by every caller.
    fn tables_layout(&self) -> Arc<TablesLayout>;

    /// The variation axes, empty for non variable fonts.
    fn variations(&self) -> &TableFvar;

    /// Returns the face Graphite tables should be loaded from, or `None` if
    /// the face has no Graphite support or Graphite has been turned off.
    fn is_graphite(&self) -> Option<&dyn FaceOpentype>;

    /// Undecoded table data, for consumers that parse tables this crate
    /// doesn't model (Graphite `Silf`, `Glat`, `Gloc`, ...).
    fn raw_table(&self, tag: Tag) -> Option<&[u8]>;
}
