//! Which edge categories a drawing keeps.

use serde::{Deserialize, Serialize};

use crate::types::{EdgeCategory, Visibility};

/// Per-category selection of visible and hidden edges.
///
/// The default keeps every visible category and drops every hidden one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HlrStyle {
    /// Visible sharp edges.
    pub visible_sharp: bool,
    /// Visible smooth edges.
    pub visible_smooth: bool,
    /// Visible silhouettes.
    pub visible_outline: bool,
    /// Visible seams.
    pub visible_seam: bool,
    /// Visible isolines.
    pub visible_iso: bool,
    /// Hidden sharp edges.
    pub hidden_sharp: bool,
    /// Hidden smooth edges.
    pub hidden_smooth: bool,
    /// Hidden silhouettes.
    pub hidden_outline: bool,
    /// Hidden seams.
    pub hidden_seam: bool,
    /// Hidden isolines.
    pub hidden_iso: bool,
}

impl Default for HlrStyle {
    fn default() -> Self {
        Self {
            visible_sharp: true,
            visible_smooth: true,
            visible_outline: true,
            visible_seam: true,
            visible_iso: true,
            hidden_sharp: false,
            hidden_smooth: false,
            hidden_outline: false,
            hidden_seam: false,
            hidden_iso: false,
        }
    }
}

impl HlrStyle {
    /// Every category, visible and hidden.
    pub fn all() -> Self {
        Self {
            hidden_sharp: true,
            hidden_smooth: true,
            hidden_outline: true,
            hidden_seam: true,
            hidden_iso: true,
            ..Self::default()
        }
    }

    /// Nothing at all; enable fields one by one.
    pub fn none() -> Self {
        Self {
            visible_sharp: false,
            visible_smooth: false,
            visible_outline: false,
            visible_seam: false,
            visible_iso: false,
            ..Self::default()
        }
    }

    /// Whether edges of `category` with `visibility` are kept.
    pub fn wants(&self, category: EdgeCategory, visibility: Visibility) -> bool {
        match (visibility, category) {
            (Visibility::Visible, EdgeCategory::Sharp) => self.visible_sharp,
            (Visibility::Visible, EdgeCategory::Smooth) => self.visible_smooth,
            (Visibility::Visible, EdgeCategory::Outline) => self.visible_outline,
            (Visibility::Visible, EdgeCategory::Seam) => self.visible_seam,
            (Visibility::Visible, EdgeCategory::IsoLine) => self.visible_iso,
            (Visibility::Hidden, EdgeCategory::Sharp) => self.hidden_sharp,
            (Visibility::Hidden, EdgeCategory::Smooth) => self.hidden_smooth,
            (Visibility::Hidden, EdgeCategory::Outline) => self.hidden_outline,
            (Visibility::Hidden, EdgeCategory::Seam) => self.hidden_seam,
            (Visibility::Hidden, EdgeCategory::IsoLine) => self.hidden_iso,
        }
    }
}
