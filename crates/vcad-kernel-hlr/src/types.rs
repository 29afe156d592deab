//! Serializable output types for projected drawings.

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::Point2;

use crate::projector::ViewDirection;

/// A 2D point for serializable drawing output.
///
/// A plain struct keeps nalgebra's serde feature out of the dependency tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point2D {
    /// Create a new 2D point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin point (0, 0).
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Distance to another point.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl From<Point2> for Point2D {
    fn from(p: Point2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<Point2D> for Point2 {
    fn from(p: Point2D) -> Self {
        Point2::new(p.x, p.y)
    }
}

/// Visibility of a piece of edge in the projected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Not occluded by any face.
    Visible,
    /// Occluded by at least one face.
    Hidden,
}

/// Drawing category of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeCategory {
    /// Edge between faces meeting at an angle.
    Sharp,
    /// Edge between tangent-continuous faces.
    Smooth,
    /// Silhouette of a curved face for the current view.
    Outline,
    /// Edge bounding the same face on both sides.
    Seam,
    /// Isoparametric line drawn on a face.
    IsoLine,
}

/// 2D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    /// Minimum X coordinate.
    pub min_x: f64,
    /// Minimum Y coordinate.
    pub min_y: f64,
    /// Maximum X coordinate.
    pub max_x: f64,
    /// Maximum Y coordinate.
    pub max_y: f64,
}

impl BoundingBox2D {
    /// Create an empty bounding box.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Expand the bounding box to include a point.
    pub fn include_point(&mut self, p: Point2D) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if the bounding box is valid (non-empty).
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }
}

impl Default for BoundingBox2D {
    fn default() -> Self {
        Self::empty()
    }
}

/// A visibility interval of one edge, flattened to a 2D polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedCurve {
    /// Polyline in view coordinates, in edge orientation.
    pub points: Vec<Point2D>,
    /// Visibility of the whole polyline.
    pub visibility: Visibility,
    /// Drawing category.
    pub category: EdgeCategory,
    /// Global edge index in the entity store.
    pub edge: usize,
    /// Depth of the interval midpoint.
    pub depth: f64,
}

impl ProjectedCurve {
    /// Length of the polyline in 2D.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }
}

/// A complete projected drawing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectedView {
    /// All projected curves.
    pub curves: Vec<ProjectedCurve>,
    /// 2D bounding box of the drawing.
    pub bounds: BoundingBox2D,
    /// View the drawing was made for, when it is a named one.
    pub view_direction: Option<ViewDirection>,
}

impl ProjectedView {
    /// Create a new empty view.
    pub fn new(view_direction: Option<ViewDirection>) -> Self {
        Self {
            curves: Vec::new(),
            bounds: BoundingBox2D::empty(),
            view_direction,
        }
    }

    /// Add a curve and update the bounding box.
    pub fn add_curve(&mut self, curve: ProjectedCurve) {
        for p in &curve.points {
            self.bounds.include_point(*p);
        }
        self.curves.push(curve);
    }

    /// Visible curves only.
    pub fn visible_curves(&self) -> impl Iterator<Item = &ProjectedCurve> {
        self.curves
            .iter()
            .filter(|c| c.visibility == Visibility::Visible)
    }

    /// Hidden curves only.
    pub fn hidden_curves(&self) -> impl Iterator<Item = &ProjectedCurve> {
        self.curves
            .iter()
            .filter(|c| c.visibility == Visibility::Hidden)
    }

    /// Number of visible curves.
    pub fn num_visible(&self) -> usize {
        self.visible_curves().count()
    }

    /// Number of hidden curves.
    pub fn num_hidden(&self) -> usize {
        self.hidden_curves().count()
    }

    /// Serialize the drawing as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(vis: Visibility, pts: &[(f64, f64)]) -> ProjectedCurve {
        ProjectedCurve {
            points: pts.iter().map(|&(x, y)| Point2D::new(x, y)).collect(),
            visibility: vis,
            category: EdgeCategory::Sharp,
            edge: 0,
            depth: 0.0,
        }
    }

    #[test]
    fn test_view_bounds_and_counts() {
        let mut view = ProjectedView::new(Some(ViewDirection::Top));
        view.add_curve(curve(Visibility::Visible, &[(0.0, 0.0), (2.0, 1.0)]));
        view.add_curve(curve(Visibility::Hidden, &[(-1.0, 0.5), (0.0, 3.0)]));
        assert_eq!(view.num_visible(), 1);
        assert_eq!(view.num_hidden(), 1);
        assert_eq!(view.bounds.min_x, -1.0);
        assert_eq!(view.bounds.max_y, 3.0);
        assert_eq!(view.bounds.width(), 3.0);
    }

    #[test]
    fn test_polyline_length() {
        let c = curve(Visibility::Visible, &[(0.0, 0.0), (3.0, 4.0), (3.0, 5.0)]);
        assert!((c.length() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_json_output() {
        let mut view = ProjectedView::new(None);
        view.add_curve(curve(Visibility::Hidden, &[(0.0, 0.0), (1.0, 0.0)]));
        let json = view.to_json().unwrap();
        assert!(json.contains("\"Hidden\""));
        let back: ProjectedView = serde_json::from_str(&json).unwrap();
        assert_eq!(back.curves.len(), 1);
    }

    #[test]
    fn test_empty_box_invalid() {
        assert!(!BoundingBox2D::empty().is_valid());
    }
}
