//! Projected bounding boxes and the coarse culling test.

use vcad_kernel_hlr_geom::{CurveEvaluator, Point2, Point3};

use crate::projector::Projector;

/// Drawing-plane box plus depth range of an edge or face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedBox {
    /// Lower corner in drawing coordinates.
    pub min: Point2,
    /// Upper corner in drawing coordinates.
    pub max: Point2,
    /// Smallest depth.
    pub depth_min: f64,
    /// Largest depth.
    pub depth_max: f64,
}

impl Default for ProjectedBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl ProjectedBox {
    /// Box containing nothing.
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            depth_min: f64::INFINITY,
            depth_max: f64::NEG_INFINITY,
        }
    }

    /// Whether nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grow to contain a projected point at `depth`.
    pub fn add(&mut self, q: &Point2, depth: f64) {
        self.min = self.min.inf(q);
        self.max = self.max.sup(q);
        self.depth_min = self.depth_min.min(depth);
        self.depth_max = self.depth_max.max(depth);
    }

    /// Grow to contain another box.
    pub fn merge(&mut self, other: &ProjectedBox) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
        self.depth_min = self.depth_min.min(other.depth_min);
        self.depth_max = self.depth_max.max(other.depth_max);
    }

    /// Enlarge by `planar` in the drawing plane and `depth` along the view.
    pub fn enlarge(&mut self, planar: f64, depth: f64) {
        if self.is_empty() {
            return;
        }
        self.min.x -= planar;
        self.min.y -= planar;
        self.max.x += planar;
        self.max.y += planar;
        self.depth_min -= depth;
        self.depth_max += depth;
    }

    /// Area in the drawing plane.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max.x - self.min.x) * (self.max.y - self.min.y)
    }

    /// Whether the drawing-plane extents intersect (closed boxes).
    pub fn overlaps_2d(&self, other: &ProjectedBox, tol: f64) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || self.max.x < other.min.x - tol
            || other.max.x < self.min.x - tol
            || self.max.y < other.min.y - tol
            || other.max.y < self.min.y - tol)
    }

    /// Whether a projected point lies in the box.
    pub fn contains_2d(&self, q: &Point2, tol: f64) -> bool {
        q.x >= self.min.x - tol
            && q.x <= self.max.x + tol
            && q.y >= self.min.y - tol
            && q.y <= self.max.y + tol
    }

    /// Whether the box lies entirely behind `depth`.
    pub fn is_behind(&self, depth: f64, tol: f64) -> bool {
        self.depth_min > depth + tol
    }
}

/// Box of a curve, sampled at `samples + 1` parameters.
///
/// Curved edges are enlarged by a quarter of the largest chord so arcs
/// bulging between samples stay inside.
pub fn curve_box(curve: &dyn CurveEvaluator, projector: &Projector, samples: usize) -> ProjectedBox {
    let n = samples.max(1);
    let (a, b) = (curve.first_parameter(), curve.last_parameter());
    let mut bx = ProjectedBox::empty();
    let mut prev: Option<(Point2, f64)> = None;
    let mut chord_2d: f64 = 0.0;
    let mut chord_depth: f64 = 0.0;
    for i in 0..=n {
        let u = a + (b - a) * i as f64 / n as f64;
        let (q, d) = projector.project_with_depth(&curve.value(u));
        bx.add(&q, d);
        if let Some((pq, pd)) = prev {
            chord_2d = chord_2d.max((q - pq).norm());
            chord_depth = chord_depth.max((d - pd).abs());
        }
        prev = Some((q, d));
    }
    if n > 1 {
        let margin = 0.25 * chord_2d.max(chord_depth);
        bx.enlarge(margin, margin);
    }
    bx
}

/// Box of scattered points, enlarged by `margin` in every direction.
pub fn points_box<'a>(
    points: impl IntoIterator<Item = &'a Point3>,
    projector: &Projector,
    margin: f64,
) -> ProjectedBox {
    let mut bx = ProjectedBox::empty();
    for p in points {
        let (q, d) = projector.project_with_depth(p);
        bx.add(&q, d);
    }
    bx.enlarge(margin, margin);
    bx
}

/// Coarse rejection of an (edge, face) pair.
///
/// True only when the drawing-plane extents are disjoint, so the face
/// cannot cover any point of the edge.
pub fn is_out(edge: &ProjectedBox, face: &ProjectedBox, tol: f64) -> bool {
    !edge.overlaps_2d(face, tol)
}
