//! Point-in-face tests in surface parameter space.
//!
//! A face domain is the set of `(u, v)` loops obtained by inverting
//! sampled boundary points onto the face surface. Loops are unwrapped
//! across periodic seams so each one is a plain polygon; containment is
//! the parity of the loops whose winding number is non-zero, so outer
//! loops and holes work regardless of their orientation.

use crate::surface::{unwrap_near, SurfaceEvaluator};
use crate::{Point2, Point3, Result};

/// Result of a point-in-face test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainState {
    /// Strictly inside the face.
    In,
    /// Outside the face.
    Out,
    /// Within tolerance of a boundary loop.
    On,
}

/// Sampled boundary of one edge occurrence inside a face loop.
#[derive(Debug, Clone)]
pub struct LoopSegment {
    /// Identifier of the edge, used to recognise the second pass over a seam.
    pub edge: usize,
    /// Points along the edge in loop order.
    pub points: Vec<Point3>,
}

/// The parameter-space region of a face.
#[derive(Debug, Clone)]
pub struct FaceDomain {
    loops: Vec<Vec<Point2>>,
    periods: (Option<f64>, Option<f64>),
    tolerance: f64,
    min: Point2,
    max: Point2,
}

impl FaceDomain {
    /// Domain covering the whole surface (a face without a usable boundary).
    pub fn unbounded(surface: &dyn SurfaceEvaluator, tolerance: f64) -> Self {
        let ((u0, u1), (v0, v1)) = surface.bounds();
        Self {
            loops: Vec::new(),
            periods: surface.periods(),
            tolerance,
            min: Point2::new(u0, v0),
            max: Point2::new(u1, v1),
        }
    }

    /// Domain from loops already expressed in parameter space.
    pub fn from_uv_loops(
        loops: Vec<Vec<Point2>>,
        periods: (Option<f64>, Option<f64>),
        tolerance: f64,
    ) -> Self {
        let loops: Vec<Vec<Point2>> = loops
            .into_iter()
            .filter(|l| polygon_area(l).abs() > tolerance * tolerance)
            .collect();
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in loops.iter().flatten() {
            min = min.inf(p);
            max = max.sup(p);
        }
        Self {
            loops,
            periods,
            tolerance,
            min,
            max,
        }
    }

    /// Domain from sampled 3D boundary loops of a face lying on `surface`.
    ///
    /// When an edge is traversed twice in one loop (a seam), its second
    /// pass is moved one period away from the first so the loop encloses
    /// the band between them. Loops with no area (a bare seam) are dropped;
    /// a face left without loops covers the whole surface.
    pub fn from_boundary(
        surface: &dyn SurfaceEvaluator,
        loops: &[Vec<LoopSegment>],
        tolerance: f64,
    ) -> Result<Self> {
        let periods = surface.periods();
        let mut uv_loops = Vec::with_capacity(loops.len());
        for segments in loops {
            uv_loops.push(unwrap_loop(surface, segments, periods)?);
        }
        let domain = Self::from_uv_loops(uv_loops, periods, tolerance);
        if domain.loops.is_empty() {
            return Ok(Self::unbounded(surface, tolerance));
        }
        Ok(domain)
    }

    /// Parameter-space loops.
    pub fn loops(&self) -> &[Vec<Point2>] {
        &self.loops
    }

    /// Whether the domain is the whole surface.
    pub fn is_unbounded(&self) -> bool {
        self.loops.is_empty()
    }

    /// Bounding rectangle of the domain in parameter space.
    pub fn uv_bounds(&self) -> (Point2, Point2) {
        (self.min, self.max)
    }

    /// Boundary tolerance in parameter units.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Classify a parameter point, trying every periodic image of it.
    pub fn classify(&self, uv: Point2) -> DomainState {
        if self.loops.is_empty() {
            return DomainState::In;
        }
        let shifts_u = shifts(self.periods.0);
        let shifts_v = shifts(self.periods.1);
        let mut best = DomainState::Out;
        for &su in &shifts_u {
            for &sv in &shifts_v {
                match self.classify_exact(Point2::new(uv.x + su, uv.y + sv)) {
                    DomainState::In => return DomainState::In,
                    DomainState::On => best = DomainState::On,
                    DomainState::Out => {}
                }
            }
        }
        best
    }

    /// Classify a 3D point assumed to lie on `surface`.
    pub fn classify_point(&self, surface: &dyn SurfaceEvaluator, p: &Point3) -> Result<DomainState> {
        if self.loops.is_empty() {
            return Ok(DomainState::In);
        }
        Ok(self.classify(surface.parameters(p)?))
    }

    fn classify_exact(&self, uv: Point2) -> DomainState {
        let t = self.tolerance;
        if uv.x < self.min.x - t || uv.x > self.max.x + t || uv.y < self.min.y - t || uv.y > self.max.y + t {
            return DomainState::Out;
        }
        for l in &self.loops {
            if distance_to_ring(&uv, l) <= t {
                return DomainState::On;
            }
        }
        let inside = self.loops.iter().filter(|l| point_in_polygon(&uv, l)).count();
        if inside % 2 == 1 {
            DomainState::In
        } else {
            DomainState::Out
        }
    }
}

fn shifts(period: Option<f64>) -> Vec<f64> {
    match period {
        Some(p) => vec![0.0, -p, p],
        None => vec![0.0],
    }
}

fn unwrap_loop(
    surface: &dyn SurfaceEvaluator,
    segments: &[LoopSegment],
    periods: (Option<f64>, Option<f64>),
) -> Result<Vec<Point2>> {
    let mut out: Vec<Point2> = Vec::new();
    // Mean parameter of each first traversal, keyed by edge.
    let mut first_pass: Vec<(usize, Point2)> = Vec::new();
    for seg in segments {
        let mut pts = Vec::with_capacity(seg.points.len());
        for p in &seg.points {
            let mut uv = surface.parameters(p)?;
            if let Some(prev) = pts.last().or(out.last()) {
                let prev: &Point2 = prev;
                if let Some(pu) = periods.0 {
                    uv.x = unwrap_near(uv.x, prev.x, pu);
                }
                if let Some(pv) = periods.1 {
                    uv.y = unwrap_near(uv.y, prev.y, pv);
                }
            }
            pts.push(uv);
        }
        if pts.is_empty() {
            continue;
        }
        let mean = mean_point(&pts);
        if let Some((_, first)) = first_pass.iter().find(|(e, _)| *e == seg.edge) {
            let center = if out.is_empty() { *first } else { mean_point(&out) };
            let offset_u = seam_offset(periods.0, first.x, mean.x, center.x);
            let offset_v = seam_offset(periods.1, first.y, mean.y, center.y);
            for p in &mut pts {
                p.x += offset_u;
                p.y += offset_v;
            }
        } else {
            first_pass.push((seg.edge, mean));
        }
        for p in pts {
            if out.last().map_or(true, |q| (q - p).norm() > 1e-12) {
                out.push(p);
            }
        }
    }
    if out.len() > 1 && (out[0] - out[out.len() - 1]).norm() < 1e-12 {
        out.pop();
    }
    Ok(out)
}

/// Offset for the second pass over a seam: one period away from the
/// first pass, on the side away from the rest of the loop.
fn seam_offset(period: Option<f64>, first: f64, second: f64, center: f64) -> f64 {
    let Some(p) = period else {
        return 0.0;
    };
    if (first - second).abs() > 0.25 * p {
        return 0.0;
    }
    if first >= center {
        -p
    } else {
        p
    }
}

fn mean_point(pts: &[Point2]) -> Point2 {
    let n = pts.len().max(1) as f64;
    let sum = pts.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
    Point2::from(sum / n)
}

fn polygon_area(polygon: &[Point2]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let n = polygon.len();
    0.5 * (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
}

/// Distance from `p` to the closed polyline `ring`.
pub fn distance_to_ring(p: &Point2, ring: &[Point2]) -> f64 {
    let n = ring.len();
    if n == 0 {
        return f64::INFINITY;
    }
    if n == 1 {
        return (p - ring[0]).norm();
    }
    (0..n)
        .map(|i| segment_distance(p, &ring[i], &ring[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from `p` to the segment `[a, b]`.
pub fn segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-300 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + t * ab)).norm()
}

/// Point-in-polygon test using the winding number algorithm.
///
/// Works for convex and concave polygons.
pub fn point_in_polygon(point: &Point2, polygon: &[Point2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut winding = 0i32;
    let n = polygon.len();
    for i in 0..n {
        let p1 = polygon[i];
        let p2 = polygon[(i + 1) % n];
        if p1.y <= point.y {
            if p2.y > point.y && is_left(&p1, &p2, point) > 0.0 {
                winding += 1;
            }
        } else if p2.y <= point.y && is_left(&p1, &p2, point) < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}

/// Twice the signed area of `(p0, p1, p2)`; positive when `p2` is left of `p0 -> p1`.
#[inline]
pub fn is_left(p0: &Point2, p1: &Point2, p2: &Point2) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Cylinder, Plane, Sphere, Surface};
    use crate::Vec3;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_point_in_polygon_concave() {
        let l_shape = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(&Point2::new(0.5, 0.5), &l_shape));
        assert!(point_in_polygon(&Point2::new(0.5, 1.5), &l_shape));
        assert!(!point_in_polygon(&Point2::new(1.5, 1.5), &l_shape));
    }

    #[test]
    fn test_hole_by_parity() {
        let hole = vec![
            Point2::new(0.25, 0.25),
            Point2::new(0.75, 0.25),
            Point2::new(0.75, 0.75),
            Point2::new(0.25, 0.75),
        ];
        let d = FaceDomain::from_uv_loops(vec![square(), hole], (None, None), 1e-9);
        assert_eq!(d.classify(Point2::new(0.1, 0.1)), DomainState::In);
        assert_eq!(d.classify(Point2::new(0.5, 0.5)), DomainState::Out);
        assert_eq!(d.classify(Point2::new(0.25, 0.5)), DomainState::On);
        assert_eq!(d.classify(Point2::new(1.5, 0.5)), DomainState::Out);
    }

    #[test]
    fn test_planar_boundary() {
        let plane = Surface::Plane(Plane::new(Point3::origin(), Vec3::x(), Vec3::y()).unwrap());
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let segments: Vec<LoopSegment> = (0..4)
            .map(|i| LoopSegment {
                edge: i,
                points: vec![corners[i], corners[(i + 1) % 4]],
            })
            .collect();
        let d = FaceDomain::from_boundary(&plane, &[segments], 1e-9).unwrap();
        assert_eq!(
            d.classify_point(&plane, &Point3::new(1.5, 0.5, 0.0)).unwrap(),
            DomainState::In
        );
        assert_eq!(
            d.classify_point(&plane, &Point3::new(2.5, 0.5, 0.0)).unwrap(),
            DomainState::Out
        );
    }

    fn circle_points(z: f64, reverse: bool) -> Vec<Point3> {
        let mut pts: Vec<Point3> = (0..=32)
            .map(|i| {
                let a = TAU * i as f64 / 32.0;
                Point3::new(a.cos(), a.sin(), z)
            })
            .collect();
        if reverse {
            pts.reverse();
        }
        pts
    }

    #[test]
    fn test_cylinder_band_with_seam() {
        let cyl = Surface::Cylinder(Cylinder::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap());
        let seam_up = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 2.0)];
        let seam_down = vec![Point3::new(1.0, 0.0, 2.0), Point3::new(1.0, 0.0, 0.0)];
        let wire = vec![
            LoopSegment { edge: 0, points: circle_points(0.0, false) },
            LoopSegment { edge: 2, points: seam_up },
            LoopSegment { edge: 1, points: circle_points(2.0, true) },
            LoopSegment { edge: 2, points: seam_down },
        ];
        let d = FaceDomain::from_boundary(&cyl, &[wire], 1e-9).unwrap();
        assert!(!d.is_unbounded());
        // Every angle around the band is inside at mid height.
        for i in 0..16 {
            let a = TAU * (i as f64 + 0.5) / 16.0;
            let p = Point3::new(a.cos(), a.sin(), 1.0);
            assert_eq!(d.classify_point(&cyl, &p).unwrap(), DomainState::In);
        }
        assert_eq!(
            d.classify_point(&cyl, &Point3::new(0.0, 1.0, 3.0)).unwrap(),
            DomainState::Out
        );
    }

    #[test]
    fn test_hemisphere_with_double_seam() {
        let sph = Surface::Sphere(Sphere::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap());
        let meridian: Vec<Point3> = (0..=8)
            .map(|i| {
                let v = FRAC_PI_2 * i as f64 / 8.0;
                Point3::new(v.cos(), 0.0, v.sin())
            })
            .collect();
        let mut back = meridian.clone();
        back.reverse();
        let wire = vec![
            LoopSegment { edge: 0, points: circle_points(0.0, false) },
            LoopSegment { edge: 1, points: meridian },
            LoopSegment { edge: 1, points: back },
        ];
        let d = FaceDomain::from_boundary(&sph, &[wire], 1e-9).unwrap();
        let north = Point3::new(0.3_f64.cos() * 0.5, 0.3_f64.sin() * 0.5, 0.75_f64.sqrt());
        assert_eq!(d.classify_point(&sph, &north).unwrap(), DomainState::In);
        let south = Point3::new(0.5, 0.0, -(0.75_f64.sqrt()));
        assert_eq!(d.classify_point(&sph, &south).unwrap(), DomainState::Out);
    }

    #[test]
    fn test_bare_seam_is_whole_surface() {
        let sph = Surface::Sphere(Sphere::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap());
        let meridian: Vec<Point3> = (0..=8)
            .map(|i| {
                let v = -FRAC_PI_2 + std::f64::consts::PI * i as f64 / 8.0;
                Point3::new(v.cos(), 0.0, v.sin())
            })
            .collect();
        let mut back = meridian.clone();
        back.reverse();
        let wire = vec![
            LoopSegment { edge: 0, points: meridian },
            LoopSegment { edge: 0, points: back },
        ];
        let d = FaceDomain::from_boundary(&sph, &[wire], 1e-9).unwrap();
        assert_eq!(
            d.classify_point(&sph, &Point3::new(0.0, -1.0, 0.0)).unwrap(),
            DomainState::In
        );
    }
}
