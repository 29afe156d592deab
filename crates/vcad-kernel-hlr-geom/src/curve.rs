//! Edge curves as a closed set of analytic kinds.
//!
//! A [`Curve`] is an unbounded [`CurveGeometry`] trimmed to `[first, last]`.
//! The engine only talks to curves through [`CurveEvaluator`].

use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;

use crate::bspline::BSplineCurve;
use crate::{any_perpendicular, Dir3, GeomError, Point3, Result, Transform, Vec3};

// =============================================================================
// Capability trait
// =============================================================================

/// Parametric smoothness of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Continuity {
    /// Position only.
    C0,
    /// Tangent direction continuous.
    G1,
    /// First derivative continuous.
    C1,
    /// Curvature continuous.
    G2,
    /// Second derivative continuous.
    C2,
    /// Third derivative continuous.
    C3,
    /// Infinitely differentiable.
    CN,
}

/// The kind of a curve, as reported to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    /// Straight line.
    Line,
    /// Circle.
    Circle,
    /// Ellipse.
    Ellipse,
    /// Hyperbola branch.
    Hyperbola,
    /// Parabola.
    Parabola,
    /// Non-rational B-spline.
    BSpline,
    /// Anything else.
    Other,
}

/// What the hidden-line engine needs from an edge curve.
pub trait CurveEvaluator: Send + Sync + fmt::Debug {
    /// Start of the parameter range.
    fn first_parameter(&self) -> f64;

    /// End of the parameter range.
    fn last_parameter(&self) -> f64;

    /// Point at parameter `u`.
    fn value(&self, u: f64) -> Point3;

    /// Point and first derivative at parameter `u`.
    fn d1(&self, u: f64) -> (Point3, Vec3);

    /// Global continuity of the curve.
    fn continuity(&self) -> Continuity {
        Continuity::CN
    }

    /// Whether the start and end points coincide.
    fn is_closed(&self) -> bool {
        let a = self.value(self.first_parameter());
        let b = self.value(self.last_parameter());
        (a - b).norm() < 1e-9
    }

    /// Whether the underlying parameterization is periodic.
    fn is_periodic(&self) -> bool {
        false
    }

    /// The curve kind.
    fn curve_type(&self) -> CurveType {
        CurveType::Other
    }

    /// Suggested number of spans for polygonal approximation.
    fn nb_samples(&self) -> usize {
        32
    }

    /// Uniform sample parameters covering the full range, endpoints included.
    fn sample_parameters(&self) -> Vec<f64> {
        let n = self.nb_samples().max(1);
        let (a, b) = (self.first_parameter(), self.last_parameter());
        (0..=n)
            .map(|i| a + (b - a) * i as f64 / n as f64)
            .collect()
    }
}

// =============================================================================
// Analytic kinds
// =============================================================================

/// Straight line `P(u) = origin + u * direction`, with unit direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Point at `u = 0`.
    pub origin: Point3,
    /// Unit direction, so `u` is arc length.
    pub direction: Dir3,
}

impl Line {
    /// Line through `origin` along `direction`.
    pub fn new(origin: Point3, direction: Vec3) -> Result<Self> {
        if direction.norm() < 1e-14 {
            return Err(GeomError::Degenerate("zero line direction".into()));
        }
        Ok(Self {
            origin,
            direction: Dir3::new_normalize(direction),
        })
    }

    fn value(&self, u: f64) -> Point3 {
        self.origin + u * self.direction.as_ref()
    }

    fn d1(&self, u: f64) -> (Point3, Vec3) {
        (self.value(u), self.direction.into_inner())
    }
}

/// Circle `P(u) = center + radius (cos u X + sin u Y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    /// Center.
    pub center: Point3,
    /// Reference direction for `u = 0`.
    pub x_dir: Dir3,
    /// Second in-plane direction, `normal × x_dir`.
    pub y_dir: Dir3,
    /// Radius.
    pub radius: f64,
}

impl Circle {
    /// Circle with the given normal and seam direction.
    ///
    /// `x_dir` is orthogonalized against `normal`.
    pub fn new(center: Point3, normal: Vec3, x_dir: Vec3, radius: f64) -> Result<Self> {
        if radius <= 0.0 || !radius.is_finite() {
            return Err(GeomError::Degenerate(format!("circle radius {radius}")));
        }
        let (x, y) = in_plane_frame(&normal, &x_dir)?;
        Ok(Self {
            center,
            x_dir: x,
            y_dir: y,
            radius,
        })
    }

    /// Circle with an arbitrary seam direction.
    pub fn with_normal(center: Point3, normal: Vec3, radius: f64) -> Result<Self> {
        let x = any_perpendicular(&normal);
        Self::new(center, normal, x.into_inner(), radius)
    }

    /// Normal of the circle plane.
    pub fn normal(&self) -> Vec3 {
        self.x_dir.cross(self.y_dir.as_ref())
    }

    fn value(&self, u: f64) -> Point3 {
        let (s, c) = u.sin_cos();
        self.center + self.radius * (c * self.x_dir.as_ref() + s * self.y_dir.as_ref())
    }

    fn d1(&self, u: f64) -> (Point3, Vec3) {
        let (s, c) = u.sin_cos();
        (
            self.value(u),
            self.radius * (-s * self.x_dir.as_ref() + c * self.y_dir.as_ref()),
        )
    }
}

/// Ellipse `P(u) = center + major cos u X + minor sin u Y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    /// Center.
    pub center: Point3,
    /// Major axis direction.
    pub x_dir: Dir3,
    /// Minor axis direction.
    pub y_dir: Dir3,
    /// Major radius.
    pub major: f64,
    /// Minor radius.
    pub minor: f64,
}

impl Ellipse {
    /// Ellipse in the plane with the given normal, major axis along `x_dir`.
    pub fn new(center: Point3, normal: Vec3, x_dir: Vec3, major: f64, minor: f64) -> Result<Self> {
        if minor <= 0.0 || major < minor {
            return Err(GeomError::Degenerate(format!(
                "ellipse radii {major} / {minor}"
            )));
        }
        let (x, y) = in_plane_frame(&normal, &x_dir)?;
        Ok(Self {
            center,
            x_dir: x,
            y_dir: y,
            major,
            minor,
        })
    }

    fn value(&self, u: f64) -> Point3 {
        let (s, c) = u.sin_cos();
        self.center + self.major * c * self.x_dir.as_ref() + self.minor * s * self.y_dir.as_ref()
    }

    fn d1(&self, u: f64) -> (Point3, Vec3) {
        let (s, c) = u.sin_cos();
        (
            self.value(u),
            -self.major * s * self.x_dir.as_ref() + self.minor * c * self.y_dir.as_ref(),
        )
    }
}

/// Hyperbola branch `P(u) = center + major cosh u X + minor sinh u Y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperbola {
    /// Center.
    pub center: Point3,
    /// Transverse axis direction.
    pub x_dir: Dir3,
    /// Conjugate axis direction.
    pub y_dir: Dir3,
    /// Transverse radius.
    pub major: f64,
    /// Conjugate radius.
    pub minor: f64,
}

impl Hyperbola {
    /// Hyperbola in the plane with the given normal.
    pub fn new(center: Point3, normal: Vec3, x_dir: Vec3, major: f64, minor: f64) -> Result<Self> {
        if major <= 0.0 || minor <= 0.0 {
            return Err(GeomError::Degenerate(format!(
                "hyperbola radii {major} / {minor}"
            )));
        }
        let (x, y) = in_plane_frame(&normal, &x_dir)?;
        Ok(Self {
            center,
            x_dir: x,
            y_dir: y,
            major,
            minor,
        })
    }

    fn value(&self, u: f64) -> Point3 {
        self.center
            + self.major * u.cosh() * self.x_dir.as_ref()
            + self.minor * u.sinh() * self.y_dir.as_ref()
    }

    fn d1(&self, u: f64) -> (Point3, Vec3) {
        (
            self.value(u),
            self.major * u.sinh() * self.x_dir.as_ref() + self.minor * u.cosh() * self.y_dir.as_ref(),
        )
    }
}

/// Parabola `P(u) = vertex + u²/(4 focal) X + u Y`, opening along `X`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parabola {
    /// Apex of the parabola.
    pub vertex: Point3,
    /// Symmetry axis.
    pub x_dir: Dir3,
    /// Tangent direction at the apex.
    pub y_dir: Dir3,
    /// Focal length.
    pub focal: f64,
}

impl Parabola {
    /// Parabola in the plane with the given normal.
    pub fn new(vertex: Point3, normal: Vec3, x_dir: Vec3, focal: f64) -> Result<Self> {
        if focal <= 0.0 {
            return Err(GeomError::Degenerate(format!("parabola focal {focal}")));
        }
        let (x, y) = in_plane_frame(&normal, &x_dir)?;
        Ok(Self {
            vertex,
            x_dir: x,
            y_dir: y,
            focal,
        })
    }

    fn value(&self, u: f64) -> Point3 {
        self.vertex + (u * u / (4.0 * self.focal)) * self.x_dir.as_ref() + u * self.y_dir.as_ref()
    }

    fn d1(&self, u: f64) -> (Point3, Vec3) {
        (
            self.value(u),
            (u / (2.0 * self.focal)) * self.x_dir.as_ref() + self.y_dir.into_inner(),
        )
    }
}

fn in_plane_frame(normal: &Vec3, x_dir: &Vec3) -> Result<(Dir3, Dir3)> {
    let n = normal
        .try_normalize(1e-14)
        .ok_or_else(|| GeomError::Degenerate("zero plane normal".into()))?;
    let x = (x_dir - x_dir.dot(&n) * n)
        .try_normalize(1e-14)
        .ok_or_else(|| GeomError::Degenerate("reference direction parallel to normal".into()))?;
    let y = n.cross(&x);
    Ok((Dir3::new_unchecked(x), Dir3::new_normalize(y)))
}

// =============================================================================
// Tagged geometry and trimmed curve
// =============================================================================

/// Unbounded curve geometry.
#[derive(Debug, Clone)]
pub enum CurveGeometry {
    /// Straight line.
    Line(Line),
    /// Circle.
    Circle(Circle),
    /// Ellipse.
    Ellipse(Ellipse),
    /// Hyperbola branch.
    Hyperbola(Hyperbola),
    /// Parabola.
    Parabola(Parabola),
    /// B-spline.
    BSpline(BSplineCurve),
    /// Caller-supplied evaluator.
    Other(Arc<dyn CurveEvaluator>),
}

/// A curve geometry trimmed to `[first, last]`.
#[derive(Debug, Clone)]
pub struct Curve {
    geometry: CurveGeometry,
    first: f64,
    last: f64,
}

impl Curve {
    /// Trim `geometry` to `[first, last]`.
    pub fn new(geometry: CurveGeometry, first: f64, last: f64) -> Result<Self> {
        if !(first.is_finite() && last.is_finite()) || first >= last {
            return Err(GeomError::OutOfDomain(format!(
                "curve range [{first}, {last}]"
            )));
        }
        if let CurveGeometry::BSpline(b) = &geometry {
            let (a, z) = b.parameter_domain();
            if first < a - 1e-12 || last > z + 1e-12 {
                return Err(GeomError::OutOfDomain(format!(
                    "range [{first}, {last}] outside knot span [{a}, {z}]"
                )));
            }
        }
        Ok(Self {
            geometry,
            first,
            last,
        })
    }

    /// Straight segment from `a` to `b`, parameterized by arc length.
    pub fn segment(a: Point3, b: Point3) -> Result<Self> {
        let len = (b - a).norm();
        let line = Line::new(a, b - a)?;
        Self::new(CurveGeometry::Line(line), 0.0, len)
    }

    /// Full circle starting at `center + radius * x_dir`.
    pub fn full_circle(circle: Circle) -> Self {
        Self {
            geometry: CurveGeometry::Circle(circle),
            first: 0.0,
            last: TAU,
        }
    }

    /// A B-spline over its whole knot span.
    pub fn bspline(curve: BSplineCurve) -> Self {
        let (first, last) = curve.parameter_domain();
        Self {
            geometry: CurveGeometry::BSpline(curve),
            first,
            last,
        }
    }

    /// Wrap a caller-supplied evaluator over its own range.
    pub fn other(evaluator: Arc<dyn CurveEvaluator>) -> Result<Self> {
        let (first, last) = (evaluator.first_parameter(), evaluator.last_parameter());
        Self::new(CurveGeometry::Other(evaluator), first, last)
    }

    /// The underlying geometry.
    pub fn geometry(&self) -> &CurveGeometry {
        &self.geometry
    }

    /// Same geometry trimmed differently.
    pub fn trimmed(&self, first: f64, last: f64) -> Result<Self> {
        Self::new(self.geometry.clone(), first, last)
    }

    /// Apply a rigid motion.
    pub fn transformed(&self, t: &Transform) -> Result<Self> {
        let geometry = match &self.geometry {
            CurveGeometry::Line(l) => CurveGeometry::Line(Line {
                origin: t.apply_point(&l.origin),
                direction: t.apply_dir(&l.direction),
            }),
            CurveGeometry::Circle(c) => CurveGeometry::Circle(Circle {
                center: t.apply_point(&c.center),
                x_dir: t.apply_dir(&c.x_dir),
                y_dir: t.apply_dir(&c.y_dir),
                radius: c.radius,
            }),
            CurveGeometry::Ellipse(e) => CurveGeometry::Ellipse(Ellipse {
                center: t.apply_point(&e.center),
                x_dir: t.apply_dir(&e.x_dir),
                y_dir: t.apply_dir(&e.y_dir),
                ..e.clone()
            }),
            CurveGeometry::Hyperbola(h) => CurveGeometry::Hyperbola(Hyperbola {
                center: t.apply_point(&h.center),
                x_dir: t.apply_dir(&h.x_dir),
                y_dir: t.apply_dir(&h.y_dir),
                ..h.clone()
            }),
            CurveGeometry::Parabola(p) => CurveGeometry::Parabola(Parabola {
                vertex: t.apply_point(&p.vertex),
                x_dir: t.apply_dir(&p.x_dir),
                y_dir: t.apply_dir(&p.y_dir),
                focal: p.focal,
            }),
            CurveGeometry::BSpline(b) => CurveGeometry::BSpline(b.transformed(t)),
            CurveGeometry::Other(_) => {
                return Err(GeomError::Unsupported("transforming a foreign curve"))
            }
        };
        Ok(Self {
            geometry,
            first: self.first,
            last: self.last,
        })
    }

    /// Chord length of the polygon through [`CurveEvaluator::sample_parameters`].
    pub fn approximate_length(&self) -> f64 {
        let params = self.sample_parameters();
        params
            .windows(2)
            .map(|w| (self.value(w[1]) - self.value(w[0])).norm())
            .sum()
    }
}

impl CurveEvaluator for Curve {
    fn first_parameter(&self) -> f64 {
        self.first
    }

    fn last_parameter(&self) -> f64 {
        self.last
    }

    fn value(&self, u: f64) -> Point3 {
        match &self.geometry {
            CurveGeometry::Line(c) => c.value(u),
            CurveGeometry::Circle(c) => c.value(u),
            CurveGeometry::Ellipse(c) => c.value(u),
            CurveGeometry::Hyperbola(c) => c.value(u),
            CurveGeometry::Parabola(c) => c.value(u),
            CurveGeometry::BSpline(c) => c.eval(u),
            CurveGeometry::Other(c) => c.value(u),
        }
    }

    fn d1(&self, u: f64) -> (Point3, Vec3) {
        match &self.geometry {
            CurveGeometry::Line(c) => c.d1(u),
            CurveGeometry::Circle(c) => c.d1(u),
            CurveGeometry::Ellipse(c) => c.d1(u),
            CurveGeometry::Hyperbola(c) => c.d1(u),
            CurveGeometry::Parabola(c) => c.d1(u),
            CurveGeometry::BSpline(c) => (c.eval(u), c.derivative(u)),
            CurveGeometry::Other(c) => c.d1(u),
        }
    }

    fn continuity(&self) -> Continuity {
        match &self.geometry {
            CurveGeometry::BSpline(b) => match b.degree {
                0 | 1 => Continuity::C0,
                2 => Continuity::C1,
                3 => Continuity::C2,
                _ => Continuity::C3,
            },
            CurveGeometry::Other(c) => c.continuity(),
            _ => Continuity::CN,
        }
    }

    fn is_closed(&self) -> bool {
        match &self.geometry {
            CurveGeometry::Circle(_) | CurveGeometry::Ellipse(_) => {
                (self.last - self.first - TAU).abs() < 1e-12
            }
            CurveGeometry::Line(_) | CurveGeometry::Hyperbola(_) | CurveGeometry::Parabola(_) => {
                false
            }
            _ => {
                let a = self.value(self.first);
                let b = self.value(self.last);
                (a - b).norm() < 1e-9
            }
        }
    }

    fn is_periodic(&self) -> bool {
        match &self.geometry {
            CurveGeometry::Circle(_) | CurveGeometry::Ellipse(_) => true,
            CurveGeometry::Other(c) => c.is_periodic(),
            _ => false,
        }
    }

    fn curve_type(&self) -> CurveType {
        match &self.geometry {
            CurveGeometry::Line(_) => CurveType::Line,
            CurveGeometry::Circle(_) => CurveType::Circle,
            CurveGeometry::Ellipse(_) => CurveType::Ellipse,
            CurveGeometry::Hyperbola(_) => CurveType::Hyperbola,
            CurveGeometry::Parabola(_) => CurveType::Parabola,
            CurveGeometry::BSpline(_) => CurveType::BSpline,
            CurveGeometry::Other(_) => CurveType::Other,
        }
    }

    fn nb_samples(&self) -> usize {
        let span = self.last - self.first;
        match &self.geometry {
            CurveGeometry::Line(_) => 1,
            CurveGeometry::Circle(_) | CurveGeometry::Ellipse(_) => {
                ((32.0 * span / TAU).ceil() as usize).max(4)
            }
            CurveGeometry::Hyperbola(_) | CurveGeometry::Parabola(_) => 16,
            CurveGeometry::BSpline(b) => (b.control_points.len() * 4).max(8),
            CurveGeometry::Other(c) => c.nb_samples(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_segment_is_arc_length() {
        let c = Curve::segment(Point3::origin(), Point3::new(3.0, 4.0, 0.0)).unwrap();
        assert_relative_eq!(c.last_parameter(), 5.0);
        let p = c.value(2.5);
        assert_relative_eq!(p.x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
        assert_eq!(c.curve_type(), CurveType::Line);
        assert!(!c.is_closed());
    }

    #[test]
    fn test_zero_length_segment_rejected() {
        assert!(Curve::segment(Point3::origin(), Point3::origin()).is_err());
    }

    #[test]
    fn test_circle_derivative_matches_difference() {
        let circle = Circle::new(Point3::origin(), Vec3::z(), Vec3::x(), 2.0).unwrap();
        let c = Curve::full_circle(circle);
        let u = 0.7;
        let h = 1e-6;
        let (_, d) = c.d1(u);
        let fd = (c.value(u + h) - c.value(u - h)) / (2.0 * h);
        assert_relative_eq!(d, fd, epsilon = 1e-6);
        assert!(c.is_closed());
        assert!(c.is_periodic());
    }

    #[test]
    fn test_circle_seam_direction() {
        let circle = Circle::new(Point3::new(0.0, 0.0, 1.0), Vec3::z(), Vec3::x(), 1.0).unwrap();
        let p = Curve::full_circle(circle).value(0.0);
        assert_relative_eq!(p, Point3::new(1.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_conic_derivatives() {
        let n = Vec3::z();
        let kinds = vec![
            CurveGeometry::Ellipse(Ellipse::new(Point3::origin(), n, Vec3::x(), 3.0, 1.0).unwrap()),
            CurveGeometry::Hyperbola(
                Hyperbola::new(Point3::origin(), n, Vec3::x(), 1.0, 2.0).unwrap(),
            ),
            CurveGeometry::Parabola(Parabola::new(Point3::origin(), n, Vec3::x(), 0.5).unwrap()),
        ];
        for g in kinds {
            let c = Curve::new(g, -1.0, 1.0).unwrap();
            let u = 0.3;
            let h = 1e-6;
            let (_, d) = c.d1(u);
            let fd = (c.value(u + h) - c.value(u - h)) / (2.0 * h);
            assert_relative_eq!(d, fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_invalid_range() {
        let line = Line::new(Point3::origin(), Vec3::x()).unwrap();
        assert!(Curve::new(CurveGeometry::Line(line), 1.0, 1.0).is_err());
    }

    #[test]
    fn test_transform_circle() {
        let circle = Circle::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap();
        let c = Curve::new(CurveGeometry::Circle(circle), 0.0, PI).unwrap();
        let t = Transform::translation(0.0, 0.0, 5.0);
        let moved = c.transformed(&t).unwrap();
        assert_relative_eq!(moved.value(0.0).z, 5.0);
        assert_eq!(moved.first_parameter(), 0.0);
        assert_eq!(moved.last_parameter(), PI);
    }

    #[test]
    fn test_sample_parameters_cover_range() {
        let circle = Circle::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap();
        let c = Curve::new(CurveGeometry::Circle(circle), 0.0, PI).unwrap();
        let params = c.sample_parameters();
        assert_eq!(params.len(), c.nb_samples() + 1);
        assert_eq!(params[0], 0.0);
        assert_relative_eq!(*params.last().unwrap(), PI);
    }
}
