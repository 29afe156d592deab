//! Face surfaces as a closed set of analytic kinds.
//!
//! The engine uses surfaces for three things only: evaluating points and
//! normals (facing tests, outlines), inverting points to `(u, v)` (face
//! domain tests), and intersecting lines of sight (depth of a face below
//! a projected point, see [`crate::ray`]).

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;
use std::sync::Arc;

use crate::{Dir3, GeomError, Point2, Point3, Result, Transform, Vec3};

// =============================================================================
// Capability trait
// =============================================================================

/// The kind of a surface, as reported to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceType {
    /// Infinite plane.
    Plane,
    /// Circular cylinder.
    Cylinder,
    /// Circular cone.
    Cone,
    /// Sphere.
    Sphere,
    /// Torus.
    Torus,
    /// Anything else.
    Other,
}

/// What the hidden-line engine needs from a face surface.
pub trait SurfaceEvaluator: Send + Sync + fmt::Debug {
    /// Point at `(u, v)`.
    fn value(&self, uv: Point2) -> Point3;

    /// Point and partial derivatives `(P, dP/du, dP/dv)`.
    fn d1(&self, uv: Point2) -> (Point3, Vec3, Vec3);

    /// Parameter bounds `((u_min, u_max), (v_min, v_max))`.
    fn bounds(&self) -> ((f64, f64), (f64, f64));

    /// Unit normal `dP/du × dP/dv`; errors where it is undefined.
    fn normal(&self, uv: Point2) -> Result<Dir3> {
        let (_, du, dv) = self.d1(uv);
        let n = du.cross(&dv);
        n.try_normalize(1e-14)
            .map(Dir3::new_unchecked)
            .ok_or_else(|| GeomError::Degenerate(format!("no normal at ({}, {})", uv.x, uv.y)))
    }

    /// Periods of `u` and `v`, when the parameterization wraps.
    fn periods(&self) -> (Option<f64>, Option<f64>) {
        (None, None)
    }

    /// Inverse evaluation: `(u, v)` of the surface point closest to `p`.
    fn parameters(&self, p: &Point3) -> Result<Point2> {
        project_newton(self, p)
    }

    /// The surface kind.
    fn surface_type(&self) -> SurfaceType {
        SurfaceType::Other
    }
}

/// Gauss–Newton inversion seeded from a coarse grid over the bounds.
fn project_newton<S: SurfaceEvaluator + ?Sized>(surface: &S, point: &Point3) -> Result<Point2> {
    const ITERATIONS: usize = 30;
    let ((u_min, u_max), (v_min, v_max)) = surface.bounds();
    if !(u_min.is_finite() && u_max.is_finite() && v_min.is_finite() && v_max.is_finite()) {
        return Err(GeomError::Unsupported("inverse of an unbounded surface"));
    }
    let mut seed = Point2::new((u_min + u_max) / 2.0, (v_min + v_max) / 2.0);
    let mut best = f64::INFINITY;
    for i in 0..=4 {
        for j in 0..=4 {
            let uv = Point2::new(
                u_min + (u_max - u_min) * i as f64 / 4.0,
                v_min + (v_max - v_min) * j as f64 / 4.0,
            );
            let d = (surface.value(uv) - point).norm_squared();
            if d < best {
                best = d;
                seed = uv;
            }
        }
    }

    let mut uv = seed;
    for _ in 0..ITERATIONS {
        let (p, du, dv) = surface.d1(uv);
        let residual = p - point;
        // Least squares: (J^T J) delta = J^T residual
        let a11 = du.dot(&du);
        let a12 = du.dot(&dv);
        let a22 = dv.dot(&dv);
        let b1 = du.dot(&residual);
        let b2 = dv.dot(&residual);
        let det = a11 * a22 - a12 * a12;
        if det.abs() < 1e-14 {
            return Err(GeomError::Degenerate("singular surface jacobian".into()));
        }
        let delta_u = (a22 * b1 - a12 * b2) / det;
        let delta_v = (a11 * b2 - a12 * b1) / det;
        uv.x = (uv.x - delta_u).clamp(u_min, u_max);
        uv.y = (uv.y - delta_v).clamp(v_min, v_max);
        if delta_u.abs() < 1e-12 && delta_v.abs() < 1e-12 {
            return Ok(uv);
        }
    }
    Err(GeomError::NonConvergent {
        iterations: ITERATIONS,
    })
}

fn polar_angle(x: f64, y: f64) -> f64 {
    let a = y.atan2(x);
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

fn frame(axis: &Vec3, ref_dir: &Vec3) -> Result<(Dir3, Dir3)> {
    let a = axis
        .try_normalize(1e-14)
        .ok_or_else(|| GeomError::Degenerate("zero axis".into()))?;
    let r = (ref_dir - ref_dir.dot(&a) * a)
        .try_normalize(1e-14)
        .ok_or_else(|| GeomError::Degenerate("reference direction parallel to axis".into()))?;
    Ok((Dir3::new_unchecked(a), Dir3::new_unchecked(r)))
}

// =============================================================================
// Plane
// =============================================================================

/// Plane `P(u, v) = origin + u X + v Y`, normal `X × Y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Origin point.
    pub origin: Point3,
    /// U direction.
    pub x_dir: Dir3,
    /// V direction.
    pub y_dir: Dir3,
    /// Normal (`x_dir × y_dir`).
    pub normal: Dir3,
}

impl Plane {
    /// Plane through `origin` spanned by `x_dir` and `y_dir` (orthogonalized).
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Result<Self> {
        let normal = x_dir
            .cross(&y_dir)
            .try_normalize(1e-14)
            .ok_or_else(|| GeomError::Degenerate("parallel plane directions".into()))?;
        let x = Dir3::new_normalize(x_dir);
        let y = Dir3::new_normalize(normal.cross(x.as_ref()));
        Ok(Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal: Dir3::new_unchecked(normal),
        })
    }

    /// Signed distance from `p` to the plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal.as_ref())
    }
}

// =============================================================================
// Cylinder
// =============================================================================

/// Cylinder `P(u, v) = center + r (cos u X + sin u Y) + v A`, `Y = A × X`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    /// Point on the axis at `v = 0`.
    pub center: Point3,
    /// Axis direction.
    pub axis: Dir3,
    /// Direction of `u = 0`.
    pub ref_dir: Dir3,
    /// Radius.
    pub radius: f64,
}

impl Cylinder {
    /// Cylinder around `axis` through `center`.
    pub fn new(center: Point3, axis: Vec3, ref_dir: Vec3, radius: f64) -> Result<Self> {
        if radius <= 0.0 {
            return Err(GeomError::Degenerate(format!("cylinder radius {radius}")));
        }
        let (axis, ref_dir) = frame(&axis, &ref_dir)?;
        Ok(Self {
            center,
            axis,
            ref_dir,
            radius,
        })
    }

    /// Second frame direction, `axis × ref_dir`.
    pub fn y_dir(&self) -> Vec3 {
        self.axis.cross(self.ref_dir.as_ref())
    }

    /// Unit radial direction at angle `u`.
    pub fn radial(&self, u: f64) -> Vec3 {
        let (s, c) = u.sin_cos();
        c * self.ref_dir.as_ref() + s * self.y_dir()
    }
}

// =============================================================================
// Cone
// =============================================================================

/// Cone `P(u, v) = apex + v (cos a A + sin a (cos u X + sin u Y))`, `v ≥ 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cone {
    /// Apex.
    pub apex: Point3,
    /// Axis from apex toward the opening.
    pub axis: Dir3,
    /// Direction of `u = 0`.
    pub ref_dir: Dir3,
    /// Half-angle in radians.
    pub half_angle: f64,
}

impl Cone {
    /// Cone with the given apex, axis and half-angle in `(0, π/2)`.
    pub fn new(apex: Point3, axis: Vec3, ref_dir: Vec3, half_angle: f64) -> Result<Self> {
        if !(half_angle > 0.0 && half_angle < FRAC_PI_2) {
            return Err(GeomError::Degenerate(format!("cone half-angle {half_angle}")));
        }
        let (axis, ref_dir) = frame(&axis, &ref_dir)?;
        Ok(Self {
            apex,
            axis,
            ref_dir,
            half_angle,
        })
    }

    /// Second frame direction, `axis × ref_dir`.
    pub fn y_dir(&self) -> Vec3 {
        self.axis.cross(self.ref_dir.as_ref())
    }

    /// Unit radial direction at angle `u`.
    pub fn radial(&self, u: f64) -> Vec3 {
        let (s, c) = u.sin_cos();
        c * self.ref_dir.as_ref() + s * self.y_dir()
    }

    /// Unit generator direction at angle `u`.
    pub fn generator(&self, u: f64) -> Vec3 {
        let (sa, ca) = self.half_angle.sin_cos();
        ca * self.axis.as_ref() + sa * self.radial(u)
    }
}

// =============================================================================
// Sphere
// =============================================================================

/// Sphere `P(u, v) = center + r (cos v (cos u X + sin u Y) + sin v A)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    /// Center.
    pub center: Point3,
    /// Polar axis.
    pub axis: Dir3,
    /// Direction of `u = 0`.
    pub ref_dir: Dir3,
    /// Radius.
    pub radius: f64,
}

impl Sphere {
    /// Sphere with the given frame.
    pub fn new(center: Point3, axis: Vec3, ref_dir: Vec3, radius: f64) -> Result<Self> {
        if radius <= 0.0 {
            return Err(GeomError::Degenerate(format!("sphere radius {radius}")));
        }
        let (axis, ref_dir) = frame(&axis, &ref_dir)?;
        Ok(Self {
            center,
            axis,
            ref_dir,
            radius,
        })
    }

    /// Second frame direction, `axis × ref_dir`.
    pub fn y_dir(&self) -> Vec3 {
        self.axis.cross(self.ref_dir.as_ref())
    }

    /// Unit radial direction at angle `u`.
    pub fn radial(&self, u: f64) -> Vec3 {
        let (s, c) = u.sin_cos();
        c * self.ref_dir.as_ref() + s * self.y_dir()
    }
}

// =============================================================================
// Torus
// =============================================================================

/// Torus `P(u, v) = center + (R + r cos v)(cos u X + sin u Y) + r sin v A`.
#[derive(Debug, Clone, PartialEq)]
pub struct Torus {
    /// Center.
    pub center: Point3,
    /// Axis of revolution.
    pub axis: Dir3,
    /// Direction of `u = 0`.
    pub ref_dir: Dir3,
    /// Distance from center to tube center.
    pub major_radius: f64,
    /// Tube radius.
    pub minor_radius: f64,
}

impl Torus {
    /// Ring torus (`major > minor > 0`).
    pub fn new(center: Point3, axis: Vec3, ref_dir: Vec3, major: f64, minor: f64) -> Result<Self> {
        if !(minor > 0.0 && major > minor) {
            return Err(GeomError::Degenerate(format!("torus radii {major} / {minor}")));
        }
        let (axis, ref_dir) = frame(&axis, &ref_dir)?;
        Ok(Self {
            center,
            axis,
            ref_dir,
            major_radius: major,
            minor_radius: minor,
        })
    }

    /// Second frame direction, `axis × ref_dir`.
    pub fn y_dir(&self) -> Vec3 {
        self.axis.cross(self.ref_dir.as_ref())
    }

    /// Unit radial direction at angle `u`.
    pub fn radial(&self, u: f64) -> Vec3 {
        let (s, c) = u.sin_cos();
        c * self.ref_dir.as_ref() + s * self.y_dir()
    }

    /// Implicit function, zero on the surface and negative inside the tube.
    pub fn implicit(&self, p: &Point3) -> f64 {
        let w = p - self.center;
        let h = w.dot(self.axis.as_ref());
        let rho = (w.norm_squared() - h * h).max(0.0).sqrt();
        (rho - self.major_radius).hypot(h) - self.minor_radius
    }
}

// =============================================================================
// Tagged surface
// =============================================================================

/// A face surface.
#[derive(Debug, Clone)]
pub enum Surface {
    /// Plane.
    Plane(Plane),
    /// Cylinder.
    Cylinder(Cylinder),
    /// Cone.
    Cone(Cone),
    /// Sphere.
    Sphere(Sphere),
    /// Torus.
    Torus(Torus),
    /// Caller-supplied evaluator.
    Other(Arc<dyn SurfaceEvaluator>),
}

impl Surface {
    /// Apply a rigid motion.
    pub fn transformed(&self, t: &Transform) -> Result<Self> {
        Ok(match self {
            Surface::Plane(s) => Surface::Plane(Plane {
                origin: t.apply_point(&s.origin),
                x_dir: t.apply_dir(&s.x_dir),
                y_dir: t.apply_dir(&s.y_dir),
                normal: t.apply_dir(&s.normal),
            }),
            Surface::Cylinder(s) => Surface::Cylinder(Cylinder {
                center: t.apply_point(&s.center),
                axis: t.apply_dir(&s.axis),
                ref_dir: t.apply_dir(&s.ref_dir),
                radius: s.radius,
            }),
            Surface::Cone(s) => Surface::Cone(Cone {
                apex: t.apply_point(&s.apex),
                axis: t.apply_dir(&s.axis),
                ref_dir: t.apply_dir(&s.ref_dir),
                half_angle: s.half_angle,
            }),
            Surface::Sphere(s) => Surface::Sphere(Sphere {
                center: t.apply_point(&s.center),
                axis: t.apply_dir(&s.axis),
                ref_dir: t.apply_dir(&s.ref_dir),
                radius: s.radius,
            }),
            Surface::Torus(s) => Surface::Torus(Torus {
                center: t.apply_point(&s.center),
                axis: t.apply_dir(&s.axis),
                ref_dir: t.apply_dir(&s.ref_dir),
                ..s.clone()
            }),
            Surface::Other(_) => return Err(GeomError::Unsupported("transforming a foreign surface")),
        })
    }
}

impl SurfaceEvaluator for Surface {
    fn value(&self, uv: Point2) -> Point3 {
        let (u, v) = (uv.x, uv.y);
        match self {
            Surface::Plane(s) => s.origin + u * s.x_dir.as_ref() + v * s.y_dir.as_ref(),
            Surface::Cylinder(s) => s.center + s.radius * s.radial(u) + v * s.axis.as_ref(),
            Surface::Cone(s) => s.apex + v * s.generator(u),
            Surface::Sphere(s) => {
                let (sv, cv) = v.sin_cos();
                s.center + s.radius * (cv * s.radial(u) + sv * s.axis.as_ref())
            }
            Surface::Torus(s) => {
                let (sv, cv) = v.sin_cos();
                s.center
                    + (s.major_radius + s.minor_radius * cv) * s.radial(u)
                    + s.minor_radius * sv * s.axis.as_ref()
            }
            Surface::Other(s) => s.value(uv),
        }
    }

    fn d1(&self, uv: Point2) -> (Point3, Vec3, Vec3) {
        let (u, v) = (uv.x, uv.y);
        let p = self.value(uv);
        match self {
            Surface::Plane(s) => (p, s.x_dir.into_inner(), s.y_dir.into_inner()),
            Surface::Cylinder(s) => {
                let tangent = s.axis.cross(&s.radial(u));
                (p, s.radius * tangent, s.axis.into_inner())
            }
            Surface::Cone(s) => {
                let tangent = s.axis.cross(&s.radial(u));
                (p, v * s.half_angle.sin() * tangent, s.generator(u))
            }
            Surface::Sphere(s) => {
                let (sv, cv) = v.sin_cos();
                let tangent = s.axis.cross(&s.radial(u));
                (
                    p,
                    s.radius * cv * tangent,
                    s.radius * (-sv * s.radial(u) + cv * s.axis.as_ref()),
                )
            }
            Surface::Torus(s) => {
                let (sv, cv) = v.sin_cos();
                let tangent = s.axis.cross(&s.radial(u));
                (
                    p,
                    (s.major_radius + s.minor_radius * cv) * tangent,
                    s.minor_radius * (-sv * s.radial(u) + cv * s.axis.as_ref()),
                )
            }
            Surface::Other(s) => s.d1(uv),
        }
    }

    fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        match self {
            Surface::Plane(_) => ((-1e10, 1e10), (-1e10, 1e10)),
            Surface::Cylinder(_) => ((0.0, TAU), (-1e10, 1e10)),
            Surface::Cone(_) => ((0.0, TAU), (0.0, 1e10)),
            Surface::Sphere(_) => ((0.0, TAU), (-FRAC_PI_2, FRAC_PI_2)),
            Surface::Torus(_) => ((0.0, TAU), (0.0, TAU)),
            Surface::Other(s) => s.bounds(),
        }
    }

    fn normal(&self, uv: Point2) -> Result<Dir3> {
        let (u, v) = (uv.x, uv.y);
        match self {
            Surface::Plane(s) => Ok(s.normal),
            Surface::Cylinder(s) => Ok(Dir3::new_normalize(s.radial(u))),
            Surface::Cone(s) => {
                let (sa, ca) = s.half_angle.sin_cos();
                Ok(Dir3::new_normalize(ca * s.radial(u) - sa * s.axis.as_ref()))
            }
            Surface::Sphere(s) => {
                let (sv, cv) = v.sin_cos();
                Ok(Dir3::new_normalize(cv * s.radial(u) + sv * s.axis.as_ref()))
            }
            Surface::Torus(s) => {
                let (sv, cv) = v.sin_cos();
                Ok(Dir3::new_normalize(cv * s.radial(u) + sv * s.axis.as_ref()))
            }
            Surface::Other(s) => s.normal(uv),
        }
    }

    fn periods(&self) -> (Option<f64>, Option<f64>) {
        match self {
            Surface::Plane(_) => (None, None),
            Surface::Cylinder(_) | Surface::Cone(_) | Surface::Sphere(_) => (Some(TAU), None),
            Surface::Torus(_) => (Some(TAU), Some(TAU)),
            Surface::Other(s) => s.periods(),
        }
    }

    fn parameters(&self, p: &Point3) -> Result<Point2> {
        match self {
            Surface::Plane(s) => {
                let d = p - s.origin;
                Ok(Point2::new(d.dot(s.x_dir.as_ref()), d.dot(s.y_dir.as_ref())))
            }
            Surface::Cylinder(s) => {
                let d = p - s.center;
                let v = d.dot(s.axis.as_ref());
                let proj = d - v * s.axis.as_ref();
                let u = polar_angle(proj.dot(s.ref_dir.as_ref()), proj.dot(&s.y_dir()));
                Ok(Point2::new(u, v))
            }
            Surface::Cone(s) => {
                let d = p - s.apex;
                let h = d.dot(s.axis.as_ref());
                let proj = d - h * s.axis.as_ref();
                let u = if proj.norm() > 1e-12 {
                    polar_angle(proj.dot(s.ref_dir.as_ref()), proj.dot(&s.y_dir()))
                } else {
                    0.0
                };
                // Foot of the perpendicular on the generator at u.
                let v = d.dot(&s.generator(u)).max(0.0);
                Ok(Point2::new(u, v))
            }
            Surface::Sphere(s) => {
                let d = (p - s.center) / s.radius;
                let z = d.dot(s.axis.as_ref());
                let proj = d - z * s.axis.as_ref();
                let u = if proj.norm() > 1e-12 {
                    polar_angle(proj.dot(s.ref_dir.as_ref()), proj.dot(&s.y_dir()))
                } else {
                    0.0
                };
                let v = z.atan2(proj.norm());
                Ok(Point2::new(u, v))
            }
            Surface::Torus(s) => {
                let d = p - s.center;
                let h = d.dot(s.axis.as_ref());
                let proj = d - h * s.axis.as_ref();
                let rho = proj.norm();
                if rho < 1e-12 {
                    return Err(GeomError::Degenerate("point on the torus axis".into()));
                }
                let u = polar_angle(proj.dot(s.ref_dir.as_ref()), proj.dot(&s.y_dir()));
                let v = polar_angle(rho - s.major_radius, h);
                Ok(Point2::new(u, v))
            }
            Surface::Other(s) => s.parameters(p),
        }
    }

    fn surface_type(&self) -> SurfaceType {
        match self {
            Surface::Plane(_) => SurfaceType::Plane,
            Surface::Cylinder(_) => SurfaceType::Cylinder,
            Surface::Cone(_) => SurfaceType::Cone,
            Surface::Sphere(_) => SurfaceType::Sphere,
            Surface::Torus(_) => SurfaceType::Torus,
            Surface::Other(_) => SurfaceType::Other,
        }
    }
}

/// Wrap `a` into the period window nearest `reference`.
pub fn unwrap_near(a: f64, reference: f64, period: f64) -> f64 {
    a + ((reference - a) / period).round() * period
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kinds() -> Vec<Surface> {
        vec![
            Surface::Plane(Plane::new(Point3::new(1.0, 2.0, 3.0), Vec3::x(), Vec3::y()).unwrap()),
            Surface::Cylinder(Cylinder::new(Point3::origin(), Vec3::z(), Vec3::x(), 2.0).unwrap()),
            Surface::Cone(Cone::new(Point3::origin(), Vec3::z(), Vec3::x(), 0.4).unwrap()),
            Surface::Sphere(Sphere::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.5).unwrap()),
            Surface::Torus(Torus::new(Point3::origin(), Vec3::z(), Vec3::x(), 3.0, 1.0).unwrap()),
        ]
    }

    #[test]
    fn test_inverse_round_trip() {
        let uv = Point2::new(1.1, 0.6);
        for s in kinds() {
            let p = s.value(uv);
            let back = s.parameters(&p).unwrap();
            assert_relative_eq!(s.value(back), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normal_matches_derivative_cross() {
        let uv = Point2::new(0.8, 0.3);
        for s in kinds() {
            let (_, du, dv) = s.d1(uv);
            let n = s.normal(uv).unwrap();
            let c = du.cross(&dv).normalize();
            assert_relative_eq!(n.into_inner(), c, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_derivatives_match_differences() {
        let uv = Point2::new(0.8, 0.3);
        let h = 1e-6;
        for s in kinds() {
            let (_, du, dv) = s.d1(uv);
            let fu = (s.value(Point2::new(uv.x + h, uv.y)) - s.value(Point2::new(uv.x - h, uv.y)))
                / (2.0 * h);
            let fv = (s.value(Point2::new(uv.x, uv.y + h)) - s.value(Point2::new(uv.x, uv.y - h)))
                / (2.0 * h);
            assert_relative_eq!(du, fu, epsilon = 1e-5);
            assert_relative_eq!(dv, fv, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_cylinder_seam_parameter() {
        let s = Surface::Cylinder(Cylinder::new(Point3::origin(), Vec3::z(), Vec3::x(), 5.0).unwrap());
        let uv = s.parameters(&Point3::new(5.0, 0.0, 3.0)).unwrap();
        assert!(uv.x.abs() < 1e-10);
        assert_relative_eq!(uv.y, 3.0);
        let uv2 = s.parameters(&Point3::new(0.0, 5.0, 7.0)).unwrap();
        assert_relative_eq!(uv2.x, FRAC_PI_2, epsilon = 1e-10);
    }

    #[test]
    fn test_torus_implicit_sign() {
        let t = Torus::new(Point3::origin(), Vec3::z(), Vec3::x(), 3.0, 1.0).unwrap();
        assert!(t.implicit(&Point3::new(3.0, 0.0, 0.0)) < 0.0);
        assert!(t.implicit(&Point3::origin()) > 0.0);
        assert!(t.implicit(&Point3::new(4.0, 0.0, 0.0)).abs() < 1e-12);
    }

    #[test]
    fn test_foreign_surface_newton_inverse() {
        #[derive(Debug)]
        struct Saddle;
        impl SurfaceEvaluator for Saddle {
            fn value(&self, uv: Point2) -> Point3 {
                Point3::new(uv.x, uv.y, 0.25 * (uv.x * uv.x - uv.y * uv.y))
            }
            fn d1(&self, uv: Point2) -> (Point3, Vec3, Vec3) {
                (
                    self.value(uv),
                    Vec3::new(1.0, 0.0, 0.5 * uv.x),
                    Vec3::new(0.0, 1.0, -0.5 * uv.y),
                )
            }
            fn bounds(&self) -> ((f64, f64), (f64, f64)) {
                ((-2.0, 2.0), (-2.0, 2.0))
            }
        }
        let s = Surface::Other(Arc::new(Saddle));
        let p = s.value(Point2::new(0.7, -1.2));
        let uv = s.parameters(&p).unwrap();
        assert_relative_eq!(uv.x, 0.7, epsilon = 1e-8);
        assert_relative_eq!(uv.y, -1.2, epsilon = 1e-8);
        assert_eq!(s.surface_type(), SurfaceType::Other);
    }

    #[test]
    fn test_unwrap_near() {
        assert_relative_eq!(unwrap_near(0.1, TAU - 0.1, TAU), TAU + 0.1);
        assert_relative_eq!(unwrap_near(TAU - 0.1, 0.05, TAU), -0.1, epsilon = 1e-12);
    }
}
