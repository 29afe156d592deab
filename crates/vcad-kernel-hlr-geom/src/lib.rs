#![warn(missing_docs)]

//! Geometry adapters for vcad hidden-line removal.
//!
//! The hidden-line engine never looks inside a curve or surface: it asks
//! for values, first derivatives, parameter ranges, inverse parameters and
//! sight-line intersections through the narrow traits defined here.
//!
//! Curves and surfaces are closed tagged enums over the analytic kinds
//! the kernel produces, with an `Other` variant carrying a trait object
//! for anything else.

pub mod bspline;
pub mod curve;
pub mod domain;
pub mod ray;
pub mod surface;

use nalgebra::{Matrix3, Unit, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bspline::BSplineCurve;
pub use curve::{
    Circle, Continuity, Curve, CurveEvaluator, CurveGeometry, CurveType, Ellipse, Hyperbola, Line,
    Parabola,
};
pub use domain::{
    distance_to_ring, is_left, point_in_polygon, segment_distance, DomainState, FaceDomain,
    LoopSegment,
};
pub use ray::{intersect_sight_line, SightLine, SurfaceHit};
pub use surface::{
    unwrap_near, Cone, Cylinder, Plane, Sphere, Surface, SurfaceEvaluator, SurfaceType, Torus,
};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D (parameter or view) space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Errors raised at the geometry adapter boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeomError {
    /// An iterative solve did not reach the requested accuracy.
    #[error("numeric solve did not converge after {iterations} iterations")]
    NonConvergent {
        /// Iterations spent before giving up.
        iterations: usize,
    },

    /// Geometry is singular at the requested location.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// A parameter or point lies outside the evaluable domain.
    #[error("value outside the parameter domain: {0}")]
    OutOfDomain(String),

    /// The requested operation is not available for this geometry kind.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Result type for geometry adapter operations.
pub type Result<T> = std::result::Result<T, GeomError>;

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
    /// Parametric tolerance, in curve/surface parameter units.
    pub parametric: f64,
}

impl Tolerance {
    /// Default CAD tolerances (1e-6 mm linear, 1e-9 rad angular and parametric).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-9,
        parametric: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Check if two angles are effectively equal (in radians).
    pub fn angles_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.angular
    }

    /// Check if two parameters are effectively equal.
    pub fn params_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.parametric
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A rigid motion: rotation followed by translation.
///
/// Analytic curves and surfaces keep their kind under rigid motions,
/// so this is the only transform shapes accept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Orthonormal rotation part.
    pub rotation: Matrix3<f64>,
    /// Translation applied after rotation.
    pub translation: Vec3,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vec3::zeros(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vec3::new(dx, dy, dz),
        }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            rotation: Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0),
            translation: Vec3::zeros(),
        }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            rotation: Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c),
            translation: Vec3::zeros(),
        }
    }

    /// Rotation about an arbitrary axis through the origin (Rodrigues).
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        Self {
            rotation: Matrix3::new(
                t * x * x + c,
                t * x * y - s * z,
                t * x * z + s * y,
                t * x * y + s * z,
                t * y * y + c,
                t * y * z - s * x,
                t * x * z - s * y,
                t * y * z + s * x,
                t * z * z + c,
            ),
            translation: Vec3::zeros(),
        }
    }

    /// Compose: apply `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        Point3::from(self.rotation * p.coords + self.translation)
    }

    /// Transform a direction vector (rotation only).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Transform a unit direction.
    pub fn apply_dir(&self, d: &Dir3) -> Dir3 {
        Dir3::new_unchecked(self.rotation * d.as_ref())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Any unit vector perpendicular to `n`.
pub fn any_perpendicular(n: &Vec3) -> Dir3 {
    let helper = if n.x.abs() < 0.9 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    Dir3::new_normalize(n.cross(&helper))
}

/// Real roots of `a t² + b t + c = 0`, ascending. Degrades to the linear case.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs()).max(1e-300);
    if a.abs() < 1e-14 * scale {
        if b.abs() < 1e-300 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < -1e-14 * scale * scale {
        return Vec::new();
    }
    let sq = disc.max(0.0).sqrt();
    // Stable form avoids cancellation when b² >> 4ac.
    let q = -0.5 * (b + b.signum() * sq);
    let (mut t0, mut t1) = if q.abs() < 1e-300 {
        (-b / (2.0 * a), -b / (2.0 * a))
    } else {
        (q / a, c / q)
    };
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    vec![t0, t1]
}

/// Solutions in `[0, 2π)` of `a cos u + b sin u = c`.
pub fn solve_trig(a: f64, b: f64, c: f64) -> Vec<f64> {
    let r = a.hypot(b);
    if r < 1e-14 || c.abs() > r {
        return Vec::new();
    }
    let phi = b.atan2(a);
    let delta = (c / r).clamp(-1.0, 1.0).acos();
    let mut out = vec![normalize_angle(phi - delta), normalize_angle(phi + delta)];
    if delta < 1e-12 {
        out.truncate(1);
    }
    out.sort_by(f64::total_cmp);
    out
}

/// Wrap an angle into `[0, 2π)`.
pub fn normalize_angle(a: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let r = a.rem_euclid(tau);
    if r >= tau {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_quadratic_two_roots() {
        let r = solve_quadratic(1.0, -3.0, 2.0);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quadratic_linear_fallback() {
        let r = solve_quadratic(0.0, 2.0, -4.0);
        assert_eq!(r, vec![2.0]);
    }

    #[test]
    fn test_quadratic_no_roots() {
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_trig_solutions() {
        // sin u = 0 -> u = 0, π
        let r = solve_trig(0.0, 1.0, 0.0);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(r[1], PI, epsilon = 1e-12);
        assert!(solve_trig(1.0, 0.0, 2.0).is_empty());
    }

    #[test]
    fn test_rigid_transform_compose() {
        let t = Transform::translation(1.0, 0.0, 0.0).then(&Transform::rotation_z(PI / 2.0));
        // rotate (1,0,0) -> (0,1,0), then translate -> (1,1,0)
        let p = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_z_matches_axis_form() {
        let a = Transform::rotation_z(0.3);
        let b = Transform::rotation_about_axis(&Vec3::z_axis(), 0.3);
        assert_relative_eq!(a.rotation, b.rotation, epsilon = 1e-12);
    }

    #[test]
    fn test_tolerance_helpers() {
        let tol = Tolerance::default();
        assert!(tol.points_equal(&Point3::origin(), &Point3::new(1e-7, 0.0, 0.0)));
        assert!(!tol.is_zero(1e-3));
        assert!(tol.params_equal(1.0, 1.0 + 1e-10));
    }
}
