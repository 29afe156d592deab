//! Line-of-sight / surface intersection.
//!
//! The hidden-line engine asks "how deep is this face under a projected
//! point": the line of sight through the point is intersected with the
//! face surface and the parameters `t` of the hits are depths along the
//! view direction.

use nalgebra::{Matrix3, Vector3};

use crate::surface::{Surface, SurfaceEvaluator, Torus};
use crate::{solve_quadratic, GeomError, Point2, Point3, Result, Vec3};

/// A line of sight `L(t) = origin + t * direction`.
///
/// `direction` is not normalized: projectors scale it so that `t` equals
/// the depth of `L(t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightLine {
    /// Point at `t = 0`.
    pub origin: Point3,
    /// Direction of increasing depth.
    pub direction: Vec3,
}

impl SightLine {
    /// Point at parameter `t`.
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }
}

/// One intersection of a sight line with a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Sight line parameter (depth).
    pub t: f64,
    /// Surface parameters at the hit.
    pub uv: Point2,
}

/// Intersect `line` with `surface`, keeping hits with `t` in `t_range`.
///
/// Hits are sorted by increasing `t`. A sight line tangent to the
/// surface yields a single (double) hit. Errors are numeric failures
/// that the caller should treat as "undecided", not as "no hit".
pub fn intersect_sight_line(
    surface: &Surface,
    line: &SightLine,
    t_range: (f64, f64),
) -> Result<Vec<SurfaceHit>> {
    let ts = match surface {
        Surface::Plane(p) => {
            let denom = line.direction.dot(p.normal.as_ref());
            if denom.abs() < 1e-14 * line.direction.norm() {
                Vec::new()
            } else {
                vec![(p.origin - line.origin).dot(p.normal.as_ref()) / denom]
            }
        }
        Surface::Cylinder(c) => {
            let axis = c.axis.as_ref();
            let d = line.direction;
            let oc = line.origin - c.center;
            let d_perp = d - d.dot(axis) * axis;
            let oc_perp = oc - oc.dot(axis) * axis;
            let a = d_perp.dot(&d_perp);
            // Parallel to the axis: the line is on the surface or misses it.
            if a < 1e-24 * d.norm_squared() {
                Vec::new()
            } else {
                solve_quadratic(
                    a,
                    2.0 * oc_perp.dot(&d_perp),
                    oc_perp.dot(&oc_perp) - c.radius * c.radius,
                )
            }
        }
        Surface::Sphere(s) => {
            let d = line.direction;
            let oc = line.origin - s.center;
            solve_quadratic(
                d.dot(&d),
                2.0 * oc.dot(&d),
                oc.dot(&oc) - s.radius * s.radius,
            )
        }
        Surface::Cone(k) => {
            let axis = k.axis.as_ref();
            let d = line.direction;
            let w = line.origin - k.apex;
            let cos2 = k.half_angle.cos().powi(2);
            let da = d.dot(axis);
            let wa = w.dot(axis);
            // (w·A)² = cos²a |w|² on the double cone; keep the nappe with w·A >= 0.
            solve_quadratic(
                da * da - cos2 * d.dot(&d),
                2.0 * (da * wa - cos2 * d.dot(&w)),
                wa * wa - cos2 * w.dot(&w),
            )
            .into_iter()
            .filter(|&t| (line.at(t) - k.apex).dot(axis) >= -1e-12)
            .collect()
        }
        Surface::Torus(t) => torus_roots(t, line, t_range),
        Surface::Other(_) => return newton_hits(surface, line, t_range),
    };

    let mut hits = Vec::with_capacity(ts.len());
    for t in ts {
        if t < t_range.0 || t > t_range.1 {
            continue;
        }
        let uv = surface.parameters(&line.at(t))?;
        hits.push(SurfaceHit { t, uv });
    }
    hits.sort_by(|a, b| a.t.total_cmp(&b.t));
    hits.dedup_by(|b, a| (b.t - a.t).abs() < 1e-12);
    Ok(hits)
}

/// Roots of the torus implicit function along the line, by sampling and bisection.
fn torus_roots(torus: &Torus, line: &SightLine, t_range: (f64, f64)) -> Vec<f64> {
    const STEPS: usize = 256;
    const BISECTIONS: usize = 60;
    let (t0, t1) = t_range;
    if !(t0.is_finite() && t1.is_finite()) || t1 <= t0 {
        return Vec::new();
    }
    let f = |t: f64| torus.implicit(&line.at(t));
    let dt = (t1 - t0) / STEPS as f64;
    let mut roots = Vec::new();
    let mut a = t0;
    let mut fa = f(a);
    for i in 1..=STEPS {
        let b = t0 + dt * i as f64;
        let fb = f(b);
        if fa == 0.0 {
            roots.push(a);
        } else if fa * fb < 0.0 {
            let (mut lo, mut hi, mut flo) = (a, b, fa);
            for _ in 0..BISECTIONS {
                let mid = 0.5 * (lo + hi);
                let fm = f(mid);
                if flo * fm <= 0.0 {
                    hi = mid;
                } else {
                    lo = mid;
                    flo = fm;
                }
            }
            roots.push(0.5 * (lo + hi));
        }
        a = b;
        fa = fb;
    }
    if fa == 0.0 {
        roots.push(a);
    }
    roots
}

/// Seeded Newton on `S(u, v) - L(t) = 0` for foreign surfaces.
fn newton_hits(surface: &Surface, line: &SightLine, t_range: (f64, f64)) -> Result<Vec<SurfaceHit>> {
    const SEEDS: usize = 6;
    const ITERATIONS: usize = 40;
    let ((u0, u1), (v0, v1)) = surface.bounds();
    let dd = line.direction.norm_squared();
    if dd < 1e-300 {
        return Err(GeomError::Degenerate("zero sight direction".into()));
    }

    let mut hits: Vec<SurfaceHit> = Vec::new();
    let mut nearest_miss = f64::INFINITY;
    for i in 0..=SEEDS {
        for j in 0..=SEEDS {
            let mut uv = Point2::new(
                u0 + (u1 - u0) * i as f64 / SEEDS as f64,
                v0 + (v1 - v0) * j as f64 / SEEDS as f64,
            );
            let mut t = (surface.value(uv) - line.origin).dot(&line.direction) / dd;
            let mut residual = f64::INFINITY;
            for _ in 0..ITERATIONS {
                let (p, du, dv) = surface.d1(uv);
                let f: Vector3<f64> = p - line.at(t);
                residual = f.norm();
                if residual < 1e-11 {
                    break;
                }
                let jac = Matrix3::from_columns(&[du, dv, -line.direction]);
                let Some(step) = jac.lu().solve(&f) else {
                    break;
                };
                uv.x -= step.x;
                uv.y -= step.y;
                t -= step.z;
            }
            let inside = uv.x >= u0 - 1e-9
                && uv.x <= u1 + 1e-9
                && uv.y >= v0 - 1e-9
                && uv.y <= v1 + 1e-9
                && t >= t_range.0
                && t <= t_range.1;
            if residual < 1e-9 && inside {
                if !hits.iter().any(|h| (h.t - t).abs() < 1e-9) {
                    hits.push(SurfaceHit { t, uv });
                }
            } else if inside {
                nearest_miss = nearest_miss.min(residual);
            }
        }
    }
    if hits.is_empty() && nearest_miss < 1e-4 {
        return Err(GeomError::NonConvergent {
            iterations: ITERATIONS,
        });
    }
    hits.sort_by(|a, b| a.t.total_cmp(&b.t));
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Cone, Cylinder, Plane, Sphere};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    const ALL: (f64, f64) = (-100.0, 100.0);

    fn down_z(x: f64, y: f64) -> SightLine {
        SightLine {
            origin: Point3::new(x, y, 10.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
        }
    }

    #[test]
    fn test_plane_hit_depth() {
        let s = Surface::Plane(Plane::new(Point3::new(0.0, 0.0, 2.0), Vec3::x(), Vec3::y()).unwrap());
        let hits = intersect_sight_line(&s, &down_z(0.3, 0.4), ALL).unwrap();
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].t, 8.0);
        assert_relative_eq!(hits[0].uv.x, 0.3);
    }

    #[test]
    fn test_plane_parallel_misses() {
        let s = Surface::Plane(Plane::new(Point3::origin(), Vec3::x(), Vec3::z()).unwrap());
        let hits = intersect_sight_line(&s, &down_z(0.0, 1.0), ALL).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_sphere_two_hits_sorted() {
        let s = Surface::Sphere(Sphere::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap());
        let hits = intersect_sight_line(&s, &down_z(0.0, 0.0), ALL).unwrap();
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].t, 9.0, epsilon = 1e-12);
        assert_relative_eq!(hits[1].t, 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_range_filter() {
        let s = Surface::Sphere(Sphere::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap());
        let hits = intersect_sight_line(&s, &down_z(0.0, 0.0), (0.0, 10.0)).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_cylinder_side_view() {
        let s = Surface::Cylinder(Cylinder::new(Point3::origin(), Vec3::x(), Vec3::y(), 1.0).unwrap());
        let hits = intersect_sight_line(&s, &down_z(5.0, 0.0), ALL).unwrap();
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].t, 9.0, epsilon = 1e-12);
        // Along the axis there is nothing to hit.
        let axial = SightLine {
            origin: Point3::new(-5.0, 0.5, 0.0),
            direction: Vec3::x(),
        };
        assert!(intersect_sight_line(&s, &axial, ALL).unwrap().is_empty());
    }

    #[test]
    fn test_cone_single_nappe() {
        let s = Surface::Cone(
            Cone::new(Point3::origin(), Vec3::z(), Vec3::x(), std::f64::consts::FRAC_PI_4).unwrap(),
        );
        // Horizontal line at height 1 crosses the upper nappe twice.
        let line = SightLine {
            origin: Point3::new(-5.0, 0.0, 1.0),
            direction: Vec3::x(),
        };
        let hits = intersect_sight_line(&s, &line, ALL).unwrap();
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].t, 4.0, epsilon = 1e-9);
        // Below the apex there is only the other nappe.
        let below = SightLine {
            origin: Point3::new(-5.0, 0.0, -1.0),
            direction: Vec3::x(),
        };
        assert!(intersect_sight_line(&s, &below, ALL).unwrap().is_empty());
    }

    #[test]
    fn test_torus_four_hits() {
        let s = Surface::Torus(Torus::new(Point3::origin(), Vec3::z(), Vec3::x(), 3.0, 1.0).unwrap());
        let line = SightLine {
            origin: Point3::new(-10.0, 0.0, 0.0),
            direction: Vec3::x(),
        };
        let hits = intersect_sight_line(&s, &line, (0.0, 20.0)).unwrap();
        let ts: Vec<f64> = hits.iter().map(|h| h.t).collect();
        assert_eq!(ts.len(), 4);
        for (t, e) in ts.iter().zip([6.0, 8.0, 12.0, 14.0]) {
            assert_relative_eq!(*t, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_foreign_surface_newton() {
        #[derive(Debug)]
        struct Bump;
        impl SurfaceEvaluator for Bump {
            fn value(&self, uv: Point2) -> Point3 {
                Point3::new(uv.x, uv.y, 1.0 - 0.1 * (uv.x * uv.x + uv.y * uv.y))
            }
            fn d1(&self, uv: Point2) -> (Point3, Vec3, Vec3) {
                (
                    self.value(uv),
                    Vec3::new(1.0, 0.0, -0.2 * uv.x),
                    Vec3::new(0.0, 1.0, -0.2 * uv.y),
                )
            }
            fn bounds(&self) -> ((f64, f64), (f64, f64)) {
                ((-1.0, 1.0), (-1.0, 1.0))
            }
        }
        let s = Surface::Other(Arc::new(Bump));
        let hits = intersect_sight_line(&s, &down_z(0.5, 0.0), ALL).unwrap();
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].t, 10.0 - (1.0 - 0.025), epsilon = 1e-8);
    }
}
