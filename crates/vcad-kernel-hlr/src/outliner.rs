//! Synthesized edges: silhouettes of curved faces and isoparametric lines.
//!
//! Silhouettes depend on the projector and are rebuilt on every update;
//! isolines are fixed at load time. Both are clipped to the face domain.

use vcad_kernel_hlr_geom::{
    any_perpendicular, solve_trig, Circle, Curve, CurveEvaluator, CurveGeometry, DomainState,
    FaceDomain, Line, Point3, Surface, SurfaceEvaluator, Vec3,
};

use crate::projector::Projector;
use crate::shape::Orientation;

/// Samples used to find where a synthesized curve leaves the face.
const CLIP_SAMPLES: usize = 64;
/// Bisection steps when refining a clip boundary.
const CLIP_BISECTIONS: usize = 40;
/// Parameter bounds at or beyond this magnitude are treated as infinite.
const UNBOUNDED: f64 = 1e9;

/// A silhouette of one face for the current projector.
#[derive(Debug, Clone)]
pub struct Outline {
    /// Trimmed silhouette curve.
    pub curve: Curve,
    /// Orientation that keeps the face on the left in the drawing.
    pub orientation: Orientation,
}

/// Silhouettes of a face: the curves where the surface turns away from the eye.
///
/// Cylinders, cones and spheres are handled analytically. Planes have no
/// silhouette; tori and foreign surfaces are not outlined.
pub fn outlines(surface: &Surface, domain: &FaceDomain, projector: &Projector) -> Vec<Outline> {
    let (lo, hi) = domain.uv_bounds();
    let (vmin, vmax) = (lo.y, hi.y);
    let mut out = Vec::new();
    match surface {
        Surface::Cylinder(c) => {
            if vmin.abs() >= UNBOUNDED || vmax.abs() >= UNBOUNDED {
                return out;
            }
            let (a, b, k) = match projector.eye() {
                None => {
                    let d = projector.view_direction();
                    (c.ref_dir.dot(&d), c.y_dir().dot(&d), 0.0)
                }
                Some(eye) => {
                    let w = c.center - eye;
                    (c.ref_dir.dot(&w), c.y_dir().dot(&w), -c.radius)
                }
            };
            for u in solve_trig(a, b, k) {
                let origin = c.center + c.radius * c.radial(u);
                let Ok(line) = Line::new(origin, c.axis.into_inner()) else {
                    continue;
                };
                for curve in clip(CurveGeometry::Line(line), (vmin, vmax), surface, domain, false) {
                    let mid = curve.value(0.5 * (curve.first_parameter() + curve.last_parameter()));
                    let axis_point = c.center + (mid - c.center).dot(c.axis.as_ref()) * c.axis.as_ref();
                    out.push(oriented(curve, &axis_point, projector));
                }
            }
        }
        Surface::Cone(c) => {
            let vmin = vmin.max(0.0);
            if vmax.abs() >= UNBOUNDED || vmax <= vmin {
                return out;
            }
            let t = c.half_angle.tan();
            let w = match projector.eye() {
                None => projector.view_direction(),
                Some(eye) => c.apex - eye,
            };
            for u in solve_trig(c.ref_dir.dot(&w), c.y_dir().dot(&w), t * c.axis.dot(&w)) {
                let Ok(line) = Line::new(c.apex, c.generator(u)) else {
                    continue;
                };
                for curve in clip(CurveGeometry::Line(line), (vmin, vmax), surface, domain, false) {
                    let mid = curve.value(0.5 * (curve.first_parameter() + curve.last_parameter()));
                    let axis_point = c.apex + (mid - c.apex).dot(c.axis.as_ref()) * c.axis.as_ref();
                    out.push(oriented(curve, &axis_point, projector));
                }
            }
        }
        Surface::Sphere(s) => {
            let circle = match projector.eye() {
                None => {
                    let d = projector.view_direction();
                    Circle::new(s.center, d, any_perpendicular(&d).into_inner(), s.radius)
                }
                Some(eye) => {
                    let to_eye = eye - s.center;
                    let dist = to_eye.norm();
                    if dist <= s.radius * (1.0 + 1e-9) {
                        return out;
                    }
                    let e = to_eye / dist;
                    let center = s.center + (s.radius * s.radius / dist) * e;
                    let radius = s.radius * (1.0 - (s.radius / dist).powi(2)).sqrt();
                    Circle::new(center, e, any_perpendicular(&e).into_inner(), radius)
                }
            };
            let Ok(circle) = circle else {
                return out;
            };
            let range = (0.0, std::f64::consts::TAU);
            for curve in clip(CurveGeometry::Circle(circle), range, surface, domain, true) {
                out.push(oriented(curve, &s.center, projector));
            }
        }
        Surface::Plane(_) | Surface::Torus(_) | Surface::Other(_) => {}
    }
    tracing::trace!(count = out.len(), "outlines generated");
    out
}

/// Orient an outline so the projected `inside` point lies on its left.
fn oriented(curve: Curve, inside: &Point3, projector: &Projector) -> Outline {
    let mid = 0.5 * (curve.first_parameter() + curve.last_parameter());
    let (p, d) = curve.d1(mid);
    let (q, dq) = projector.project_d1(&p, &d);
    let to_inside = projector.project(inside) - q;
    let side = (dq.x * to_inside.y - dq.y * to_inside.x) * projector.orientation_sign();
    let orientation = if side >= 0.0 {
        Orientation::Forward
    } else {
        Orientation::Reversed
    };
    Outline { curve, orientation }
}

/// `count` isolines per parameter direction, clipped to the face.
pub fn iso_lines(surface: &Surface, domain: &FaceDomain, count: usize) -> Vec<Curve> {
    if count == 0 {
        return Vec::new();
    }
    let (lo, hi) = domain.uv_bounds();
    if [lo.x, lo.y, hi.x, hi.y].iter().any(|b| !b.is_finite() || b.abs() >= UNBOUNDED) {
        return Vec::new();
    }
    let mut out = Vec::new();
    for i in 0..count {
        let f = (i + 1) as f64 / (count + 1) as f64;
        let u = lo.x + f * (hi.x - lo.x);
        let v = lo.y + f * (hi.y - lo.y);
        if let Some((geometry, closed)) = u_iso(surface, u) {
            out.extend(clip(geometry, (lo.y, hi.y), surface, domain, closed));
        }
        if let Some((geometry, closed)) = v_iso(surface, v) {
            out.extend(clip(geometry, (lo.x, hi.x), surface, domain, closed));
        }
    }
    out
}

/// Curve of constant `u`, parameterized by `v`.
fn u_iso(surface: &Surface, u: f64) -> Option<(CurveGeometry, bool)> {
    let geometry = match surface {
        Surface::Plane(p) => CurveGeometry::Line(
            Line::new(p.origin + u * p.x_dir.as_ref(), p.y_dir.into_inner()).ok()?,
        ),
        Surface::Cylinder(c) => CurveGeometry::Line(
            Line::new(c.center + c.radius * c.radial(u), c.axis.into_inner()).ok()?,
        ),
        Surface::Cone(c) => CurveGeometry::Line(Line::new(c.apex, c.generator(u)).ok()?),
        Surface::Sphere(s) => {
            let r = s.radial(u);
            CurveGeometry::Circle(Circle::new(s.center, r.cross(s.axis.as_ref()), r, s.radius).ok()?)
        }
        Surface::Torus(t) => {
            let r = t.radial(u);
            let center = t.center + t.major_radius * r;
            CurveGeometry::Circle(Circle::new(center, r.cross(t.axis.as_ref()), r, t.minor_radius).ok()?)
        }
        Surface::Other(_) => return None,
    };
    let closed = matches!(surface, Surface::Torus(_));
    Some((geometry, closed))
}

/// Curve of constant `v`, parameterized by `u`.
fn v_iso(surface: &Surface, v: f64) -> Option<(CurveGeometry, bool)> {
    let geometry = match surface {
        Surface::Plane(p) => CurveGeometry::Line(
            Line::new(p.origin + v * p.y_dir.as_ref(), p.x_dir.into_inner()).ok()?,
        ),
        Surface::Cylinder(c) => CurveGeometry::Circle(
            Circle::new(c.center + v * c.axis.as_ref(), c.axis.into_inner(), c.ref_dir.into_inner(), c.radius)
                .ok()?,
        ),
        Surface::Cone(c) => {
            if v <= 0.0 {
                return None;
            }
            let (sa, ca) = c.half_angle.sin_cos();
            CurveGeometry::Circle(
                Circle::new(
                    c.apex + v * ca * c.axis.as_ref(),
                    c.axis.into_inner(),
                    c.ref_dir.into_inner(),
                    v * sa,
                )
                .ok()?,
            )
        }
        Surface::Sphere(s) => {
            let (sv, cv) = v.sin_cos();
            if cv < 1e-9 {
                return None;
            }
            CurveGeometry::Circle(
                Circle::new(
                    s.center + s.radius * sv * s.axis.as_ref(),
                    s.axis.into_inner(),
                    s.ref_dir.into_inner(),
                    s.radius * cv,
                )
                .ok()?,
            )
        }
        Surface::Torus(t) => {
            let (sv, cv) = v.sin_cos();
            CurveGeometry::Circle(
                Circle::new(
                    t.center + t.minor_radius * sv * t.axis.as_ref(),
                    t.axis.into_inner(),
                    t.ref_dir.into_inner(),
                    t.major_radius + t.minor_radius * cv,
                )
                .ok()?,
            )
        }
        Surface::Other(_) => return None,
    };
    let closed = !matches!(surface, Surface::Plane(_));
    Some((geometry, closed))
}

/// Pieces of `geometry` over `range` that lie on the face.
///
/// `closed` curves whose first and last pieces meet across the range end
/// are joined into one piece running past the end.
fn clip(
    geometry: CurveGeometry,
    range: (f64, f64),
    surface: &Surface,
    domain: &FaceDomain,
    closed: bool,
) -> Vec<Curve> {
    let (a, b) = range;
    let Ok(full) = Curve::new(geometry, a, b) else {
        return Vec::new();
    };
    let inside = |u: f64| {
        matches!(
            domain.classify_point(surface, &full.value(u)),
            Ok(DomainState::In | DomainState::On)
        )
    };
    let params: Vec<f64> = (0..=CLIP_SAMPLES)
        .map(|i| a + (b - a) * i as f64 / CLIP_SAMPLES as f64)
        .collect();
    let flags: Vec<bool> = params.iter().map(|&u| inside(u)).collect();

    let refine = |mut lo: f64, mut hi: f64| {
        // `lo` is inside, `hi` outside; they may be in either order.
        for _ in 0..CLIP_BISECTIONS {
            let mid = 0.5 * (lo + hi);
            if inside(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    };

    let mut runs: Vec<(f64, f64)> = Vec::new();
    let mut start: Option<f64> = None;
    for i in 0..params.len() {
        match (flags[i], start) {
            (true, None) => {
                start = Some(if i == 0 {
                    params[0]
                } else {
                    refine(params[i], params[i - 1])
                });
            }
            (false, Some(s)) => {
                runs.push((s, refine(params[i - 1], params[i])));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, b));
    }

    if closed && runs.len() > 1 {
        let first = runs[0];
        let last = runs[runs.len() - 1];
        if first.0 <= a && last.1 >= b {
            runs.pop();
            runs[0] = (last.0, first.1 + (b - a));
        }
    }

    runs.into_iter()
        .filter(|(s, e)| e - s > 1e-9)
        .filter_map(|(s, e)| full.trimmed(s, e).ok())
        .collect()
}

/// Normal of `surface` at `p`, flipped for reversed faces.
pub fn face_normal(surface: &Surface, orientation: Orientation, p: &Point3) -> Option<Vec3> {
    let uv = surface.parameters(p).ok()?;
    let n = surface.normal(uv).ok()?;
    Some(orientation.sign() * n.into_inner())
}
