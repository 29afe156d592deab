//! Interferences: crossings of an edge with the projected boundary of a face.
//!
//! Both curves are sampled into projected polylines, segment pairs are
//! intersected, and each crossing is refined with Newton iteration on the
//! exact projected curves. Crossings that fail to refine are kept as
//! *rejected* with the polyline estimate, so the classifier still samples
//! around them.

use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::{Curve, CurveEvaluator, CurveType, Point2, Point3, Vec2};

use crate::params::HlrParams;
use crate::projector::Projector;
use crate::store::{EdgeRecord, EntityStore, FaceRecord};

/// Which curve is nearer the eye at a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The edge passes in front of the boundary.
    Above,
    /// The edge passes behind the boundary.
    Below,
}

/// One crossing of an edge with a face boundary edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Interference {
    /// Drawing-plane position.
    pub point: Point2,
    /// Parameter on the edge.
    pub parameter: f64,
    /// Global index of the boundary edge.
    pub boundary_edge: usize,
    /// Parameter on the boundary edge.
    pub boundary_parameter: f64,
    /// Refinement failed; `parameter` is the polyline estimate.
    pub rejected: bool,
    /// Depth order at a rejected crossing. Reported in diagnostics only:
    /// the piece holding a rejected crossing is classified along the exact
    /// sight-line path instead.
    pub side: Option<Side>,
}

/// All crossings of one (edge, face) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterferenceReport {
    /// Crossings sorted by edge parameter.
    pub interferences: Vec<Interference>,
    /// Crossings dropped because both curves meet at a shared vertex.
    pub suppressed: usize,
}

impl InterferenceReport {
    /// Refined crossings.
    pub fn accepted(&self) -> impl Iterator<Item = &Interference> {
        self.interferences.iter().filter(|i| !i.rejected)
    }

    /// Crossings that failed to refine.
    pub fn rejected(&self) -> impl Iterator<Item = &Interference> {
        self.interferences.iter().filter(|i| i.rejected)
    }

    /// Whether a rejected crossing falls in `[u0, u1]`.
    pub fn has_rejected_in(&self, u0: f64, u1: f64) -> bool {
        self.rejected().any(|i| i.parameter >= u0 && i.parameter <= u1)
    }
}

/// Crossings of `edge` with the boundary of `face`.
///
/// The edge itself is never intersected with its own curve, and boundary
/// edges that project to a point contribute nothing.
pub fn compute_interferences(
    store: &EntityStore,
    edge_index: usize,
    edge: &EdgeRecord,
    face: &FaceRecord,
    projector: &Projector,
) -> InterferenceReport {
    let params = store.params();
    let mut report = InterferenceReport::default();
    if edge.flags.cut {
        return report;
    }
    let tol = params.linear_tolerance;
    let edge_line = Polyline::new(&edge.curve, projector, params.edge_samples);

    for b in face.boundary_edges() {
        if b == edge_index {
            continue;
        }
        let Some(boundary) = store.edge(b) else {
            continue;
        };
        if boundary.flags.cut || !edge.bbox.overlaps_2d(&boundary.bbox, tol) {
            continue;
        }
        let boundary_line = Polyline::new(&boundary.curve, projector, params.edge_samples);
        for i in 0..edge_line.segments() {
            for j in 0..boundary_line.segments() {
                let (a0, a1) = (edge_line.points[i], edge_line.points[i + 1]);
                let (b0, b1) = (boundary_line.points[j], boundary_line.points[j + 1]);
                let Some(crossing) = segment_crossing(&a0, &a1, &b0, &b1, tol) else {
                    continue;
                };
                let candidates = match crossing {
                    Crossing::Point { s, t } => {
                        let (s, t) = (edge_line.parameter(i, s), boundary_line.parameter(j, t));
                        vec![refine_crossing(&edge.curve, &boundary.curve, projector, s, t, params)]
                    }
                    Crossing::Overlap { ends } => ends
                        .iter()
                        .map(|&(s, t)| {
                            let s = edge_line.parameter(i, s);
                            let t = boundary_line.parameter(j, t);
                            let target = projector.project(&boundary.curve.value(t));
                            let s = project_onto(&edge.curve, projector, &target, s, params);
                            Candidate {
                                s,
                                t,
                                point: target,
                                refined: true,
                            }
                        })
                        .collect(),
                };
                for c in candidates {
                    if shares_vertex(&edge.curve, c.s, &boundary.curve, c.t, tol) {
                        report.suppressed += 1;
                        continue;
                    }
                    let side = (!c.refined).then(|| {
                        let de = projector.depth(&edge.curve.value(c.s));
                        let db = projector.depth(&boundary.curve.value(c.t));
                        if de < db {
                            Side::Above
                        } else {
                            Side::Below
                        }
                    });
                    report.interferences.push(Interference {
                        point: c.point,
                        parameter: c.s,
                        boundary_edge: b,
                        boundary_parameter: c.t,
                        rejected: !c.refined,
                        side,
                    });
                }
            }
        }
    }
    dedupe(&mut report.interferences, &edge.curve, params);
    report
}

// =============================================================================
// Polylines and segments
// =============================================================================

/// Projected sample polyline of a curve.
struct Polyline {
    params: Vec<f64>,
    points: Vec<Point2>,
}

impl Polyline {
    fn new(curve: &Curve, projector: &Projector, samples: usize) -> Self {
        let n = if curve.curve_type() == CurveType::Line {
            1
        } else {
            curve.nb_samples().max(samples).max(2)
        };
        let (a, b) = (curve.first_parameter(), curve.last_parameter());
        let params: Vec<f64> = (0..=n).map(|i| a + (b - a) * i as f64 / n as f64).collect();
        let points = params
            .iter()
            .map(|&u| projector.project(&curve.value(u)))
            .collect();
        Self { params, points }
    }

    fn segments(&self) -> usize {
        self.points.len() - 1
    }

    /// Curve parameter at fraction `f` of segment `i`.
    fn parameter(&self, i: usize, f: f64) -> f64 {
        self.params[i] + f * (self.params[i + 1] - self.params[i])
    }
}

/// Intersection of two drawing-plane segments, as segment fractions.
#[derive(Debug, Clone, PartialEq)]
enum Crossing {
    Point { s: f64, t: f64 },
    Overlap { ends: [(f64, f64); 2] },
}

fn cross2(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

fn segment_crossing(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2, tol: f64) -> Option<Crossing> {
    let r = a1 - a0;
    let s = b1 - b0;
    let (lr, ls) = (r.norm(), s.norm());
    if lr <= tol || ls <= tol {
        return None;
    }
    let q = b0 - a0;
    let denom = cross2(&r, &s);

    if denom.abs() <= 1e-12 * lr * ls {
        if cross2(&r, &q).abs() / lr > tol {
            return None;
        }
        // Collinear: overlap range on the first segment.
        let fa = |p: &Point2| (p - a0).dot(&r) / (lr * lr);
        let fb = |p: Point2| (p - b0).dot(&s) / (ls * ls);
        let (t0, t1) = (fa(b0), fa(b1));
        let lo = t0.min(t1).max(0.0);
        let hi = t0.max(t1).min(1.0);
        if lo > hi + tol / lr {
            return None;
        }
        let hi = hi.max(lo);
        let at = |f: f64| (f, fb(a0 + f * r).clamp(0.0, 1.0));
        return Some(Crossing::Overlap {
            ends: [at(lo), at(hi)],
        });
    }

    let fs = cross2(&q, &s) / denom;
    let ft = cross2(&q, &r) / denom;
    let (ea, eb) = (tol / lr, tol / ls);
    if fs < -ea || fs > 1.0 + ea || ft < -eb || ft > 1.0 + eb {
        return None;
    }
    Some(Crossing::Point {
        s: fs.clamp(0.0, 1.0),
        t: ft.clamp(0.0, 1.0),
    })
}

// =============================================================================
// Refinement
// =============================================================================

struct Candidate {
    s: f64,
    t: f64,
    point: Point2,
    refined: bool,
}

/// Newton iteration on `Q_e(s) - Q_b(t) = 0` in the drawing plane.
fn refine_crossing(
    edge: &Curve,
    boundary: &Curve,
    projector: &Projector,
    s0: f64,
    t0: f64,
    params: &HlrParams,
) -> Candidate {
    let tol = params.linear_tolerance;
    let (ea, eb) = (edge.first_parameter(), edge.last_parameter());
    let (ba, bb) = (boundary.first_parameter(), boundary.last_parameter());
    let (mut s, mut t) = (s0, t0);

    for _ in 0..params.max_newton_iterations.max(1) {
        let (pe, de) = edge.d1(s);
        let (qe, dqe) = projector.project_d1(&pe, &de);
        let (pb, db) = boundary.d1(t);
        let (qb, dqb) = projector.project_d1(&pb, &db);
        let f = qe - qb;
        if f.norm() <= 0.1 * tol {
            return Candidate {
                s,
                t,
                point: qe,
                refined: true,
            };
        }
        let jac = Matrix2::new(dqe.x, -dqb.x, dqe.y, -dqb.y);
        if jac.determinant().abs() <= 1e-14 * dqe.norm() * dqb.norm() {
            break;
        }
        let Some(inv) = jac.try_inverse() else {
            break;
        };
        let step = inv * f;
        s = (s - step.x).clamp(ea, eb);
        t = (t - step.y).clamp(ba, bb);
    }

    let qe = projector.project(&edge.value(s));
    let qb = projector.project(&boundary.value(t));
    if (qe - qb).norm() <= tol {
        Candidate {
            s,
            t,
            point: qe,
            refined: true,
        }
    } else {
        Candidate {
            s: s0,
            t: t0,
            point: projector.project(&edge.value(s0)),
            refined: false,
        }
    }
}

/// Parameter of the point of `curve` whose projection is nearest `target`.
fn project_onto(
    curve: &Curve,
    projector: &Projector,
    target: &Point2,
    s0: f64,
    params: &HlrParams,
) -> f64 {
    let (a, b) = (curve.first_parameter(), curve.last_parameter());
    let mut s = s0;
    for _ in 0..params.max_newton_iterations {
        let (p, d) = curve.d1(s);
        let (q, dq) = projector.project_d1(&p, &d);
        let len2 = dq.norm_squared();
        if len2 <= 1e-300 {
            break;
        }
        let step = (q - target).dot(&dq) / len2;
        s = (s - step).clamp(a, b);
        if step.abs() <= params.parametric_tolerance {
            break;
        }
    }
    s
}

/// Both curves end at the crossing and meet there in 3D.
fn shares_vertex(edge: &Curve, s: f64, boundary: &Curve, t: f64, tol: f64) -> bool {
    let p = edge.value(s);
    let q = boundary.value(t);
    if (p - q).norm() > tol {
        return false;
    }
    let at_end = |c: &Curve, x: Point3| {
        (c.value(c.first_parameter()) - x).norm() <= tol
            || (c.value(c.last_parameter()) - x).norm() <= tol
    };
    at_end(edge, p) && at_end(boundary, q)
}

/// Sort by parameter and collapse crossings at the same edge point.
fn dedupe(list: &mut Vec<Interference>, curve: &Curve, params: &HlrParams) {
    list.sort_by(|a, b| {
        a.parameter
            .total_cmp(&b.parameter)
            .then(a.rejected.cmp(&b.rejected))
    });
    let mut out: Vec<Interference> = Vec::with_capacity(list.len());
    for i in list.drain(..) {
        if let Some(last) = out.last_mut() {
            let close = (i.parameter - last.parameter).abs() <= params.parametric_tolerance
                || (curve.value(i.parameter) - curve.value(last.parameter)).norm()
                    <= params.linear_tolerance;
            if close {
                if last.rejected && !i.rejected {
                    *last = i;
                }
                continue;
            }
        }
        out.push(i);
    }
    *list = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vcad_kernel_hlr_geom::{Circle, Vec3};

    fn top() -> Projector {
        Projector::from_view(crate::ViewDirection::Top).unwrap()
    }

    #[test]
    fn test_segment_crossing_point() {
        let c = segment_crossing(
            &Point2::new(0.0, 0.0),
            &Point2::new(2.0, 0.0),
            &Point2::new(1.0, -1.0),
            &Point2::new(1.0, 1.0),
            1e-9,
        );
        assert_eq!(c, Some(Crossing::Point { s: 0.5, t: 0.5 }));
    }

    #[test]
    fn test_segment_crossing_overlap() {
        let c = segment_crossing(
            &Point2::new(0.0, 0.0),
            &Point2::new(2.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(3.0, 0.0),
            1e-9,
        );
        let Some(Crossing::Overlap { ends }) = c else {
            panic!("expected overlap, got {c:?}");
        };
        assert_relative_eq!(ends[0].0, 0.5);
        assert_relative_eq!(ends[0].1, 0.0);
        assert_relative_eq!(ends[1].0, 1.0);
        assert_relative_eq!(ends[1].1, 0.5);
    }

    #[test]
    fn test_parallel_disjoint_segments() {
        let c = segment_crossing(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(0.0, 1.0),
            &Point2::new(1.0, 1.0),
            1e-9,
        );
        assert!(c.is_none());
    }

    #[test]
    fn test_refine_circle_line_crossing() {
        let proj = top();
        let circle = Curve::full_circle(
            Circle::new(Point3::origin(), Vec3::z(), Vec3::x(), 1.0).unwrap(),
        );
        let line = Curve::segment(Point3::new(0.5, -2.0, 3.0), Point3::new(0.5, 2.0, 3.0)).unwrap();
        // Rough start near u = π/3, crossing at y = √3/2.
        let c = refine_crossing(&circle, &line, &proj, 1.0, 2.9, &HlrParams::default());
        assert!(c.refined);
        assert_relative_eq!(c.s, std::f64::consts::FRAC_PI_3, epsilon = 1e-9);
        assert_relative_eq!(c.point.y, 3f64.sqrt() / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_refine_parallel_lines_rejected() {
        let proj = top();
        let a = Curve::segment(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)).unwrap();
        let b = Curve::segment(Point3::new(0.0, 0.5, 0.0), Point3::new(1.0, 0.5, 0.0)).unwrap();
        let c = refine_crossing(&a, &b, &proj, 0.5, 0.5, &HlrParams::default());
        assert!(!c.refined);
        assert_eq!(c.s, 0.5);
    }

    #[test]
    fn test_shared_vertex_detection() {
        let a = Curve::segment(Point3::new(1.0, 1.0, 0.0), Point3::new(2.0, 2.0, 0.0)).unwrap();
        let b = Curve::segment(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(shares_vertex(&a, 0.0, &b, 1.0, 1e-6));
        // Same drawing point, different depth.
        let c = Curve::segment(Point3::new(1.0, 0.0, 5.0), Point3::new(1.0, 1.0, 5.0)).unwrap();
        assert!(!shares_vertex(&a, 0.0, &c, 1.0, 1e-6));
    }

    #[test]
    fn test_dedupe_prefers_refined() {
        let curve = Curve::segment(Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap();
        let make = |u: f64, rejected: bool| Interference {
            point: Point2::new(u, 0.0),
            parameter: u,
            boundary_edge: 0,
            boundary_parameter: 0.0,
            rejected,
            side: None,
        };
        let mut list = vec![make(0.5, true), make(0.2, false), make(0.5, false)];
        dedupe(&mut list, &curve, &HlrParams::default());
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|i| !i.rejected));
    }
}
