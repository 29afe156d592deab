//! Visibility classification of an edge against one hiding face.
//!
//! The edge is cut at its interferences with the face boundary. Each piece
//! is then sampled; a piece whose samples disagree is bisected down to the
//! transition, so the result is a sorted partition of the edge range into
//! intervals that are [`State::In`] (hidden by the face), [`State::On`]
//! (lying on it) or [`State::Out`].

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::{
    distance_to_ring, intersect_sight_line, point_in_polygon, CurveEvaluator, DomainState, Point3,
};

use crate::interference::InterferenceReport;
use crate::params::HlrParams;
use crate::projector::Projector;
use crate::store::{EdgeRecord, FaceRecord};

/// Visibility of a point or interval with respect to one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum State {
    /// Not covered by the face.
    Out,
    /// Covered and behind the face.
    In,
    /// On the face itself.
    On,
}

impl State {
    /// Whether the state draws as visible.
    pub fn is_visible(self) -> bool {
        !matches!(self, State::In)
    }
}

/// Position of a projected point relative to the projected face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Strictly inside.
    Inside,
    /// On the projected boundary.
    Boundary,
    /// Not covered.
    Outside,
}

/// Result of classifying one 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointClass {
    /// Decided state.
    pub state: State,
    /// A numeric failure left the state undecided; `state` is then `On`.
    pub ambiguous: bool,
}

impl PointClass {
    fn of(state: State) -> Self {
        Self {
            state,
            ambiguous: false,
        }
    }
}

/// Point-versus-face queries the classifier relies on.
pub trait FaceDomainTest {
    /// Where the projection of `p` falls with respect to the projected face.
    fn coverage(&self, p: &Point3) -> Coverage;

    /// Full depth-aware classification of `p`.
    fn classify_point(&self, p: &Point3) -> PointClass;
}

// =============================================================================
// Face coverage
// =============================================================================

/// [`FaceDomainTest`] backed by a face record and a projector.
///
/// Simple faces answer coverage with their projected boundary polygon;
/// the others fall back to the projected box and let the sight line
/// decide.
pub struct FaceCoverage<'a> {
    face: &'a FaceRecord,
    projector: &'a Projector,
    tol: f64,
}

impl<'a> FaceCoverage<'a> {
    /// Coverage tests for `face` under `projector`.
    pub fn new(face: &'a FaceRecord, projector: &'a Projector, tol: f64) -> Self {
        Self {
            face,
            projector,
            tol,
        }
    }
}

impl FaceDomainTest for FaceCoverage<'_> {
    fn coverage(&self, p: &Point3) -> Coverage {
        let q = self.projector.project(p);
        if !self.face.bbox.contains_2d(&q, self.tol) {
            return Coverage::Outside;
        }
        if !self.face.flags.simple || self.face.projected.is_empty() {
            return Coverage::Inside;
        }
        if self
            .face
            .projected
            .iter()
            .any(|ring| distance_to_ring(&q, ring) <= self.tol)
        {
            return Coverage::Boundary;
        }
        let inside = self
            .face
            .projected
            .iter()
            .filter(|ring| point_in_polygon(&q, ring))
            .count();
        if inside % 2 == 1 {
            Coverage::Inside
        } else {
            Coverage::Outside
        }
    }

    fn classify_point(&self, p: &Point3) -> PointClass {
        let coverage = self.coverage(p);
        if coverage == Coverage::Outside {
            return PointClass::of(State::Out);
        }
        let (q, z) = self.projector.project_with_depth(p);
        let line = self.projector.sight_line(&q);
        let bx = &self.face.bbox;
        let range = (bx.depth_min - 10.0 * self.tol, bx.depth_max + 10.0 * self.tol);
        let hits = match intersect_sight_line(&self.face.surface, &line, range) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::trace!(%err, "sight line intersection failed");
                return PointClass {
                    state: State::On,
                    ambiguous: true,
                };
            }
        };

        let mut in_front = false;
        let mut level: Option<DomainState> = None;
        let mut kept = 0usize;
        for hit in &hits {
            let mut domain = self.face.domain.classify(hit.uv);
            if domain == DomainState::Out {
                continue;
            }
            if coverage == Coverage::Boundary {
                domain = DomainState::On;
            }
            kept += 1;
            if hit.t < z - self.tol {
                in_front = true;
            } else if (hit.t - z).abs() <= self.tol && level != Some(DomainState::In) {
                level = Some(domain);
            }
        }

        if in_front {
            return PointClass::of(State::In);
        }
        match level {
            Some(DomainState::In) => PointClass::of(State::On),
            Some(_) => PointClass::of(State::Out),
            // The polygon says covered but no surface hit lies in the face.
            None if kept == 0 && self.face.flags.simple && coverage == Coverage::Inside => {
                PointClass {
                    state: State::On,
                    ambiguous: true,
                }
            }
            None => PointClass::of(State::Out),
        }
    }
}

// =============================================================================
// Verdicts
// =============================================================================

/// Classification of an edge against one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceVerdict {
    /// Global face index.
    pub face: usize,
    /// Interval breaks, from the first to the last edge parameter.
    pub breaks: Vec<f64>,
    /// State of each interval; one fewer than `breaks`.
    pub states: Vec<State>,
    /// Whether each interval came from an undecided classification.
    pub ambiguous: Vec<bool>,
}

impl FaceVerdict {
    /// One interval over `[first, last]`.
    pub fn uniform(face: usize, first: f64, last: f64, state: State) -> Self {
        Self {
            face,
            breaks: vec![first, last],
            states: vec![state],
            ambiguous: vec![false],
        }
    }

    /// State at parameter `u` and whether it was undecided.
    pub fn state_at(&self, u: f64) -> (State, bool) {
        let n = self.states.len();
        if n == 0 {
            return (State::Out, false);
        }
        let k = self
            .breaks
            .partition_point(|&b| b <= u)
            .saturating_sub(1)
            .min(n - 1);
        (self.states[k], self.ambiguous[k])
    }

    /// Breaks strictly between the edge ends.
    pub fn interior_breaks(&self) -> &[f64] {
        let n = self.breaks.len();
        if n <= 2 {
            &[]
        } else {
            &self.breaks[1..n - 1]
        }
    }

    /// Whether the face hides any part of the edge.
    pub fn hides(&self) -> bool {
        self.states.contains(&State::In)
    }

    /// Number of undecided intervals.
    pub fn ambiguous_count(&self) -> usize {
        self.ambiguous.iter().filter(|&&a| a).count()
    }
}

/// Length of the curve piece `[u0, u1]`, approximated by two chords.
pub(crate) fn piece_length(curve: &dyn CurveEvaluator, u0: f64, u1: f64) -> f64 {
    let (a, m, b) = (
        curve.value(u0),
        curve.value(0.5 * (u0 + u1)),
        curve.value(u1),
    );
    (m - a).norm() + (b - m).norm()
}

// =============================================================================
// Classification
// =============================================================================

/// Classify `edge` against the face behind `coverage`.
///
/// `simple` enables the polygon shortcut: a piece with a sample outside the
/// projected boundary is wholly outside, unless an unrefined crossing falls
/// in it.
pub fn classify_edge(
    edge: &EdgeRecord,
    face: usize,
    coverage: &dyn FaceDomainTest,
    report: &InterferenceReport,
    simple: bool,
    params: &HlrParams,
) -> FaceVerdict {
    let curve = &edge.curve;
    let (first, last) = edge.range();

    if edge.flags.cut {
        let mid = 0.5 * (first + last);
        let a = coverage.classify_point(&curve.value(first));
        let b = coverage.classify_point(&curve.value(last));
        return FaceVerdict {
            face,
            breaks: vec![first, mid, last],
            states: vec![a.state, b.state],
            ambiguous: vec![a.ambiguous, b.ambiguous],
        };
    }

    let span = last - first;
    let ptol = params.parametric_tolerance * span.abs().max(1.0);
    let mut cuts = vec![first];
    for i in report.accepted() {
        if i.parameter > first + ptol && i.parameter < last - ptol {
            if let Some(&prev) = cuts.last() {
                if i.parameter - prev > ptol {
                    cuts.push(i.parameter);
                }
            }
        }
    }
    cuts.push(last);

    let mut pieces = Pieces::default();
    for w in cuts.windows(2) {
        let (u0, u1) = (w[0], w[1]);
        if simple
            && !report.has_rejected_in(u0, u1)
            && outside_somewhere(curve, u0, u1, coverage, params)
        {
            pieces.push(u0, State::Out, false);
            continue;
        }
        resolve(curve, u0, u1, params.refine_depth, coverage, params, &mut pieces);
    }
    pieces.finish(face, last, curve, params.min_interval_length)
}

/// Whether any interior sample of `[u0, u1]` projects outside the face.
fn outside_somewhere(
    curve: &dyn CurveEvaluator,
    u0: f64,
    u1: f64,
    coverage: &dyn FaceDomainTest,
    params: &HlrParams,
) -> bool {
    let n = params.classify_samples.max(1);
    (0..n).any(|k| {
        let u = u0 + (u1 - u0) * (k + 1) as f64 / (n + 1) as f64;
        coverage.coverage(&curve.value(u)) == Coverage::Outside
    })
}

/// Sample `[u0, u1]` and split it at state transitions, `depth` levels deep.
fn resolve(
    curve: &dyn CurveEvaluator,
    u0: f64,
    u1: f64,
    depth: usize,
    coverage: &dyn FaceDomainTest,
    params: &HlrParams,
    out: &mut Pieces,
) {
    let m = params.classify_samples.max(3);
    let samples: Vec<(f64, PointClass)> = (0..m)
        .map(|k| {
            let u = u0 + (u1 - u0) * (k + 1) as f64 / (m + 1) as f64;
            (u, coverage.classify_point(&curve.value(u)))
        })
        .collect();

    if let Some((_, c)) = samples.iter().find(|(_, c)| c.ambiguous) {
        out.push(u0, c.state, true);
        return;
    }
    let first = samples[0].1.state;
    let Some(k) = samples.windows(2).position(|w| w[0].1.state != w[1].1.state) else {
        out.push(u0, first, false);
        return;
    };
    if depth == 0 {
        out.push(u0, samples[m / 2].1.state, false);
        return;
    }
    let (lo, hi) = (samples[k], samples[k + 1]);
    let x = bisect(curve, lo.0, lo.1.state, hi.0, coverage, params.bisection_iterations);
    resolve(curve, u0, x, depth - 1, coverage, params, out);
    resolve(curve, x, u1, depth - 1, coverage, params, out);
}

/// Transition parameter between `lo` (in state `s_lo`) and `hi`.
fn bisect(
    curve: &dyn CurveEvaluator,
    mut lo: f64,
    s_lo: State,
    mut hi: f64,
    coverage: &dyn FaceDomainTest,
    iterations: usize,
) -> f64 {
    for _ in 0..iterations {
        let mid = 0.5 * (lo + hi);
        if coverage.classify_point(&curve.value(mid)).state == s_lo {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Interval accumulator: starts with their state, closed by [`Pieces::finish`].
#[derive(Default)]
struct Pieces {
    starts: Vec<f64>,
    states: Vec<State>,
    ambiguous: Vec<bool>,
}

impl Pieces {
    fn push(&mut self, start: f64, state: State, ambiguous: bool) {
        self.starts.push(start);
        self.states.push(state);
        self.ambiguous.push(ambiguous);
    }

    fn finish(self, face: usize, last: f64, curve: &dyn CurveEvaluator, min_len: f64) -> FaceVerdict {
        let mut breaks = self.starts;
        breaks.push(last);
        let mut v = FaceVerdict {
            face,
            breaks,
            states: self.states,
            ambiguous: self.ambiguous,
        };
        merge_equal(&mut v);
        merge_short(&mut v, curve, min_len);
        v
    }
}

/// Join neighbouring intervals with the same state.
fn merge_equal(v: &mut FaceVerdict) {
    let mut k = 1;
    while k < v.states.len() {
        if v.states[k] == v.states[k - 1] {
            v.ambiguous[k - 1] |= v.ambiguous[k];
            v.states.remove(k);
            v.ambiguous.remove(k);
            v.breaks.remove(k);
        } else {
            k += 1;
        }
    }
}

/// Absorb intervals shorter than `min_len` into a neighbour.
///
/// The first interval gives way to the next; any other merges into the
/// previous one.
pub(crate) fn merge_short(v: &mut FaceVerdict, curve: &dyn CurveEvaluator, min_len: f64) {
    loop {
        if v.states.len() < 2 {
            return;
        }
        let Some(k) = (0..v.states.len())
            .find(|&k| piece_length(curve, v.breaks[k], v.breaks[k + 1]) < min_len)
        else {
            return;
        };
        if k == 0 {
            v.breaks.remove(1);
            v.states.remove(0);
            v.ambiguous.remove(0);
        } else {
            v.breaks.remove(k);
            v.states.remove(k);
            v.ambiguous.remove(k);
        }
        merge_equal(v);
    }
}
