//! Visibility areas of an edge, rebuilt from its node sequence.
//!
//! Each node where the merged state may change becomes an [`AreaLimit`] in a
//! small arena; consecutive limits bound an [`AreaInterval`]. The chain is
//! checked while it is built: the state leaving one limit must be the
//! state entering the next.

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::Point3;

use crate::classifier::State;
use crate::error::{HlrError, Result};
use crate::sequencer::{EdgeSequence, NodeKind};
use crate::shape::Orientation;

/// Index of a limit in an [`EdgeAreas`] arena.
pub type LimitId = usize;

/// One end of a visibility area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaLimit {
    /// Edge parameter.
    pub parameter: f64,
    /// 3D position.
    pub point: Point3,
    /// Origin of the node.
    pub kind: NodeKind,
    /// State entering the limit.
    pub state_before: Option<State>,
    /// State leaving the limit.
    pub state_after: Option<State>,
    /// Previous limit along the edge.
    pub prev: Option<LimitId>,
    /// Next limit along the edge.
    pub next: Option<LimitId>,
}

/// A maximal run of one state between two limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaInterval {
    /// Starting limit.
    pub start: LimitId,
    /// Ending limit.
    pub end: LimitId,
    /// First parameter.
    pub first: f64,
    /// Last parameter.
    pub last: f64,
    /// State over the run.
    pub state: State,
    /// Highest hide level in the run.
    pub level: usize,
    /// Part of the run came from an undecided classification.
    pub ambiguous: bool,
}

/// Vertex yielded by the area cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaVertex {
    /// Edge parameter.
    pub parameter: f64,
    /// 3D position.
    pub point: Point3,
    /// The vertex is an edge end rather than a visibility change.
    pub is_boundary: bool,
    /// Start of the sub-edge (`Forward`) or its end (`Reversed`), after the
    /// edge orientation is applied.
    pub orientation: Orientation,
}

/// Areas of one edge with a cursor for walking them.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAreas {
    edge: usize,
    orientation: Orientation,
    limits: Vec<AreaLimit>,
    areas: Vec<AreaInterval>,
    // Cursor.
    target: Option<State>,
    current: Option<usize>,
    vertex: usize,
}

impl EdgeAreas {
    /// Rebuild areas from a sequence.
    ///
    /// Fails with `ClassificationInconsistency` when the sequence does not
    /// start and end at edge ends, misses an interval, or two neighbouring
    /// nodes disagree on the state between them.
    pub fn reconstruct(seq: &EdgeSequence, orientation: Orientation) -> Result<Self> {
        let broken = |parameter: f64| HlrError::ClassificationInconsistency {
            edge: seq.edge,
            parameter,
        };
        let (Some(first), Some(last)) = (seq.nodes.first(), seq.nodes.last()) else {
            return Err(broken(f64::NAN));
        };
        if seq.nodes.len() < 2 || seq.intervals.len() != seq.nodes.len() - 1 {
            return Err(broken(first.parameter));
        }
        if first.kind != NodeKind::Boundary {
            return Err(broken(first.parameter));
        }
        if last.kind != NodeKind::Boundary {
            return Err(broken(last.parameter));
        }

        let mut limits: Vec<AreaLimit> = Vec::new();
        let mut areas: Vec<AreaInterval> = Vec::new();
        for (k, node) in seq.nodes.iter().enumerate() {
            if let Some(prev) = limits.last() {
                if prev.state_after != node.state_before {
                    return Err(broken(node.parameter));
                }
            }
            let is_end = k == 0 || k + 1 == seq.nodes.len();
            let changes = node.state_before != node.state_after;
            if !(is_end || changes || node.kind == NodeKind::Cut) {
                if let (Some(area), Some(interval)) = (areas.last_mut(), seq.intervals.get(k)) {
                    area.level = area.level.max(interval.level);
                    area.ambiguous |= interval.ambiguous;
                }
                continue;
            }
            let id = limits.len();
            if let Some(prev) = limits.last_mut() {
                prev.next = Some(id);
            }
            if let Some(area) = areas.last_mut() {
                area.end = id;
                area.last = node.parameter;
            }
            limits.push(AreaLimit {
                parameter: node.parameter,
                point: node.point,
                kind: node.kind,
                state_before: node.state_before,
                state_after: node.state_after,
                prev: id.checked_sub(1),
                next: None,
            });
            if let (Some(state), Some(interval)) = (node.state_after, seq.intervals.get(k)) {
                if state != interval.state {
                    return Err(broken(node.parameter));
                }
                areas.push(AreaInterval {
                    start: id,
                    end: id,
                    first: node.parameter,
                    last: node.parameter,
                    state,
                    level: interval.level,
                    ambiguous: interval.ambiguous,
                });
            }
        }
        if let Some(area) = areas.iter().find(|a| a.start == a.end) {
            return Err(broken(area.first));
        }

        Ok(Self {
            edge: seq.edge,
            orientation,
            limits,
            areas,
            target: None,
            current: None,
            vertex: 0,
        })
    }

    /// Global edge index.
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Limit by id.
    pub fn limit(&self, id: LimitId) -> Option<&AreaLimit> {
        self.limits.get(id)
    }

    /// All areas in parameter order.
    pub fn areas(&self) -> &[AreaInterval] {
        &self.areas
    }

    /// Areas in `state`.
    pub fn iter(&self, state: State) -> impl Iterator<Item = &AreaInterval> {
        self.areas.iter().filter(move |a| a.state == state)
    }

    /// Areas drawn as visible (`Out` or `On`), neighbours joined.
    pub fn visible_runs(&self) -> Vec<(f64, f64)> {
        self.runs(|s| s.is_visible())
    }

    /// Hidden areas, neighbours joined.
    pub fn hidden_runs(&self) -> Vec<(f64, f64)> {
        self.runs(|s| !s.is_visible())
    }

    fn runs(&self, keep: impl Fn(State) -> bool) -> Vec<(f64, f64)> {
        let mut runs: Vec<(f64, f64)> = Vec::new();
        for a in self.areas.iter().filter(|a| keep(a.state)) {
            match runs.last_mut() {
                Some(run) if run.1 == a.first => run.1 = a.last,
                _ => runs.push((a.first, a.last)),
            }
        }
        runs
    }

    // -------------------------------------------------------------------------
    // Cursor
    // -------------------------------------------------------------------------

    /// Position the cursor on the first area in `state`.
    pub fn builds(&mut self, state: State) {
        self.target = Some(state);
        self.current = self.areas.iter().position(|a| a.state == state);
        self.vertex = 0;
    }

    /// Whether the cursor is on an area.
    pub fn more_edges(&self) -> bool {
        self.current.is_some()
    }

    /// Advance to the next area in the cursor state.
    pub fn next_edge(&mut self) {
        let (Some(cur), Some(state)) = (self.current, self.target) else {
            return;
        };
        self.current = self.areas[cur + 1..]
            .iter()
            .position(|a| a.state == state)
            .map(|k| cur + 1 + k);
        self.vertex = 0;
    }

    /// Area under the cursor.
    pub fn current_area(&self) -> Option<&AreaInterval> {
        self.current.and_then(|i| self.areas.get(i))
    }

    /// Whether a vertex of the current area remains.
    pub fn more_vertices(&self) -> bool {
        self.current.is_some() && self.vertex < 2
    }

    /// Advance to the other end of the current area.
    pub fn next_vertex(&mut self) {
        self.vertex += 1;
    }

    /// Vertex under the cursor.
    pub fn current(&self) -> Option<AreaVertex> {
        if !self.more_vertices() {
            return None;
        }
        let area = self.current_area()?;
        let (id, orientation) = if self.vertex == 0 {
            (area.start, Orientation::Forward)
        } else {
            (area.end, Orientation::Reversed)
        };
        let limit = self.limits.get(id)?;
        let orientation = match self.orientation {
            Orientation::Forward => orientation,
            Orientation::Reversed => orientation.reversed(),
        };
        Some(AreaVertex {
            parameter: limit.parameter,
            point: limit.point,
            is_boundary: limit.kind == NodeKind::Boundary,
            orientation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{SequenceInterval, SequenceNode};

    fn node(parameter: f64, kind: NodeKind, before: Option<State>, after: Option<State>) -> SequenceNode {
        SequenceNode {
            parameter,
            point: Point3::new(parameter, 0.0, 0.0),
            kind,
            faces: Vec::new(),
            state_before: before,
            state_after: after,
        }
    }

    fn interval(state: State, level: usize) -> SequenceInterval {
        SequenceInterval {
            state,
            level,
            ambiguous: false,
        }
    }

    fn sample() -> EdgeSequence {
        use State::*;
        EdgeSequence {
            edge: 7,
            nodes: vec![
                node(0.0, NodeKind::Boundary, None, Some(Out)),
                node(0.3, NodeKind::Interference, Some(Out), Some(In)),
                node(0.5, NodeKind::Interference, Some(In), Some(In)),
                node(0.8, NodeKind::Interference, Some(In), Some(On)),
                node(1.0, NodeKind::Boundary, Some(On), None),
            ],
            intervals: vec![interval(Out, 0), interval(In, 1), interval(In, 2), interval(On, 0)],
        }
    }

    #[test]
    fn test_reconstruct_joins_equal_states() {
        let areas = EdgeAreas::reconstruct(&sample(), Orientation::Forward).unwrap();
        assert_eq!(areas.areas().len(), 3);
        let hidden: Vec<_> = areas.iter(State::In).collect();
        assert_eq!(hidden.len(), 1);
        assert_eq!((hidden[0].first, hidden[0].last), (0.3, 0.8));
        assert_eq!(hidden[0].level, 2);
        assert_eq!(areas.visible_runs(), vec![(0.0, 0.3), (0.8, 1.0)]);
        let lim = areas.limit(hidden[0].end).unwrap();
        assert_eq!(lim.prev, Some(hidden[0].start));
    }

    #[test]
    fn test_broken_chain_is_reported() {
        let mut seq = sample();
        seq.nodes[3].state_before = Some(State::Out);
        let err = EdgeAreas::reconstruct(&seq, Orientation::Forward).unwrap_err();
        assert!(matches!(
            err,
            HlrError::ClassificationInconsistency { edge: 7, parameter } if parameter == 0.8
        ));
    }

    #[test]
    fn test_missing_end_is_reported() {
        let mut seq = sample();
        seq.nodes.pop();
        seq.intervals.pop();
        assert!(EdgeAreas::reconstruct(&seq, Orientation::Forward).is_err());
    }

    #[test]
    fn test_cursor_walks_areas_and_vertices() {
        let mut areas = EdgeAreas::reconstruct(&sample(), Orientation::Forward).unwrap();
        areas.builds(State::Out);
        let mut seen = Vec::new();
        while areas.more_edges() {
            while areas.more_vertices() {
                let v = areas.current().unwrap();
                seen.push((v.parameter, v.orientation, v.is_boundary));
                areas.next_vertex();
            }
            areas.next_edge();
        }
        assert_eq!(
            seen,
            vec![
                (0.0, Orientation::Forward, true),
                (0.3, Orientation::Reversed, false),
            ]
        );
    }

    #[test]
    fn test_reversed_edge_flips_vertex_orientation() {
        let mut areas = EdgeAreas::reconstruct(&sample(), Orientation::Reversed).unwrap();
        areas.builds(State::On);
        let v = areas.current().unwrap();
        assert_eq!(v.parameter, 0.8);
        assert_eq!(v.orientation, Orientation::Reversed);
    }
}
