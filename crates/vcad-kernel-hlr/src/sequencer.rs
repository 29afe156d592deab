//! Merge per-face verdicts into one ordered node sequence per edge.
//!
//! Nodes are the edge ends, the cut point of degenerate edges and every
//! interior break of a face verdict. Between two nodes the *hide level* is
//! the number of faces hiding the interval; it is counted directly and
//! cross-checked against the level obtained by walking the transitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::{CurveEvaluator, Point3};

use crate::classifier::{piece_length, FaceVerdict, State};
use crate::params::HlrParams;
use crate::store::EdgeRecord;

/// Origin of a sequence node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Edge end.
    Boundary,
    /// Break coming from a face verdict.
    Interference,
    /// Midpoint of an edge that projects to a point.
    Cut,
}

/// One node along an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceNode {
    /// Edge parameter.
    pub parameter: f64,
    /// 3D position.
    pub point: Point3,
    /// Origin.
    pub kind: NodeKind,
    /// Faces whose verdict breaks here.
    pub faces: Vec<usize>,
    /// Merged state just before the node; `None` at the first node.
    pub state_before: Option<State>,
    /// Merged state just after the node; `None` at the last node.
    pub state_after: Option<State>,
}

/// Merged classification between two consecutive nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceInterval {
    /// `In` when hidden by any face, `On` when lying on one, else `Out`.
    pub state: State,
    /// Number of faces hiding the interval.
    pub level: usize,
    /// Some face classification was undecided here.
    pub ambiguous: bool,
}

/// Ordered nodes and intervals of one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSequence {
    /// Global edge index.
    pub edge: usize,
    /// Nodes sorted by parameter, first and last at the edge ends.
    pub nodes: Vec<SequenceNode>,
    /// One interval per consecutive node pair.
    pub intervals: Vec<SequenceInterval>,
}

/// Build the sequence of `edge` from its verdicts.
pub fn build_sequence(
    edge_index: usize,
    edge: &EdgeRecord,
    verdicts: &BTreeMap<usize, FaceVerdict>,
    params: &HlrParams,
) -> EdgeSequence {
    let curve = &edge.curve;
    let (first, last) = edge.range();
    let node = |parameter: f64, kind: NodeKind, faces: Vec<usize>| SequenceNode {
        parameter,
        point: curve.value(parameter),
        kind,
        faces,
        state_before: None,
        state_after: None,
    };

    let mut candidates = Vec::new();
    if edge.flags.cut {
        candidates.push(node(0.5 * (first + last), NodeKind::Cut, Vec::new()));
    }
    for (&face, verdict) in verdicts {
        for &u in verdict.interior_breaks() {
            candidates.push(node(u, NodeKind::Interference, vec![face]));
        }
    }
    candidates.sort_by(|a, b| a.parameter.total_cmp(&b.parameter));

    let mut nodes = vec![node(first, NodeKind::Boundary, Vec::new())];
    for c in candidates {
        merge_node(&mut nodes, c, curve, params.min_interval_length);
    }
    merge_node(
        &mut nodes,
        node(last, NodeKind::Boundary, Vec::new()),
        curve,
        params.min_interval_length,
    );

    // Direct count per interval.
    let mids: Vec<f64> = nodes
        .windows(2)
        .map(|w| 0.5 * (w[0].parameter + w[1].parameter))
        .collect();
    let mut intervals: Vec<SequenceInterval> = mids
        .iter()
        .map(|&u| {
            let mut level = 0;
            let mut on = false;
            let mut ambiguous = false;
            for verdict in verdicts.values() {
                let (state, amb) = verdict.state_at(u);
                level += usize::from(state == State::In);
                on |= state == State::On;
                ambiguous |= amb;
            }
            let state = if level > 0 {
                State::In
            } else if on {
                State::On
            } else {
                State::Out
            };
            SequenceInterval {
                state,
                level,
                ambiguous,
            }
        })
        .collect();

    // Walk: only faces breaking at a node may change the level there.
    let mut walked = intervals.first().map_or(0, |i| i.level) as i64;
    for k in 1..intervals.len() {
        for face in &nodes[k].faces {
            if let Some(v) = verdicts.get(face) {
                let before = v.state_at(mids[k - 1]).0 == State::In;
                let after = v.state_at(mids[k]).0 == State::In;
                walked += i64::from(after) - i64::from(before);
            }
        }
        let direct = intervals[k].level as i64;
        if walked != direct {
            tracing::warn!(
                edge = edge_index,
                parameter = nodes[k].parameter,
                walked,
                direct,
                "hide level walk disagrees with direct count, using direct count"
            );
            walked = direct;
        }
    }

    for (k, node) in nodes.iter_mut().enumerate() {
        node.state_before = k.checked_sub(1).map(|i| intervals[i].state);
        node.state_after = intervals.get(k).map(|i| i.state);
    }
    if intervals.is_empty() {
        intervals.push(SequenceInterval {
            state: State::Out,
            level: 0,
            ambiguous: false,
        });
    }

    EdgeSequence {
        edge: edge_index,
        nodes,
        intervals,
    }
}

/// Append `node`, folding it into the last node when the piece between
/// them is shorter than `min_len`. Edge ends win over interior nodes and
/// keep their kind when an interior node folds into them.
fn merge_node(nodes: &mut Vec<SequenceNode>, node: SequenceNode, curve: &dyn CurveEvaluator, min_len: f64) {
    let Some(last) = nodes.last_mut() else {
        nodes.push(node);
        return;
    };
    let short = node.parameter - last.parameter <= 0.0
        || piece_length(curve, last.parameter, node.parameter) < min_len;
    if !short {
        nodes.push(node);
        return;
    }
    if node.kind == NodeKind::Boundary && last.kind != NodeKind::Boundary {
        let mut faces = std::mem::take(&mut last.faces);
        *last = node;
        faces.append(&mut last.faces);
        faces.sort_unstable();
        faces.dedup();
        last.faces = faces;
    } else if node.kind == NodeKind::Boundary {
        // A degenerate edge: keep both ends.
        nodes.push(node);
    } else {
        last.faces.extend(node.faces);
        last.faces.sort_unstable();
        last.faces.dedup();
        if node.kind == NodeKind::Cut && last.kind == NodeKind::Interference {
            last.kind = NodeKind::Cut;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::ProjectedBox;
    use crate::shape::Orientation;
    use crate::store::{EdgeFlags, EdgeStatus};
    use vcad_kernel_hlr_geom::Curve;

    fn edge(len: f64) -> EdgeRecord {
        EdgeRecord {
            shape: 0,
            curve: Curve::segment(Point3::origin(), Point3::new(len, 0.0, 0.0)).unwrap(),
            vertices: None,
            orientation: Orientation::Forward,
            faces: Vec::new(),
            flags: EdgeFlags {
                selected: true,
                ..Default::default()
            },
            tolerance: 1e-6,
            bbox: ProjectedBox::empty(),
            hide_count: 0,
            status: EdgeStatus::default(),
        }
    }

    fn verdict(face: usize, breaks: &[f64], states: &[State]) -> FaceVerdict {
        FaceVerdict {
            face,
            breaks: breaks.to_vec(),
            states: states.to_vec(),
            ambiguous: vec![false; states.len()],
        }
    }

    #[test]
    fn test_no_verdicts_single_visible_interval() {
        let seq = build_sequence(0, &edge(1.0), &BTreeMap::new(), &HlrParams::default());
        assert_eq!(seq.nodes.len(), 2);
        assert_eq!(seq.intervals.len(), 1);
        assert_eq!(seq.intervals[0].state, State::Out);
        assert_eq!(seq.intervals[0].level, 0);
        assert!(seq.nodes.iter().all(|n| n.kind == NodeKind::Boundary));
    }

    #[test]
    fn test_levels_count_overlapping_faces() {
        let mut verdicts = BTreeMap::new();
        verdicts.insert(1, verdict(1, &[0.0, 0.4, 1.0], &[State::Out, State::In]));
        verdicts.insert(2, verdict(2, &[0.0, 0.6, 1.0], &[State::Out, State::In]));
        let seq = build_sequence(0, &edge(1.0), &verdicts, &HlrParams::default());
        let levels: Vec<usize> = seq.intervals.iter().map(|i| i.level).collect();
        assert_eq!(levels, vec![0, 1, 2]);
        assert_eq!(seq.nodes[1].faces, vec![1]);
        assert_eq!(seq.nodes[1].state_before, Some(State::Out));
        assert_eq!(seq.nodes[1].state_after, Some(State::In));
    }

    #[test]
    fn test_on_state_is_visible_unless_hidden() {
        let mut verdicts = BTreeMap::new();
        verdicts.insert(0, verdict(0, &[0.0, 1.0], &[State::On]));
        verdicts.insert(5, verdict(5, &[0.0, 0.5, 1.0], &[State::In, State::Out]));
        let seq = build_sequence(0, &edge(1.0), &verdicts, &HlrParams::default());
        assert_eq!(seq.intervals[0].state, State::In);
        assert_eq!(seq.intervals[1].state, State::On);
    }

    #[test]
    fn test_close_breaks_merge_and_ends_win() {
        let mut verdicts = BTreeMap::new();
        verdicts.insert(
            1,
            verdict(1, &[0.0, 0.5, 1.0 - 1e-7, 1.0], &[State::Out, State::In, State::Out]),
        );
        let seq = build_sequence(0, &edge(1.0), &verdicts, &HlrParams::default());
        assert_eq!(seq.nodes.len(), 3);
        assert_eq!(seq.nodes[2].kind, NodeKind::Boundary);
        assert_eq!(seq.nodes[2].parameter, 1.0);
        assert_eq!(seq.nodes[2].faces, vec![1]);
    }

    #[test]
    fn test_cut_edge_has_midpoint_node() {
        let mut e = edge(1.0);
        e.flags.cut = true;
        let mut verdicts = BTreeMap::new();
        verdicts.insert(0, verdict(0, &[0.0, 0.5, 1.0], &[State::In, State::Out]));
        let seq = build_sequence(0, &e, &verdicts, &HlrParams::default());
        assert_eq!(seq.nodes.len(), 3);
        assert_eq!(seq.nodes[1].kind, NodeKind::Cut);
        assert_eq!(seq.intervals[0].state, State::In);
        assert_eq!(seq.intervals[1].state, State::Out);
    }

    #[test]
    fn test_short_cut_edge_keeps_both_ends() {
        let params = HlrParams::default();
        let len = 1.5 * params.min_interval_length;
        let mut e = edge(len);
        e.flags.cut = true;
        let mid = 0.5 * len;
        let mut verdicts = BTreeMap::new();
        verdicts.insert(0, verdict(0, &[0.0, mid, len], &[State::In, State::Out]));
        let seq = build_sequence(0, &e, &verdicts, &params);
        assert_eq!(seq.nodes.len(), 2);
        assert!(seq.nodes.iter().all(|n| n.kind == NodeKind::Boundary));
        assert_eq!(seq.nodes[0].parameter, 0.0);
        assert_eq!(seq.nodes[1].parameter, len);
        assert_eq!(seq.intervals.len(), 1);
        assert!(crate::area::EdgeAreas::reconstruct(&seq, Orientation::Forward).is_ok());
    }
}
