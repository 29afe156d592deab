//! The hidden-line orchestrator.
//!
//! [`HlrAlgo`] owns one [`EntityStore`] and drives culling, interference
//! computation, classification and sequencing over pairs of loaded shapes.
//! It is the only place where all of those stages meet.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::area::EdgeAreas;
use crate::classifier::{classify_edge, FaceCoverage, FaceVerdict};
use crate::error::{HlrError, Result};
use crate::interference::compute_interferences;
use crate::params::HlrParams;
use crate::projector::Projector;
use crate::sequencer::build_sequence;
use crate::shape::{Orientation, ShapeData, ShapeInput};
use crate::store::EntityStore;
use crate::types::Visibility;

/// Lifecycle of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlgoState {
    /// Nothing loaded.
    Unloaded,
    /// Shapes loaded, no projector yet (or shapes changed since).
    Loaded,
    /// Projector applied, nothing classified.
    Updated,
    /// Every shape classified against its own faces.
    PartiallyHidden,
    /// Cross-shape hiding done.
    Hidden,
}

/// Counters of one or more hide passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlrStats {
    /// (edge, face) pairs looked at.
    pub pairs_considered: usize,
    /// Pairs rejected by the drawing-plane box test.
    pub pairs_culled: usize,
    /// Pairs skipped because the face lies wholly behind the edge.
    pub pairs_behind: usize,
    /// Pairs skipped because the edge bounds the (simple) face.
    pub pairs_own_boundary: usize,
    /// Refined interferences.
    pub interferences: usize,
    /// Interferences whose refinement failed.
    pub rejected: usize,
    /// Crossings dropped at shared vertices.
    pub suppressed: usize,
    /// Intervals left undecided.
    pub ambiguous: usize,
    /// Edges whose merged sequence does not rebuild into areas.
    pub inconsistent: usize,
}

impl HlrStats {
    fn absorb(&mut self, other: &HlrStats) {
        self.pairs_considered += other.pairs_considered;
        self.pairs_culled += other.pairs_culled;
        self.pairs_behind += other.pairs_behind;
        self.pairs_own_boundary += other.pairs_own_boundary;
        self.interferences += other.interferences;
        self.rejected += other.rejected;
        self.suppressed += other.suppressed;
        self.ambiguous += other.ambiguous;
        self.inconsistent += other.inconsistent;
    }
}

/// Hidden-line removal over a set of shapes and one projector.
///
/// ```text
/// Unloaded -> Loaded -> Updated -> PartiallyHidden -> Hidden
/// ```
/// `load` and `remove` fall back to `Loaded`, `update` to `Updated`.
#[derive(Debug, Clone)]
pub struct HlrAlgo {
    store: EntityStore,
    state: AlgoState,
    stats: HlrStats,
    last_pass: HlrStats,
}

impl HlrAlgo {
    /// Empty orchestrator.
    pub fn new(params: HlrParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::from_store(EntityStore::new(params)))
    }

    /// Orchestrator with preallocated store arrays.
    pub fn with_capacity(
        vertex_count: usize,
        edge_count: usize,
        face_count: usize,
        params: HlrParams,
    ) -> Result<Self> {
        params.validate()?;
        let store = EntityStore::with_capacity(vertex_count, edge_count, face_count, params)?;
        Ok(Self::from_store(store))
    }

    fn from_store(store: EntityStore) -> Self {
        Self {
            store,
            state: AlgoState::Unloaded,
            stats: HlrStats::default(),
            last_pass: HlrStats::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AlgoState {
        self.state
    }

    /// Parameters.
    pub fn params(&self) -> &HlrParams {
        self.store.params()
    }

    /// Underlying records.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Counters accumulated since the last update.
    pub fn stats(&self) -> HlrStats {
        self.stats
    }

    /// Counters of the most recent hide pass.
    pub fn last_pass_stats(&self) -> HlrStats {
        self.last_pass
    }

    fn require(&self, required: AlgoState) -> Result<()> {
        if self.state >= required {
            return Ok(());
        }
        if required >= AlgoState::Updated && self.state == AlgoState::Loaded {
            return Err(HlrError::InvalidProjector(
                "no projector applied since the last load".into(),
            ));
        }
        Err(HlrError::InvalidState {
            required,
            current: self.state,
        })
    }

    fn invalidate(&mut self) {
        self.store.clear_status();
        self.stats = HlrStats::default();
        self.last_pass = HlrStats::default();
        self.state = AlgoState::Loaded;
    }

    // -------------------------------------------------------------------------
    // Loading and projection
    // -------------------------------------------------------------------------

    /// Load a shape and return its index.
    #[instrument(skip_all, fields(edges = shape.edges.len(), faces = shape.faces.len()))]
    pub fn load(
        &mut self,
        shape: &ShapeInput,
        data: Option<ShapeData>,
        iso_count: usize,
    ) -> Result<usize> {
        let index = self.store.append_shape(shape, data, iso_count)?;
        self.invalidate();
        Ok(index)
    }

    /// Remove a shape; indices of the others do not change.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.store.remove_shape(index)?;
        self.invalidate();
        Ok(())
    }

    /// Repack the store after removals; see [`EntityStore::compact`].
    pub fn compact(&mut self) -> Vec<Option<usize>> {
        let map = self.store.compact();
        if self.state > AlgoState::Loaded {
            self.invalidate();
        }
        map
    }

    /// Apply a projector, discarding any classification.
    #[instrument(skip_all, fields(perspective = projector.is_perspective()))]
    pub fn update(&mut self, projector: Projector) -> Result<()> {
        self.require(AlgoState::Loaded)?;
        self.store.update(projector)?;
        self.stats = HlrStats::default();
        self.last_pass = HlrStats::default();
        self.state = AlgoState::Updated;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Hiding
    // -------------------------------------------------------------------------

    /// Classify every shape against its own faces.
    pub fn partial_hide(&mut self) -> Result<()> {
        self.require(AlgoState::Updated)?;
        let pairs: Vec<(usize, usize)> = self.store.live_shapes().map(|s| (s, s)).collect();
        self.run_pass(&pairs)?;
        self.state = self.state.max(AlgoState::PartiallyHidden);
        Ok(())
    }

    /// Classify every shape against every shape, itself included.
    #[instrument(skip_all)]
    pub fn hide(&mut self) -> Result<()> {
        self.require(AlgoState::Updated)?;
        let shapes: Vec<usize> = self.store.live_shapes().collect();
        let pairs: Vec<(usize, usize)> = shapes
            .iter()
            .flat_map(|&e| shapes.iter().map(move |&f| (e, f)))
            .collect();
        self.run_pass(&pairs)?;
        self.state = AlgoState::Hidden;
        Ok(())
    }

    /// Classify one shape against its own faces.
    pub fn hide_shape(&mut self, index: usize) -> Result<()> {
        self.require(AlgoState::Updated)?;
        self.store.live_shape(index)?;
        self.run_pass(&[(index, index)])?;
        self.state = self.state.max(AlgoState::PartiallyHidden);
        Ok(())
    }

    /// Classify the edges of shape `edges` against the faces of shape `faces`.
    #[instrument(skip(self))]
    pub fn hide_pair(&mut self, edges: usize, faces: usize) -> Result<()> {
        self.require(AlgoState::Updated)?;
        self.store.live_shape(edges)?;
        self.store.live_shape(faces)?;
        self.run_pass(&[(edges, faces)])?;
        self.state = AlgoState::Hidden;
        Ok(())
    }

    fn run_pass(&mut self, pairs: &[(usize, usize)]) -> Result<()> {
        let projector = self
            .store
            .projector()
            .cloned()
            .ok_or_else(|| HlrError::InvalidProjector("store has no projector".into()))?;
        let mut stats = HlrStats::default();
        let mut touched = BTreeSet::new();

        for &(edge_shape, face_shape) in pairs {
            let faces = self.store.hiding_faces(face_shape);
            let edges: Vec<usize> = self
                .store
                .live_shape(edge_shape)?
                .all_edges()
                .filter(|&e| {
                    self.store
                        .edge(e)
                        .is_some_and(|r| r.flags.selected && !r.flags.removed)
                })
                .collect();
            for e in edges {
                let verdicts = self.classify_against(e, &faces, &projector, &mut stats);
                if let Some(record) = self.store.edge_mut(e) {
                    for v in verdicts {
                        record.status.verdicts.insert(v.face, v);
                    }
                }
                touched.insert(e);
            }
        }

        let params = self.store.params().clone();
        for e in touched {
            if let Some(record) = self.store.edge_mut(e) {
                let seq = build_sequence(e, record, &record.status.verdicts, &params);
                if let Err(err) = EdgeAreas::reconstruct(&seq, record.orientation) {
                    stats.inconsistent += 1;
                    tracing::warn!(error = %err, "edge areas cannot be rebuilt");
                }
                record.hide_count = record.status.verdicts.values().filter(|v| v.hides()).count();
                record.status.sequence = Some(seq);
            }
        }

        tracing::debug!(
            pairs = stats.pairs_considered,
            culled = stats.pairs_culled,
            behind = stats.pairs_behind,
            interferences = stats.interferences,
            rejected = stats.rejected,
            suppressed = stats.suppressed,
            ambiguous = stats.ambiguous,
            inconsistent = stats.inconsistent,
            "hide pass done"
        );
        self.stats.absorb(&stats);
        self.last_pass = stats;
        Ok(())
    }

    /// Verdicts of edge `e` against every face in `faces` that survives culling.
    fn classify_against(
        &self,
        e: usize,
        faces: &[usize],
        projector: &Projector,
        stats: &mut HlrStats,
    ) -> Vec<FaceVerdict> {
        let params = self.store.params();
        let tol = params.linear_tolerance;
        let Some(edge) = self.store.edge(e) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for &f in faces {
            let Some(face) = self.store.face(f) else {
                continue;
            };
            stats.pairs_considered += 1;
            if face.flags.simple && face.has_boundary_edge(e) {
                stats.pairs_own_boundary += 1;
                continue;
            }
            if self.store.is_out(e, f) {
                stats.pairs_culled += 1;
                tracing::trace!(edge = e, face = f, "culled");
                continue;
            }
            if face.bbox.is_behind(edge.bbox.depth_max, tol) {
                stats.pairs_behind += 1;
                continue;
            }

            let report = compute_interferences(&self.store, e, edge, face, projector);
            stats.interferences += report.accepted().count();
            stats.suppressed += report.suppressed;
            for r in report.rejected() {
                stats.rejected += 1;
                let err = HlrError::NonConvergentIntersection {
                    edge: e,
                    boundary: r.boundary_edge,
                };
                tracing::warn!(error = %err, parameter = r.parameter, side = ?r.side, "keeping unrefined crossing");
            }

            let coverage = FaceCoverage::new(face, projector, tol);
            let verdict = classify_edge(edge, f, &coverage, &report, face.flags.simple, params);
            stats.ambiguous += verdict.ambiguous_count();
            for (k, _) in verdict.ambiguous.iter().enumerate().filter(|&(_, &a)| a) {
                let err = HlrError::AmbiguousClassification {
                    edge: e,
                    parameter: verdict.breaks[k],
                };
                tracing::warn!(error = %err, face = f, "interval marked on");
            }
            tracing::trace!(
                edge = e,
                face = f,
                interferences = report.interferences.len(),
                intervals = verdict.states.len(),
                "classified"
            );
            out.push(verdict);
        }
        out
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Make every edge a candidate again.
    pub fn select(&mut self) {
        let shapes: Vec<usize> = self.store.live_shapes().collect();
        for s in shapes {
            self.store.set_shape_selected(s, true);
        }
    }

    /// Restrict candidates to the edges of one shape.
    pub fn select_shape(&mut self, index: usize) -> Result<()> {
        self.store.live_shape(index)?;
        let shapes: Vec<usize> = self.store.live_shapes().collect();
        for s in shapes {
            self.store.set_shape_selected(s, s == index);
        }
        Ok(())
    }

    /// Restrict candidates to one edge.
    pub fn select_edge(&mut self, index: usize) -> Result<()> {
        self.check_edge(index)?;
        self.select_only(|e, _| e == index);
        Ok(())
    }

    /// Restrict candidates to the edges lying on one face.
    pub fn select_face(&mut self, index: usize) -> Result<()> {
        let face = self
            .store
            .face(index)
            .filter(|f| !f.flags.removed)
            .ok_or_else(|| HlrError::InvalidShape(format!("no face {index}")))?;
        let boundary = face.boundary_edges();
        self.select_only(|e, faces| boundary.contains(&e) || faces.contains(&index));
        Ok(())
    }

    fn select_only(&mut self, keep: impl Fn(usize, &[usize]) -> bool) {
        for e in 0..self.store.num_edges() {
            if let Some(record) = self.store.edge_mut(e) {
                if !record.flags.removed {
                    record.flags.selected = keep(e, &record.faces);
                }
            }
        }
    }

    fn check_edge(&self, index: usize) -> Result<()> {
        match self.store.edge(index) {
            Some(e) if !e.flags.removed => Ok(()),
            _ => Err(HlrError::InvalidShape(format!("no edge {index}"))),
        }
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    /// Visibility areas of an edge.
    ///
    /// An edge no pass has touched yet is a single `Out` area.
    pub fn edge_areas(&self, index: usize) -> Result<EdgeAreas> {
        self.require(AlgoState::Updated)?;
        self.check_edge(index)?;
        let Some(edge) = self.store.edge(index) else {
            return Err(HlrError::InvalidShape(format!("no edge {index}")));
        };
        match &edge.status.sequence {
            Some(seq) => EdgeAreas::reconstruct(seq, edge.orientation),
            None => {
                let seq = build_sequence(index, edge, &edge.status.verdicts, self.store.params());
                EdgeAreas::reconstruct(&seq, edge.orientation)
            }
        }
    }

    /// `(first, last, orientation)` runs of an edge with the given visibility.
    pub fn intervals(&self, index: usize, visibility: Visibility) -> Result<Vec<(f64, f64, Orientation)>> {
        let areas = self.edge_areas(index)?;
        let orientation = self
            .store
            .edge(index)
            .map_or(Orientation::Forward, |e| e.orientation);
        let runs = match visibility {
            Visibility::Visible => areas.visible_runs(),
            Visibility::Hidden => areas.hidden_runs(),
        };
        Ok(runs
            .into_iter()
            .map(|(a, b)| (a, b, orientation))
            .collect())
    }

    /// Largest hide level along an edge.
    pub fn hide_level(&self, index: usize) -> usize {
        self.store
            .edge(index)
            .and_then(|e| e.status.sequence.as_ref())
            .map_or(0, |s| s.intervals.iter().map(|i| i.level).max().unwrap_or(0))
    }

    /// Classified edges whose sequence does not rebuild into areas.
    pub fn failed_edges(&self) -> Vec<usize> {
        (0..self.store.num_edges())
            .filter(|&e| {
                self.store.edge(e).is_some_and(|r| {
                    !r.flags.removed
                        && r.status
                            .sequence
                            .as_ref()
                            .is_some_and(|s| EdgeAreas::reconstruct(s, r.orientation).is_err())
                })
            })
            .collect()
    }
}
