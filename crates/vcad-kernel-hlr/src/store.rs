//! Entity store: edge, face and shape records for one projection request.
//!
//! Records live in flat arrays addressed by global index. Each loaded shape
//! owns contiguous index ranges ([`ShapeBounds`]). Silhouette edges depend on
//! the projector; they are rebuilt by [`EntityStore::update`] and stored
//! after every shape's own edges.

use std::collections::BTreeMap;
use std::ops::Range;

use vcad_kernel_hlr_geom::{
    Curve, CurveEvaluator, CurveType, DomainState, FaceDomain, LoopSegment, Point2, Point3,
    Surface, SurfaceEvaluator, SurfaceType, Vec3,
};

use crate::bbox::{curve_box, is_out, points_box, ProjectedBox};
use crate::classifier::FaceVerdict;
use crate::error::{HlrError, Result};
use crate::outliner::{face_normal, iso_lines, outlines};
use crate::params::HlrParams;
use crate::projector::Projector;
use crate::sequencer::EdgeSequence;
use crate::shape::{Orientation, ShapeData, ShapeInput, WireEdge};
use crate::types::EdgeCategory;

/// Parameter bounds at or beyond this magnitude are treated as infinite.
const UNBOUNDED: f64 = 1e9;

// =============================================================================
// Records
// =============================================================================

/// Regularity and status flags of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeFlags {
    /// Silhouette, synthesized for the current projector or supplied by the caller.
    pub outline: bool,
    /// Lies inside a face rather than on its boundary.
    pub internal: bool,
    /// Bounds the same face on both sides (seam).
    pub double: bool,
    /// Isoparametric line.
    pub iso_line: bool,
    /// Adjacent faces are tangent along the edge.
    pub smooth: bool,
    /// Projected tangent vanishes at the start / end vertex.
    pub vertical: [bool; 2],
    /// Whole edge projects to a point; classified as two halves.
    pub cut: bool,
    /// Takes part as a candidate in hide passes.
    pub selected: bool,
    /// Owning shape was removed.
    pub removed: bool,
}

/// One edge of a loaded shape.
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    /// Owning shape index.
    pub shape: usize,
    /// Trimmed curve.
    pub curve: Curve,
    /// Global vertex indices; `None` for synthesized edges.
    pub vertices: Option<[usize; 2]>,
    /// Drawing orientation.
    pub orientation: Orientation,
    /// Global indices of adjacent faces.
    pub faces: Vec<usize>,
    /// Flags.
    pub flags: EdgeFlags,
    /// Linear tolerance.
    pub tolerance: f64,
    /// Projected box, valid after an update.
    pub bbox: ProjectedBox,
    /// Number of faces that hide part of the edge.
    pub hide_count: usize,
    /// Accumulated classification.
    pub status: EdgeStatus,
}

impl EdgeRecord {
    /// Parameter range of the curve.
    pub fn range(&self) -> (f64, f64) {
        (self.curve.first_parameter(), self.curve.last_parameter())
    }

    /// Drawing category; iso lines win over outlines, then seams, smooth and sharp edges.
    pub fn category(&self) -> EdgeCategory {
        if self.flags.iso_line {
            EdgeCategory::IsoLine
        } else if self.flags.outline {
            EdgeCategory::Outline
        } else if self.flags.double {
            EdgeCategory::Seam
        } else if self.flags.smooth {
            EdgeCategory::Smooth
        } else {
            EdgeCategory::Sharp
        }
    }
}

/// Classification accumulated on an edge during hide passes.
#[derive(Debug, Clone, Default)]
pub struct EdgeStatus {
    /// Per hiding face verdicts, keyed by global face index.
    pub verdicts: BTreeMap<usize, FaceVerdict>,
    /// Merged node sequence, rebuilt after every pass that touched the edge.
    pub sequence: Option<EdgeSequence>,
}

/// Hiding eligibility flags of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceFlags {
    /// Owning shape bounds a closed volume.
    pub closed: bool,
    /// Every sampled normal points away from the eye.
    pub back: bool,
    /// Every sampled normal is perpendicular to the sight line.
    pub edge_on: bool,
    /// Projection is one-to-one, so the projected boundary is a polygon test.
    pub simple: bool,
    /// Owning shape was removed.
    pub removed: bool,
}

impl FaceFlags {
    /// Whether the face can occlude anything in the current projection.
    pub fn can_hide(&self) -> bool {
        !self.removed && !self.edge_on && !(self.closed && self.back)
    }
}

/// One face of a loaded shape.
#[derive(Debug, Clone)]
pub struct FaceRecord {
    /// Owning shape index.
    pub shape: usize,
    /// Surface.
    pub surface: Surface,
    /// Face orientation.
    pub orientation: Orientation,
    /// Wires with global edge indices.
    pub wires: Vec<Vec<WireEdge>>,
    /// Surface kind.
    pub surface_type: SurfaceType,
    /// Diagonal of the 3D extent.
    pub size: f64,
    /// Flags.
    pub flags: FaceFlags,
    /// Parameter-space region.
    pub domain: FaceDomain,
    /// Sampled 3D boundary loops.
    pub boundary: Vec<Vec<Point3>>,
    /// Boundary loops projected for the current projector.
    pub projected: Vec<Vec<Point2>>,
    /// Interior samples with oriented normals.
    pub samples: Vec<(Point3, Vec3)>,
    /// Largest distance between neighbouring interior samples.
    pub sample_step: f64,
    /// Projected box, valid after an update.
    pub bbox: ProjectedBox,
}

impl FaceRecord {
    /// Whether `edge` is one of the face's wire edges.
    pub fn has_boundary_edge(&self, edge: usize) -> bool {
        self.wires.iter().flatten().any(|we| we.edge == edge)
    }

    /// Distinct wire edges, in wire order.
    pub fn boundary_edges(&self) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for we in self.wires.iter().flatten() {
            if !out.contains(&we.edge) {
                out.push(we.edge);
            }
        }
        out
    }
}

/// Index ranges of one loaded shape.
#[derive(Debug, Clone)]
pub struct ShapeBounds {
    /// Vertex range.
    pub vertices: Range<usize>,
    /// Range of the shape's own edges and isolines.
    pub edges: Range<usize>,
    /// Face range.
    pub faces: Range<usize>,
    /// Range of synthesized silhouettes for the current projector.
    pub outlines: Range<usize>,
    /// Isolines requested per face and direction.
    pub iso_count: usize,
    /// Closed volume.
    pub closed: bool,
    /// Caller data.
    pub data: Option<ShapeData>,
    /// Selected for hide passes.
    pub selected: bool,
    /// Removed shapes keep their slots until [`EntityStore::compact`].
    pub removed: bool,
}

impl ShapeBounds {
    /// All edge indices of the shape, silhouettes included.
    pub fn all_edges(&self) -> impl Iterator<Item = usize> {
        self.edges.clone().chain(self.outlines.clone())
    }
}

// =============================================================================
// Store
// =============================================================================

/// All records for one projection request.
#[derive(Debug, Clone)]
pub struct EntityStore {
    params: HlrParams,
    vertices: Vec<Point3>,
    edges: Vec<EdgeRecord>,
    faces: Vec<FaceRecord>,
    shapes: Vec<ShapeBounds>,
    real_edges: usize,
    projector: Option<Projector>,
    hiding_order: Vec<usize>,
    /// Vertex, edge and face limits set by [`EntityStore::with_capacity`].
    limits: Option<[usize; 3]>,
}

impl EntityStore {
    /// Empty store.
    pub fn new(params: HlrParams) -> Self {
        Self {
            params,
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            shapes: Vec::new(),
            real_edges: 0,
            projector: None,
            hiding_order: Vec::new(),
            limits: None,
        }
    }

    /// Store with preallocated arrays and fixed limits.
    ///
    /// Faces need edges and edges need vertices, so counts that violate
    /// this are rejected. Appending a shape that would exceed a limit fails
    /// with `Capacity`; isolines count against the edge limit.
    pub fn with_capacity(
        vertex_count: usize,
        edge_count: usize,
        face_count: usize,
        params: HlrParams,
    ) -> Result<Self> {
        if face_count > 0 && edge_count == 0 {
            return Err(HlrError::Capacity(format!(
                "{face_count} faces but no edges"
            )));
        }
        if edge_count > 0 && vertex_count == 0 {
            return Err(HlrError::Capacity(format!(
                "{edge_count} edges but no vertices"
            )));
        }
        let mut store = Self::new(params);
        store.vertices.reserve(vertex_count);
        store.edges.reserve(edge_count);
        store.faces.reserve(face_count);
        store.limits = Some([vertex_count, edge_count, face_count]);
        Ok(store)
    }

    /// Parameters the store was built with.
    pub fn params(&self) -> &HlrParams {
        &self.params
    }

    /// Projector of the last update.
    pub fn projector(&self) -> Option<&Projector> {
        self.projector.as_ref()
    }

    /// Vertex position.
    pub fn vertex(&self, index: usize) -> Option<&Point3> {
        self.vertices.get(index)
    }

    /// Edge record.
    pub fn edge(&self, index: usize) -> Option<&EdgeRecord> {
        self.edges.get(index)
    }

    /// Mutable edge record.
    pub fn edge_mut(&mut self, index: usize) -> Option<&mut EdgeRecord> {
        self.edges.get_mut(index)
    }

    /// Face record.
    pub fn face(&self, index: usize) -> Option<&FaceRecord> {
        self.faces.get(index)
    }

    /// Shape bounds.
    pub fn shape(&self, index: usize) -> Option<&ShapeBounds> {
        self.shapes.get(index)
    }

    /// Live shape bounds, or `UnknownShape`.
    pub fn live_shape(&self, index: usize) -> Result<&ShapeBounds> {
        match self.shapes.get(index) {
            Some(s) if !s.removed => Ok(s),
            _ => Err(HlrError::UnknownShape(index)),
        }
    }

    /// Number of edge slots, silhouettes included.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of face slots.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of shape slots, removed ones included.
    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    /// Indices of shapes that have not been removed.
    pub fn live_shapes(&self) -> impl Iterator<Item = usize> + '_ {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed)
            .map(|(i, _)| i)
    }

    /// Faces of `shape` able to hide, largest projected area first.
    pub fn hiding_faces(&self, shape: usize) -> Vec<usize> {
        self.hiding_order
            .iter()
            .copied()
            .filter(|&f| self.faces[f].shape == shape && self.faces[f].flags.can_hide())
            .collect()
    }

    /// Coarse culling test between an edge and a face.
    pub fn is_out(&self, edge: usize, face: usize) -> bool {
        match (self.edges.get(edge), self.faces.get(face)) {
            (Some(e), Some(f)) => is_out(&e.bbox, &f.bbox, self.params.linear_tolerance),
            _ => true,
        }
    }

    /// Forget every classification result.
    pub fn clear_status(&mut self) {
        for e in &mut self.edges {
            e.status = EdgeStatus::default();
            e.hide_count = 0;
        }
    }

    /// Set the candidate flag of every edge of `shape`.
    pub fn set_shape_selected(&mut self, shape: usize, selected: bool) {
        let Some(bounds) = self.shapes.get_mut(shape) else {
            return;
        };
        bounds.selected = selected;
        let range: Vec<usize> = bounds.all_edges().collect();
        for e in range {
            self.edges[e].flags.selected = selected;
        }
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Append a shape; nothing is kept if any part of it fails.
    pub fn append_shape(
        &mut self,
        input: &ShapeInput,
        data: Option<ShapeData>,
        iso_count: usize,
    ) -> Result<usize> {
        input.validate()?;
        if let Some([max_v, max_e, max_f]) = self.limits {
            let needed = [
                ("vertices", self.vertices.len() + input.vertices.len(), max_v),
                ("edges", self.real_edges + input.edges.len(), max_e),
                ("faces", self.faces.len() + input.faces.len(), max_f),
            ];
            if let Some((what, n, max)) = needed.into_iter().find(|&(_, n, max)| n > max) {
                return Err(HlrError::Capacity(format!("{n} {what} exceed the limit of {max}")));
            }
        }
        let shape = self.shapes.len();
        let v0 = self.vertices.len();
        let e0 = self.real_edges;
        let f0 = self.faces.len();
        let tol = self.params.linear_tolerance;

        let mut edges: Vec<EdgeRecord> = input
            .edges
            .iter()
            .map(|e| EdgeRecord {
                shape,
                curve: e.curve.clone(),
                vertices: Some([e.vertices[0] + v0, e.vertices[1] + v0]),
                orientation: Orientation::Forward,
                faces: Vec::new(),
                flags: EdgeFlags {
                    outline: e.marks.outline,
                    internal: e.marks.internal,
                    iso_line: e.marks.iso_line,
                    selected: true,
                    ..Default::default()
                },
                tolerance: tol,
                bbox: ProjectedBox::empty(),
                hide_count: 0,
                status: EdgeStatus::default(),
            })
            .collect();

        let mut faces = Vec::with_capacity(input.faces.len());
        for (fi, face) in input.faces.iter().enumerate() {
            let mut boundary = Vec::with_capacity(face.wires.len());
            let mut loops = Vec::with_capacity(face.wires.len());
            for wire in &face.wires {
                let mut ring = Vec::new();
                let mut segments = Vec::with_capacity(wire.len());
                for we in wire {
                    let curve = &input.edges[we.edge].curve;
                    let mut points = sample_curve(curve, self.boundary_samples(curve));
                    if we.orientation == Orientation::Reversed {
                        points.reverse();
                    }
                    ring.extend(points.iter().copied());
                    segments.push(LoopSegment {
                        edge: we.edge,
                        points,
                    });

                    let record = &mut edges[we.edge];
                    if record.faces.contains(&(f0 + fi)) {
                        record.flags.double = true;
                    } else {
                        record.faces.push(f0 + fi);
                    }
                }
                boundary.push(ring);
                loops.push(segments);
            }
            let domain = FaceDomain::from_boundary(&face.surface, &loops, 10.0 * tol)?;
            let (samples, sample_step) =
                interior_samples(&face.surface, face.orientation, &domain, self.params.face_samples);
            let size = extent_diagonal(boundary.iter().flatten().chain(samples.iter().map(|(p, _)| p)));

            for curve in iso_lines(&face.surface, &domain, iso_count) {
                edges.push(EdgeRecord {
                    shape,
                    curve,
                    vertices: None,
                    orientation: Orientation::Forward,
                    faces: vec![f0 + fi],
                    flags: EdgeFlags {
                        iso_line: true,
                        internal: true,
                        selected: true,
                        ..Default::default()
                    },
                    tolerance: tol,
                    bbox: ProjectedBox::empty(),
                    hide_count: 0,
                    status: EdgeStatus::default(),
                });
            }

            faces.push(FaceRecord {
                shape,
                surface: face.surface.clone(),
                orientation: face.orientation,
                wires: face
                    .wires
                    .iter()
                    .map(|w| {
                        w.iter()
                            .map(|we| WireEdge {
                                edge: we.edge + e0,
                                orientation: we.orientation,
                            })
                            .collect()
                    })
                    .collect(),
                surface_type: face.surface.surface_type(),
                size,
                flags: FaceFlags {
                    closed: input.closed,
                    ..Default::default()
                },
                domain,
                boundary,
                projected: Vec::new(),
                samples,
                sample_step,
                bbox: ProjectedBox::empty(),
            });
        }

        // Smooth edges: adjacent face normals agree at the midpoint.
        for edge in &mut edges {
            if let [a, b] = edge.faces[..] {
                let (fa, fb) = (&faces[a - f0], &faces[b - f0]);
                let (u0, u1) = edge.range();
                let p = edge.curve.value(0.5 * (u0 + u1));
                if let (Some(na), Some(nb)) = (
                    face_normal(&fa.surface, fa.orientation, &p),
                    face_normal(&fb.surface, fb.orientation, &p),
                ) {
                    edge.flags.smooth = na.angle(&nb) < self.params.smooth_angle;
                }
            }
        }

        // Commit. Silhouettes are dropped: they come back on the next update.
        self.drop_outlines();
        let own_edges = edges.len();
        self.vertices.extend(input.vertices.iter().copied());
        self.edges.extend(edges);
        self.faces.extend(faces);
        self.real_edges += own_edges;
        self.projector = None;
        self.shapes.push(ShapeBounds {
            vertices: v0..v0 + input.vertices.len(),
            edges: e0..e0 + own_edges,
            faces: f0..f0 + input.faces.len(),
            outlines: self.real_edges..self.real_edges,
            iso_count,
            closed: input.closed,
            data,
            selected: true,
            removed: false,
        });
        tracing::debug!(
            shape,
            edges = own_edges,
            faces = input.faces.len(),
            "shape appended"
        );
        Ok(shape)
    }

    /// Mark a shape and all its records as removed.
    ///
    /// Slots stay in place so outstanding indices remain valid.
    pub fn remove_shape(&mut self, index: usize) -> Result<()> {
        let bounds = self.live_shape(index)?.clone();
        for e in bounds.all_edges() {
            self.edges[e].flags.removed = true;
            self.edges[e].flags.selected = false;
        }
        for f in bounds.faces.clone() {
            self.faces[f].flags.removed = true;
        }
        self.shapes[index].removed = true;
        self.hiding_order.retain(|&f| !bounds.faces.contains(&f));
        tracing::debug!(shape = index, "shape removed");
        Ok(())
    }

    /// Repack arrays without removed shapes.
    ///
    /// Returns the new index of every old shape slot (`None` if removed).
    /// Silhouettes and classification results are discarded.
    pub fn compact(&mut self) -> Vec<Option<usize>> {
        self.drop_outlines();
        let old_shapes = std::mem::take(&mut self.shapes);
        let old_vertices = std::mem::take(&mut self.vertices);
        let mut old_edges: Vec<Option<EdgeRecord>> =
            std::mem::take(&mut self.edges).into_iter().map(Some).collect();
        let mut old_faces: Vec<Option<FaceRecord>> =
            std::mem::take(&mut self.faces).into_iter().map(Some).collect();
        let mut map = Vec::with_capacity(old_shapes.len());

        for bounds in old_shapes {
            if bounds.removed {
                map.push(None);
                continue;
            }
            let shape = self.shapes.len();
            let (v0, e0, f0) = (self.vertices.len(), self.edges.len(), self.faces.len());
            let shift = |index: usize, old: &Range<usize>, new_start: usize| index - old.start + new_start;

            self.vertices
                .extend_from_slice(&old_vertices[bounds.vertices.clone()]);
            for e in bounds.edges.clone() {
                if let Some(mut record) = old_edges[e].take() {
                    record.shape = shape;
                    record.vertices = record.vertices.map(|[a, b]| {
                        [shift(a, &bounds.vertices, v0), shift(b, &bounds.vertices, v0)]
                    });
                    for f in &mut record.faces {
                        *f = shift(*f, &bounds.faces, f0);
                    }
                    record.status = EdgeStatus::default();
                    record.hide_count = 0;
                    self.edges.push(record);
                }
            }
            for f in bounds.faces.clone() {
                if let Some(mut record) = old_faces[f].take() {
                    record.shape = shape;
                    for we in record.wires.iter_mut().flatten() {
                        we.edge = shift(we.edge, &bounds.edges, e0);
                    }
                    self.faces.push(record);
                }
            }
            let edges = e0..self.edges.len();
            self.shapes.push(ShapeBounds {
                vertices: v0..self.vertices.len(),
                outlines: edges.end..edges.end,
                edges,
                faces: f0..self.faces.len(),
                ..bounds
            });
            map.push(Some(shape));
        }
        self.real_edges = self.edges.len();
        for bounds in &mut self.shapes {
            bounds.outlines = self.real_edges..self.real_edges;
        }
        self.projector = None;
        self.hiding_order.clear();
        tracing::debug!(shapes = self.shapes.len(), "store compacted");
        map
    }

    fn drop_outlines(&mut self) {
        self.edges.truncate(self.real_edges);
        for bounds in &mut self.shapes {
            bounds.outlines = self.real_edges..self.real_edges;
        }
    }

    fn boundary_samples(&self, curve: &Curve) -> usize {
        if curve.curve_type() == CurveType::Line {
            1
        } else {
            2 * curve.nb_samples().max(self.params.edge_samples)
        }
    }

    // -------------------------------------------------------------------------
    // Projection
    // -------------------------------------------------------------------------

    /// Recompute everything that depends on the projector.
    ///
    /// Rebuilds silhouettes, projected boxes, vertical and cut flags,
    /// face eligibility and the hiding order; clears classification.
    pub fn update(&mut self, projector: Projector) -> Result<()> {
        let tol = self.params.linear_tolerance;
        let facing_tol = self.params.angular_tolerance.max(1e-12);
        self.drop_outlines();

        // Face eligibility.
        for face in &mut self.faces {
            if face.flags.removed {
                continue;
            }
            let planar = face.surface_type == SurfaceType::Plane;
            let points = face
                .samples
                .iter()
                .map(|(p, n)| (*p, *n))
                .chain(face_boundary_normals(face));
            let (mut front, mut back, mut on) = (0usize, 0usize, 0usize);
            for (p, n) in points {
                let f = projector.facing(&p, &n);
                if f > facing_tol {
                    back += 1;
                } else if f < -facing_tol {
                    front += 1;
                } else {
                    on += 1;
                }
            }
            let total = front + back + on;
            face.flags.back = total > 0 && back == total;
            face.flags.edge_on = total > 0 && on == total;
            face.flags.simple = planar || front == 0 || back == 0;
            face.projected = face
                .boundary
                .iter()
                .map(|ring| ring.iter().map(|p| projector.project(p)).collect())
                .collect();
        }

        // Silhouettes, appended after every shape's own edges.
        for shape in 0..self.shapes.len() {
            let start = self.edges.len();
            if !self.shapes[shape].removed {
                let selected = self.shapes[shape].selected;
                for f in self.shapes[shape].faces.clone() {
                    let face = &self.faces[f];
                    if face.flags.edge_on || face.flags.back {
                        continue;
                    }
                    for outline in outlines(&face.surface, &face.domain, &projector) {
                        self.edges.push(EdgeRecord {
                            shape,
                            curve: outline.curve,
                            vertices: None,
                            orientation: outline.orientation,
                            faces: vec![f],
                            flags: EdgeFlags {
                                outline: true,
                                selected,
                                ..Default::default()
                            },
                            tolerance: tol,
                            bbox: ProjectedBox::empty(),
                            hide_count: 0,
                            status: EdgeStatus::default(),
                        });
                    }
                }
            }
            self.shapes[shape].outlines = start..self.edges.len();
        }

        // Edge boxes and degenerate projections.
        for edge in &mut self.edges {
            if edge.flags.removed {
                continue;
            }
            let samples = if edge.curve.curve_type() == CurveType::Line {
                1
            } else {
                edge.curve.nb_samples().max(8)
            };
            edge.bbox = curve_box(&edge.curve, &projector, samples);
            let (u0, u1) = edge.range();
            for (k, u) in [u0, u1].into_iter().enumerate() {
                let (p, d) = edge.curve.d1(u);
                let (_, dq) = projector.project_d1(&p, &d);
                edge.flags.vertical[k] = dq.norm() <= 1e-9 * d.norm().max(1e-300);
            }
            let extent = (edge.bbox.max - edge.bbox.min).norm();
            edge.flags.cut = edge.flags.vertical[0] && edge.flags.vertical[1] && extent <= tol;
        }

        // Face boxes: boundary edges plus interior samples.
        for fi in 0..self.faces.len() {
            let face = &self.faces[fi];
            if face.flags.removed {
                continue;
            }
            let mut bx = points_box(
                face.samples.iter().map(|(p, _)| p),
                &projector,
                0.25 * face.sample_step,
            );
            for e in face.boundary_edges() {
                bx.merge(&self.edges[e].bbox);
            }
            self.faces[fi].bbox = bx;
        }

        let mut order: Vec<usize> = (0..self.faces.len())
            .filter(|&f| !self.faces[f].flags.removed)
            .collect();
        order.sort_by(|&a, &b| {
            self.faces[b]
                .bbox
                .area()
                .total_cmp(&self.faces[a].bbox.area())
                .then(a.cmp(&b))
        });
        self.hiding_order = order;
        self.projector = Some(projector);
        self.clear_status();

        tracing::debug!(
            edges = self.edges.len(),
            outlines = self.edges.len() - self.real_edges,
            hiding = self
                .hiding_order
                .iter()
                .filter(|&&f| self.faces[f].flags.can_hide())
                .count(),
            "store updated"
        );
        Ok(())
    }
}

// =============================================================================
// Sampling helpers
// =============================================================================

/// `n + 1` points along a curve, evenly spaced in parameter.
pub fn sample_curve(curve: &dyn CurveEvaluator, n: usize) -> Vec<Point3> {
    let n = n.max(1);
    let (a, b) = (curve.first_parameter(), curve.last_parameter());
    (0..=n)
        .map(|i| curve.value(a + (b - a) * i as f64 / n as f64))
        .collect()
}

/// Grid samples of a curved face inside its domain, with oriented normals.
fn interior_samples(
    surface: &Surface,
    orientation: Orientation,
    domain: &FaceDomain,
    n: usize,
) -> (Vec<(Point3, Vec3)>, f64) {
    if surface.surface_type() == SurfaceType::Plane {
        return (Vec::new(), 0.0);
    }
    let (lo, hi) = domain.uv_bounds();
    if [lo.x, lo.y, hi.x, hi.y]
        .iter()
        .any(|b| !b.is_finite() || b.abs() >= UNBOUNDED)
    {
        return (Vec::new(), 0.0);
    }
    let n = n.max(2);
    let mut grid: Vec<Vec<Point3>> = Vec::with_capacity(n);
    let mut samples = Vec::new();
    for i in 0..n {
        let u = lo.x + (hi.x - lo.x) * i as f64 / (n - 1) as f64;
        let mut row = Vec::with_capacity(n);
        for j in 0..n {
            let v = lo.y + (hi.y - lo.y) * j as f64 / (n - 1) as f64;
            let uv = Point2::new(u, v);
            let p = surface.value(uv);
            if domain.classify(uv) != DomainState::Out {
                if let Ok(normal) = surface.normal(uv) {
                    samples.push((p, orientation.sign() * normal.into_inner()));
                }
            }
            row.push(p);
        }
        grid.push(row);
    }
    let mut step: f64 = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i + 1 < n {
                step = step.max((grid[i][j] - grid[i + 1][j]).norm());
            }
            if j + 1 < n {
                step = step.max((grid[i][j] - grid[i][j + 1]).norm());
            }
        }
    }
    (samples, step)
}

/// Boundary points of a face paired with the face normal there.
fn face_boundary_normals(face: &FaceRecord) -> impl Iterator<Item = (Point3, Vec3)> + '_ {
    face.boundary
        .iter()
        .flatten()
        .filter_map(|p| face_normal(&face.surface, face.orientation, p).map(|n| (*p, n)))
}

fn extent_diagonal<'a>(points: impl Iterator<Item = &'a Point3>) -> f64 {
    let mut lo = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut hi = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut any = false;
    for p in points {
        lo = lo.inf(p);
        hi = hi.sup(p);
        any = true;
    }
    if any {
        (hi - lo).norm()
    } else {
        0.0
    }
}
