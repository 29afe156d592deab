//! Shape input: the faces, edges and vertices of one B-rep shape.
//!
//! The engine does not own a topology kernel. Callers decompose their
//! shape into this flat model (vertices, edges carrying a trimmed curve,
//! faces carrying a surface and wires of oriented edge references) and
//! hand it to [`HlrAlgo::load`](crate::HlrAlgo::load).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::{Curve, CurveEvaluator, Point3, Surface, Transform};

use crate::error::{HlrError, Result};

/// Orientation of an edge inside a wire, or of a face relative to its surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Same direction as the underlying geometry.
    #[default]
    Forward,
    /// Opposite direction.
    Reversed,
}

impl Orientation {
    /// The opposite orientation.
    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
        }
    }

    /// `1.0` for forward, `-1.0` for reversed.
    pub fn sign(self) -> f64 {
        match self {
            Orientation::Forward => 1.0,
            Orientation::Reversed => -1.0,
        }
    }
}

/// Caller-supplied role markers of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeMarks {
    /// Edge lies inside a face rather than on its boundary.
    pub internal: bool,
    /// Edge is an isoparametric line of a face.
    pub iso_line: bool,
    /// Edge is a silhouette supplied by the caller.
    pub outline: bool,
}

/// One edge of a shape.
#[derive(Debug, Clone)]
pub struct EdgeInput {
    /// Trimmed 3D curve.
    pub curve: Curve,
    /// Start and end vertex indices (equal for closed edges).
    pub vertices: [usize; 2],
    /// Role markers.
    pub marks: EdgeMarks,
}

impl EdgeInput {
    /// Boundary edge between two vertices.
    pub fn new(curve: Curve, start: usize, end: usize) -> Self {
        Self {
            curve,
            vertices: [start, end],
            marks: EdgeMarks::default(),
        }
    }

    /// Same edge with the given markers.
    pub fn with_marks(mut self, marks: EdgeMarks) -> Self {
        self.marks = marks;
        self
    }
}

/// Reference to an edge from a face wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEdge {
    /// Edge index within the shape.
    pub edge: usize,
    /// Traversal direction in the wire.
    pub orientation: Orientation,
}

impl WireEdge {
    /// Forward reference to `edge`.
    pub fn forward(edge: usize) -> Self {
        Self {
            edge,
            orientation: Orientation::Forward,
        }
    }

    /// Reversed reference to `edge`.
    pub fn reversed(edge: usize) -> Self {
        Self {
            edge,
            orientation: Orientation::Reversed,
        }
    }
}

/// One face of a shape.
#[derive(Debug, Clone)]
pub struct FaceInput {
    /// Underlying surface.
    pub surface: Surface,
    /// Face orientation: reversed faces flip the surface normal.
    pub orientation: Orientation,
    /// Boundary wires, outer first.
    pub wires: Vec<Vec<WireEdge>>,
}

/// Opaque caller data carried alongside a loaded shape.
#[derive(Clone)]
pub struct ShapeData(pub Arc<dyn Any + Send + Sync>);

impl ShapeData {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ShapeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShapeData(..)")
    }
}

/// A shape decomposed into vertices, edges and faces.
#[derive(Debug, Clone, Default)]
pub struct ShapeInput {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Edges.
    pub edges: Vec<EdgeInput>,
    /// Faces.
    pub faces: Vec<FaceInput>,
    /// Faces bound a closed volume, so back faces never hide anything.
    pub closed: bool,
}

impl ShapeInput {
    /// Check indices and edge/vertex agreement.
    pub fn validate(&self) -> Result<()> {
        if self.edges.is_empty() {
            return Err(HlrError::InvalidShape("shape has no edges".into()));
        }
        let tol = 1e-6;
        for (i, e) in self.edges.iter().enumerate() {
            for (k, &v) in e.vertices.iter().enumerate() {
                let p = self.vertices.get(v).ok_or_else(|| {
                    HlrError::InvalidShape(format!("edge {i} references missing vertex {v}"))
                })?;
                let u = if k == 0 {
                    e.curve.first_parameter()
                } else {
                    e.curve.last_parameter()
                };
                let q = e.curve.value(u);
                let scale = 1.0 + p.coords.norm();
                if (q - p).norm() > tol * scale {
                    return Err(HlrError::InvalidShape(format!(
                        "edge {i} endpoint {k} is {} away from vertex {v}",
                        (q - p).norm()
                    )));
                }
            }
        }
        for (i, f) in self.faces.iter().enumerate() {
            for wire in &f.wires {
                if wire.is_empty() {
                    return Err(HlrError::InvalidShape(format!("face {i} has an empty wire")));
                }
                for (k, we) in wire.iter().enumerate() {
                    if we.edge >= self.edges.len() {
                        return Err(HlrError::InvalidShape(format!(
                            "face {i} references missing edge {}",
                            we.edge
                        )));
                    }
                    // The same half-edge twice is only legal for seams, which
                    // appear once in each direction.
                    if wire[..k].contains(we) {
                        return Err(HlrError::InvalidShape(format!(
                            "face {i} uses edge {} twice with the same orientation",
                            we.edge
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply a rigid motion to every vertex, curve and surface.
    pub fn transformed(&self, t: &Transform) -> Result<Self> {
        let vertices = self.vertices.iter().map(|p| t.apply_point(p)).collect();
        let edges = self
            .edges
            .iter()
            .map(|e| {
                Ok(EdgeInput {
                    curve: e.curve.transformed(t)?,
                    vertices: e.vertices,
                    marks: e.marks,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let faces = self
            .faces
            .iter()
            .map(|f| {
                Ok(FaceInput {
                    surface: f.surface.transformed(t)?,
                    orientation: f.orientation,
                    wires: f.wires.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            vertices,
            edges,
            faces,
            closed: self.closed,
        })
    }
}
