#![warn(missing_docs)]

//! Exact hidden-line removal for B-rep shapes in the vcad kernel.
//!
//! Given shapes made of faces, edges and vertices over analytic curves
//! and surfaces, and a projector, the engine splits every edge into
//! parameter intervals that are visible or hidden, and sorts them into
//! drawing categories:
//!
//! - **Sharp / smooth edges**: real edges between faces
//! - **Outlines**: silhouettes of curved faces for the current view
//! - **Seams** and **isolines**
//!
//! The pipeline per (edge, face) pair is: box culling, interferences with
//! the face boundary, point classification along the edge, then merging
//! of all faces into one hide-level sequence per edge.
//!
//! # Example
//!
//! ```
//! use vcad_kernel_hlr::{make_box, HlrAlgo, HlrParams, Projector, ViewDirection, Visibility};
//! use vcad_kernel_hlr_geom::Point3;
//!
//! let mut algo = HlrAlgo::new(HlrParams::default()).unwrap();
//! algo.load(&make_box(Point3::origin(), [1.0, 1.0, 1.0]).unwrap(), None, 0).unwrap();
//! algo.update(Projector::from_view(ViewDirection::Top).unwrap()).unwrap();
//! algo.hide().unwrap();
//!
//! // Bottom edge 0 lies under the top face.
//! assert!(algo.intervals(0, Visibility::Visible).unwrap().is_empty());
//! ```

pub mod algo;
pub mod area;
pub mod bbox;
pub mod classifier;
pub mod driver;
pub mod error;
pub mod extract;
pub mod interference;
pub mod outliner;
pub mod params;
pub mod primitives;
pub mod projector;
pub mod sequencer;
pub mod shape;
pub mod store;
pub mod style;
pub mod types;

pub use algo::{AlgoState, HlrAlgo, HlrStats};
pub use area::{AreaInterval, AreaLimit, AreaVertex, EdgeAreas};
pub use classifier::{Coverage, FaceCoverage, FaceDomainTest, FaceVerdict, PointClass, State};
pub use driver::{hide_views, ViewOutput, WorkerContext};
pub use error::{HlrError, Result};
pub use extract::{extract, project_segments, HlrSegment};
pub use interference::{Interference, InterferenceReport, Side};
pub use params::HlrParams;
pub use primitives::{make_box, make_cylinder, make_planar_face, make_sphere};
pub use projector::{Projector, ViewDirection};
pub use sequencer::{EdgeSequence, NodeKind, SequenceInterval, SequenceNode};
pub use shape::{EdgeInput, EdgeMarks, FaceInput, Orientation, ShapeData, ShapeInput, WireEdge};
pub use store::{EntityStore, ShapeBounds};
pub use style::HlrStyle;
pub use types::{
    BoundingBox2D, EdgeCategory, Point2D, ProjectedCurve, ProjectedView, Visibility,
};
