//! Multi-view driver.
//!
//! Every view gets a [`WorkerContext`] that owns its projector, style and
//! parameters and shares the input shapes read-only. Contexts are moved into
//! rayon tasks; each task builds a private store and orchestrator, so views
//! never touch each other's state.

use std::sync::Arc;

use rayon::prelude::*;

use crate::algo::{HlrAlgo, HlrStats};
use crate::error::Result;
use crate::extract::{extract, project_segments, HlrSegment};
use crate::params::HlrParams;
use crate::projector::{Projector, ViewDirection};
use crate::shape::ShapeInput;
use crate::style::HlrStyle;
use crate::types::ProjectedView;

/// Everything one view needs.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Shapes to draw, shared between views.
    pub shapes: Arc<[ShapeInput]>,
    /// Projection.
    pub projector: Projector,
    /// Named view, recorded in the output drawing.
    pub view: Option<ViewDirection>,
    /// Categories to keep.
    pub style: HlrStyle,
    /// Engine parameters.
    pub params: HlrParams,
    /// Isolines per face and direction.
    pub iso_count: usize,
}

/// Result of one view.
#[derive(Debug, Clone)]
pub struct ViewOutput {
    /// Kept segments.
    pub segments: Vec<HlrSegment>,
    /// Segments flattened to 2D.
    pub drawing: ProjectedView,
    /// Counters of all hide passes.
    pub stats: HlrStats,
    /// Edges left out of the drawing because their areas did not rebuild.
    pub failed_edges: Vec<usize>,
}

impl WorkerContext {
    /// Context for a named view with default style and parameters.
    pub fn new(shapes: Arc<[ShapeInput]>, view: ViewDirection) -> Result<Self> {
        let params = HlrParams::default();
        Ok(Self {
            shapes,
            projector: Projector::from_view(view)?,
            view: Some(view),
            style: HlrStyle::default(),
            iso_count: params.iso_count,
            params,
        })
    }

    /// Load, project, hide and extract.
    pub fn run(self) -> Result<ViewOutput> {
        let mut algo = HlrAlgo::new(self.params)?;
        for shape in self.shapes.iter() {
            algo.load(shape, None, self.iso_count)?;
        }
        algo.update(self.projector)?;
        algo.partial_hide()?;
        algo.hide()?;
        let segments = extract(&algo, &self.style)?;
        let drawing = project_segments(&algo, &segments, self.view)?;
        Ok(ViewOutput {
            segments,
            drawing,
            stats: algo.stats(),
            failed_edges: algo.failed_edges(),
        })
    }
}

/// Run every context in parallel; results keep the input order.
pub fn hide_views(contexts: Vec<WorkerContext>) -> Vec<Result<ViewOutput>> {
    contexts.into_par_iter().map(WorkerContext::run).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{make_box, make_cylinder};
    use vcad_kernel_hlr_geom::Point3;

    fn shapes() -> Arc<[ShapeInput]> {
        vec![
            make_box(Point3::origin(), [1.0; 3]).unwrap(),
            make_cylinder(Point3::new(3.0, 0.0, 0.0), 0.5, 1.0).unwrap(),
        ]
        .into()
    }

    #[test]
    fn test_views_run_independently() {
        let shapes = shapes();
        let views = [ViewDirection::Top, ViewDirection::Front, ViewDirection::Right];
        let contexts: Vec<_> = views
            .iter()
            .map(|&v| WorkerContext::new(shapes.clone(), v).unwrap())
            .collect();
        let results = hide_views(contexts);
        assert_eq!(results.len(), 3);
        for (result, view) in results.into_iter().zip(views) {
            let out = result.unwrap();
            assert_eq!(out.drawing.view_direction, Some(view));
            assert!(out.drawing.num_visible() > 0);
            assert_eq!(out.drawing.num_hidden(), 0);
            assert!(out.failed_edges.is_empty());
            assert_eq!(out.stats.inconsistent, 0);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let shapes = shapes();
        let ctx = WorkerContext::new(shapes, ViewDirection::ISOMETRIC_STANDARD).unwrap();
        let sequential = ctx.clone().run().unwrap();
        let parallel = hide_views(vec![ctx.clone(), ctx]);
        for out in parallel {
            assert_eq!(out.unwrap().segments, sequential.segments);
        }
    }
}
