//! Turn classified edges into drawing segments.

use serde::{Deserialize, Serialize};
use vcad_kernel_hlr_geom::{CurveEvaluator, CurveType};

use crate::algo::HlrAlgo;
use crate::classifier::State;
use crate::error::{HlrError, Result};
use crate::projector::ViewDirection;
use crate::shape::Orientation;
use crate::style::HlrStyle;
use crate::types::{EdgeCategory, Point2D, ProjectedCurve, ProjectedView, Visibility};

/// A visible or hidden piece of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HlrSegment {
    /// Owning shape.
    pub shape: usize,
    /// Global edge index.
    pub edge: usize,
    /// Drawing category.
    pub category: EdgeCategory,
    /// Visibility.
    pub visibility: Visibility,
    /// First edge parameter.
    pub first: f64,
    /// Last edge parameter.
    pub last: f64,
    /// Drawing direction.
    pub orientation: Orientation,
    /// Largest number of faces hiding the piece.
    pub hide_level: usize,
    /// Part of the piece was classified without a decision.
    pub ambiguous: bool,
}

/// Segments of every live edge that `style` asks for.
///
/// `On` pieces draw as visible and merge with neighbouring `Out` pieces.
/// An edge whose areas cannot be rebuilt is left out of the drawing; see
/// [`HlrAlgo::failed_edges`].
pub fn extract(algo: &HlrAlgo, style: &HlrStyle) -> Result<Vec<HlrSegment>> {
    let store = algo.store();
    let mut out = Vec::new();
    for shape in store.live_shapes() {
        let bounds = store.live_shape(shape)?;
        for e in bounds.all_edges() {
            let Some(edge) = store.edge(e) else {
                continue;
            };
            if edge.flags.removed {
                continue;
            }
            let category = edge.category();
            let areas = match algo.edge_areas(e) {
                Ok(areas) => areas,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(error = %err, edge = e, "edge skipped");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let mut pending: Option<HlrSegment> = None;
            for area in areas.areas() {
                let visibility = if area.state == State::In {
                    Visibility::Hidden
                } else {
                    Visibility::Visible
                };
                match pending.as_mut() {
                    Some(seg) if seg.visibility == visibility && seg.last == area.first => {
                        seg.last = area.last;
                        seg.hide_level = seg.hide_level.max(area.level);
                        seg.ambiguous |= area.ambiguous;
                        continue;
                    }
                    _ => {}
                }
                if let Some(seg) = pending.take() {
                    if style.wants(seg.category, seg.visibility) {
                        out.push(seg);
                    }
                }
                pending = Some(HlrSegment {
                    shape,
                    edge: e,
                    category,
                    visibility,
                    first: area.first,
                    last: area.last,
                    orientation: edge.orientation,
                    hide_level: area.level,
                    ambiguous: area.ambiguous,
                });
            }
            if let Some(seg) = pending {
                if style.wants(seg.category, seg.visibility) {
                    out.push(seg);
                }
            }
        }
    }
    tracing::debug!(segments = out.len(), "segments extracted");
    Ok(out)
}

/// Sample segments into 2D polylines.
pub fn project_segments(
    algo: &HlrAlgo,
    segments: &[HlrSegment],
    view: Option<ViewDirection>,
) -> Result<ProjectedView> {
    let store = algo.store();
    let projector = store
        .projector()
        .ok_or_else(|| HlrError::InvalidProjector("store has no projector".into()))?;
    let samples = algo.params().edge_samples.max(2);
    let mut drawing = ProjectedView::new(view);

    for seg in segments {
        let Some(edge) = store.edge(seg.edge) else {
            continue;
        };
        let curve = &edge.curve;
        let n = if curve.curve_type() == CurveType::Line {
            1
        } else {
            let (a, b) = edge.range();
            let fraction = ((seg.last - seg.first) / (b - a)).abs();
            ((curve.nb_samples().max(samples) as f64 * fraction).ceil() as usize).max(2)
        };
        let mut points: Vec<Point2D> = (0..=n)
            .map(|i| {
                let u = seg.first + (seg.last - seg.first) * i as f64 / n as f64;
                projector.project(&curve.value(u)).into()
            })
            .collect();
        if seg.orientation == Orientation::Reversed {
            points.reverse();
        }
        drawing.add_curve(ProjectedCurve {
            points,
            visibility: seg.visibility,
            category: seg.category,
            edge: seg.edge,
            depth: projector.depth(&curve.value(0.5 * (seg.first + seg.last))),
        });
    }
    Ok(drawing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HlrParams;
    use crate::primitives::make_box;
    use crate::projector::Projector;
    use vcad_kernel_hlr_geom::Point3;

    fn hidden_box() -> HlrAlgo {
        let mut algo = HlrAlgo::new(HlrParams::default()).unwrap();
        algo.load(&make_box(Point3::origin(), [1.0; 3]).unwrap(), None, 0)
            .unwrap();
        algo.update(Projector::from_view(ViewDirection::Top).unwrap())
            .unwrap();
        algo.hide().unwrap();
        algo
    }

    #[test]
    fn test_default_style_drops_hidden() {
        let algo = hidden_box();
        let segs = extract(&algo, &HlrStyle::default()).unwrap();
        assert!(segs.iter().all(|s| s.visibility == Visibility::Visible));
        // Four top edges and the upper halves of the vertical ones.
        assert_eq!(segs.len(), 8);
    }

    #[test]
    fn test_all_style_covers_every_edge() {
        let algo = hidden_box();
        let segs = extract(&algo, &HlrStyle::all()).unwrap();
        assert_eq!(segs.iter().filter(|s| s.visibility == Visibility::Hidden).count(), 8);
        for e in 0..12 {
            let len: f64 = segs
                .iter()
                .filter(|s| s.edge == e)
                .map(|s| s.last - s.first)
                .sum();
            assert!((len - 1.0).abs() < 1e-9, "edge {e} covers {len}");
        }
    }

    #[test]
    fn test_projected_view_bounds() {
        let algo = hidden_box();
        let segs = extract(&algo, &HlrStyle::all()).unwrap();
        let view = project_segments(&algo, &segs, Some(ViewDirection::Top)).unwrap();
        assert_eq!(view.curves.len(), segs.len());
        assert!((view.bounds.width() - 1.0).abs() < 1e-9);
        assert!((view.bounds.height() - 1.0).abs() < 1e-9);
        assert_eq!(view.num_hidden(), 8);
    }
}
