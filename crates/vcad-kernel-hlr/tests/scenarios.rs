//! End-to-end hidden-line scenarios on primitive shapes.

use approx::assert_relative_eq;
use vcad_kernel_hlr::{
    extract, make_box, make_cylinder, make_planar_face, EdgeCategory, EdgeInput, HlrAlgo,
    HlrParams, HlrStyle, Projector, ShapeInput, ViewDirection, Visibility,
};
use vcad_kernel_hlr_geom::{Curve, Point3, Transform, Vec3};

fn algo_with(shapes: &[ShapeInput], projector: Projector) -> HlrAlgo {
    let mut algo = HlrAlgo::new(HlrParams::default()).unwrap();
    for s in shapes {
        algo.load(s, None, 0).unwrap();
    }
    algo.update(projector).unwrap();
    algo
}

fn visible(algo: &HlrAlgo, edge: usize) -> Vec<(f64, f64)> {
    algo.intervals(edge, Visibility::Visible)
        .unwrap()
        .into_iter()
        .map(|(a, b, _)| (a, b))
        .collect()
}

fn hidden(algo: &HlrAlgo, edge: usize) -> Vec<(f64, f64)> {
    algo.intervals(edge, Visibility::Hidden)
        .unwrap()
        .into_iter()
        .map(|(a, b, _)| (a, b))
        .collect()
}

fn unit_cube() -> ShapeInput {
    make_box(Point3::origin(), [1.0, 1.0, 1.0]).unwrap()
}

#[test]
fn test_cube_top_view() {
    let mut algo = algo_with(&[unit_cube()], Projector::from_view(ViewDirection::Top).unwrap());
    algo.partial_hide().unwrap();

    // Top edges: visible over their whole length.
    for e in 4..8 {
        assert_eq!(visible(&algo, e), vec![(0.0, 1.0)], "top edge {e}");
        assert!(hidden(&algo, e).is_empty());
    }
    // Bottom edges: hidden over their whole length.
    for e in 0..4 {
        assert_eq!(hidden(&algo, e), vec![(0.0, 1.0)], "bottom edge {e}");
        assert!(visible(&algo, e).is_empty());
    }
    // Vertical edges run bottom to top: lower half hidden, upper half visible.
    for e in 8..12 {
        let h = hidden(&algo, e);
        let v = visible(&algo, e);
        assert_eq!(h.len(), 1);
        assert_eq!(v.len(), 1);
        assert_relative_eq!(h[0].0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(h[0].1, 0.5, epsilon = 1e-6);
        assert_relative_eq!(v[0].0, 0.5, epsilon = 1e-6);
        assert_relative_eq!(v[0].1, 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_cube_isometric_hides_far_corner() {
    let mut algo = algo_with(
        &[unit_cube()],
        Projector::from_view(ViewDirection::ISOMETRIC_STANDARD).unwrap(),
    );
    algo.hide().unwrap();

    // The corner (1, 1, 0) points away from the viewer.
    let far = [1, 2, 10];
    for e in 0..12 {
        if far.contains(&e) {
            assert!(visible(&algo, e).is_empty(), "edge {e} should be hidden");
            assert_eq!(hidden(&algo, e).len(), 1);
            assert!(algo.hide_level(e) >= 1);
        } else {
            assert_eq!(visible(&algo, e), vec![(0.0, 1.0)], "edge {e} should be visible");
        }
    }
}

#[test]
fn test_cylinder_bottom_circle_half_hidden() {
    let cylinder = make_cylinder(Point3::origin(), 1.0, 2.0).unwrap();
    let view = ViewDirection::Isometric {
        azimuth: 0.0,
        elevation: std::f64::consts::FRAC_PI_6,
    };
    let mut algo = algo_with(&[cylinder], Projector::from_view(view).unwrap());
    algo.hide().unwrap();

    let pi = std::f64::consts::PI;
    let h = hidden(&algo, 0);
    assert_eq!(h.len(), 1, "bottom circle hidden runs: {h:?}");
    assert_relative_eq!(h[0].0, 0.0, epsilon = 1e-3);
    assert_relative_eq!(h[0].1, pi, epsilon = 1e-3);
    let v = visible(&algo, 0);
    assert_eq!(v.len(), 1);
    assert_relative_eq!(v[0].1, 2.0 * pi, epsilon = 1e-9);

    assert!(hidden(&algo, 1).is_empty(), "top circle is fully visible");

    // Two silhouettes, both visible.
    let bounds = algo.store().shape(0).unwrap().clone();
    assert_eq!(bounds.outlines.len(), 2);
    for e in bounds.outlines.clone() {
        assert!(hidden(&algo, e).is_empty());
    }
}

#[test]
fn test_separated_cubes_cross_hiding_is_culled() {
    let a = unit_cube();
    let b = make_box(Point3::new(3.0, 0.0, 0.0), [1.0, 1.0, 1.0]).unwrap();
    // Looking along +Z.
    let projector = Projector::orthographic(Vec3::z(), Vec3::y()).unwrap();
    let mut algo = algo_with(&[a, b], projector);
    algo.partial_hide().unwrap();
    let before: Vec<_> = (0..24).map(|e| (visible(&algo, e), hidden(&algo, e))).collect();

    algo.hide_pair(0, 1).unwrap();
    let pass = algo.last_pass_stats();
    assert_eq!(pass.interferences, 0);
    assert!(pass.pairs_considered > 0);
    assert_eq!(pass.pairs_culled, pass.pairs_considered);

    algo.hide_pair(1, 0).unwrap();
    let pass = algo.last_pass_stats();
    assert_eq!(pass.interferences, 0);
    assert_eq!(pass.pairs_culled, pass.pairs_considered);

    let after: Vec<_> = (0..24).map(|e| (visible(&algo, e), hidden(&algo, e))).collect();
    assert_eq!(before, after);
}

#[test]
fn test_inner_cube_fully_hidden() {
    let outer = make_box(Point3::new(-1.0, -1.0, -1.0), [2.0, 2.0, 2.0]).unwrap();
    let inner = make_box(Point3::new(-0.3, -0.3, -0.3), [0.6, 0.6, 0.6])
        .unwrap()
        .transformed(&Transform::rotation_z(std::f64::consts::FRAC_PI_4))
        .unwrap();
    let mut algo = algo_with(&[outer, inner], Projector::from_view(ViewDirection::Top).unwrap());
    algo.partial_hide().unwrap();
    algo.hide().unwrap();

    let inner_edges = algo.store().shape(1).unwrap().edges.clone();
    assert_eq!(inner_edges.len(), 12);
    for e in inner_edges {
        let edge = algo.store().edge(e).unwrap();
        let (first, last) = edge.range();
        assert!(visible(&algo, e).is_empty(), "inner edge {e} has visible parts");
        let h = hidden(&algo, e);
        assert_eq!(h.len(), 1);
        assert_relative_eq!(h[0].0, first, epsilon = 1e-9);
        assert_relative_eq!(h[0].1, last, epsilon = 1e-9);
        assert!(algo.hide_level(e) >= 1);
    }
}

#[test]
fn test_iso_line_category_selection() {
    let face = make_planar_face(2.0, 1.0, true).unwrap();
    let mut algo = algo_with(&[face], Projector::from_view(ViewDirection::Top).unwrap());
    algo.hide().unwrap();

    let iso_only = HlrStyle {
        visible_iso: true,
        ..HlrStyle::none()
    };
    let segs = extract(&algo, &iso_only).unwrap();
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].edge, 4);
    assert_eq!(segs[0].category, EdgeCategory::IsoLine);
    assert_relative_eq!(segs[0].last - segs[0].first, 1.0, epsilon = 1e-9);

    let sharp_only = HlrStyle {
        visible_sharp: true,
        ..HlrStyle::none()
    };
    let segs = extract(&algo, &sharp_only).unwrap();
    assert_eq!(segs.len(), 4);
    assert!(segs.iter().all(|s| s.edge != 4));
}

fn diagonal_segment() -> ShapeInput {
    let a = Point3::new(1.0, 1.0, 0.0);
    let b = Point3::new(2.0, 2.0, 0.0);
    ShapeInput {
        vertices: vec![a, b],
        edges: vec![EdgeInput::new(Curve::segment(a, b).unwrap(), 0, 1)],
        faces: Vec::new(),
        closed: false,
    }
}

#[test]
fn test_shared_vertex_is_not_an_interference() {
    let face = make_planar_face(1.0, 1.0, false).unwrap();
    let mut algo = algo_with(
        &[face, diagonal_segment()],
        Projector::from_view(ViewDirection::Top).unwrap(),
    );
    algo.hide().unwrap();
    let stats = algo.stats();
    assert_eq!(stats.interferences, 0);
    assert!(stats.suppressed >= 1);

    let seg_edge = algo.store().shape(1).unwrap().edges.start;
    let with_face = algo.edge_areas(seg_edge).unwrap().areas().len();

    let mut alone = algo_with(
        &[diagonal_segment()],
        Projector::from_view(ViewDirection::Top).unwrap(),
    );
    alone.hide().unwrap();
    let without_face = alone.edge_areas(0).unwrap().areas().len();
    assert_eq!(with_face, without_face);
    assert_eq!(with_face, 1);
}
