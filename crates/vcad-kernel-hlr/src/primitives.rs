//! Primitive shape builders.
//!
//! Boxes, cylinders, spheres and single planar faces with the face,
//! wire and seam layout a B-rep kernel would produce, for tests, demos
//! and benchmarks.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use vcad_kernel_hlr_geom::{
    Circle, Cylinder, Plane, Point3, Sphere, Surface, Vec3, Curve, CurveGeometry,
};

use crate::error::{HlrError, Result};
use crate::shape::{EdgeInput, EdgeMarks, FaceInput, Orientation, ShapeInput, WireEdge};

/// Axis-aligned box with its minimum corner at `origin`.
///
/// Vertex layout:
/// ```text
///     v4----v5
///    /|    /|
///   v7----v6|    z
///   | v0--|-v1   | y
///   |/    |/     |/
///   v3----v2     +---x
/// ```
/// Every face is planar with an outward normal; vertical edges run from
/// the bottom vertex to the top one.
pub fn make_box(origin: Point3, size: [f64; 3]) -> Result<ShapeInput> {
    let [sx, sy, sz] = size;
    if !(sx > 0.0 && sy > 0.0 && sz > 0.0) {
        return Err(HlrError::InvalidShape(format!("box size {size:?}")));
    }
    let o = origin.coords;
    let vertices: Vec<Point3> = [
        (0.0, 0.0, 0.0),
        (sx, 0.0, 0.0),
        (sx, sy, 0.0),
        (0.0, sy, 0.0),
        (0.0, 0.0, sz),
        (sx, 0.0, sz),
        (sx, sy, sz),
        (0.0, sy, sz),
    ]
    .iter()
    .map(|&(x, y, z)| Point3::from(o + Vec3::new(x, y, z)))
    .collect();

    // Bottom, top and vertical edges.
    let edge_pairs: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
    let mut edges = Vec::with_capacity(12);
    let mut by_vertices = HashMap::new();
    for (i, &(a, b)) in edge_pairs.iter().enumerate() {
        edges.push(EdgeInput::new(Curve::segment(vertices[a], vertices[b])?, a, b));
        by_vertices.insert((a, b), i);
    }

    // Loops are counter-clockwise seen from outside; plane normal = x_dir × y_dir.
    let face_defs: [([usize; 4], usize, Vec3, Vec3); 6] = [
        ([0, 3, 2, 1], 0, Vec3::y(), Vec3::x()),
        ([4, 5, 6, 7], 4, Vec3::x(), Vec3::y()),
        ([0, 1, 5, 4], 0, Vec3::x(), Vec3::z()),
        ([2, 3, 7, 6], 3, Vec3::z(), Vec3::x()),
        ([0, 4, 7, 3], 0, Vec3::z(), Vec3::y()),
        ([1, 2, 6, 5], 1, Vec3::y(), Vec3::z()),
    ];
    let mut faces = Vec::with_capacity(6);
    for (loop_vertices, plane_origin, x_dir, y_dir) in face_defs {
        let mut wire = Vec::with_capacity(4);
        for j in 0..4 {
            let (a, b) = (loop_vertices[j], loop_vertices[(j + 1) % 4]);
            let we = match (by_vertices.get(&(a, b)), by_vertices.get(&(b, a))) {
                (Some(&e), _) => WireEdge::forward(e),
                (None, Some(&e)) => WireEdge::reversed(e),
                (None, None) => {
                    return Err(HlrError::InvalidShape(format!("no box edge {a}-{b}")))
                }
            };
            wire.push(we);
        }
        faces.push(FaceInput {
            surface: Surface::Plane(Plane::new(vertices[plane_origin], x_dir, y_dir)?),
            orientation: Orientation::Forward,
            wires: vec![wire],
        });
    }

    Ok(ShapeInput {
        vertices,
        edges,
        faces,
        closed: true,
    })
}

/// Cylinder standing on `center` along +Z.
///
/// One lateral face bounded by the bottom circle, a seam line at `u = 0`
/// (traversed once in each direction) and the top circle, plus two
/// planar caps.
pub fn make_cylinder(center: Point3, radius: f64, height: f64) -> Result<ShapeInput> {
    if !(radius > 0.0 && height > 0.0) {
        return Err(HlrError::InvalidShape(format!(
            "cylinder radius {radius} height {height}"
        )));
    }
    let top_center = center + height * Vec3::z();
    let v_bot = center + radius * Vec3::x();
    let v_top = top_center + radius * Vec3::x();

    let bottom = Circle::new(center, Vec3::z(), Vec3::x(), radius)?;
    let top = Circle::new(top_center, Vec3::z(), Vec3::x(), radius)?;
    let edges = vec![
        EdgeInput::new(Curve::full_circle(bottom), 0, 0),
        EdgeInput::new(Curve::full_circle(top), 1, 1),
        EdgeInput::new(Curve::segment(v_bot, v_top)?, 0, 1),
    ];

    let lateral = FaceInput {
        surface: Surface::Cylinder(Cylinder::new(center, Vec3::z(), Vec3::x(), radius)?),
        orientation: Orientation::Forward,
        wires: vec![vec![
            WireEdge::forward(0),
            WireEdge::forward(2),
            WireEdge::reversed(1),
            WireEdge::reversed(2),
        ]],
    };
    let bottom_cap = FaceInput {
        surface: Surface::Plane(Plane::new(center, Vec3::x(), -Vec3::y())?),
        orientation: Orientation::Forward,
        wires: vec![vec![WireEdge::reversed(0)]],
    };
    let top_cap = FaceInput {
        surface: Surface::Plane(Plane::new(top_center, Vec3::x(), Vec3::y())?),
        orientation: Orientation::Forward,
        wires: vec![vec![WireEdge::forward(1)]],
    };

    Ok(ShapeInput {
        vertices: vec![v_bot, v_top],
        edges,
        faces: vec![lateral, bottom_cap, top_cap],
        closed: true,
    })
}

/// Sphere around `center` with a single face and a seam meridian in the XZ plane.
pub fn make_sphere(center: Point3, radius: f64) -> Result<ShapeInput> {
    if radius <= 0.0 {
        return Err(HlrError::InvalidShape(format!("sphere radius {radius}")));
    }
    let south = center - radius * Vec3::z();
    let north = center + radius * Vec3::z();
    // y_dir = normal × x_dir = +Z, so the meridian climbs from the south pole.
    let meridian = Circle::new(center, -Vec3::y(), Vec3::x(), radius)?;
    let seam = Curve::new(CurveGeometry::Circle(meridian), -FRAC_PI_2, FRAC_PI_2)?;

    Ok(ShapeInput {
        vertices: vec![south, north],
        edges: vec![EdgeInput::new(seam, 0, 1)],
        faces: vec![FaceInput {
            surface: Surface::Sphere(Sphere::new(center, Vec3::z(), Vec3::x(), radius)?),
            orientation: Orientation::Forward,
            wires: vec![vec![WireEdge::forward(0), WireEdge::reversed(0)]],
        }],
        closed: true,
    })
}

/// A `width × height` rectangle in the XY plane at the origin, normal +Z.
///
/// With `iso_line`, an internal isoparametric edge runs across the face
/// at `x = width / 2`.
pub fn make_planar_face(width: f64, height: f64, iso_line: bool) -> Result<ShapeInput> {
    if !(width > 0.0 && height > 0.0) {
        return Err(HlrError::InvalidShape(format!("face size {width} x {height}")));
    }
    let mut vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(width, 0.0, 0.0),
        Point3::new(width, height, 0.0),
        Point3::new(0.0, height, 0.0),
    ];
    let mut edges = Vec::with_capacity(5);
    for i in 0..4 {
        let j = (i + 1) % 4;
        edges.push(EdgeInput::new(Curve::segment(vertices[i], vertices[j])?, i, j));
    }
    if iso_line {
        let a = Point3::new(width / 2.0, 0.0, 0.0);
        let b = Point3::new(width / 2.0, height, 0.0);
        vertices.extend([a, b]);
        edges.push(EdgeInput::new(Curve::segment(a, b)?, 4, 5).with_marks(EdgeMarks {
            internal: true,
            iso_line: true,
            outline: false,
        }));
    }
    Ok(ShapeInput {
        vertices,
        edges,
        faces: vec![FaceInput {
            surface: Surface::Plane(Plane::new(Point3::origin(), Vec3::x(), Vec3::y())?),
            orientation: Orientation::Forward,
            wires: vec![(0..4).map(WireEdge::forward).collect()],
        }],
        closed: false,
    })
}
