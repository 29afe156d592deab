//! Benchmarks for the full hide pass.
//!
//! Run with: cargo bench -p vcad-kernel-hlr --bench hide

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vcad_kernel_hlr::{
    make_box, make_cylinder, HlrAlgo, HlrParams, Projector, ShapeInput, ViewDirection,
};
use vcad_kernel_hlr_geom::Point3;

/// A grid of alternating boxes and cylinders.
fn scene(n: usize) -> Vec<ShapeInput> {
    let mut shapes = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let origin = Point3::new(1.5 * i as f64, 1.5 * j as f64, 0.0);
            let shape = if (i + j) % 2 == 0 {
                make_box(origin, [1.0, 1.0, 1.0 + 0.1 * j as f64])
            } else {
                make_cylinder(origin + Point3::new(0.5, 0.5, 0.0).coords, 0.5, 1.2)
            };
            if let Ok(shape) = shape {
                shapes.push(shape);
            }
        }
    }
    shapes
}

fn hide_scene(shapes: &[ShapeInput], view: ViewDirection) -> HlrAlgo {
    let mut algo = HlrAlgo::new(HlrParams::default()).unwrap();
    for shape in shapes {
        algo.load(shape, None, 0).unwrap();
    }
    algo.update(Projector::from_view(view).unwrap()).unwrap();
    algo.hide().unwrap();
    algo
}

fn bench_hide(c: &mut Criterion) {
    let mut group = c.benchmark_group("hide");
    group.sample_size(10);
    for n in [1, 2, 4] {
        let shapes = scene(n);
        group.bench_with_input(BenchmarkId::new("isometric", n * n), &shapes, |b, shapes| {
            b.iter(|| hide_scene(black_box(shapes), ViewDirection::ISOMETRIC_STANDARD))
        });
    }
    group.finish();
}

fn bench_single_box_views(c: &mut Criterion) {
    let shapes = vec![make_box(Point3::origin(), [1.0, 1.0, 1.0]).unwrap()];
    for (name, view) in [
        ("top", ViewDirection::Top),
        ("front", ViewDirection::Front),
        ("isometric", ViewDirection::ISOMETRIC_STANDARD),
    ] {
        c.bench_function(&format!("box_{name}"), |b| {
            b.iter(|| hide_scene(black_box(&shapes), view))
        });
    }
}

criterion_group!(benches, bench_hide, bench_single_box_views);
criterion_main!(benches);
