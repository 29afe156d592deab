//! Draw a box and a cylinder in the six standard views plus isometric,
//! in parallel, and print a summary (or the JSON drawing with `--json`).
//!
//! Run with: RUST_LOG=vcad_kernel_hlr=debug cargo run -p vcad-kernel-hlr --example cube_views

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use vcad_kernel_hlr::{
    hide_views, make_box, make_cylinder, HlrStyle, ShapeInput, ViewDirection, WorkerContext,
};
use vcad_kernel_hlr_geom::Point3;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let json = std::env::args().any(|a| a == "--json");

    let shapes: Arc<[ShapeInput]> = vec![
        make_box(Point3::origin(), [2.0, 1.0, 1.0])?,
        make_cylinder(Point3::new(1.0, 0.5, 1.0), 0.4, 1.5)?,
    ]
    .into();

    let views = [
        ViewDirection::Front,
        ViewDirection::Back,
        ViewDirection::Top,
        ViewDirection::Bottom,
        ViewDirection::Right,
        ViewDirection::Left,
        ViewDirection::ISOMETRIC_STANDARD,
    ];
    let contexts = views
        .iter()
        .map(|&view| {
            let mut ctx = WorkerContext::new(shapes.clone(), view)?;
            ctx.style = HlrStyle::all();
            Ok(ctx)
        })
        .collect::<vcad_kernel_hlr::Result<Vec<_>>>()?;

    for (view, result) in views.iter().zip(hide_views(contexts)) {
        let out = result.with_context(|| format!("hiding {view:?}"))?;
        if json {
            println!("{}", out.drawing.to_json()?);
            continue;
        }
        println!(
            "{view:?}: {} visible, {} hidden, {:.3} x {:.3}, {} interferences, {} ambiguous",
            out.drawing.num_visible(),
            out.drawing.num_hidden(),
            out.drawing.bounds.width(),
            out.drawing.bounds.height(),
            out.stats.interferences,
            out.stats.ambiguous,
        );
    }
    Ok(())
}
