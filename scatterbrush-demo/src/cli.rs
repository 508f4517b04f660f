use crate::scene::PlaneScene;
use anyhow::{Result, bail};
use scatterbrush::config::{Diagnostics, EngineDesc, FluxMode, JitterAlgorithm, RampMode, ScatterOptions, TransformRanges};
use scatterbrush::modifiers::ModifierMask;
use scatterbrush::{
    AssetPool, DVec3, EventOutcome, HierarchyPolicy, NodeRef, Ray, ScatterEngine, ScatterEvent,
    ToolMode,
};

/// Height the scripted pointer rays are cast from.
const EYE_HEIGHT: f64 = 1000.0;

fn down_at(x: f64, z: f64) -> Ray {
    Ray::new(DVec3::new(x, EYE_HEIGHT, z), DVec3::NEG_Y)
}

/// Builds a scene with a flat ground, a slope rising off its +X edge and
/// three source meshes.
fn build_scene() -> (PlaneScene, Vec<NodeRef>, Vec<NodeRef>) {
    let mut scene = PlaneScene::new();
    let ground = scene.add_quad(
        "ground",
        DVec3::new(-500.0, 0.0, -500.0),
        DVec3::new(0.0, 0.0, 1000.0),
        DVec3::new(1000.0, 0.0, 0.0),
    );
    let slope = scene.add_quad(
        "slope",
        DVec3::new(500.0, 0.0, -500.0),
        DVec3::new(0.0, 0.0, 1000.0),
        DVec3::new(500.0, 300.0, 0.0),
    );
    let sources = ["rock", "shrub", "log"]
        .iter()
        .map(|name| scene.add_mesh(name))
        .collect();
    (scene, sources, vec![ground, slope])
}

/// Settings shared by every scenario.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub seed: u64,
    /// Turns on every engine trace switch
    pub trace: bool,
}

fn build_engine(
    options: ScatterOptions,
    ranges: TransformRanges,
    run: RunConfig,
) -> Result<ScatterEngine<PlaneScene>> {
    let (scene, source_nodes, target_nodes) = build_scene();
    let mut sources = AssetPool::new();
    for node in &source_nodes {
        sources.add_entry(&scene, node)?;
    }
    let mut targets = AssetPool::new();
    for node in &target_nodes {
        targets.add_entry(&scene, node)?;
    }
    let diagnostics = if run.trace {
        Diagnostics::all()
    } else {
        Diagnostics::default()
    };
    let desc = EngineDesc::new().rng_seed(run.seed).diagnostics(diagnostics);
    Ok(ScatterEngine::new(scene, desc, options, ranges, sources, targets))
}

fn log_events(engine: &ScatterEngine<PlaneScene>) {
    for event in engine.poll_events() {
        match &event {
            ScatterEvent::PlacementCreated { node, source, point, .. } => log::info!(
                "placed {} from {} at ({:.1}, {:.1}, {:.1})",
                node,
                source,
                point.x,
                point.y,
                point.z
            ),
            ScatterEvent::PlacementGated { .. } => log::trace!("{:?}", event),
            ScatterEvent::PlacementFailed { error, .. } => log::warn!("placement failed: {}", error),
            _ => log::debug!("{:?}", event),
        }
    }
}

pub fn run_paint(run: RunConfig) -> Result<()> {
    log::info!("=== Paint stroke across ground and slope ===");
    let options = ScatterOptions::new()
        .flux(FluxMode::Distance(60.0))
        .ramp(RampMode::Scale, false)
        .jitter(Some(JitterAlgorithm::ReRaycast))
        .hierarchy(Some(HierarchyPolicy::PerSourceGroup));
    let ranges = TransformRanges::new()
        .rotate((0.0, 0.0), (0.0, 360.0), (0.0, 0.0))
        .uniform_scale((0.5, 1.5))
        .jitter((-10.0, 10.0), (-10.0, 10.0));
    let mut engine = build_engine(options, ranges, run)?;

    engine.begin_stroke(ToolMode::Paint)?;
    let mut x = -450.0;
    engine.on_press(down_at(x, 0.0))?;
    let mut placed = 1;
    while x < 900.0 {
        x += 7.5;
        if let EventOutcome::Placed(_) = engine.on_drag(down_at(x, (x / 120.0).sin() * 80.0))? {
            placed += 1;
        }
    }
    // holding still does not place more under distance gating
    engine.on_hold()?;
    let summary = engine.end_stroke()?;
    log_events(&engine);

    log::info!(
        "{} placements ({} reported during the drag) in {} groups",
        summary.placements.len(),
        placed,
        summary.groups.len()
    );
    for node in &summary.placements {
        log::info!("  {}", engine.host().describe(node));
    }
    if summary.placements.is_empty() {
        bail!("paint stroke produced no placements");
    }
    Ok(())
}

pub fn run_place(run: RunConfig) -> Result<()> {
    log::info!("=== Place interaction ===");
    let options = ScatterOptions::new()
        .random(false)
        .up_offset(2.0)
        .hierarchy(Some(HierarchyPolicy::SingleSessionGroup));
    let ranges = TransformRanges::new().uniform_scale((0.8, 1.2));
    let mut engine = build_engine(options, ranges, run)?;

    engine.begin_stroke(ToolMode::Place)?;
    engine.on_press(down_at(-100.0, -100.0))?;
    engine.on_drag(down_at(0.0, 0.0))?;

    // swap to the next source
    engine.host().set_modifiers(ModifierMask::CTRL.bits());
    engine.on_hold()?;
    engine.host().set_modifiers(0);
    engine.on_hold()?;

    // spin twice about up
    for _ in 0..2 {
        engine.host().set_modifiers(ModifierMask::SHIFT.bits());
        engine.on_hold()?;
        engine.host().set_modifiers(0);
        engine.on_hold()?;
    }

    // drag up onto the slope; the cursor re-aligns to the tilted face
    engine.on_drag(down_at(700.0, 50.0))?;
    if let Some(cursor) = engine.cursor() {
        log::info!("cursor: {}", engine.host().describe(cursor));
    }
    let summary = engine.end_stroke()?;
    log_events(&engine);

    for node in &summary.placements {
        log::info!("committed {}", engine.host().describe(node));
    }
    log::info!("viewport refreshed {} times", engine.host().refreshes());
    Ok(())
}
