use crate::config::{EngineDesc, ScatterOptions, TransformRanges};
use crate::error::{PlacementError, Result, ScatterError};
use crate::events::{ScatterEvent, ToolMode};
use crate::hierarchy::HierarchyManager;
use crate::math::Ray;
use crate::modifiers::{ModifierEdges, ModifierTracker};
use crate::place::PlaceSession;
use crate::pool::AssetPool;
use crate::preflight::preflight;
use crate::random::{RandomSource, XorShiftRng};
use crate::sampler::TransformSampler;
use crate::scene::{Intersection, NodeRef, SceneHost};
use crate::stroke::{Gate, StrokeEvent, StrokeId, StrokeSession, StrokeState};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking single-flight flag shared by the drag and hold handlers.
///
/// Clones share the same flag, so a host can inspect it from its redraw
/// callback.
#[derive(Debug, Clone, Default)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl FlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the flag, or returns `None` if a handler is already running.
    pub fn try_enter(&self) -> Option<FlightToken> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| FlightToken {
                busy: self.busy.clone(),
            })
    }

    /// Whether a drag or hold handler is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the [`FlightGuard`] when dropped.
#[derive(Debug)]
pub struct FlightToken {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// What one input event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// A new placement was created
    Placed(NodeRef),
    /// The gating policy rejected the hit
    Gated,
    /// The ray missed every target surface
    NoIntersection,
    /// Placement failed; the stroke continues
    Failed(PlacementError),
    /// The place-mode cursor was moved onto a surface
    CursorMoved(NodeRef),
    /// The event arrived while another handler was running and was dropped
    Dropped,
    /// Nothing to do for this event
    Idle,
}

/// Result of closing a stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSummary {
    pub stroke: StrokeId,
    pub mode: ToolMode,
    /// Created nodes in placement order, with their final identifiers
    pub placements: Vec<NodeRef>,
    /// Output groups the placements were assigned to
    pub groups: Vec<NodeRef>,
}

#[derive(Debug)]
pub(crate) enum Interaction {
    Paint(StrokeSession),
    Place(PlaceSession),
}

impl Interaction {
    fn id(&self) -> StrokeId {
        match self {
            Self::Paint(session) => session.id(),
            Self::Place(session) => session.id(),
        }
    }

    fn state(&self) -> StrokeState {
        match self {
            Self::Paint(session) => session.state(),
            Self::Place(session) => session.state(),
        }
    }

    fn mode(&self) -> ToolMode {
        match self {
            Self::Paint(_) => ToolMode::Paint,
            Self::Place(_) => ToolMode::Place,
        }
    }
}

/// Surface scattering engine driven by host input events.
///
/// `ScatterEngine` owns the host handle, both asset pools, the random source
/// and the hierarchy state. The host delivers press, drag, hold and release
/// events serially; each call returns an [`EventOutcome`] and publishes
/// [`ScatterEvent`]s that callers drain with [`ScatterEngine::poll_events`].
///
/// # Lifecycle
///
/// [`begin_stroke`](Self::begin_stroke) validates the pools and opens an idle
/// stroke, [`on_press`](Self::on_press) activates it,
/// [`on_drag`](Self::on_drag) and [`on_hold`](Self::on_hold) feed it, and
/// [`end_stroke`](Self::end_stroke) closes it and assigns output groups.
pub struct ScatterEngine<H: SceneHost> {
    pub(crate) desc: EngineDesc,
    pub(crate) host: H,
    pub(crate) options: ScatterOptions,
    pub(crate) ranges: TransformRanges,
    pub(crate) sampler: TransformSampler,
    pub(crate) sources: AssetPool,
    pub(crate) targets: AssetPool,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) hierarchy: HierarchyManager,
    pub(crate) modifiers: ModifierTracker,
    interaction: Option<Interaction>,
    guard: FlightGuard,
    event_sender: Sender<ScatterEvent>,
    event_receiver: Receiver<ScatterEvent>,
}

impl<H: SceneHost> ScatterEngine<H> {
    /// Creates an engine over `host` with the given pools and settings.
    pub fn new(
        host: H,
        desc: EngineDesc,
        options: ScatterOptions,
        ranges: TransformRanges,
        sources: AssetPool,
        targets: AssetPool,
    ) -> Self {
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        let rng = match desc.rng_seed {
            Some(seed) => XorShiftRng::new(seed),
            None => XorShiftRng::from_entropy(),
        };
        Self {
            hierarchy: HierarchyManager::new(desc.group_names.clone()),
            sampler: TransformSampler::new(&ranges, options.allow_negative_scale),
            desc,
            host,
            options,
            ranges,
            sources,
            targets,
            rng: Box::new(rng),
            modifiers: ModifierTracker::new(),
            interaction: None,
            guard: FlightGuard::new(),
            event_sender,
            event_receiver,
        }
    }

    /// Replaces the random source, for example with a seeded generator in tests.
    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    /// The scene host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the scene host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Construction-time descriptor.
    pub fn desc(&self) -> &EngineDesc {
        &self.desc
    }

    /// Current tool options.
    pub fn options(&self) -> &ScatterOptions {
        &self.options
    }

    /// Current transform ranges, as configured.
    pub fn ranges(&self) -> &TransformRanges {
        &self.ranges
    }

    /// Registered source assets.
    pub fn sources(&self) -> &AssetPool {
        &self.sources
    }

    /// Registered target surfaces.
    pub fn targets(&self) -> &AssetPool {
        &self.targets
    }

    /// Output group and scaffolding state.
    pub fn hierarchy(&self) -> &HierarchyManager {
        &self.hierarchy
    }

    /// A handle on the re-entrancy flag guarding drag and hold.
    pub fn flight_guard(&self) -> FlightGuard {
        self.guard.clone()
    }

    /// Identifier of the stroke in progress, if any.
    pub fn current_stroke(&self) -> Option<StrokeId> {
        self.interaction.as_ref().map(Interaction::id)
    }

    /// Lifecycle state of the stroke in progress.
    pub fn stroke_state(&self) -> Option<StrokeState> {
        self.interaction.as_ref().map(Interaction::state)
    }

    /// Interaction mode of the stroke in progress.
    pub fn mode(&self) -> Option<ToolMode> {
        self.interaction.as_ref().map(Interaction::mode)
    }

    /// Accepted placements of the paint stroke in progress.
    pub fn placements(&self) -> &[Intersection] {
        match &self.interaction {
            Some(Interaction::Paint(session)) => session.placements(),
            _ => &[],
        }
    }

    /// Cursor object of the place interaction in progress.
    pub fn cursor(&self) -> Option<&NodeRef> {
        match &self.interaction {
            Some(Interaction::Place(session)) => Some(session.cursor()),
            _ => None,
        }
    }

    /// Drains every pending event.
    pub fn poll_events(&self) -> Vec<ScatterEvent> {
        self.event_receiver.try_iter().collect()
    }

    pub(crate) fn emit(&self, event: ScatterEvent) {
        // receiver is owned by self
        let _ = self.event_sender.send(event);
    }

    /// Hot-swaps configuration.
    ///
    /// A stroke in progress keeps its placements and timestamps; only its gate
    /// is rebuilt from the new flux setting.
    pub fn runtime_update(
        &mut self,
        options: ScatterOptions,
        ranges: TransformRanges,
        sources: AssetPool,
        targets: AssetPool,
    ) {
        self.sampler = TransformSampler::new(&ranges, options.allow_negative_scale);
        if let Some(Interaction::Paint(session)) = self.interaction.as_mut() {
            session.set_gate(Gate::from_flux(options.flux));
            log::debug!("{} gate rebuilt: {:?}", session.id(), session.gate());
        }
        self.options = options;
        self.ranges = ranges;
        self.sources = sources;
        self.targets = targets;
        log::info!(
            "configuration updated ({} sources, {} targets)",
            self.sources.len(),
            self.targets.len()
        );
    }

    /// Validates the pools and opens a new stroke in the given mode.
    ///
    /// A stroke that was never released is closed first. Preflight failures
    /// leave no session behind.
    pub fn begin_stroke(&mut self, mode: ToolMode) -> Result<StrokeId> {
        if let Some(open) = self.current_stroke() {
            log::warn!("{} was never released, closing it", open);
            self.end_stroke()?;
        }

        preflight(&self.host, &mut self.sources, &mut self.targets)?;
        let swept = self.hierarchy.sweep_stale_scaffolding(&mut self.host);
        if swept > 0 {
            log::debug!("removed {} stale scaffolding groups", swept);
        }
        self.modifiers.reset();

        let id = StrokeId::new();
        let interaction = match mode {
            ToolMode::Paint => {
                Interaction::Paint(StrokeSession::new(id, Gate::from_flux(self.options.flux)))
            }
            ToolMode::Place => Interaction::Place(self.fetch_place_session(id)?),
        };
        self.interaction = Some(interaction);

        log::info!("{} started in {:?} mode", id, mode);
        self.emit(ScatterEvent::StrokeStarted { stroke: id, mode });
        Ok(id)
    }

    /// Handles the pointer going down. Activates the stroke.
    pub fn on_press(&mut self, ray: Ray) -> Result<EventOutcome> {
        self.advance(StrokeEvent::Press, Some(ray))?;
        let edges = self.poll_modifiers();
        let outcome = match self.require_mode()? {
            ToolMode::Paint => self.paint_at(ray)?,
            ToolMode::Place => self.place_press(ray, edges)?,
        };
        self.host.refresh_viewport();
        Ok(outcome)
    }

    /// Handles a drag sample. Dropped without effect while another drag or
    /// hold is still being processed.
    pub fn on_drag(&mut self, ray: Ray) -> Result<EventOutcome> {
        let Some(_token) = self.guard.try_enter() else {
            log::debug!("drag event arrived while busy, dropped");
            return Ok(EventOutcome::Dropped);
        };
        self.advance(StrokeEvent::Drag, Some(ray))?;
        let edges = self.poll_modifiers();
        let outcome = match self.require_mode()? {
            ToolMode::Paint => self.paint_at(ray)?,
            ToolMode::Place => self.place_drag(ray, edges)?,
        };
        self.host.refresh_viewport();
        Ok(outcome)
    }

    /// Handles the pointer holding still. In paint mode the last ray is
    /// re-evaluated, which lets timer gating keep placing.
    pub fn on_hold(&mut self) -> Result<EventOutcome> {
        let Some(_token) = self.guard.try_enter() else {
            log::debug!("hold event arrived while busy, dropped");
            return Ok(EventOutcome::Dropped);
        };
        self.advance(StrokeEvent::Hold, None)?;
        let edges = self.poll_modifiers();
        let outcome = match self.require_mode()? {
            ToolMode::Paint => match self.last_ray() {
                Some(ray) => self.paint_at(ray)?,
                None => EventOutcome::Idle,
            },
            ToolMode::Place => self.place_hold(edges)?,
        };
        self.host.refresh_viewport();
        Ok(outcome)
    }

    /// Closes the stroke: batch ramp, hierarchy assignment, scaffolding cleanup.
    pub fn end_stroke(&mut self) -> Result<StrokeSummary> {
        let interaction = self.interaction.take().ok_or(ScatterError::NoActiveStroke)?;
        let summary = match interaction {
            Interaction::Paint(session) => self.finish_paint(session)?,
            Interaction::Place(session) => self.finish_place(session)?,
        };
        log::info!(
            "{} closed with {} placements in {} groups",
            summary.stroke,
            summary.placements.len(),
            summary.groups.len()
        );
        self.emit(ScatterEvent::StrokeClosed {
            stroke: summary.stroke,
            placements: summary.placements.len(),
            groups: summary.groups.clone(),
        });
        self.host.refresh_viewport();
        Ok(summary)
    }

    fn advance(&mut self, event: StrokeEvent, ray: Option<Ray>) -> Result<()> {
        match self.interaction.as_mut() {
            Some(Interaction::Paint(session)) => session.advance(event, ray),
            Some(Interaction::Place(session)) => session.advance(event),
            None => Err(ScatterError::NoActiveStroke),
        }
    }

    /// Runs `f` on the place session in progress.
    pub(crate) fn with_place_session<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut PlaceSession) -> Result<T>,
    ) -> Result<T> {
        let mut session = match self.interaction.take() {
            Some(Interaction::Place(session)) => session,
            other => {
                self.interaction = other;
                return Err(ScatterError::NoActiveStroke);
            }
        };
        let result = f(self, &mut session);
        self.interaction = Some(Interaction::Place(session));
        result
    }

    fn last_ray(&self) -> Option<Ray> {
        match &self.interaction {
            Some(Interaction::Paint(session)) => session.last_ray(),
            _ => None,
        }
    }

    fn require_mode(&self) -> Result<ToolMode> {
        self.mode().ok_or(ScatterError::NoActiveStroke)
    }

    fn poll_modifiers(&mut self) -> ModifierEdges {
        let edges = self.modifiers.poll(self.host.modifier_bits());
        if !edges.is_empty() {
            log::debug!("modifiers changed: {:?}", edges);
            self.emit(ScatterEvent::ModifierChanged { edges });
        }
        edges
    }

    fn paint_at(&mut self, ray: Ray) -> Result<EventOutcome> {
        let Some(mut hit) = self.resolve_targets(&ray) else {
            return Ok(EventOutcome::NoIntersection);
        };

        let now = self.host.now();
        let Some(Interaction::Paint(session)) = self.interaction.as_ref() else {
            return Err(ScatterError::NoActiveStroke);
        };
        let stroke = session.id();
        if !session.gate_candidate(&mut hit, now, self.desc.diagnostics.trace_gating) {
            self.emit(ScatterEvent::PlacementGated {
                stroke,
                point: hit.point,
            });
            return Ok(EventOutcome::Gated);
        }

        match self.create_placement(&mut hit) {
            Ok((node, source)) => {
                self.emit(ScatterEvent::PlacementCreated {
                    stroke,
                    node: node.clone(),
                    source,
                    point: hit.point,
                });
                self.record_placement(hit);
                Ok(EventOutcome::Placed(node))
            }
            Err(ScatterError::Placement(error)) => {
                log::warn!("{}: placement failed: {}", stroke, error);
                self.emit(ScatterEvent::PlacementFailed {
                    stroke,
                    error: error.clone(),
                });
                Ok(EventOutcome::Failed(error))
            }
            Err(other) => Err(other),
        }
    }

    fn record_placement(&mut self, placement: Intersection) {
        let Some(Interaction::Paint(session)) = self.interaction.as_mut() else {
            return;
        };
        session.push(placement);
        if self.options.ramp.is_on() && self.options.real_time_ramp {
            session.apply_ramp(
                &mut self.host,
                self.sampler.ranges(),
                self.options.ramp,
                self.options.uniform_scale,
                self.desc.diagnostics.trace_ramp,
            );
        }
    }

    fn finish_paint(&mut self, mut session: StrokeSession) -> Result<StrokeSummary> {
        session.advance(StrokeEvent::Release, None)?;
        if self.options.ramp.is_on() && !self.options.real_time_ramp {
            session.apply_ramp(
                &mut self.host,
                self.sampler.ranges(),
                self.options.ramp,
                self.options.uniform_scale,
                self.desc.diagnostics.trace_ramp,
            );
        }
        let groups = match self.options.hierarchy {
            Some(policy) => {
                self.hierarchy
                    .assign_stroke(&mut self.host, policy, session.placements_mut())
            }
            None => Vec::new(),
        };
        self.hierarchy.release_scaffolding(&mut self.host);

        Ok(StrokeSummary {
            stroke: session.id(),
            mode: ToolMode::Paint,
            placements: session
                .placements()
                .iter()
                .filter_map(|p| p.created_instance.clone())
                .collect(),
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FluxMode, JitterAlgorithm, RampMode};
    use crate::hierarchy::HierarchyPolicy;
    use crate::math::{DVec3, LinearUnit};
    use crate::pool::AssetEntry;
    use crate::testing::{HostCall, MockScene};
    use std::time::Duration;

    struct Fixture {
        engine: ScatterEngine<MockScene>,
        rock: NodeRef,
        ground: NodeRef,
    }

    fn fixture(options: ScatterOptions, ranges: TransformRanges) -> Fixture {
        let mut scene = MockScene::new();
        let (rock, _) = scene.add_mesh("|rock");
        let ground = scene.add_plane("|ground", 0.0, 1000.0);
        let mut sources = AssetPool::new();
        sources.add_entry(&scene, &rock).unwrap();
        let mut targets = AssetPool::new();
        targets.add_entry(&scene, &ground).unwrap();
        let engine = ScatterEngine::new(
            scene,
            EngineDesc::new().rng_seed(7),
            options,
            ranges,
            sources,
            targets,
        );
        Fixture {
            engine,
            rock,
            ground,
        }
    }

    fn down_at(x: f64, z: f64) -> Ray {
        Ray::new(DVec3::new(x, 500.0, z), DVec3::NEG_Y)
    }

    fn plain_options() -> ScatterOptions {
        ScatterOptions::new()
            .transform(false, false)
            .align(false)
            .hierarchy(None)
    }

    #[test]
    fn test_events_outside_stroke_rejected() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        assert!(matches!(
            f.engine.on_press(down_at(0.0, 0.0)),
            Err(ScatterError::NoActiveStroke)
        ));
        assert!(matches!(f.engine.end_stroke(), Err(ScatterError::NoActiveStroke)));

        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        assert!(matches!(
            f.engine.on_drag(down_at(0.0, 0.0)),
            Err(ScatterError::InvalidTransition { state: "idle", event: "drag" })
        ));
        assert_eq!(f.engine.stroke_state(), Some(StrokeState::Idle));
    }

    #[test]
    fn test_preflight_failure_leaves_no_session() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        let rock = f.rock.clone();
        f.engine.host_mut().remove_externally(&rock);
        assert!(matches!(
            f.engine.begin_stroke(ToolMode::Paint),
            Err(ScatterError::Preflight(_))
        ));
        assert!(f.engine.current_stroke().is_none());
    }

    #[test]
    fn test_paint_stroke_places_along_drag() {
        let mut f = fixture(
            plain_options().flux(FluxMode::Distance(10.0)),
            TransformRanges::default(),
        );
        let id = f.engine.begin_stroke(ToolMode::Paint).unwrap();

        assert!(matches!(f.engine.on_press(down_at(0.0, 0.0)).unwrap(), EventOutcome::Placed(_)));
        assert_eq!(f.engine.on_drag(down_at(4.0, 0.0)).unwrap(), EventOutcome::Gated);
        assert!(matches!(f.engine.on_drag(down_at(14.0, 0.0)).unwrap(), EventOutcome::Placed(_)));
        assert_eq!(f.engine.on_drag(down_at(5000.0, 0.0)).unwrap(), EventOutcome::NoIntersection);

        let points: Vec<f64> = f.engine.placements().iter().map(|p| p.point.x).collect();
        assert_eq!(points, [0.0, 14.0]);
        assert!(f.engine.placements().iter().all(|p| p.is_valid() == Some(true)));
        assert!(f.engine.placements().iter().all(|p| p.surface.as_str().starts_with(f.ground.as_str())));

        let summary = f.engine.end_stroke().unwrap();
        assert_eq!(summary.stroke, id);
        assert_eq!(summary.placements.len(), 2);
        assert_eq!(f.engine.host().duplicates_of(&f.rock).len(), 2);

        let events = f.engine.poll_events();
        assert!(matches!(events.first(), Some(ScatterEvent::StrokeStarted { .. })));
        assert_eq!(events.iter().filter(|e| matches!(e, ScatterEvent::PlacementCreated { .. })).count(), 2);
        assert_eq!(events.iter().filter(|e| matches!(e, ScatterEvent::PlacementGated { .. })).count(), 1);
        assert!(matches!(events.last(), Some(ScatterEvent::StrokeClosed { placements: 2, .. })));
        assert!(events.iter().all(|e| e.stroke_id().is_none_or(|s| s == id)));
    }

    #[test]
    fn test_scale_pivot_lands_on_hit() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        let rock = f.rock.clone();
        if let Some(node) = f.engine.host_mut().node_mut(&rock) {
            node.translation = DVec3::new(100.0, 0.0, 0.0);
            node.pivot_offset = DVec3::new(0.0, -5.0, 0.0);
        }
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        let EventOutcome::Placed(node) = f.engine.on_press(down_at(10.0, 20.0)).unwrap() else {
            panic!("expected a placement");
        };
        let placed = f.engine.host().world_transform(&node).unwrap();
        assert_eq!(placed.scale_pivot, DVec3::new(10.0, 0.0, 20.0));
        assert_eq!(placed.translation, DVec3::new(10.0, 5.0, 20.0));
    }

    #[test]
    fn test_working_unit_applied_to_transforms() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        f.engine.host_mut().unit = LinearUnit::Meter;
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(250.0, 0.0)).unwrap();
        assert!((f.engine.placements()[0].point.x - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_timer_gating_places_while_holding() {
        let mut f = fixture(
            plain_options().flux(FluxMode::Timer(Duration::from_millis(50))),
            TransformRanges::default(),
        );
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        f.engine.host().clock.advance(Duration::from_millis(20));
        assert_eq!(f.engine.on_hold().unwrap(), EventOutcome::Gated);
        f.engine.host().clock.advance(Duration::from_millis(40));
        assert!(matches!(f.engine.on_hold().unwrap(), EventOutcome::Placed(_)));
        assert_eq!(f.engine.placements().len(), 2);
    }

    #[test]
    fn test_reentrant_drag_dropped() {
        let mut f = fixture(plain_options().flux(FluxMode::Distance(1.0)), TransformRanges::default());
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        let before = f.engine.placements().len();

        let guard = f.engine.flight_guard();
        let token = guard.try_enter().unwrap();
        assert_eq!(f.engine.on_drag(down_at(50.0, 0.0)).unwrap(), EventOutcome::Dropped);
        assert_eq!(f.engine.on_hold().unwrap(), EventOutcome::Dropped);
        assert_eq!(f.engine.placements().len(), before);
        drop(token);

        assert!(matches!(f.engine.on_drag(down_at(50.0, 0.0)).unwrap(), EventOutcome::Placed(_)));
        assert!(!guard.is_busy());
    }

    #[test]
    fn test_guard_held_while_host_redraws() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        let guard = f.engine.flight_guard();
        f.engine.host_mut().watched_guard = Some(guard);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        f.engine.on_drag(down_at(30.0, 0.0)).unwrap();
        f.engine.on_hold().unwrap();
        assert_eq!(f.engine.host().guard_busy_on_refresh, [false, true, true]);
    }

    #[test]
    fn test_failed_duplicate_keeps_stroke_alive() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.host_mut().fail_duplicates = true;
        let outcome = f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        assert_eq!(
            outcome,
            EventOutcome::Failed(PlacementError::HostDuplicationFailed(f.rock.clone()))
        );
        assert!(f.engine.placements().is_empty());
        assert!(f.engine.poll_events().iter().any(ScatterEvent::is_error));

        f.engine.host_mut().fail_duplicates = false;
        assert!(matches!(f.engine.on_drag(down_at(0.0, 0.0)).unwrap(), EventOutcome::Placed(_)));
        assert_eq!(f.engine.stroke_state(), Some(StrokeState::Active));
    }

    #[test]
    fn test_parentless_shape_source_fails_placement() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        let shape = f.engine.host_mut().add_root_shape("|looseShape");
        let mut sources = AssetPool::new();
        sources
            .insert(AssetEntry::new(shape.clone(), shape.clone()))
            .unwrap();
        let (options, ranges, targets) = (
            f.engine.options().clone(),
            f.engine.ranges().clone(),
            f.engine.targets().clone(),
        );
        f.engine.runtime_update(options, ranges, sources, targets);

        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        assert_eq!(
            f.engine.on_press(down_at(0.0, 0.0)).unwrap(),
            EventOutcome::Failed(PlacementError::NoParentTransform(shape))
        );
        assert_eq!(f.engine.stroke_state(), Some(StrokeState::Active));
        assert!(f.engine.placements().is_empty());
        assert_eq!(f.engine.host().duplicate_count(), 0);
    }

    #[test]
    fn test_begin_stroke_sweeps_stale_scaffolding() {
        let mut f = fixture(plain_options(), TransformRanges::default());
        let stale = f.engine.host_mut().add_group("|scatterTempGroup");
        let kept = f.engine.host_mut().add_group("|scatterTempGroup1");
        f.engine
            .host_mut()
            .add_mesh_under("|scatterTempGroup1|pebble", &kept);

        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        assert!(!f.engine.host().node_exists(&stale));
        assert!(f.engine.host().node_exists(&kept));
    }

    #[test]
    fn test_batch_ramp_applied_at_release() {
        let ranges = TransformRanges::new().uniform_scale((1.0, 2.0));
        let options = plain_options()
            .flux(FluxMode::Distance(1.0))
            .ramp(RampMode::Scale, false);
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        for x in [10.0, 20.0, 30.0] {
            f.engine.on_drag(down_at(x, 0.0)).unwrap();
        }
        let nodes: Vec<NodeRef> = f
            .engine
            .placements()
            .iter()
            .filter_map(|p| p.created_instance.clone())
            .collect();
        assert!(nodes.iter().all(|n| f.engine.host().node(n).unwrap().scale == DVec3::ONE));

        f.engine.end_stroke().unwrap();
        let scales: Vec<f64> = nodes
            .iter()
            .map(|n| f.engine.host().node(n).unwrap().scale.x)
            .collect();
        assert_eq!(scales, [1.25, 1.5, 1.75, 2.0]);
    }

    #[test]
    fn test_real_time_ramp_rescales_earlier_placements() {
        let ranges = TransformRanges::new().uniform_scale((1.0, 2.0));
        let options = plain_options()
            .flux(FluxMode::Distance(1.0))
            .ramp(RampMode::Scale, true);
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        let first = f.engine.placements()[0].created_instance.clone().unwrap();
        assert_eq!(f.engine.host().node(&first).unwrap().scale, DVec3::splat(2.0));

        f.engine.on_drag(down_at(10.0, 0.0)).unwrap();
        assert_eq!(f.engine.host().node(&first).unwrap().scale, DVec3::splat(1.5));
    }

    #[test]
    fn test_rotation_ramp_does_not_accumulate() {
        let ranges = TransformRanges::new().rotate((0.0, 0.0), (0.0, 90.0), (0.0, 0.0));
        let options = plain_options()
            .flux(FluxMode::Distance(1.0))
            .ramp(RampMode::Rotate, true);
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        f.engine.on_drag(down_at(10.0, 0.0)).unwrap();
        f.engine.on_drag(down_at(20.0, 0.0)).unwrap();

        let rotations: Vec<f64> = f
            .engine
            .placements()
            .iter()
            .map(|p| f.engine.host().node(p.created_instance.as_ref().unwrap()).unwrap().rotation.y)
            .collect();
        assert_eq!(rotations, [30.0, 60.0, 90.0]);
    }

    #[test]
    fn test_sampled_scale_skipped_when_ramp_drives_scale() {
        let ranges = TransformRanges::new().uniform_scale((3.0, 4.0));
        let options = ScatterOptions::new()
            .align(false)
            .hierarchy(None)
            .ramp(RampMode::Scale, false);
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        let node = f.engine.placements()[0].created_instance.clone().unwrap();
        let calls = f.engine.host().calls_for(&node);
        assert!(!calls.iter().any(|c| matches!(c, HostCall::ScaleRelative(..))));
        assert!(calls.iter().any(|c| matches!(c, HostCall::Rotate(..))));
    }

    #[test]
    fn test_hierarchy_groups_stroke_and_cleans_scaffolding() {
        let options = plain_options().hierarchy(Some(HierarchyPolicy::PerStrokeGroup));
        let mut f = fixture(options, TransformRanges::default());
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        let scaffolding = f.engine.hierarchy().scaffolding().cloned().unwrap();
        f.engine.on_drag(down_at(50.0, 0.0)).unwrap();

        let summary = f.engine.end_stroke().unwrap();
        assert_eq!(summary.groups.len(), 1);
        assert_eq!(f.engine.host().children(&summary.groups[0]), summary.placements);
        assert!(!f.engine.host().node_exists(&scaffolding));
    }

    #[test]
    fn test_round_robin_sources_across_stroke() {
        let mut f = fixture(
            plain_options().random(false).flux(FluxMode::Distance(1.0)),
            TransformRanges::default(),
        );
        let (tree, _) = f.engine.host_mut().add_mesh("|tree");
        let mut sources = f.engine.sources().clone();
        sources.add_entry(f.engine.host(), &tree).unwrap();
        let (options, ranges, targets) = (
            f.engine.options().clone(),
            f.engine.ranges().clone(),
            f.engine.targets().clone(),
        );
        f.engine.runtime_update(options, ranges, sources, targets);

        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        for x in [10.0, 20.0, 30.0] {
            f.engine.on_drag(down_at(x, 0.0)).unwrap();
        }
        let used: Vec<&str> = f
            .engine
            .placements()
            .iter()
            .map(|p| p.source_used.as_ref().unwrap().short_name())
            .collect();
        assert_eq!(used, ["rockShape", "treeShape", "rockShape", "treeShape"]);
    }

    #[test]
    fn test_runtime_update_keeps_placements_and_swaps_gate() {
        let mut f = fixture(plain_options().flux(FluxMode::Distance(100.0)), TransformRanges::default());
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        assert_eq!(f.engine.on_drag(down_at(20.0, 0.0)).unwrap(), EventOutcome::Gated);

        let (ranges, sources, targets) = (
            f.engine.ranges().clone(),
            f.engine.sources().clone(),
            f.engine.targets().clone(),
        );
        f.engine.runtime_update(
            plain_options().flux(FluxMode::Distance(10.0)),
            ranges,
            sources,
            targets,
        );
        assert_eq!(f.engine.placements().len(), 1);
        assert!(matches!(f.engine.on_drag(down_at(20.0, 0.0)).unwrap(), EventOutcome::Placed(_)));
    }

    #[test]
    fn test_reraycast_jitter_lands_on_surface() {
        let ranges = TransformRanges::new().jitter((5.0, 5.0), (-3.0, -3.0));
        let options = plain_options().jitter(Some(JitterAlgorithm::ReRaycast));
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        let placement = &f.engine.placements()[0];
        assert_eq!(placement.point, DVec3::new(5.0, 0.0, -3.0));
        let node = placement.created_instance.clone().unwrap();
        assert_eq!(f.engine.host().node(&node).unwrap().translation, DVec3::new(5.0, 0.0, -3.0));
        let rays = f.engine.host().rays.borrow();
        assert_eq!(
            rays.last(),
            Some(&(DVec3::new(5.0, crate::placement::RERAYCAST_HEIGHT, -3.0), DVec3::NEG_Y))
        );
    }

    #[test]
    fn test_reraycast_jitter_miss_keeps_original_hit() {
        let ranges = TransformRanges::new().jitter((5000.0, 5000.0), (0.0, 0.0));
        let options = plain_options().jitter(Some(JitterAlgorithm::ReRaycast));
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(1.0, 2.0)).unwrap();
        assert_eq!(f.engine.placements()[0].point, DVec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_simple_jitter_translates_after_creation() {
        let ranges = TransformRanges::new().jitter((2.0, 2.0), (-4.0, -4.0));
        let options = plain_options().jitter(Some(JitterAlgorithm::Simple));
        let mut f = fixture(options, ranges);
        f.engine.begin_stroke(ToolMode::Paint).unwrap();
        f.engine.on_press(down_at(0.0, 0.0)).unwrap();
        let placement = &f.engine.placements()[0];
        assert_eq!(placement.point, DVec3::ZERO);
        let node = placement.created_instance.clone().unwrap();
        assert_eq!(f.engine.host().node(&node).unwrap().translation, DVec3::new(2.0, 0.0, -4.0));
    }
}
