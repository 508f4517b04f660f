//! Place mode: a single cursor object positioned interactively and committed
//! on release.
//!
//! The cursor is a duplicate of a selected source created when the
//! interaction begins. Press and drag move it onto the surface under the
//! pointer; Ctrl swaps it for the next source and Shift spins it about world
//! up. Its orientation is rebuilt on every change as surface alignment, then
//! the accumulated Shift rotation, then the sampled rotation.

use crate::engine::{EventOutcome, ScatterEngine, StrokeSummary};
use crate::error::{Result, ScatterError};
use crate::events::{ScatterEvent, ToolMode};
use crate::math::{DVec3, Point3, Ray};
use crate::modifiers::{ModifierEdges, ModifierMask};
use crate::placement::move_to;
use crate::scene::{Intersection, NodeRef, SceneHost};
use crate::stroke::{StrokeEvent, StrokeId, StrokeState};

/// State of one place interaction.
#[derive(Debug, Clone)]
pub struct PlaceSession {
    id: StrokeId,
    state: StrokeState,
    source: NodeRef,
    cursor: NodeRef,
    /// Sampled rotation, degrees
    rotate: DVec3,
    /// Sampled scale including the cursor's initial scale
    scale: DVec3,
    /// Rotation accumulated from Shift presses
    rotation_increment: DVec3,
    align: Option<DVec3>,
    position: Option<Point3>,
    initial_scale: DVec3,
}

impl PlaceSession {
    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    /// Source drawable the cursor was created from.
    pub fn source(&self) -> &NodeRef {
        &self.source
    }

    pub fn cursor(&self) -> &NodeRef {
        &self.cursor
    }

    /// Last surface point the cursor was moved to.
    pub fn position(&self) -> Option<Point3> {
        self.position
    }

    pub fn rotation_increment(&self) -> DVec3 {
        self.rotation_increment
    }

    pub(crate) fn advance(&mut self, event: StrokeEvent) -> Result<()> {
        self.state = self.state.transition(event)?;
        Ok(())
    }
}

impl<H: SceneHost> ScatterEngine<H> {
    /// Creates the cursor and samples its transform.
    pub(crate) fn fetch_place_session(&mut self, id: StrokeId) -> Result<PlaceSession> {
        let (source, cursor) = self.fetch_cursor()?;
        let initial_scale = self.node_scale(&cursor);
        let (rotate, scale) = self.sample_cursor_transform(initial_scale);
        let session = PlaceSession {
            id,
            state: StrokeState::Idle,
            source,
            cursor,
            rotate,
            scale,
            rotation_increment: DVec3::ZERO,
            align: None,
            position: None,
            initial_scale,
        };
        self.scale_cursor(&session);
        self.orient_cursor(&session);
        Ok(session)
    }

    pub(crate) fn place_press(&mut self, ray: Ray, edges: ModifierEdges) -> Result<EventOutcome> {
        self.with_place_session(|engine, session| {
            session.rotation_increment = DVec3::ZERO;
            let outcome = match engine.resolve_targets(&ray) {
                Some(hit) => {
                    engine.move_cursor(session, &hit, false);
                    EventOutcome::CursorMoved(session.cursor.clone())
                }
                None => EventOutcome::NoIntersection,
            };
            engine.handle_place_modifiers(session, edges)?;
            Ok(outcome)
        })
    }

    pub(crate) fn place_drag(&mut self, ray: Ray, edges: ModifierEdges) -> Result<EventOutcome> {
        self.with_place_session(|engine, session| {
            let outcome = match engine.resolve_targets(&ray) {
                Some(hit) => {
                    engine.move_cursor(session, &hit, true);
                    EventOutcome::CursorMoved(session.cursor.clone())
                }
                None => EventOutcome::NoIntersection,
            };
            engine.handle_place_modifiers(session, edges)?;
            Ok(outcome)
        })
    }

    pub(crate) fn place_hold(&mut self, edges: ModifierEdges) -> Result<EventOutcome> {
        self.with_place_session(|engine, session| {
            if engine.handle_place_modifiers(session, edges)? {
                Ok(EventOutcome::CursorMoved(session.cursor.clone()))
            } else {
                Ok(EventOutcome::Idle)
            }
        })
    }

    /// Commits the cursor into its output group. A cursor that never reached
    /// a surface is deleted instead.
    pub(crate) fn finish_place(&mut self, mut session: PlaceSession) -> Result<StrokeSummary> {
        session.advance(StrokeEvent::Release)?;

        let Some(point) = session.position else {
            log::info!("{} released before reaching a surface, discarding cursor", session.id);
            self.discard_cursor(&session.cursor);
            self.hierarchy.release_scaffolding(&mut self.host);
            return Ok(StrokeSummary {
                stroke: session.id,
                mode: ToolMode::Place,
                placements: Vec::new(),
                groups: Vec::new(),
            });
        };

        let (node, groups) = match self.options.hierarchy {
            Some(policy) => {
                let (node, group) = self.hierarchy.assign_node(
                    &mut self.host,
                    policy,
                    &session.cursor,
                    Some(&session.source),
                );
                (node, vec![group])
            }
            None => (session.cursor.clone(), Vec::new()),
        };
        self.hierarchy.release_scaffolding(&mut self.host);

        self.emit(ScatterEvent::PlacementCreated {
            stroke: session.id,
            node: node.clone(),
            source: session.source.clone(),
            point,
        });
        Ok(StrokeSummary {
            stroke: session.id,
            mode: ToolMode::Place,
            placements: vec![node],
            groups,
        })
    }

    fn fetch_cursor(&mut self) -> Result<(NodeRef, NodeRef)> {
        let source = self.select_source()?;
        let cursor = self.duplicate_source(&source)?;
        let cursor = match self.options.hierarchy {
            Some(_) => self.hierarchy.park(&mut self.host, &cursor),
            None => cursor,
        };
        log::debug!("cursor {} created from {}", cursor, source);
        Ok((source, cursor))
    }

    fn node_scale(&self, node: &NodeRef) -> DVec3 {
        self.host.world_transform(node).map_or(DVec3::ONE, |t| t.scale)
    }

    fn sample_cursor_transform(&mut self, initial_scale: DVec3) -> (DVec3, DVec3) {
        let rotate = if self.options.transform_rotate {
            self.sampler
                .sample_rotation(&mut *self.rng, self.options.snap_increment())
        } else {
            DVec3::ZERO
        };
        let scale = if self.options.transform_scale {
            self.sampler
                .sample_scale(&mut *self.rng, self.options.uniform_scale)
                * initial_scale
        } else {
            initial_scale
        };
        (rotate, scale)
    }

    fn move_cursor(&mut self, session: &mut PlaceSession, hit: &Intersection, dragging: bool) {
        session.position = Some(hit.point);
        session.align = if self.aligns(&session.source) {
            self.surface_alignment(hit)
        } else {
            None
        };
        if dragging && self.options.continuous_transform {
            let (rotate, scale) = self.sample_cursor_transform(session.initial_scale);
            session.rotate = rotate;
            session.scale = scale;
            self.scale_cursor(session);
        }
        self.place_cursor(session);
    }

    /// Moves the cursor to its stored position, reorients it and applies the up offset.
    fn place_cursor(&mut self, session: &PlaceSession) {
        self.orient_cursor(session);
        if let Some(position) = session.position {
            move_to(&mut self.host, &session.cursor, position);
            self.apply_up_offset(&session.cursor);
        }
    }

    fn orient_cursor(&mut self, session: &PlaceSession) {
        let cursor = &session.cursor;
        self.host
            .set_rotation(cursor, session.align.unwrap_or(DVec3::ZERO));
        if session.rotation_increment != DVec3::ZERO {
            self.host
                .rotate_object_space(cursor, session.rotation_increment);
        }
        if self.options.transform_rotate && session.rotate != DVec3::ZERO {
            self.host.rotate_object_space(cursor, session.rotate);
        }
    }

    fn scale_cursor(&mut self, session: &PlaceSession) {
        if self.options.transform_scale {
            self.host.scale_absolute(&session.cursor, session.scale);
        }
    }

    /// Returns whether the cursor changed.
    fn handle_place_modifiers(
        &mut self,
        session: &mut PlaceSession,
        edges: ModifierEdges,
    ) -> Result<bool> {
        let mut changed = false;
        if edges.just_pressed(ModifierMask::CTRL) {
            changed |= self.swap_cursor(session)?;
        }
        if edges.just_pressed(ModifierMask::SHIFT) {
            self.spin_cursor(session);
            changed = true;
        }
        Ok(changed)
    }

    /// Replaces the cursor with a duplicate of the next source. A failed
    /// duplication keeps the current cursor.
    fn swap_cursor(&mut self, session: &mut PlaceSession) -> Result<bool> {
        let (source, cursor) = match self.fetch_cursor() {
            Ok(fetched) => fetched,
            Err(ScatterError::Placement(error)) => {
                log::warn!("{}: could not swap cursor: {}", session.id, error);
                self.emit(ScatterEvent::PlacementFailed {
                    stroke: session.id,
                    error,
                });
                return Ok(false);
            }
            Err(other) => return Err(other),
        };

        let previous = std::mem::replace(&mut session.cursor, cursor);
        session.source = source;
        self.discard_cursor(&previous);

        session.initial_scale = self.node_scale(&session.cursor);
        let (rotate, scale) = self.sample_cursor_transform(session.initial_scale);
        session.rotate = rotate;
        session.scale = scale;
        self.scale_cursor(session);
        self.place_cursor(session);

        log::debug!("{}: cursor swapped {} -> {}", session.id, previous, session.cursor);
        self.emit(ScatterEvent::CursorUpdated {
            stroke: session.id,
            cursor: session.cursor.clone(),
            source: session.source.clone(),
        });
        Ok(true)
    }

    /// Spins the cursor about world up by `place_rotate`, or with rotation
    /// snapping draws a fresh snapped rotation instead.
    fn spin_cursor(&mut self, session: &mut PlaceSession) {
        session.rotation_increment = match self.options.snap_increment() {
            Some(increment) => self
                .sampler
                .sample_rotation(&mut *self.rng, Some(increment)),
            None => {
                session.rotation_increment
                    + self.host.up_axis().vector() * self.options.place_rotate
            }
        };
        self.orient_cursor(session);
    }

    /// Deletes a cursor, and its parent group if that is left empty.
    fn discard_cursor(&mut self, cursor: &NodeRef) {
        let parent = self.host.parent(cursor);
        self.host.delete_node(cursor);
        if let Some(parent) = parent {
            if self.host.node_exists(&parent) && self.host.children(&parent).is_empty() {
                log::debug!("removing emptied group {}", parent);
                self.host.delete_node(&parent);
            }
        }
    }
}
