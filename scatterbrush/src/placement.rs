//! Creating placements: source selection, duplication, transform and jitter.

use crate::config::{JitterAlgorithm, JitterAxis};
use crate::engine::ScatterEngine;
use crate::error::{PlacementError, Result};
use crate::math::{DVec3, Point3, Ray, align_rotation};
use crate::pool::AlignOverride;
use crate::scene::{Intersection, IntersectionResolver, NodeKind, NodeRef, NormalMode, SceneHost};

/// Height above the hit (working unit) re-raycast jitter casts down from.
pub const RERAYCAST_HEIGHT: f64 = 2000.0;

/// Moves `node` so its scale pivot lands on `point`.
pub fn move_to<H: SceneHost + ?Sized>(host: &mut H, node: &NodeRef, point: Point3) {
    let translation = match host.world_transform(node) {
        Some(current) => current.translation - current.scale_pivot + point,
        None => point,
    };
    host.set_world_translation(node, translation);
}

impl<H: SceneHost> ScatterEngine<H> {
    /// Picks the next source drawable: weighted or uniform random, or round robin.
    pub(crate) fn select_source(&mut self) -> Result<NodeRef> {
        let source = if self.options.random {
            self.sources.get_random(
                &mut *self.rng,
                self.options.weighted(),
                &self.options.source_weights,
            )?
        } else {
            self.sources.get_next()?
        };
        Ok(source)
    }

    /// Transform to duplicate for a source drawable.
    pub(crate) fn source_transform(
        &self,
        source: &NodeRef,
    ) -> std::result::Result<NodeRef, PlacementError> {
        match self.host.node_kind(source) {
            Some(NodeKind::Transform { .. }) => Ok(source.clone()),
            Some(NodeKind::Shape) => self
                .host
                .parent(source)
                .ok_or_else(|| PlacementError::NoParentTransform(source.clone())),
            None => Err(PlacementError::HostDuplicationFailed(source.clone())),
        }
    }

    /// Duplicates (or instances) a source's transform, forcing it visible if configured.
    pub(crate) fn duplicate_source(
        &mut self,
        source: &NodeRef,
    ) -> std::result::Result<NodeRef, PlacementError> {
        let transform = self.source_transform(source)?;
        let node = self
            .host
            .duplicate(&transform, self.options.preserve_connections, self.options.instance)
            .ok_or_else(|| PlacementError::HostDuplicationFailed(transform.clone()))?;
        if self.desc.diagnostics.trace_host {
            log::debug!(
                "{} {} -> {}",
                if self.options.instance { "instanced" } else { "duplicated" },
                transform,
                node
            );
        }
        if self.options.force_visibility {
            self.host.set_visibility(&node, true);
        }
        Ok(node)
    }

    /// Selects a source and creates a placement at `hit`.
    ///
    /// Returns the created node and the source drawable. Updates `hit` with the
    /// placement bookkeeping (source, created node, initial scale) and, with
    /// re-raycast jitter, its jittered location.
    pub(crate) fn create_placement(&mut self, hit: &mut Intersection) -> Result<(NodeRef, NodeRef)> {
        let source = self.select_source()?;
        hit.source_used = Some(source.clone());

        if self.options.jitter == Some(JitterAlgorithm::ReRaycast) {
            self.rejitter(hit);
        }
        let node = self.create_object(hit, &source)?;
        if self.options.jitter == Some(JitterAlgorithm::Simple) {
            self.simple_jitter(&node);
        }

        hit.initial_scale = self
            .host
            .world_transform(&node)
            .map_or(DVec3::ONE, |t| t.scale);
        hit.created_instance = Some(node.clone());
        Ok((node, source))
    }

    fn create_object(
        &mut self,
        hit: &Intersection,
        source: &NodeRef,
    ) -> std::result::Result<NodeRef, PlacementError> {
        let node = self.duplicate_source(source)?;
        move_to(&mut self.host, &node, hit.point);

        if self.aligns(source) {
            self.align_to_surface(&node, hit);
        }
        if self.options.transform_rotate && !self.options.ramp.drives_rotation() {
            let rotation = self
                .sampler
                .sample_rotation(&mut *self.rng, self.options.snap_increment());
            self.host.rotate_object_space(&node, rotation);
        }
        if self.options.transform_scale && !self.options.ramp.drives_scale() {
            let scale = self
                .sampler
                .sample_scale(&mut *self.rng, self.options.uniform_scale);
            self.host.scale_relative(&node, scale);
        }
        self.apply_up_offset(&node);

        let node = match self.options.hierarchy {
            Some(_) => self.hierarchy.park(&mut self.host, &node),
            None => node,
        };
        if self.desc.diagnostics.trace_host {
            log::debug!("created {} at {:?} on {}", node, hit.point, hit.surface);
        }
        Ok(node)
    }

    /// Whether placements of `source` follow the surface normal.
    pub(crate) fn aligns(&self, source: &NodeRef) -> bool {
        self.sources
            .find(source)
            .map_or(AlignOverride::Inherit, |e| e.align_override)
            .resolve(self.options.align)
    }

    /// Euler rotation taking world up onto the normal at `hit`, or `None`
    /// when the host has no normal there.
    pub(crate) fn surface_alignment(&self, hit: &Intersection) -> Option<DVec3> {
        let mode = NormalMode::from_smooth_flag(self.options.smooth_normal);
        let Some(normal) = hit.normal(&self.host, mode) else {
            log::debug!("no normal at {:?} on {}, not aligning", hit.point, hit.surface);
            return None;
        };
        Some(align_rotation(self.host.up_axis().vector(), normal))
    }

    fn align_to_surface(&mut self, node: &NodeRef, hit: &Intersection) {
        if let Some(rotation) = self.surface_alignment(hit) {
            self.host.set_rotation(node, rotation);
        }
    }

    /// Nearest hit of a ray (internal unit) across the active targets.
    pub(crate) fn resolve_targets(&self, ray: &Ray) -> Option<Intersection> {
        let resolver = IntersectionResolver::from_host(&self.host);
        let surfaces = self.targets.active_drawables();
        resolver.resolve(&self.host, ray, &surfaces)
    }

    pub(crate) fn apply_up_offset(&mut self, node: &NodeRef) {
        if self.options.up_offset != 0.0 {
            let offset = self.host.up_axis().vector() * self.options.up_offset;
            self.host.translate_relative(node, offset);
        }
    }

    /// Re-resolves a jittered location straight down onto the targets.
    /// A miss keeps the original hit.
    fn rejitter(&mut self, hit: &mut Intersection) {
        let u = self.sampler.sample_jitter(&mut *self.rng, JitterAxis::U);
        let v = self.sampler.sample_jitter(&mut *self.rng, JitterAxis::V);
        let up = self.host.up_axis();
        let origin = hit.point + up.horizontal_offset(u, v) + up.vector() * RERAYCAST_HEIGHT;

        let resolver = IntersectionResolver::from_host(&self.host);
        let surfaces = self.targets.active_drawables();
        match resolver.resolve_working(&self.host, origin, -up.vector(), &surfaces) {
            Some(jittered) => {
                if self.desc.diagnostics.trace_host {
                    log::debug!("jitter moved hit {:?} -> {:?}", hit.point, jittered.point);
                }
                hit.relocate(jittered);
            }
            None => log::debug!("jittered ray from {:?} missed, keeping {:?}", origin, hit.point),
        }
    }

    /// Offsets a created node in the plane orthogonal to world up.
    fn simple_jitter(&mut self, node: &NodeRef) {
        let u = self.sampler.sample_jitter(&mut *self.rng, JitterAxis::U);
        let v = self.sampler.sample_jitter(&mut *self.rng, JitterAxis::V);
        let up = self.host.up_axis().vector();
        let offset = DVec3::new(u, (up.y - 1.0).abs() * v, (up.z - 1.0).abs() * v);
        self.host.translate_relative(node, offset);
    }
}
