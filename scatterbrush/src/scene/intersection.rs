//! Ray/surface intersection records and the nearest-hit resolver.

use crate::math::{DVec3, LinearUnit, Point3, Ray};
use crate::scene::host::{NodeRef, SceneHost};
use std::time::Instant;

/// How the surface normal at a hit is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalMode {
    /// Interpolated from the surface's per-vertex smoothing data.
    Smooth,
    /// Hard normal of the hit triangle.
    #[default]
    Face,
}

impl NormalMode {
    pub fn from_smooth_flag(smooth: bool) -> Self {
        if smooth { Self::Smooth } else { Self::Face }
    }
}

/// Outcome of the gating decision for one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Unset,
    Accepted,
    Rejected,
}

/// A hit on a target surface, plus the bookkeeping of the placement made there.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Hit position in the scene's working unit.
    pub point: Point3,
    pub face_index: u32,
    pub sub_face_index: u32,
    pub surface: NodeRef,
    /// Unit `point` is expressed in.
    pub unit: LinearUnit,
    pub created_instance: Option<NodeRef>,
    pub source_used: Option<NodeRef>,
    pub created_at: Option<Instant>,
    pub initial_scale: DVec3,
    /// Ramp rotation already applied to the created instance.
    pub(crate) ramp_rotation: DVec3,
    validity: Validity,
}

impl Intersection {
    pub fn new(
        point: Point3,
        face_index: u32,
        sub_face_index: u32,
        surface: NodeRef,
        unit: LinearUnit,
    ) -> Self {
        Self {
            point,
            face_index,
            sub_face_index,
            surface,
            unit,
            created_instance: None,
            source_used: None,
            created_at: None,
            initial_scale: DVec3::ONE,
            ramp_rotation: DVec3::ZERO,
            validity: Validity::Unset,
        }
    }

    /// Records the gating decision. Decided exactly once per placement attempt.
    pub fn set_valid(&mut self, accepted: bool) {
        debug_assert_eq!(
            self.validity,
            Validity::Unset,
            "gating decision recorded twice"
        );
        self.validity = if accepted {
            Validity::Accepted
        } else {
            Validity::Rejected
        };
    }

    /// `None` until the gating policy has decided.
    pub fn is_valid(&self) -> Option<bool> {
        match self.validity {
            Validity::Unset => None,
            Validity::Accepted => Some(true),
            Validity::Rejected => Some(false),
        }
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn start_timer(&mut self, now: Instant) {
        self.created_at = Some(now);
    }

    /// Takes over the location of another hit, keeping this record's bookkeeping.
    pub fn relocate(&mut self, other: Intersection) {
        self.point = other.point;
        self.face_index = other.face_index;
        self.sub_face_index = other.sub_face_index;
        self.surface = other.surface;
        self.unit = other.unit;
    }

    /// Unit surface normal at the hit, computed on request.
    pub fn normal<H: SceneHost + ?Sized>(&self, host: &H, mode: NormalMode) -> Option<DVec3> {
        let normal = match mode {
            NormalMode::Smooth => {
                host.smooth_normal(&self.surface, self.unit.to_internal(self.point))?
            }
            NormalMode::Face => {
                host.face_normal(&self.surface, self.face_index, self.sub_face_index)?
            }
        };
        normal.try_normalize()
    }
}

/// Finds the nearest hit of a ray across a set of target surfaces.
///
/// Each surface is queried through the host bounded by the camera far clip.
/// The winner is the hit closest to the ray origin; on equal distance the
/// surface queried first wins, so results are deterministic for a fixed
/// surface order (pool registration order).
#[derive(Debug, Clone, Copy)]
pub struct IntersectionResolver {
    far_clip: f64,
    unit: LinearUnit,
}

impl IntersectionResolver {
    pub fn new(far_clip: f64, unit: LinearUnit) -> Self {
        Self { far_clip, unit }
    }

    /// Reads the active camera's far clip and the working unit from the host.
    pub fn from_host<H: SceneHost + ?Sized>(host: &H) -> Self {
        Self::new(host.far_clip(), host.linear_unit())
    }

    /// Resolves a ray given in the host's internal unit.
    ///
    /// `None` means nothing was hit, which callers treat as a no-op.
    pub fn resolve<'a, H, I>(&self, host: &H, ray: &Ray, surfaces: I) -> Option<Intersection>
    where
        H: SceneHost + ?Sized,
        I: IntoIterator<Item = &'a NodeRef>,
    {
        let mut closest: Option<(f64, Intersection)> = None;

        for surface in surfaces {
            let Some(hit) = host.cast_ray(ray.origin, ray.direction, surface, self.far_clip)
            else {
                continue;
            };
            let distance = hit.point.distance(ray.origin);
            log::trace!(
                "hit on {} at {:?} (face {}, tri {}, distance {})",
                surface,
                hit.point,
                hit.face_index,
                hit.sub_face_index,
                distance
            );
            let nearer = closest.as_ref().is_none_or(|(best, _)| distance < *best);
            if nearer {
                let candidate = Intersection::new(
                    self.unit.from_internal(hit.point),
                    hit.face_index,
                    hit.sub_face_index,
                    surface.clone(),
                    self.unit,
                );
                closest = Some((distance, candidate));
            }
        }

        closest.map(|(_, intersection)| intersection)
    }

    /// Resolves a ray whose origin is expressed in the working unit.
    pub fn resolve_working<'a, H, I>(
        &self,
        host: &H,
        origin: Point3,
        direction: DVec3,
        surfaces: I,
    ) -> Option<Intersection>
    where
        H: SceneHost + ?Sized,
        I: IntoIterator<Item = &'a NodeRef>,
    {
        let ray = Ray::new(self.unit.to_internal(origin), direction);
        self.resolve(host, &ray, surfaces)
    }
}
