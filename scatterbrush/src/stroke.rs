//! Stroke sessions: per-stroke placement bookkeeping, flux gating and ramp FX.

use crate::config::{FluxMode, RampMode, TransformRanges};
use crate::error::{Result, ScatterError};
use crate::math::{DVec3, Ray};
use crate::scene::{Intersection, SceneHost};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Smallest distance threshold distance gating accepts.
pub const MIN_DISTANCE_THRESHOLD: f64 = 1e-3;

/// Handle identifying one stroke (or one place interaction).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrokeId(Uuid);

impl StrokeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StrokeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrokeId({})", self.0)
    }
}

/// Lifecycle of a stroke: `Idle -> Active -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeState {
    Idle,
    Active,
    Closed,
}

impl StrokeState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// Validates a lifecycle event against this state and returns the next state.
    pub fn transition(self, event: StrokeEvent) -> Result<Self> {
        let next = match (self, event) {
            (Self::Idle, StrokeEvent::Press) => Self::Active,
            (Self::Active, StrokeEvent::Drag | StrokeEvent::Hold) => Self::Active,
            (Self::Idle | Self::Active, StrokeEvent::Release) => Self::Closed,
            (state, event) => {
                return Err(ScatterError::InvalidTransition {
                    state: state.as_str(),
                    event: event.as_str(),
                });
            }
        };
        Ok(next)
    }
}

/// Input events driving a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeEvent {
    Press,
    Drag,
    Hold,
    Release,
}

impl StrokeEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Drag => "drag",
            Self::Hold => "hold",
            Self::Release => "release",
        }
    }
}

/// Gating policy deciding whether a hit warrants a new placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    /// Accept when at least `threshold` away from the last accepted point
    Distance { threshold: f64 },
    /// Accept when more than `threshold` elapsed since the last accepted point
    Timer { threshold: Duration },
}

impl Gate {
    pub fn from_flux(flux: FluxMode) -> Self {
        match flux {
            FluxMode::Distance(threshold) => Self::Distance {
                threshold: if threshold.is_finite() {
                    threshold.max(MIN_DISTANCE_THRESHOLD)
                } else {
                    MIN_DISTANCE_THRESHOLD
                },
            },
            FluxMode::Timer(threshold) => Self::Timer { threshold },
        }
    }

    /// The first accepted point of a stroke is always admitted.
    pub fn admits(&self, last: Option<&Intersection>, candidate: &Intersection, now: Instant) -> bool {
        let Some(last) = last else {
            return true;
        };
        match *self {
            Self::Distance { threshold } => candidate.point.distance(last.point) >= threshold,
            Self::Timer { threshold } => match last.created_at {
                Some(stamp) => now.saturating_duration_since(stamp) > threshold,
                None => true,
            },
        }
    }
}

/// Ramp envelope values for one placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStep {
    /// `i / n` for the i-th of n placements (1-indexed)
    pub fraction: f64,
    /// Scale multiplier before the placement's initial scale is applied
    pub scale: DVec3,
    /// Target object-space rotation in degrees
    pub rotation: DVec3,
}

/// Envelope for the `index`-th (1-indexed) of `count` placements.
pub fn ramp_step(ranges: &TransformRanges, index: usize, count: usize, uniform: bool) -> RampStep {
    let fraction = if count == 0 {
        0.0
    } else {
        index as f64 / count as f64
    };
    let lerp = |(min, max): (f64, f64)| min + (max - min) * fraction;

    let [sx, sy, sz] = ranges.scale;
    let x = lerp(sx);
    let scale = if uniform {
        DVec3::splat(x)
    } else {
        DVec3::new(x, lerp(sy), lerp(sz))
    };
    let [rx, ry, rz] = ranges.rotate;
    RampStep {
        fraction,
        scale,
        rotation: DVec3::new(lerp(rx), lerp(ry), lerp(rz)),
    }
}

/// Ordered placements of one continuous press-drag-release interaction.
#[derive(Debug, Clone)]
pub struct StrokeSession {
    id: StrokeId,
    state: StrokeState,
    gate: Gate,
    placements: Vec<Intersection>,
    last_ray: Option<Ray>,
}

impl StrokeSession {
    pub fn new(id: StrokeId, gate: Gate) -> Self {
        Self {
            id,
            state: StrokeState::Idle,
            gate,
            placements: Vec::new(),
            last_ray: None,
        }
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    /// Swaps the gating policy; placements and timestamps are kept.
    pub fn set_gate(&mut self, gate: Gate) {
        self.gate = gate;
    }

    pub fn placements(&self) -> &[Intersection] {
        &self.placements
    }

    pub fn placements_mut(&mut self) -> &mut [Intersection] {
        &mut self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn last(&self) -> Option<&Intersection> {
        self.placements.last()
    }

    pub fn last_ray(&self) -> Option<Ray> {
        self.last_ray
    }

    /// Advances the lifecycle. Errors leave the session untouched.
    pub fn advance(&mut self, event: StrokeEvent, ray: Option<Ray>) -> Result<()> {
        self.state = self.state.transition(event)?;
        if ray.is_some() {
            self.last_ray = ray;
        }
        Ok(())
    }

    /// Records the gating decision on `candidate`; accepted candidates get a timestamp.
    pub fn gate_candidate(&self, candidate: &mut Intersection, now: Instant, trace: bool) -> bool {
        let accepted = self.gate.admits(self.last(), candidate, now);
        if trace {
            match (self.gate, self.last()) {
                (Gate::Distance { threshold }, Some(last)) => log::debug!(
                    "{}: candidate at {:?} is {:.4} from previous (threshold {}), accepted: {}",
                    self.id,
                    candidate.point,
                    candidate.point.distance(last.point),
                    threshold,
                    accepted
                ),
                (Gate::Timer { threshold }, Some(last)) => log::debug!(
                    "{}: candidate {:?} after last placement (threshold {:?}), accepted: {}",
                    self.id,
                    last.created_at.map(|t| now.saturating_duration_since(t)),
                    threshold,
                    accepted
                ),
                (_, None) => log::debug!("{}: first candidate of stroke accepted", self.id),
            }
        }
        candidate.set_valid(accepted);
        if accepted {
            candidate.start_timer(now);
        }
        accepted
    }

    /// Appends an accepted placement.
    pub fn push(&mut self, placement: Intersection) {
        debug_assert_eq!(placement.is_valid(), Some(true), "pushing an ungated placement");
        self.placements.push(placement);
    }

    /// Applies the ramp envelope over the placements made so far.
    ///
    /// Scale is set absolutely as envelope times each placement's initial
    /// scale. Rotation is applied in object space as the difference between
    /// the envelope and what earlier ramp passes already applied, so it
    /// composes with sampled rotation and repeated passes do not accumulate.
    pub fn apply_ramp<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        ranges: &TransformRanges,
        mode: RampMode,
        uniform: bool,
        trace: bool,
    ) {
        let count = self.placements.len();
        if count == 0 || !mode.is_on() {
            return;
        }
        for (i, placement) in self.placements.iter_mut().enumerate() {
            let Some(node) = placement.created_instance.as_ref() else {
                continue;
            };
            let step = ramp_step(ranges, i + 1, count, uniform);
            if mode.drives_scale() {
                host.scale_absolute(node, step.scale * placement.initial_scale);
            }
            if mode.drives_rotation() {
                let delta = step.rotation - placement.ramp_rotation;
                if delta != DVec3::ZERO {
                    host.rotate_object_space(node, delta);
                }
                placement.ramp_rotation = step.rotation;
            }
            if trace {
                log::debug!(
                    "ramp {} / {} ({:.3}) {} -> scale {:?} rotate {:?}",
                    i + 1,
                    count,
                    step.fraction,
                    node,
                    step.scale,
                    step.rotation
                );
            }
        }
    }
}
