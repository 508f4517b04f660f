//! Randomized rotation, scale and jitter draws.

use crate::config::{JitterAxis, MIN_SCALE, Range, TransformRanges};
use crate::math::DVec3;
use crate::random::RandomSource;

/// Draws transform variation from configured ranges.
#[derive(Debug, Clone, Default)]
pub struct TransformSampler {
    ranges: TransformRanges,
    allow_negative_scale: bool,
}

impl TransformSampler {
    /// Scale bounds are clamped to [`MIN_SCALE`] unless negative scale is allowed.
    pub fn new(ranges: &TransformRanges, allow_negative_scale: bool) -> Self {
        Self {
            ranges: ranges.sanitized(allow_negative_scale),
            allow_negative_scale,
        }
    }

    pub fn ranges(&self) -> &TransformRanges {
        &self.ranges
    }

    /// Per-axis rotation in degrees.
    ///
    /// With a snap increment each draw is rounded to the nearest multiple of
    /// the increment counted from the range minimum, then clamped back into
    /// the range.
    pub fn sample_rotation<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        snap_increment: Option<f64>,
    ) -> DVec3 {
        let [x, y, z] = self.ranges.rotate;
        DVec3::new(
            draw_rotation(rng, x, snap_increment),
            draw_rotation(rng, y, snap_increment),
            draw_rotation(rng, z, snap_increment),
        )
    }

    /// Per-axis scale multipliers; `uniform` replicates the X draw.
    pub fn sample_scale<R: RandomSource + ?Sized>(&self, rng: &mut R, uniform: bool) -> DVec3 {
        let [x, y, z] = self.ranges.scale;
        let scale = if uniform {
            DVec3::splat(rng.uniform(x.0, x.1))
        } else {
            DVec3::new(
                rng.uniform(x.0, x.1),
                rng.uniform(y.0, y.1),
                rng.uniform(z.0, z.1),
            )
        };
        if self.allow_negative_scale {
            scale
        } else {
            scale.max(DVec3::splat(MIN_SCALE))
        }
    }

    pub fn sample_jitter<R: RandomSource + ?Sized>(&self, rng: &mut R, axis: JitterAxis) -> f64 {
        let (min, max) = self.ranges.jitter_range(axis);
        rng.uniform(min, max)
    }
}

fn draw_rotation<R: RandomSource + ?Sized>(rng: &mut R, (min, max): Range, snap: Option<f64>) -> f64 {
    let value = rng.uniform(min, max);
    match snap {
        Some(increment) if increment > 0.0 => snap_to_increment(value, increment, min, max),
        _ => value,
    }
}

/// Rounds `value` to `min + k * increment` and clamps it into `[min, max]`.
pub fn snap_to_increment(value: f64, increment: f64, min: f64, max: f64) -> f64 {
    let steps = ((value - min) / increment).round();
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    (min + steps * increment).clamp(lo, hi)
}
