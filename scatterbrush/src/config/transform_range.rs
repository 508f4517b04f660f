/// Smallest scale a placement may receive unless negative scale is allowed.
pub const MIN_SCALE: f64 = 1e-3;

/// Inclusive `(min, max)` bounds of one sampled channel.
pub type Range = (f64, f64);

/// Which jitter range to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterAxis {
    U,
    V,
}

/// Ranges the transform sampler draws from.
///
/// Rotations are in degrees, scales are multipliers, jitter is in the
/// scene's working unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRanges {
    pub rotate: [Range; 3],
    pub scale: [Range; 3],
    pub u_jitter: Range,
    pub v_jitter: Range,
}

impl Default for TransformRanges {
    fn default() -> Self {
        Self {
            rotate: [(0.0, 0.0), (-360.0, 360.0), (0.0, 0.0)],
            scale: [(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)],
            u_jitter: (-15.0, 15.0),
            v_jitter: (-15.0, 15.0),
        }
    }
}

impl TransformRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rotate(mut self, x: Range, y: Range, z: Range) -> Self {
        self.rotate = [x, y, z];
        self
    }

    pub fn scale(mut self, x: Range, y: Range, z: Range) -> Self {
        self.scale = [x, y, z];
        self
    }

    pub fn uniform_scale(mut self, range: Range) -> Self {
        self.scale = [range; 3];
        self
    }

    pub fn jitter(mut self, u: Range, v: Range) -> Self {
        self.u_jitter = u;
        self.v_jitter = v;
        self
    }

    pub fn jitter_range(&self, axis: JitterAxis) -> Range {
        match axis {
            JitterAxis::U => self.u_jitter,
            JitterAxis::V => self.v_jitter,
        }
    }

    /// Copy with scale bounds clamped to [`MIN_SCALE`] unless negative scale is allowed.
    pub fn sanitized(&self, allow_negative_scale: bool) -> Self {
        let mut ranges = self.clone();
        if !allow_negative_scale {
            for (min, max) in &mut ranges.scale {
                *min = min.max(MIN_SCALE);
                *max = max.max(MIN_SCALE);
            }
        }
        ranges
    }
}
