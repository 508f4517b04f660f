use crate::hierarchy::HierarchyPolicy;
use crate::scene::NodeRef;
use std::collections::HashMap;
use std::time::Duration;

/// Rule deciding whether a new placement is warranted during a stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FluxMode {
    /// Place when the hit moved at least this far (working unit) from the last placement
    Distance(f64),
    /// Place when more than this much time passed since the last placement
    Timer(Duration),
}

impl Default for FluxMode {
    fn default() -> Self {
        Self::Distance(10.0)
    }
}

/// Which channels the ramp envelope drives across a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampMode {
    #[default]
    Off,
    Rotate,
    Scale,
    Both,
}

impl RampMode {
    pub fn is_on(self) -> bool {
        self != Self::Off
    }

    pub fn drives_rotation(self) -> bool {
        matches!(self, Self::Rotate | Self::Both)
    }

    pub fn drives_scale(self) -> bool {
        matches!(self, Self::Scale | Self::Both)
    }
}

/// How jitter offsets a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterAlgorithm {
    /// Translate the created instance in the plane orthogonal to world up
    #[default]
    Simple,
    /// Re-resolve the jittered location against the target surfaces
    ReRaycast,
}

/// Tool options. Hot-swappable through
/// [`ScatterEngine::runtime_update`](crate::ScatterEngine::runtime_update).
#[derive(Debug, Clone)]
pub struct ScatterOptions {
    /// Apply a sampled rotation to each placement
    pub transform_rotate: bool,
    /// Apply a sampled scale to each placement
    pub transform_scale: bool,
    /// Draw one scale scalar for all three axes
    pub uniform_scale: bool,
    /// Instance sources instead of duplicating them
    pub instance: bool,
    /// Keep input connections when duplicating
    pub preserve_connections: bool,
    /// Random source selection (false walks sources round robin)
    pub random: bool,
    /// Per-source weights; a non-empty map switches random selection to weighted
    pub source_weights: HashMap<String, f64>,
    /// Align placements to the surface normal
    pub align: bool,
    /// Use the smoothed normal instead of the hit triangle's normal
    pub smooth_normal: bool,
    pub flux: FluxMode,
    pub ramp: RampMode,
    /// Apply the ramp after every placement instead of once at release
    pub real_time_ramp: bool,
    /// Let negative sampled scales through unmodified
    pub allow_negative_scale: bool,
    /// Force created nodes visible
    pub force_visibility: bool,
    /// Offset along world up applied after placement (working unit)
    pub up_offset: f64,
    /// Place mode rotate increment, also the snap increment (degrees)
    pub place_rotate: f64,
    /// Snap sampled rotations to multiples of `place_rotate`
    pub rotate_increment_snap: bool,
    /// Place mode: resample the cursor transform on every drag
    pub continuous_transform: bool,
    /// Jitter algorithm, `None` disables jitter
    pub jitter: Option<JitterAlgorithm>,
    /// Grouping policy applied at stroke close, `None` disables grouping
    pub hierarchy: Option<HierarchyPolicy>,
}

impl Default for ScatterOptions {
    fn default() -> Self {
        Self {
            transform_rotate: true,
            transform_scale: true,
            uniform_scale: true,
            instance: false,
            preserve_connections: true,
            random: true,
            source_weights: HashMap::new(),
            align: true,
            smooth_normal: false,
            flux: FluxMode::default(),
            ramp: RampMode::Off,
            real_time_ramp: true,
            allow_negative_scale: false,
            force_visibility: true,
            up_offset: 0.0,
            place_rotate: 45.0,
            rotate_increment_snap: false,
            continuous_transform: false,
            jitter: None,
            hierarchy: Some(HierarchyPolicy::SingleSessionGroup),
        }
    }
}

impl ScatterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flux(mut self, flux: FluxMode) -> Self {
        self.flux = flux;
        self
    }

    pub fn ramp(mut self, ramp: RampMode, real_time: bool) -> Self {
        self.ramp = ramp;
        self.real_time_ramp = real_time;
        self
    }

    pub fn jitter(mut self, algorithm: Option<JitterAlgorithm>) -> Self {
        self.jitter = algorithm;
        self
    }

    pub fn hierarchy(mut self, policy: Option<HierarchyPolicy>) -> Self {
        self.hierarchy = policy;
        self
    }

    pub fn random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    pub fn align(mut self, align: bool) -> Self {
        self.align = align;
        self
    }

    pub fn transform(mut self, rotate: bool, scale: bool) -> Self {
        self.transform_rotate = rotate;
        self.transform_scale = scale;
        self
    }

    pub fn uniform_scale(mut self, uniform: bool) -> Self {
        self.uniform_scale = uniform;
        self
    }

    pub fn instance(mut self, instance: bool) -> Self {
        self.instance = instance;
        self
    }

    pub fn up_offset(mut self, offset: f64) -> Self {
        self.up_offset = offset;
        self
    }

    pub fn allow_negative_scale(mut self, allow: bool) -> Self {
        self.allow_negative_scale = allow;
        self
    }

    pub fn rotate_snap(mut self, enabled: bool, increment: f64) -> Self {
        self.rotate_increment_snap = enabled;
        self.place_rotate = increment;
        self
    }

    pub fn source_weight(mut self, source: &NodeRef, weight: f64) -> Self {
        self.source_weights.insert(source.as_str().to_string(), weight);
        self
    }

    /// Weighted selection is used whenever any weight is configured.
    pub fn weighted(&self) -> bool {
        !self.source_weights.is_empty()
    }

    /// Snap increment when rotation snapping is active.
    pub fn snap_increment(&self) -> Option<f64> {
        (self.rotate_increment_snap && self.place_rotate > 0.0).then_some(self.place_rotate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ScatterOptions::default();
        assert_eq!(options.flux, FluxMode::Distance(10.0));
        assert!(!options.ramp.is_on());
        assert!(options.jitter.is_none());
        assert_eq!(options.hierarchy, Some(HierarchyPolicy::SingleSessionGroup));
        assert!(!options.weighted());
    }

    #[test]
    fn test_jitter_algorithm_defaults_to_simple() {
        assert_eq!(JitterAlgorithm::default(), JitterAlgorithm::Simple);
    }

    #[test]
    fn test_ramp_channels() {
        assert!(RampMode::Both.drives_rotation() && RampMode::Both.drives_scale());
        assert!(RampMode::Rotate.drives_rotation() && !RampMode::Rotate.drives_scale());
        assert!(!RampMode::Scale.drives_rotation() && RampMode::Scale.drives_scale());
        assert!(!RampMode::Off.drives_rotation() && !RampMode::Off.drives_scale());
    }

    #[test]
    fn test_snap_increment_requires_positive_step() {
        assert_eq!(ScatterOptions::new().rotate_snap(true, 90.0).snap_increment(), Some(90.0));
        assert_eq!(ScatterOptions::new().rotate_snap(true, 0.0).snap_increment(), None);
        assert_eq!(ScatterOptions::new().rotate_snap(false, 90.0).snap_increment(), None);
    }
}
