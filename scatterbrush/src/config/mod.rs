//! Configuration types for Scatterbrush

pub mod engine_desc;
pub mod options;
pub mod transform_range;

pub use engine_desc::{Diagnostics, EngineDesc, GroupNames};
pub use options::{FluxMode, JitterAlgorithm, RampMode, ScatterOptions};
pub use transform_range::{JitterAxis, MIN_SCALE, Range, TransformRanges};
