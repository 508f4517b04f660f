/// Verbose tracing switches, set per engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Trace every gating decision with its distance or elapsed time
    pub trace_gating: bool,
    /// Trace every ramp application per placement
    pub trace_ramp: bool,
    /// Trace every mutating host call made for a placement
    pub trace_host: bool,
}

impl Diagnostics {
    /// Every trace switch on.
    pub fn all() -> Self {
        Self {
            trace_gating: true,
            trace_ramp: true,
            trace_host: true,
        }
    }
}

/// Names of the groups the hierarchy manager creates in the host scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNames {
    /// Group accumulating every placement across the tool's lifetime
    pub session: String,
    /// Group created fresh for each stroke
    pub stroke: String,
    /// Prefix of the per-source groups, followed by the source's short name
    pub source_prefix: String,
    /// Transient group holding placements while a stroke is in progress
    pub scaffolding: String,
}

impl Default for GroupNames {
    fn default() -> Self {
        Self {
            session: "scatterOutput".to_string(),
            stroke: "scatterStrokeOutput".to_string(),
            source_prefix: "scatterOutput_".to_string(),
            scaffolding: "scatterTempGroup".to_string(),
        }
    }
}

/// Construction-time descriptor for a [`ScatterEngine`](crate::ScatterEngine).
#[derive(Debug, Clone, Default)]
pub struct EngineDesc {
    pub diagnostics: Diagnostics,
    /// Fixed seed for the engine's random source (None seeds from the clock)
    pub rng_seed: Option<u64>,
    pub group_names: GroupNames,
}

impl EngineDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn group_names(mut self, names: GroupNames) -> Self {
        self.group_names = names;
        self
    }
}
