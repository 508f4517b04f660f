//! # Scatterbrush
//!
//! A surface-constrained scattering engine: paint copies of source assets onto
//! target surfaces by dragging a pointer across them, or position a single
//! object interactively and commit it on release.
//!
//! The engine never touches a scene graph directly. A host application
//! implements [`SceneHost`] (ray casts, duplication, transforms, grouping) and
//! forwards pointer events to a [`ScatterEngine`], which owns the stroke
//! lifecycle, placement gating, transform sampling and output grouping.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scatterbrush::*;
//! # fn demo<H: SceneHost>(host: H) -> Result<(), ScatterError> {
//! let mut sources = AssetPool::new();
//! sources.add_entry(&host, &NodeRef::new("|rock"))?;
//! let mut targets = AssetPool::new();
//! targets.add_entry(&host, &NodeRef::new("|ground"))?;
//!
//! let mut engine = ScatterEngine::new(
//!     host,
//!     EngineDesc::default(),
//!     ScatterOptions::default().flux(FluxMode::Distance(10.0)),
//!     TransformRanges::new().rotate((0.0, 0.0), (0.0, 360.0), (0.0, 0.0)),
//!     sources,
//!     targets,
//! );
//!
//! engine.begin_stroke(ToolMode::Paint)?;
//! engine.on_press(Ray::new(DVec3::new(0.0, 100.0, 0.0), DVec3::NEG_Y))?;
//! engine.on_drag(Ray::new(DVec3::new(25.0, 100.0, 0.0), DVec3::NEG_Y))?;
//! let summary = engine.end_stroke()?;
//!
//! for event in engine.poll_events() {
//!     if let ScatterEvent::PlacementCreated { node, .. } = event {
//!         println!("placed {}", node);
//!     }
//! }
//! println!("{} objects", summary.placements.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Components
//!
//! - **[`ScatterEngine`]**: Stroke lifecycle and event dispatch
//! - **[`SceneHost`]**: Trait the host application implements
//! - **[`AssetPool`]**: Registered sources and target surfaces
//! - **[`ScatterOptions`]** / **[`TransformRanges`]**: Per-tool settings
//! - **[`ScatterEvent`]**: Notifications drained with [`ScatterEngine::poll_events`]
//!
//! ## Interaction model
//!
//! A stroke is press, any number of drag or hold events, then release. In
//! paint mode each event casts a ray against the target pool; the hit is gated
//! by distance or time since the last accepted placement and, when admitted,
//! a source is duplicated onto the surface. In place mode one cursor object
//! follows the pointer; Ctrl swaps its source and Shift spins it.
//!
//! Drag and hold events arriving while the previous one is still being
//! processed are dropped (see [`FlightGuard`]).

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod math;
pub mod modifiers;
pub mod place;
pub mod placement;
pub mod pool;
pub mod preflight;
pub mod random;
pub mod sampler;
pub mod scene;
pub mod stroke;

#[cfg(test)]
mod testing;

pub use config::{EngineDesc, FluxMode, JitterAlgorithm, RampMode, ScatterOptions, TransformRanges};
pub use engine::{EventOutcome, FlightGuard, ScatterEngine, StrokeSummary};
pub use error::{PlacementError, PoolError, PreflightError, ScatterError, SelectionError};
pub use events::{ScatterEvent, ToolMode};
pub use hierarchy::HierarchyPolicy;
pub use math::{DVec3, Point3, Ray, UpAxis};
pub use pool::{AlignOverride, AssetEntry, AssetPool};
pub use scene::{Intersection, NodeRef, SceneHost};
pub use stroke::{StrokeId, StrokeState};
