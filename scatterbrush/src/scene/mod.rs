//! Scene access for the scattering engine.
//!
//! The engine talks to the host application only through the [`SceneHost`]
//! trait. This module also holds the intersection types built from the
//! host's ray queries.
//!
//! # Workflow
//!
//! 1. Implement [`SceneHost`] on top of your scene graph
//! 2. Register target surfaces and source assets in [`AssetPool`](crate::pool::AssetPool)s
//! 3. Drive a [`ScatterEngine`](crate::ScatterEngine) from your input events
//!
//! # Example
//!
//! ```rust,ignore
//! use scatterbrush::scene::{IntersectionResolver, NodeRef};
//! use scatterbrush::math::{DVec3, Ray};
//!
//! let resolver = IntersectionResolver::from_host(&host);
//! let ray = Ray::new(DVec3::new(0.0, 1000.0, 0.0), DVec3::NEG_Y);
//! if let Some(hit) = resolver.resolve(&host, &ray, [&NodeRef::new("|ground")]) {
//!     println!("hit at {:?}", hit.point);
//! }
//! ```

pub mod host;
pub mod intersection;

pub use host::{HostHit, NodeKind, NodeRef, SceneHost, WorldTransform};
pub use intersection::{Intersection, IntersectionResolver, NormalMode, Validity};
