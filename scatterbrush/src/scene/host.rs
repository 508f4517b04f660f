//! Scene host callback trait.
//!
//! The engine never owns scene data. Ray queries, normals, duplication,
//! transforms and hierarchy edits are all delegated to a [`SceneHost`]
//! implemented by the application embedding Scatterbrush (a DCC plugin, a
//! game editor, or the in-memory scene used by the demo and the tests).

use crate::math::{DVec3, LinearUnit, Point3, UpAxis, triangle_normal};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Opaque, stable identifier of a host node (for example a full DAG path).
///
/// Ordering is the host identifier's lexical order; round-robin selection
/// walks pool keys in this order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(Arc<str>);

impl NodeRef {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `|`-separated segment of the identifier.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('|').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Raw hit reported by [`SceneHost::cast_ray`], in the host's internal unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostHit {
    pub point: Point3,
    pub face_index: u32,
    pub sub_face_index: u32,
}

/// What kind of node a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A positionable node. `shapes` are its direct drawable children,
    /// `child_transforms` counts its direct transform children.
    Transform {
        shapes: Vec<NodeRef>,
        child_transforms: usize,
    },
    /// A drawable leaf (mesh, cache, locator) owned by a transform.
    Shape,
}

impl NodeKind {
    /// A transform with child transforms but no drawable of its own.
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            Self::Transform { shapes, child_transforms } if shapes.is_empty() && *child_transforms > 0
        )
    }
}

/// World-space transform data of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub translation: DVec3,
    /// World-space position of the node's scale pivot.
    pub scale_pivot: DVec3,
    /// Relative scale of the node.
    pub scale: DVec3,
}

/// Host scene-graph and query service consumed by the engine.
///
/// Ray queries and surface geometry cross this boundary in the host's
/// internal unit (centimeters); the engine converts hits to
/// [`SceneHost::linear_unit`] itself. Transform edits and
/// [`WorldTransform`] use the working unit. Rotations are Euler XYZ in
/// degrees.
///
/// All calls are synchronous and made from the single thread delivering
/// input events.
pub trait SceneHost {
    /// Intersects a ray with one surface, bounded by `far_clip`.
    fn cast_ray(
        &self,
        origin: Point3,
        direction: DVec3,
        surface: &NodeRef,
        far_clip: f64,
    ) -> Option<HostHit>;

    /// Normal interpolated from the surface's per-vertex smoothing data.
    fn smooth_normal(&self, surface: &NodeRef, point: Point3) -> Option<DVec3>;

    /// World-space vertices of one triangle of a face.
    fn face_triangle(&self, surface: &NodeRef, face: u32, sub_face: u32) -> Option<[Point3; 3]>;

    /// Hard normal of the hit triangle.
    fn face_normal(&self, surface: &NodeRef, face: u32, sub_face: u32) -> Option<DVec3> {
        let [p0, p1, p2] = self.face_triangle(surface, face, sub_face)?;
        triangle_normal(p0, p1, p2)
    }

    /// Duplicates or instances a transform and returns the new top-level node.
    fn duplicate(
        &mut self,
        source: &NodeRef,
        preserve_connections: bool,
        as_instance: bool,
    ) -> Option<NodeRef>;

    fn world_transform(&self, node: &NodeRef) -> Option<WorldTransform>;
    fn set_world_translation(&mut self, node: &NodeRef, translation: DVec3);
    fn translate_relative(&mut self, node: &NodeRef, offset: DVec3);
    /// Sets the absolute rotation.
    fn set_rotation(&mut self, node: &NodeRef, euler_degrees: DVec3);
    /// Rotates relative to the current orientation, in object space.
    fn rotate_object_space(&mut self, node: &NodeRef, euler_degrees: DVec3);
    fn scale_absolute(&mut self, node: &NodeRef, scale: DVec3);
    fn scale_relative(&mut self, node: &NodeRef, scale: DVec3);
    fn set_visibility(&mut self, node: &NodeRef, visible: bool);

    fn create_group(&mut self, name: &str) -> NodeRef;
    /// Moves `child` under `parent`, keeping its local transform. Returns the
    /// child's new identifier.
    fn reparent(&mut self, child: &NodeRef, parent: &NodeRef) -> NodeRef;
    fn children(&self, node: &NodeRef) -> Vec<NodeRef>;
    /// One-hop parent lookup.
    fn parent(&self, node: &NodeRef) -> Option<NodeRef>;
    fn delete_node(&mut self, node: &NodeRef);
    fn node_exists(&self, node: &NodeRef) -> bool;
    fn node_kind(&self, node: &NodeRef) -> Option<NodeKind>;
    /// Drawable nodes anywhere below `node`, nearest first.
    fn descendant_drawables(&self, node: &NodeRef) -> Vec<NodeRef>;
    /// Transform groups whose name starts with `prefix`.
    fn groups_with_prefix(&self, prefix: &str) -> Vec<NodeRef>;

    /// Currently held modifier keys as a shift=1 / ctrl=4 / alt=8 bitmask.
    fn modifier_bits(&self) -> u32;
    /// Far clipping distance of the active camera.
    fn far_clip(&self) -> f64;
    fn up_axis(&self) -> UpAxis;
    fn linear_unit(&self) -> LinearUnit;

    /// Asks the host to redraw. Hosts may deliver further input events from here.
    fn refresh_viewport(&mut self) {}

    /// Time source used by timer gating.
    fn now(&self) -> Instant {
        Instant::now()
    }
}
